pub mod fixtures;
pub mod graph;
pub mod store;

pub use fixtures::{DemoDataset, FixtureReport};
pub use graph::{
    CatalogGraph, ComparisonRow, GraphError, GraphSeedSummary, GraphService, GraphStore,
    Neo4jGraph, ProductComparison,
};
pub use store::{DataStore, Dataset, StoreCounts, StoreError};
