use std::sync::Arc;

use async_trait::async_trait;

use techpro_core::{Product, ProductId};

use super::{
    build_comparison, compatibility_pairs, same_category_pairs, GraphError, GraphSeedSummary,
    GraphStore, ProductComparison,
};
use crate::store::DataStore;

/// Graph queries answered directly from the product catalog in the data store.
#[derive(Clone)]
pub struct CatalogGraph {
    store: Arc<DataStore>,
}

impl CatalogGraph {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }

    pub fn name(&self) -> &'static str {
        "catalog"
    }

    /// Products keep catalog order, not the order the ids were given in.
    pub async fn compare(&self, ids: &[ProductId]) -> ProductComparison {
        let entries = self
            .store
            .products()
            .await
            .into_iter()
            .filter(|product| ids.contains(&product.id))
            .map(|product| {
                let specs = product.specs.entries();
                (product, specs)
            })
            .collect();
        build_comparison(entries)
    }

    pub async fn compatible_with(&self, id: ProductId) -> Vec<Product> {
        let products = self.store.products().await;
        let compatible: Vec<ProductId> = compatibility_pairs(&products)
            .into_iter()
            .filter(|(laptop, _)| *laptop == id)
            .map(|(_, accessory)| accessory)
            .collect();
        products.into_iter().filter(|product| compatible.contains(&product.id)).collect()
    }
}

#[async_trait]
impl GraphStore for CatalogGraph {
    fn name(&self) -> &'static str {
        CatalogGraph::name(self)
    }

    async fn has_data(&self) -> Result<bool, GraphError> {
        Ok(self.store.counts().await.products > 0)
    }

    async fn seed(&self, products: &[Product]) -> Result<GraphSeedSummary, GraphError> {
        Ok(GraphSeedSummary {
            products: products.len(),
            specs: products.iter().map(|product| product.specs.entries().len()).sum(),
            same_category_pairs: same_category_pairs(products).len(),
            compatible_pairs: compatibility_pairs(products).len(),
        })
    }

    async fn compare_products(&self, ids: &[ProductId]) -> Result<ProductComparison, GraphError> {
        Ok(self.compare(ids).await)
    }

    async fn find_compatible_products(&self, id: ProductId) -> Result<Vec<Product>, GraphError> {
        Ok(self.compatible_with(id).await)
    }
}
