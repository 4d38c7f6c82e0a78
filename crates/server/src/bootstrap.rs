use std::sync::Arc;

use techpro_agent::{LlmService, Orchestrator, OrchestratorSettings};
use techpro_core::config::{AppConfig, ConfigError, LoadOptions};
use techpro_db::{CatalogGraph, DataStore, GraphService, GraphStore, Neo4jGraph, StoreError};
use techpro_rag::{embedder_from_config, PipelineSettings, RagError, RagPipeline};
use thiserror::Error;
use tracing::{info, warn};

/// Everything the API and CLI need, wired once at startup.
pub struct Application {
    pub config: AppConfig,
    pub store: Arc<DataStore>,
    pub graph: Arc<GraphService>,
    pub rag: Arc<RagPipeline>,
    pub llm: Arc<LlmService>,
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("data store failed to load: {0}")]
    Store(#[from] StoreError),
    #[error("document index failed to build: {0}")]
    Rag(#[from] RagError),
    #[error("language model setup failed: {0:#}")]
    Llm(anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        data_dir = %config.data.dir.display(),
        "starting application bootstrap"
    );

    let store = Arc::new(DataStore::load(&config.data.dir).await?);
    let counts = store.counts().await;
    info!(
        event_name = "system.bootstrap.data_loaded",
        correlation_id = "bootstrap",
        products = counts.products,
        orders = counts.orders,
        complaints = counts.complaints,
        refunds = counts.refunds,
        deliveries = counts.deliveries,
        "data store loaded"
    );

    let graph = Arc::new(connect_graph(&config, store.clone()).await);

    let embedder = embedder_from_config(&config)?;
    let rag = Arc::new(RagPipeline::new(embedder, PipelineSettings::from_config(&config)));
    let report = rag.initialize().await?;
    info!(
        event_name = "system.bootstrap.rag_ready",
        correlation_id = "bootstrap",
        chunks = report.chunks,
        loaded_from_cache = report.loaded_from_cache,
        "document index ready"
    );

    let llm = Arc::new(LlmService::from_config(&config).map_err(BootstrapError::Llm)?);
    let orchestrator = Arc::new(Orchestrator::new(
        llm.clone(),
        store.clone(),
        rag.clone(),
        graph.clone(),
        OrchestratorSettings::from(&config.agent),
    ));

    info!(
        event_name = "system.bootstrap.completed",
        correlation_id = "bootstrap",
        graph_backend = graph.backend_name(),
        llm = llm.client_name(),
        "application bootstrap complete"
    );

    Ok(Application { config, store, graph, rag, llm, orchestrator })
}

/// Neo4j when it is enabled and reachable (seeding an empty graph), else the in-memory catalog.
pub async fn connect_graph(config: &AppConfig, store: Arc<DataStore>) -> GraphService {
    let catalog = CatalogGraph::new(store.clone());
    if !config.graph.enabled {
        info!(event_name = "system.bootstrap.graph_disabled", "graph database disabled, using catalog");
        return GraphService::new(None, catalog);
    }

    let neo4j = match Neo4jGraph::new(&config.graph) {
        Ok(neo4j) => neo4j,
        Err(err) => {
            warn!(event_name = "system.bootstrap.graph_client_failed", error = %err, "could not build graph client, using catalog");
            return GraphService::new(None, catalog);
        }
    };

    match neo4j.has_data().await {
        Ok(true) => {}
        Ok(false) => {
            let products = store.products().await;
            if let Err(err) = neo4j.seed(&products).await {
                warn!(event_name = "system.bootstrap.graph_seed_failed", error = %err, "graph seeding failed, using catalog");
                return GraphService::new(None, catalog);
            }
        }
        Err(err) => {
            warn!(
                event_name = "system.bootstrap.graph_unreachable",
                endpoint = neo4j.endpoint(),
                error = %err,
                "graph database unreachable, using catalog"
            );
            return GraphService::new(None, catalog);
        }
    }

    info!(event_name = "system.bootstrap.graph_connected", endpoint = neo4j.endpoint(), "graph database connected");
    GraphService::new(Some(Arc::new(neo4j) as Arc<dyn GraphStore>), catalog)
}

#[cfg(test)]
pub(crate) mod testing {
    use tempfile::TempDir;

    use techpro_core::config::{AppConfig, LlmProvider};
    use techpro_db::DemoDataset;

    use super::{bootstrap_with_config, Application};

    /// Demo data in a temp dir, no graph server and no model.
    pub async fn offline_application() -> (Application, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let mut config = AppConfig::default();
        config.data.dir = dir.path().join("data");
        config.data.documents_dir = config.data.dir.join("documents");
        config.rag.index_path = dir.path().join("vector_store").join("index.json");
        config.graph.enabled = false;
        config.llm.provider = LlmProvider::Offline;
        config.llm.api_key = None;

        DemoDataset::write_missing(&config.data.dir, &config.data.documents_dir)
            .await
            .expect("fixtures");
        let app = bootstrap_with_config(config).await.expect("bootstrap");
        (app, dir)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use techpro_core::config::AppConfig;
    use techpro_db::DataStore;

    use super::{connect_graph, testing::offline_application};

    #[tokio::test]
    async fn offline_bootstrap_wires_catalog_graph_and_offline_model() {
        let (app, _dir) = offline_application().await;

        assert_eq!(app.graph.backend_name(), "catalog");
        assert_eq!(app.llm.client_name(), "offline");
        assert_eq!(app.store.counts().await.products, 12);
        assert!(app.rag.stats().await.vector_store.total_documents > 0);
        assert!(app.config.rag.index_path.exists());
    }

    #[tokio::test]
    async fn unreachable_graph_server_falls_back_to_catalog() {
        let mut config = AppConfig::default();
        config.graph.enabled = true;
        config.graph.uri = "http://127.0.0.1:9".to_string();
        config.graph.timeout_secs = 1;

        let store = Arc::new(DataStore::from_dataset(Default::default()));
        let graph = connect_graph(&config, store).await;
        assert!(!graph.has_primary());
        assert_eq!(graph.backend_name(), "catalog");
    }
}
