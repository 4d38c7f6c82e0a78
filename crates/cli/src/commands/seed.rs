use serde_json::json;
use techpro_core::config::{AppConfig, LoadOptions};
use techpro_db::{DataStore, DemoDataset, GraphStore, Neo4jGraph};
use techpro_rag::{embedder_from_config, PipelineSettings, RagPipeline};

use crate::commands::{current_thread_runtime, CommandResult};

type StepError = (&'static str, String, u8);

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(seed(&config)) {
        Ok(output) => {
            let message = format!(
                "demo data ready: {} file(s) written, {} already present; graph {}; {} chunk(s) indexed",
                output.written,
                output.skipped,
                output.graph,
                output.chunks
            );
            let data = json!({
                "written": output.written,
                "skipped": output.skipped,
                "graph": output.graph,
                "chunks": output.chunks,
                "index_path": config.rag.index_path.display().to_string(),
            });
            CommandResult::success_with("seed", message, Some(data))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    written: usize,
    skipped: usize,
    graph: String,
    chunks: usize,
}

async fn seed(config: &AppConfig) -> Result<SeedOutput, StepError> {
    let fixtures = DemoDataset::write_missing(&config.data.dir, &config.data.documents_dir)
        .await
        .map_err(|error| ("fixture_write", error.to_string(), 4u8))?;

    let store = DataStore::load(&config.data.dir)
        .await
        .map_err(|error| ("data_load", error.to_string(), 4u8))?;

    let graph = seed_graph(config, &store).await;

    let embedder =
        embedder_from_config(config).map_err(|error| ("index_build", error.to_string(), 5u8))?;
    let rag = RagPipeline::new(embedder, PipelineSettings::from_config(config));
    let report =
        rag.initialize().await.map_err(|error| ("index_build", error.to_string(), 5u8))?;

    Ok(SeedOutput {
        written: fixtures.written.len(),
        skipped: fixtures.skipped.len(),
        graph,
        chunks: report.chunks,
    })
}

/// Graph seeding never fails the command; the server falls back to the catalog.
async fn seed_graph(config: &AppConfig, store: &DataStore) -> String {
    if !config.graph.enabled {
        return "disabled".to_string();
    }

    let graph = match Neo4jGraph::new(&config.graph) {
        Ok(graph) => graph,
        Err(error) => return format!("unavailable ({error})"),
    };
    let products = store.products().await;
    match graph.seed(&products).await {
        Ok(summary) => format!(
            "seeded with {} products and {} compatibility links",
            summary.products, summary.compatible_pairs
        ),
        Err(error) => format!("unavailable ({error})"),
    }
}
