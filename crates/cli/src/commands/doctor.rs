use serde::Serialize;
use techpro_core::config::{AppConfig, LlmProvider, LoadOptions};
use techpro_db::{DataStore, GraphStore, Neo4jGraph};

use crate::commands::current_thread_runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_llm_credentials(&config));
            match current_thread_runtime() {
                Ok(runtime) => {
                    checks.push(runtime.block_on(check_data_files(&config)));
                    checks.push(check_documents(&config));
                    checks.push(runtime.block_on(check_graph_connectivity(&config)));
                }
                Err(error) => {
                    let details = format!("failed to initialize async runtime: {error}");
                    checks.push(DoctorCheck::new("data_files", CheckStatus::Fail, details.clone()));
                    checks.push(check_documents(&config));
                    checks.push(DoctorCheck::new("graph_connectivity", CheckStatus::Fail, details));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["llm_credentials", "data_files", "documents", "graph_connectivity"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "llm_credentials";
    match config.llm.provider {
        LlmProvider::Offline => {
            DoctorCheck::new(NAME, CheckStatus::Skipped, "offline provider, answers run in limited mode")
        }
        _ if config.llm.is_remote_available() => DoctorCheck::new(
            NAME,
            CheckStatus::Pass,
            format!("{:?} provider configured with model `{}`", config.llm.provider, config.llm.model),
        ),
        _ => DoctorCheck::new(
            NAME,
            CheckStatus::Fail,
            "no API key set (TECHPRO_LLM_API_KEY or OPENAI_API_KEY); answers would run in limited mode",
        ),
    }
}

async fn check_data_files(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "data_files";
    if !config.data.dir.is_dir() {
        return DoctorCheck::new(
            NAME,
            CheckStatus::Fail,
            format!("data directory `{}` is missing, run `techpro seed`", config.data.dir.display()),
        );
    }
    match DataStore::load(&config.data.dir).await {
        Ok(store) => {
            let counts = store.counts().await;
            let details = format!(
                "{} products, {} orders, {} complaints, {} refunds, {} deliveries in `{}`",
                counts.products,
                counts.orders,
                counts.complaints,
                counts.refunds,
                counts.deliveries,
                config.data.dir.display()
            );
            let status = if counts.products > 0 { CheckStatus::Pass } else { CheckStatus::Fail };
            DoctorCheck::new(NAME, status, details)
        }
        Err(error) => DoctorCheck::new(NAME, CheckStatus::Fail, error.to_string()),
    }
}

fn check_documents(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "documents";
    let dir = &config.data.documents_dir;
    let count = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
                .count()
        })
        .unwrap_or(0);

    if count == 0 {
        DoctorCheck::new(NAME, CheckStatus::Fail, format!("no document files in `{}`", dir.display()))
    } else {
        DoctorCheck::new(NAME, CheckStatus::Pass, format!("{count} document file(s) in `{}`", dir.display()))
    }
}

async fn check_graph_connectivity(config: &AppConfig) -> DoctorCheck {
    const NAME: &str = "graph_connectivity";
    if !config.graph.enabled {
        return DoctorCheck::new(NAME, CheckStatus::Skipped, "graph disabled, comparisons use the catalog");
    }

    let graph = match Neo4jGraph::new(&config.graph) {
        Ok(graph) => graph,
        Err(error) => return DoctorCheck::new(NAME, CheckStatus::Fail, error.to_string()),
    };
    match graph.has_data().await {
        Ok(seeded) => DoctorCheck::new(
            NAME,
            CheckStatus::Pass,
            format!(
                "connected to `{}` ({})",
                graph.endpoint(),
                if seeded { "products present" } else { "empty, run `techpro seed`" }
            ),
        ),
        Err(error) => DoctorCheck::new(
            NAME,
            CheckStatus::Fail,
            format!("`{}` unreachable: {error}", graph.endpoint()),
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
