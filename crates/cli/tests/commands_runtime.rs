use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tempfile::TempDir;

use techpro_cli::commands::{ask, config, doctor, seed};

#[test]
fn seed_writes_fixtures_and_builds_the_index() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&offline_env(dir.path()), || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["written"], 8);
        assert_eq!(payload["data"]["graph"], "disabled");
        assert!(payload["data"]["chunks"].as_u64().is_some_and(|chunks| chunks > 0));

        assert!(dir.path().join("data/products.json").exists());
        assert!(dir.path().join("data/documents/faqs.json").exists());
        assert!(dir.path().join("index/index.json").exists());
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&offline_env(dir.path()), || {
        let first = parse_payload(&seed::run().output);
        let second = parse_payload(&seed::run().output);

        assert_eq!(first["status"], "ok");
        assert_eq!(second["status"], "ok");
        assert_eq!(second["data"]["written"], 0);
        assert_eq!(second["data"]["skipped"], 8);
        assert_eq!(first["data"]["chunks"], second["data"]["chunks"]);
    });
}

#[test]
fn seed_returns_config_failure_for_invalid_env() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = offline_env(dir.path());
    vars.push(("TECHPRO_SERVER_PORT", "not-a-port".to_string()));
    with_env(&vars, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn ask_answers_order_questions_after_seeding() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&offline_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = ask::run("cli-test", "Where is my order ORD-1001?");
        assert_eq!(result.exit_code, 0, "expected ask success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "ask");
        assert_eq!(
            payload["message"],
            "Order ORD-1001 is currently shipped. Expected delivery: 2024-01-22"
        );
        assert_eq!(payload["data"]["intent"], "order_status");
    });
}

#[test]
fn ask_rejects_blank_messages() {
    let result = ask::run("cli-test", "   ");
    assert_eq!(result.exit_code, 2);
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
}

#[test]
fn config_attributes_sources_and_redacts_secrets() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = offline_env(dir.path());
    vars.push(("TECHPRO_LLM_API_KEY", "sk-very-secret".to_string()));
    with_env(&vars, || {
        let output = config::run();

        assert!(output.starts_with("effective config"));
        assert!(output.contains("- llm.api_key = sk-*** (source: env (TECHPRO_LLM_API_KEY))"));
        assert!(output.contains("- graph.enabled = false (source: env (TECHPRO_GRAPH_ENABLED))"));
        assert!(output.contains("- server.port = 8000 (source: default)"));
        assert!(output.contains("- graph.password = <redacted> (source: default)"));
        assert!(!output.contains("very-secret"));
        assert!(!output.contains("password123"));
    });
}

#[test]
fn doctor_reports_missing_data_until_seeded() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&offline_env(dir.path()), || {
        let before = parse_payload(&doctor::run(true));
        assert_eq!(before["overall_status"], "fail");
        assert_eq!(check_status(&before, "data_files"), "fail");

        assert_eq!(seed::run().exit_code, 0);

        let after = parse_payload(&doctor::run(true));
        assert_eq!(after["overall_status"], "pass", "doctor report: {after}");
        assert_eq!(check_status(&after, "config_validation"), "pass");
        assert_eq!(check_status(&after, "data_files"), "pass");
        assert_eq!(check_status(&after, "documents"), "pass");
        assert_eq!(check_status(&after, "llm_credentials"), "skipped");
        assert_eq!(check_status(&after, "graph_connectivity"), "skipped");
    });
}

#[test]
fn doctor_human_output_lists_every_check() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&offline_env(dir.path()), || {
        let output = doctor::run(false);
        assert!(output.starts_with("doctor: "));
        assert_eq!(output.lines().filter(|line| line.starts_with("- [")).count(), 5);
    });
}

fn offline_env(root: &Path) -> Vec<(&'static str, String)> {
    vec![
        ("TECHPRO_DATA_DIR", root.join("data").display().to_string()),
        ("TECHPRO_DATA_DOCUMENTS_DIR", root.join("data/documents").display().to_string()),
        ("TECHPRO_RAG_INDEX_PATH", root.join("index/index.json").display().to_string()),
        ("TECHPRO_LLM_PROVIDER", "offline".to_string()),
        ("TECHPRO_GRAPH_ENABLED", "false".to_string()),
    ]
}

fn check_status<'a>(report: &'a Value, name: &str) -> &'a str {
    report["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .and_then(|check| check["status"].as_str())
        .unwrap_or("missing")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, String)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "TECHPRO_DATA_DIR",
        "TECHPRO_DATA_DOCUMENTS_DIR",
        "TECHPRO_LLM_PROVIDER",
        "TECHPRO_LLM_API_KEY",
        "OPENAI_API_KEY",
        "TECHPRO_LLM_BASE_URL",
        "TECHPRO_LLM_MODEL",
        "MODEL_NAME",
        "TECHPRO_LLM_TEMPERATURE",
        "TEMPERATURE",
        "TECHPRO_LLM_TIMEOUT_SECS",
        "TECHPRO_EMBEDDING_MODEL",
        "EMBEDDING_MODEL",
        "TECHPRO_EMBEDDING_LOCAL_DIMENSION",
        "TECHPRO_RAG_TOP_K",
        "TOP_K_RESULTS",
        "TECHPRO_RAG_CHUNK_SIZE",
        "TECHPRO_RAG_CHUNK_OVERLAP",
        "TECHPRO_RAG_INDEX_PATH",
        "VECTOR_STORE_PATH",
        "TECHPRO_GRAPH_ENABLED",
        "TECHPRO_GRAPH_URI",
        "NEO4J_URI",
        "TECHPRO_GRAPH_USER",
        "NEO4J_USER",
        "TECHPRO_GRAPH_PASSWORD",
        "NEO4J_PASSWORD",
        "TECHPRO_SERVER_PORT",
        "TECHPRO_SERVER_BIND_ADDRESS",
        "TECHPRO_LOGGING_LEVEL",
        "TECHPRO_LOG_LEVEL",
        "TECHPRO_LOGGING_FORMAT",
        "TECHPRO_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
