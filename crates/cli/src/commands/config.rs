use std::env;
use std::fs;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use techpro_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl ConfigField {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    vec![
        ConfigField::new("data.dir", display_path(&config.data.dir), &["TECHPRO_DATA_DIR"]),
        ConfigField::new(
            "data.documents_dir",
            display_path(&config.data.documents_dir),
            &["TECHPRO_DATA_DOCUMENTS_DIR"],
        ),
        ConfigField::new(
            "llm.provider",
            format!("{:?}", config.llm.provider),
            &["TECHPRO_LLM_PROVIDER"],
        ),
        ConfigField::new(
            "llm.api_key",
            redact_optional(config.llm.api_key.as_ref()),
            &["TECHPRO_LLM_API_KEY", "OPENAI_API_KEY"],
        ),
        ConfigField::new(
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or("<unset>"),
            &["TECHPRO_LLM_BASE_URL"],
        ),
        ConfigField::new("llm.model", config.llm.model.as_str(), &["TECHPRO_LLM_MODEL", "MODEL_NAME"]),
        ConfigField::new(
            "llm.temperature",
            config.llm.temperature.to_string(),
            &["TECHPRO_LLM_TEMPERATURE", "TEMPERATURE"],
        ),
        ConfigField::new(
            "embedding.model",
            config.embedding.model.as_str(),
            &["TECHPRO_EMBEDDING_MODEL", "EMBEDDING_MODEL"],
        ),
        ConfigField::new(
            "rag.top_k",
            config.rag.top_k.to_string(),
            &["TECHPRO_RAG_TOP_K", "TOP_K_RESULTS"],
        ),
        ConfigField::new(
            "rag.index_path",
            display_path(&config.rag.index_path),
            &["TECHPRO_RAG_INDEX_PATH", "VECTOR_STORE_PATH"],
        ),
        ConfigField::new(
            "graph.enabled",
            config.graph.enabled.to_string(),
            &["TECHPRO_GRAPH_ENABLED"],
        ),
        ConfigField::new("graph.uri", config.graph.uri.as_str(), &["TECHPRO_GRAPH_URI", "NEO4J_URI"]),
        ConfigField::new(
            "graph.user",
            config.graph.user.as_str(),
            &["TECHPRO_GRAPH_USER", "NEO4J_USER"],
        ),
        ConfigField::new(
            "graph.password",
            redact_optional(Some(&config.graph.password)),
            &["TECHPRO_GRAPH_PASSWORD", "NEO4J_PASSWORD"],
        ),
        ConfigField::new(
            "agent.max_history",
            config.agent.max_history.to_string(),
            &["TECHPRO_AGENT_MAX_HISTORY"],
        ),
        ConfigField::new(
            "server.bind_address",
            config.server.bind_address.as_str(),
            &["TECHPRO_SERVER_BIND_ADDRESS"],
        ),
        ConfigField::new("server.port", config.server.port.to_string(), &["TECHPRO_SERVER_PORT"]),
        ConfigField::new(
            "server.allowed_origins",
            config.server.allowed_origins.join(","),
            &["TECHPRO_SERVER_ALLOWED_ORIGINS"],
        ),
        ConfigField::new(
            "logging.level",
            config.logging.level.as_str(),
            &["TECHPRO_LOGGING_LEVEL", "TECHPRO_LOG_LEVEL"],
        ),
        ConfigField::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["TECHPRO_LOGGING_FORMAT", "TECHPRO_LOG_FORMAT"],
        ),
    ]
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_optional(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) => redact_token(secret.expose_secret()),
        None => "<unset>".to_string(),
    }
}

/// Keeps only a key's vendor prefix (`sk-***`).
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
