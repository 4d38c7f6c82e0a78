use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub graph: GraphConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub documents_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub model: String,
    pub local_dimension: usize,
}

#[derive(Clone, Debug)]
pub struct RagConfig {
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub index_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct GraphConfig {
    pub enabled: bool,
    pub uri: String,
    pub user: String,
    pub password: SecretString,
    pub database: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_history: usize,
    pub history_window: usize,
    pub max_response_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
    Offline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub graph_enabled: Option<bool>,
    pub server_port: Option<u16>,
    pub rag_index_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://frontend:3000"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                dir: PathBuf::from("./data"),
                documents_dir: PathBuf::from("./data/documents"),
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: Some("https://api.openai.com/v1".to_string()),
                model: "gpt-4".to_string(),
                temperature: 0.7,
                timeout_secs: 30,
            },
            embedding: EmbeddingConfig {
                model: "text-embedding-ada-002".to_string(),
                local_dimension: 384,
            },
            rag: RagConfig {
                top_k: 3,
                chunk_size: 500,
                chunk_overlap: 50,
                index_path: PathBuf::from("./data/vector_store/index.json"),
            },
            graph: GraphConfig {
                enabled: true,
                uri: "http://localhost:7474".to_string(),
                user: "neo4j".to_string(),
                password: secret_value("password123".to_string()),
                database: "neo4j".to_string(),
                timeout_secs: 10,
            },
            agent: AgentConfig { max_history: 10, history_window: 6, max_response_tokens: 500 },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8000,
                allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(ToString::to_string).collect(),
                static_dir: None,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "offline" | "none" => Ok(Self::Offline),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama|offline)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    /// True when a remote completion endpoint can actually be called.
    pub fn is_remote_available(&self) -> bool {
        match self.provider {
            LlmProvider::OpenAi => self
                .api_key
                .as_ref()
                .is_some_and(|key| !key.expose_secret().trim().is_empty()),
            LlmProvider::Ollama => true,
            LlmProvider::Offline => false,
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("techpro.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.normalize_graph_uri();
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(dir) = data.dir {
                self.relocate_data_dir(dir);
            }
            if let Some(documents_dir) = data.documents_dir {
                self.data.documents_dir = documents_dir;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(embedding) = patch.embedding {
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(local_dimension) = embedding.local_dimension {
                self.embedding.local_dimension = local_dimension;
            }
        }

        if let Some(rag) = patch.rag {
            if let Some(top_k) = rag.top_k {
                self.rag.top_k = top_k;
            }
            if let Some(chunk_size) = rag.chunk_size {
                self.rag.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = rag.chunk_overlap {
                self.rag.chunk_overlap = chunk_overlap;
            }
            if let Some(index_path) = rag.index_path {
                self.rag.index_path = index_path;
            }
        }

        if let Some(graph) = patch.graph {
            if let Some(enabled) = graph.enabled {
                self.graph.enabled = enabled;
            }
            if let Some(uri) = graph.uri {
                self.graph.uri = uri;
            }
            if let Some(user) = graph.user {
                self.graph.user = user;
            }
            if let Some(graph_password_value) = graph.password {
                self.graph.password = secret_value(graph_password_value);
            }
            if let Some(database) = graph.database {
                self.graph.database = database;
            }
            if let Some(timeout_secs) = graph.timeout_secs {
                self.graph.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_history) = agent.max_history {
                self.agent.max_history = max_history;
            }
            if let Some(history_window) = agent.history_window {
                self.agent.history_window = history_window;
            }
            if let Some(max_response_tokens) = agent.max_response_tokens {
                self.agent.max_response_tokens = max_response_tokens;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(allowed_origins) = server.allowed_origins {
                self.server.allowed_origins = allowed_origins;
            }
            if let Some(static_dir) = server.static_dir {
                self.server.static_dir = Some(static_dir);
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TECHPRO_DATA_DIR") {
            self.relocate_data_dir(PathBuf::from(value));
        }
        if let Some(value) = read_env("TECHPRO_DATA_DOCUMENTS_DIR") {
            self.data.documents_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("TECHPRO_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env_any(&["TECHPRO_LLM_API_KEY", "OPENAI_API_KEY"]) {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TECHPRO_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env_any(&["TECHPRO_LLM_MODEL", "MODEL_NAME"]) {
            self.llm.model = value;
        }
        if let Some((key, value)) = read_env_keyed(&["TECHPRO_LLM_TEMPERATURE", "TEMPERATURE"]) {
            self.llm.temperature = parse_env(key, &value)?;
        }
        if let Some(value) = read_env("TECHPRO_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("TECHPRO_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env_any(&["TECHPRO_EMBEDDING_MODEL", "EMBEDDING_MODEL"]) {
            self.embedding.model = value;
        }
        if let Some(value) = read_env("TECHPRO_EMBEDDING_LOCAL_DIMENSION") {
            self.embedding.local_dimension =
                parse_env("TECHPRO_EMBEDDING_LOCAL_DIMENSION", &value)?;
        }

        if let Some((key, value)) = read_env_keyed(&["TECHPRO_RAG_TOP_K", "TOP_K_RESULTS"]) {
            self.rag.top_k = parse_env(key, &value)?;
        }
        if let Some(value) = read_env("TECHPRO_RAG_CHUNK_SIZE") {
            self.rag.chunk_size = parse_env("TECHPRO_RAG_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = read_env("TECHPRO_RAG_CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_env("TECHPRO_RAG_CHUNK_OVERLAP", &value)?;
        }
        if let Some(value) = read_env_any(&["TECHPRO_RAG_INDEX_PATH", "VECTOR_STORE_PATH"]) {
            self.rag.index_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("TECHPRO_GRAPH_ENABLED") {
            self.graph.enabled = parse_env("TECHPRO_GRAPH_ENABLED", &value)?;
        }
        if let Some(value) = read_env_any(&["TECHPRO_GRAPH_URI", "NEO4J_URI"]) {
            self.graph.uri = value;
        }
        if let Some(value) = read_env_any(&["TECHPRO_GRAPH_USER", "NEO4J_USER"]) {
            self.graph.user = value;
        }
        if let Some(value) = read_env_any(&["TECHPRO_GRAPH_PASSWORD", "NEO4J_PASSWORD"]) {
            self.graph.password = secret_value(value);
        }
        if let Some(value) = read_env("TECHPRO_GRAPH_DATABASE") {
            self.graph.database = value;
        }
        if let Some(value) = read_env("TECHPRO_GRAPH_TIMEOUT_SECS") {
            self.graph.timeout_secs = parse_env("TECHPRO_GRAPH_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TECHPRO_AGENT_MAX_HISTORY") {
            self.agent.max_history = parse_env("TECHPRO_AGENT_MAX_HISTORY", &value)?;
        }
        if let Some(value) = read_env("TECHPRO_AGENT_HISTORY_WINDOW") {
            self.agent.history_window = parse_env("TECHPRO_AGENT_HISTORY_WINDOW", &value)?;
        }
        if let Some(value) = read_env("TECHPRO_AGENT_MAX_RESPONSE_TOKENS") {
            self.agent.max_response_tokens =
                parse_env("TECHPRO_AGENT_MAX_RESPONSE_TOKENS", &value)?;
        }

        if let Some(value) = read_env("TECHPRO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TECHPRO_SERVER_PORT") {
            self.server.port = parse_env("TECHPRO_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TECHPRO_SERVER_ALLOWED_ORIGINS") {
            self.server.allowed_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(value) = read_env("TECHPRO_SERVER_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("TECHPRO_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("TECHPRO_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env_any(&["TECHPRO_LOGGING_LEVEL", "TECHPRO_LOG_LEVEL"]) {
            self.logging.level = value;
        }
        if let Some(value) = read_env_any(&["TECHPRO_LOGGING_FORMAT", "TECHPRO_LOG_FORMAT"]) {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.relocate_data_dir(data_dir);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(graph_enabled) = overrides.graph_enabled {
            self.graph.enabled = graph_enabled;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(rag_index_path) = overrides.rag_index_path {
            self.rag.index_path = rag_index_path;
        }
    }

    /// Moves the data root; documents and the vector index follow it unless a
    /// later key in the same layer sets them explicitly.
    fn relocate_data_dir(&mut self, dir: PathBuf) {
        self.data.documents_dir = dir.join("documents");
        self.rag.index_path = dir.join("vector_store").join("index.json");
        self.data.dir = dir;
    }

    fn normalize_graph_uri(&mut self) {
        let Some(http_uri) = http_endpoint_for_bolt_uri(&self.graph.uri) else {
            return;
        };
        warn!(
            event_name = "config.graph_uri.rewritten",
            correlation_id = "bootstrap",
            from = %self.graph.uri,
            to = %http_uri,
            "graph.uri uses the bolt protocol; talking to the HTTP endpoint instead"
        );
        self.graph.uri = http_uri;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_llm(&self.llm)?;
        validate_rag(&self.rag, &self.embedding)?;
        validate_graph(&self.graph)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Candidate config files in lookup order.
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["techpro.toml", "config/techpro.toml"];

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.dir must not be empty".to_string()));
    }
    if data.documents_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.documents_dir must not be empty".to_string()));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Ollama => {
            let base_url = llm.base_url.as_deref().map(str::trim).unwrap_or_default();
            if base_url.is_empty() {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for openai/ollama providers".to_string(),
                ));
            }
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(ConfigError::Validation(
                    "llm.base_url must start with http:// or https://".to_string(),
                ));
            }
        }
        LlmProvider::Offline => {}
    }

    Ok(())
}

fn validate_rag(rag: &RagConfig, embedding: &EmbeddingConfig) -> Result<(), ConfigError> {
    if rag.top_k == 0 {
        return Err(ConfigError::Validation("rag.top_k must be greater than zero".to_string()));
    }
    if rag.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "rag.chunk_size must be greater than zero".to_string(),
        ));
    }
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(ConfigError::Validation(
            "rag.chunk_overlap must be smaller than rag.chunk_size".to_string(),
        ));
    }
    if embedding.local_dimension == 0 {
        return Err(ConfigError::Validation(
            "embedding.local_dimension must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_graph(graph: &GraphConfig) -> Result<(), ConfigError> {
    if !graph.enabled {
        return Ok(());
    }

    let uri = graph.uri.trim();
    if uri.starts_with("bolt://") || uri.starts_with("neo4j://") {
        return Err(ConfigError::Validation(
            "graph.uri must point at the Neo4j HTTP endpoint (e.g. http://localhost:7474), not the bolt port"
                .to_string(),
        ));
    }
    if !uri.starts_with("http://") && !uri.starts_with("https://") {
        return Err(ConfigError::Validation(
            "graph.uri must start with http:// or https://".to_string(),
        ));
    }
    if graph.database.trim().is_empty() {
        return Err(ConfigError::Validation("graph.database must not be empty".to_string()));
    }
    if graph.timeout_secs == 0 || graph.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "graph.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_history == 0 {
        return Err(ConfigError::Validation(
            "agent.max_history must be greater than zero".to_string(),
        ));
    }
    if agent.history_window == 0 {
        return Err(ConfigError::Validation(
            "agent.history_window must be greater than zero".to_string(),
        ));
    }
    if agent.max_response_tokens == 0 {
        return Err(ConfigError::Validation(
            "agent.max_response_tokens must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(origin) = server
        .allowed_origins
        .iter()
        .find(|origin| !origin.starts_with("http://") && !origin.starts_with("https://"))
    {
        return Err(ConfigError::Validation(format!(
            "server.allowed_origins entry `{origin}` must start with http:// or https://"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Maps `bolt://host:7687` style URIs onto the Neo4j HTTP port of the same host.
fn http_endpoint_for_bolt_uri(uri: &str) -> Option<String> {
    let uri = uri.trim();
    let (scheme, rest) = uri.split_once("://")?;
    let (http_scheme, http_port) = match scheme {
        "bolt" | "neo4j" => ("http", 7474),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => ("https", 7473),
        _ => return None,
    };

    let authority = rest.split('/').next().unwrap_or_default();
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|ch| ch.is_ascii_digit()) => host,
        _ => authority,
    };
    if host.is_empty() {
        return None;
    }

    Some(format!("{http_scheme}://{host}:{http_port}"))
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_env_keyed<'a>(keys: &[&'a str]) -> Option<(&'a str, String)> {
    keys.iter().find_map(|key| read_env(key).map(|value| (*key, value)))
}

fn read_env_any(keys: &[&str]) -> Option<String> {
    read_env_keyed(keys).map(|(_, value)| value)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    llm: Option<LlmPatch>,
    embedding: Option<EmbeddingPatch>,
    rag: Option<RagPatch>,
    graph: Option<GraphPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    dir: Option<PathBuf>,
    documents_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingPatch {
    model: Option<String>,
    local_dimension: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RagPatch {
    top_k: Option<usize>,
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    index_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphPatch {
    enabled: Option<bool>,
    uri: Option<String>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_history: Option<usize>,
    history_window: Option<usize>,
    max_response_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    static_dir: Option<PathBuf>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
