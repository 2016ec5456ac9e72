use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the archive server.
#[derive(Debug)]
pub struct Config {
    /// Credential for the language-model/embedding provider. When absent the
    /// AI steps degrade to placeholders instead of calling out.
    pub llm_api_key: Option<String>,
    /// Base URL of the provider serving completion and embedding requests.
    pub llm_url: String,
    /// Model identifier used for summaries, tags, and chat answers.
    pub llm_model: String,
    /// Model identifier used to embed chunks and queries.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding document chunks.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Directory where uploaded files are persisted.
    pub uploads_dir: String,
    /// Character budget per chunk.
    pub chunk_size: usize,
    /// Characters of overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per chat query.
    pub retrieval_top_k: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Optional override for the log file path.
    pub log_file: Option<String>,
}

const DEFAULT_LLM_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_COLLECTION: &str = "documents";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_RETRIEVAL_TOP_K: usize = 5;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm_api_key: load_env_optional("LLM_API_KEY"),
            llm_url: load_env_or("LLM_URL", DEFAULT_LLM_URL),
            llm_model: load_env_or("LLM_MODEL", "llama3.1"),
            embedding_model: load_env_or("EMBEDDING_MODEL", "nomic-embed-text"),
            embedding_dimension: load_parsed_or("EMBEDDING_DIMENSION", 768)?,
            qdrant_url: load_env_or("QDRANT_URL", DEFAULT_QDRANT_URL),
            qdrant_collection_name: load_env_or("QDRANT_COLLECTION_NAME", DEFAULT_COLLECTION),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            uploads_dir: load_env_or("UPLOADS_DIR", DEFAULT_UPLOADS_DIR),
            chunk_size: load_parsed_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: load_parsed_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            retrieval_top_k: load_parsed_or("RETRIEVAL_TOP_K", DEFAULT_RETRIEVAL_TOP_K)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            log_file: load_env_optional("ARCHIVE_LOG_FILE"),
        })
    }

    /// Whether a provider credential is present, enabling embedding and generation calls.
    pub fn has_credential(&self) -> bool {
        self.llm_api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        uploads_dir = %config.uploads_dir,
        server_port = ?config.server_port,
        has_credential = config.has_credential(),
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
