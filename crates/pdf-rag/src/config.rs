//! Configuration for the RAG system
//!
//! Every option is sourced from the environment (optionally preloaded from a
//! `.env` file by the server binary) through the `config` crate. Variable
//! names map onto lowercase keys, so `EMBEDDING_MODEL` fills `embedding_model`.
//! [`RagConfig::from_vars`] takes the variables as pairs so tests never touch
//! the process environment.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main RAG system configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Text generation configuration
    pub llm: LlmConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Vector store configuration
    pub vector_db: VectorDbConfig,
}

impl RagConfig {
    /// Load the full configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    /// Load the full configuration from explicit variable pairs
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::load(environment_from(vars))
    }

    fn load(environment: config::Environment) -> Result<Self> {
        let settings = settings(environment)?;
        let server = ServerConfig::from_settings(settings.clone())?;
        let vars: EnvVars = settings.try_deserialize().map_err(config_error)?;

        let config = vars.into_config(server)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("EMBEDDING_DIMENSION must be positive".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("EMBEDDING_BATCH_SIZE must be positive".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("RETRIEVAL_K must be positive".to_string()));
        }
        if self.vector_db.pool_size + self.vector_db.max_overflow == 0 {
            return Err(Error::Config(
                "DB_POOL_SIZE + DB_MAX_OVERFLOW must allow at least one connection".to_string(),
            ));
        }
        if self.vector_db.store == VectorStoreKind::PgVector && self.vector_db.database_url.is_none() {
            return Err(Error::Config("DATABASE_URL is required for the pgvector store".to_string()));
        }
        Ok(())
    }
}

/// Flat view of the environment, one field per variable
///
/// Provider-dependent options stay optional here and are resolved against
/// the selected [`ProviderKind`] in [`EnvVars::into_config`].
#[derive(Debug, Deserialize)]
#[serde(default)]
struct EnvVars {
    provider: ProviderKind,
    openai_api_key: Option<String>,
    openai_base_url: Option<String>,
    ollama_base_url: Option<String>,
    embedding_model: Option<String>,
    embedding_dimension: Option<usize>,
    embedding_batch_size: usize,
    llm_model: Option<String>,
    llm_temperature: f32,
    retrieval_k: usize,
    chunk_size: usize,
    chunk_overlap: usize,
    vector_store: VectorStoreKind,
    database_url: Option<String>,
    vector_collection: String,
    db_pool_size: u32,
    db_max_overflow: u32,
    db_connect_timeout_secs: u64,
}

impl Default for EnvVars {
    fn default() -> Self {
        let embeddings = EmbeddingConfig::default();
        let llm = LlmConfig::default();
        let chunking = ChunkingConfig::default();
        let vector_db = VectorDbConfig::default();
        Self {
            provider: ProviderKind::default(),
            openai_api_key: None,
            openai_base_url: None,
            ollama_base_url: None,
            embedding_model: None,
            embedding_dimension: None,
            embedding_batch_size: embeddings.batch_size,
            llm_model: None,
            llm_temperature: llm.temperature,
            retrieval_k: RetrievalConfig::default().top_k,
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.chunk_overlap,
            vector_store: vector_db.store,
            database_url: None,
            vector_collection: vector_db.collection,
            db_pool_size: vector_db.pool_size,
            db_max_overflow: vector_db.max_overflow,
            db_connect_timeout_secs: vector_db.connect_timeout_secs,
        }
    }
}

impl EnvVars {
    /// Apply provider defaults and the conditional requirements
    fn into_config(self, server: ServerConfig) -> Result<RagConfig> {
        let provider = self.provider;
        let (base_url, api_key) = match provider {
            ProviderKind::OpenAi => {
                let key = self
                    .openai_api_key
                    .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;
                (self.openai_base_url, Some(key))
            }
            ProviderKind::Ollama => (self.ollama_base_url, self.openai_api_key),
        };
        let base_url = base_url.unwrap_or_else(|| provider.default_base_url().to_string());

        let embeddings = EmbeddingConfig {
            provider,
            base_url: base_url.clone(),
            api_key: api_key.clone(),
            model: self
                .embedding_model
                .unwrap_or_else(|| provider.default_embedding_model().to_string()),
            dimensions: self
                .embedding_dimension
                .unwrap_or_else(|| provider.default_dimensions()),
            batch_size: self.embedding_batch_size,
        };

        let llm = LlmConfig {
            base_url,
            api_key,
            generate_model: self
                .llm_model
                .unwrap_or_else(|| provider.default_llm_model().to_string()),
            temperature: self.llm_temperature,
        };

        let database_url = match self.vector_store {
            VectorStoreKind::PgVector => Some(
                self.database_url
                    .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?,
            ),
            VectorStoreKind::Memory => self.database_url,
        };

        Ok(RagConfig {
            server,
            embeddings,
            llm,
            chunking: ChunkingConfig {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
            },
            retrieval: RetrievalConfig {
                top_k: self.retrieval_k,
            },
            vector_db: VectorDbConfig {
                store: self.vector_store,
                database_url: database_url.map(|url| normalize_database_url(&url)),
                collection: self.vector_collection,
                pool_size: self.db_pool_size,
                max_overflow: self.db_max_overflow,
                connect_timeout_secs: self.db_connect_timeout_secs,
            },
        })
    }
}

/// Environment source mirroring the given pairs instead of the process
fn environment_from<I, K, V>(vars: I) -> config::Environment
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let map: config::Map<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    config::Environment::default().source(Some(map))
}

fn settings(environment: config::Environment) -> Result<config::Config> {
    config::Config::builder()
        .add_source(environment.try_parsing(true).ignore_empty(true))
        .build()
        .map_err(config_error)
}

fn config_error(e: config::ConfigError) -> Error {
    Error::Config(e.to_string())
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed cross-origin caller ("*" allows any origin)
    #[serde(alias = "frontend_url")]
    pub allowed_origin: String,
    /// Maximum upload size in bytes (default: 50MB)
    #[serde(alias = "max_upload_bytes")]
    pub max_upload_size: usize,
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origin: "http://localhost:5173".to_string(),
            max_upload_size: 50 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load only the transport settings from the process environment
    ///
    /// Used on its own when the full configuration fails to load, so the
    /// server can still bind and answer liveness checks.
    pub fn from_env() -> Result<Self> {
        Self::from_settings(settings(config::Environment::default())?)
    }

    fn from_settings(settings: config::Config) -> Result<Self> {
        let mut server: Self = settings.try_deserialize().map_err(config_error)?;
        server.log_level = server.log_level.to_lowercase();
        Ok(server)
    }

    /// Socket address string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which external service family backs embeddings and generation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ProviderKind {
    /// OpenAI-compatible HTTP API
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

impl ProviderKind {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_BASE_URL,
            Self::Ollama => DEFAULT_OLLAMA_BASE_URL,
        }
    }

    fn default_embedding_model(self) -> &'static str {
        match self {
            Self::OpenAi => "text-embedding-3-small",
            Self::Ollama => "nomic-embed-text",
        }
    }

    fn default_dimensions(self) -> usize {
        match self {
            Self::OpenAi => 1536,
            Self::Ollama => 768,
        }
    }

    fn default_llm_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::Ollama => "llama3",
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown provider '{}' (expected openai or ollama)", other)),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Service family
    pub provider: ProviderKind,
    /// API base URL
    pub base_url: String,
    /// API key (required for OpenAI)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Embedding model identifier
    pub model: String,
    /// Embedding dimensions, must match the persisted schema
    pub dimensions: usize,
    /// Maximum texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: ProviderKind::OpenAi.default_embedding_model().to_string(),
            dimensions: ProviderKind::OpenAi.default_dimensions(),
            batch_size: 64,
        }
    }
}

/// Text generation configuration
///
/// The service family follows [`EmbeddingConfig::provider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL
    pub base_url: String,
    /// API key (required for OpenAI)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation (0 for reproducible answers)
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            generate_model: ProviderKind::OpenAi.default_llm_model().to_string(),
            temperature: 0.0,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Window must be positive and strictly larger than the overlap
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("CHUNK_SIZE must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the generator
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Vector store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum VectorStoreKind {
    /// Postgres with the pgvector extension
    #[default]
    PgVector,
    /// Process-local store, contents are lost on restart
    Memory,
}

impl TryFrom<String> for VectorStoreKind {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for VectorStoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pgvector" | "postgres" => Ok(Self::PgVector),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown vector store '{}' (expected pgvector or memory)", other)),
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Backend
    pub store: VectorStoreKind,
    /// Postgres connection string
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    /// Table holding stored records
    pub collection: String,
    /// Connections kept open in the pool
    pub pool_size: u32,
    /// Extra connections allowed under load
    pub max_overflow: u32,
    /// Maximum wait for a pooled connection in seconds
    pub connect_timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            store: VectorStoreKind::PgVector,
            database_url: None,
            collection: "documents".to_string(),
            pool_size: 5,
            max_overflow: 10,
            connect_timeout_secs: 10,
        }
    }
}

impl VectorDbConfig {
    /// Bounded wait for pool checkout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

/// Route Supabase direct connections through the session pooler port
///
/// Direct connections (`:5432`) to `*.supabase.co` are frequently IPv6-only;
/// the pooler on `:6543` is reachable over IPv4.
pub fn normalize_database_url(url: &str) -> String {
    if url.contains("supabase.co") && url.contains(":5432") && !url.contains("pooler") {
        return url.replace(":5432", ":6543");
    }
    url.to_string()
}
