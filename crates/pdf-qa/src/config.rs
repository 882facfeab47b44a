//! Configuration for the PDF Q&A service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "PDF_QA_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Conversation memory configuration
    pub memory: MemoryConfig,
    /// Processing configuration
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration.
    ///
    /// Resolution order: the explicit `path`, then `PDF_QA_CONFIG`, then
    /// `<config_dir>/pdf-qa/config.toml` when it exists, else defaults.
    /// Environment overrides are applied on top and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pdf-qa").join("config.toml"))
    }

    /// Apply overrides from environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PDF_QA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PDF_QA_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PDF_QA_PORT: {}", port),
            }
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("PDF_QA_LLM_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(model) = lookup("PDF_QA_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(key) = lookup("PDF_QA_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be > 0".to_string()));
        }
        if self.llm.context_size <= self.llm.num_predict as usize {
            return Err(Error::Config(format!(
                "llm.context_size ({}) must be larger than llm.num_predict ({})",
                self.llm.context_size, self.llm.num_predict
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model served by Ollama (all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-minilm".to_string(),
            dimensions: 384,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 10,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum number of tokens generated per answer
    pub num_predict: u32,
    /// Context window size (tokens), sent as `num_ctx`; must hold the
    /// stuffed QA prompt plus `num_predict`
    pub context_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Bearer token for model servers behind an authenticating proxy
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "phi3.5".to_string(),
            temperature: 0.3,
            num_predict: 100,
            context_size: 4096,
            timeout_secs: 120,
            max_retries: 2,
            api_key: None,
        }
    }
}

/// Distance used by the vector index
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L2 distance, lower is closer
    #[default]
    Euclidean,
    /// Cosine similarity, higher is closer
    Cosine,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks passed to the model per question
    pub top_k: usize,
    /// Distance metric for nearest-neighbor search
    pub metric: DistanceMetric,
    /// Rewrite follow-up questions into standalone ones using the history
    pub rephrase_question: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            metric: DistanceMetric::Euclidean,
            rephrase_question: true,
        }
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Keep conversation turns between questions
    pub enabled: bool,
    /// Maximum turns kept (oldest evicted first); `None` keeps everything
    pub max_turns: Option<usize>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_turns: None,
        }
    }
}

/// Processing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of concurrent embedding requests (default: CPU count, max 8)
    pub parallel_embeddings: Option<usize>,
}

impl ProcessingConfig {
    /// Effective embedding concurrency
    pub fn embedding_concurrency(&self) -> usize {
        self.parallel_embeddings
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}
