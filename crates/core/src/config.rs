//! Configuration management for docrag.
//!
//! Configuration is layered, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.docrag/config.yaml` in the workspace, or `DOCRAG_CONFIG`)
//! - Environment variables
//! - Command-line flags (`AppConfig::with_overrides`)
//!
//! The embedding model is a single setting shared by indexing and querying,
//! so both sides always embed into the same vector space.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Default embedding service (a local Ollama instance).
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default generation model for `ask`.
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";

/// Default number of results per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Embedding providers understood by the knowledge crate.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docrag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Base URL of the embedding / generation service
    pub endpoint: String,

    /// Embedding provider ("ollama" or "mock")
    pub embedding_provider: String,

    /// Embedding model identifier, shared by indexer and search engine
    pub embedding_model: String,

    /// Generation model used by `ask`
    pub chat_model: String,

    /// Markdown corpus root (relative paths resolve against the workspace)
    pub corpus_dir: PathBuf,

    /// Persisted index file (relative paths resolve against the workspace)
    pub index_path: PathBuf,

    /// HTTP location of the index; takes precedence over `index_path` when loading
    pub index_url: Option<String>,

    /// Default number of results per query
    pub top_k: usize,

    /// Per-request timeout for the embedding service; `None` waits indefinitely
    pub timeout_secs: Option<u64>,

    /// Bind address for `serve`
    pub listen: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    #[serde(skip)]
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    embedding: Option<EmbeddingSection>,
    chat: Option<ChatSection>,
    index: Option<IndexSection>,
    proxy: Option<ProxySection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingSection {
    provider: Option<String>,
    endpoint: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChatSection {
    model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexSection {
    corpus: Option<PathBuf>,
    path: Option<PathBuf>,
    url: Option<String>,
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProxySection {
    listen: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<String>,
    color: Option<bool>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    pub index: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            embedding_provider: "ollama".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            corpus_dir: PathBuf::from("docs"),
            index_path: PathBuf::from("docs-embeddings.json"),
            index_url: None,
            top_k: DEFAULT_TOP_K,
            timeout_secs: None,
            listen: "127.0.0.1:5173".to_string(),
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment
    /// variables, then apply CLI overrides on top.
    ///
    /// `--workspace` and `--config` are honored before the config file is
    /// read, so a file named on the command line is merged too. A config file
    /// named explicitly must exist; the default `.docrag/config.yaml` is
    /// optional.
    ///
    /// Environment variables:
    /// - `DOCRAG_WORKSPACE`: Override workspace path
    /// - `DOCRAG_CONFIG`: Path to config file
    /// - `DOCRAG_ENDPOINT` (or `OLLAMA_URL`): Embedding service base URL
    /// - `DOCRAG_EMBEDDING_MODEL`: Embedding model identifier
    /// - `DOCRAG_CHAT_MODEL`: Generation model identifier
    /// - `DOCRAG_INDEX`: Index file path or `http(s)://` URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load_with(overrides: ConfigOverrides) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = overrides
            .workspace
            .clone()
            .or_else(|| std::env::var("DOCRAG_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) = overrides
            .config_file
            .clone()
            .or_else(|| std::env::var("DOCRAG_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        match config.config_file.clone() {
            Some(path) if !path.exists() => {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    path
                )));
            }
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let default_path = config.docrag_dir().join("config.yaml");
                if default_path.exists() {
                    config = config.merge_yaml(&default_path)?;
                }
            }
        }

        // Environment variables override the config file
        if let Ok(endpoint) =
            std::env::var("DOCRAG_ENDPOINT").or_else(|_| std::env::var("OLLAMA_URL"))
        {
            config.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("DOCRAG_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }

        if let Ok(model) = std::env::var("DOCRAG_CHAT_MODEL") {
            config.chat_model = model;
        }

        if let Ok(index) = std::env::var("DOCRAG_INDEX") {
            config.set_index(index);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config.with_overrides(overrides))
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge_file(file))
    }

    fn merge_file(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding_provider = provider;
            }
            if let Some(endpoint) = embedding.endpoint {
                result.endpoint = endpoint;
            }
            if let Some(model) = embedding.model {
                result.embedding_model = model;
            }
            if embedding.timeout_secs.is_some() {
                result.timeout_secs = embedding.timeout_secs;
            }
        }

        if let Some(model) = file.chat.and_then(|chat| chat.model) {
            result.chat_model = model;
        }

        if let Some(index) = file.index {
            if let Some(corpus) = index.corpus {
                result.corpus_dir = corpus;
            }
            if let Some(path) = index.path {
                result.index_path = path;
            }
            if index.url.is_some() {
                result.index_url = index.url;
            }
            if let Some(top_k) = index.top_k {
                result.top_k = top_k;
            }
        }

        if let Some(listen) = file.proxy.and_then(|proxy| proxy.listen) {
            result.listen = listen;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                match format.parse() {
                    Ok(format) => result.log_format = format,
                    Err(e) => tracing::warn!("Ignoring logging.format: {}", e),
                }
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }

        if let Some(provider) = overrides.embedding_provider {
            self.embedding_provider = provider;
        }

        if let Some(model) = overrides.embedding_model {
            self.embedding_model = model;
        }

        if let Some(index) = overrides.index {
            self.set_index(index);
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = overrides.log_format {
            self.log_format = log_format;
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Point the index at a file path or an `http(s)://` URL.
    pub fn set_index(&mut self, index: impl Into<String>) {
        let index = index.into();
        if is_http_url(&index) {
            self.index_url = Some(index);
        } else {
            self.index_path = PathBuf::from(index);
            self.index_url = None;
        }
    }

    /// Get the path to the .docrag directory.
    pub fn docrag_dir(&self) -> PathBuf {
        self.workspace.join(".docrag")
    }

    /// Corpus root, resolved against the workspace.
    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.corpus_dir)
    }

    /// Index file, resolved against the workspace.
    pub fn index_file(&self) -> PathBuf {
        self.resolve(&self.index_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !is_http_url(&self.endpoint) {
            return Err(AppError::Config(format!(
                "Endpoint must be an http(s) URL, got: {}",
                self.endpoint
            )));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding model must not be empty".to_string(),
            ));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if let Some(url) = &self.index_url {
            if !is_http_url(url) {
                return Err(AppError::Config(format!(
                    "Index URL must be an http(s) URL, got: {}",
                    url
                )));
            }
        }

        self.listen.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("Invalid listen address {}: {}", self.listen, e))
        })?;

        Ok(())
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
