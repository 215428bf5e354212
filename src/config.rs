//! Configuration for the stakeholder chat.
//!
//! Values resolve in precedence order: CLI arguments, then `NOMADS_*`
//! environment variables, then the TOML config file, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Main chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Document source settings
    pub documents: DocumentSettings,

    /// OpenAI-compatible API settings (generation + embeddings)
    pub openai: OpenAiSettings,

    /// Retrieval index settings
    pub retrieval: RetrievalSettings,

    /// Conversation settings
    pub chat: ChatSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Document source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Directory read recursively for reference documents (.txt, .md)
    pub dir: String,
}

/// OpenAI-compatible API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key. Required for hosted providers; may also come from
    /// NOMADS_OPENAI_API_KEY.
    pub api_key: String,

    /// Chat model identifier
    pub model: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient errors
    pub max_retries: u32,
}

/// Retrieval index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Target chunk size in characters
    pub chunk_chars: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Number of top-ranked chunks returned per query
    pub top_k: usize,

    /// Minimum cosine similarity for a chunk to be returned (0 disables the cut)
    pub min_score: f32,
}

/// Conversation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Replay prior turns into the generation request (multi-turn memory)
    pub replay_history: bool,

    /// Window of prior messages replayed when replay_history is on (0 = all)
    pub max_history_messages: usize,

    /// Stream assistant output fragment-by-fragment
    pub streaming: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Defaults

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            documents: DocumentSettings::default(),
            openai: OpenAiSettings::default(),
            retrieval: RetrievalSettings::default(),
            chat: ChatSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            dir: "./data".to_string(),
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_chars: 1200,
            chunk_overlap: 200,
            top_k: 4,
            min_score: 0.0,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            replay_history: true,
            max_history_messages: 20,
            streaming: true,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ChatConfig {
    /// Resolve the effective configuration: file (if any), env overrides,
    /// path expansion, then validation.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::config_parse(format!("Failed to read config file: {}", e)))?;
            config = toml::from_str(&content)
                .map_err(|e| Error::config_parse(format!("Failed to parse config file: {}", e)))?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Pick the config file: an explicit `--config` path must exist; the
    /// search locations are optional.
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::ConfigNotFound { path });
            }
        }

        // Working directory first, then the user-level locations
        let search_paths = [
            PathBuf::from("nomads-chat.toml"),
            dirs::config_dir()
                .map(|p| p.join("nomads").join("chat.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".nomads").join("chat.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// `NOMADS_*` environment overrides, applied on top of the file
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NOMADS_DOCS_DIR") {
            self.documents.dir = val;
        }

        if let Ok(val) = std::env::var("NOMADS_OPENAI_BASE_URL") {
            self.openai.base_url = val;
        }
        if let Ok(val) = std::env::var("NOMADS_OPENAI_API_KEY") {
            self.openai.api_key = val;
        }
        if let Ok(val) = std::env::var("NOMADS_OPENAI_MODEL") {
            self.openai.model = val;
        }
        if let Ok(val) = std::env::var("NOMADS_OPENAI_EMBEDDING_MODEL") {
            self.openai.embedding_model = val;
        }
        if let Ok(val) = std::env::var("NOMADS_OPENAI_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.openai.timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("NOMADS_OPENAI_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                self.openai.max_retries = n;
            }
        }

        // Retrieval settings
        if let Ok(val) = std::env::var("NOMADS_RETRIEVAL_TOP_K") {
            if let Ok(n) = val.parse() {
                self.retrieval.top_k = n;
            }
        }
        if let Ok(val) = std::env::var("NOMADS_RETRIEVAL_MIN_SCORE") {
            if let Ok(n) = val.parse() {
                self.retrieval.min_score = n;
            }
        }

        // Chat settings
        if let Ok(val) = std::env::var("NOMADS_CHAT_REPLAY_HISTORY") {
            self.chat.replay_history = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = std::env::var("NOMADS_CHAT_STREAMING") {
            self.chat.streaming = val.to_lowercase() == "true" || val == "1";
        }

        // Logging settings
        if let Ok(val) = std::env::var("NOMADS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("NOMADS_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("NOMADS_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Tilde/env expansion for every configured path
    fn expand_paths(&mut self) {
        self.documents.dir = expand_path(&self.documents.dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Reject values no session could run with
    fn validate(&self) -> Result<()> {
        // Validate API base URL
        if self.openai.base_url.is_empty() {
            return Err(Error::config_validation("API base URL cannot be empty"));
        }
        if url::Url::parse(&self.openai.base_url).is_err() {
            return Err(Error::config_validation(format!(
                "Invalid API base URL '{}'",
                self.openai.base_url
            )));
        }

        // Validate retrieval knobs
        if self.retrieval.chunk_chars == 0 {
            return Err(Error::config_validation("chunk_chars must be greater than 0"));
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_chars {
            return Err(Error::config_validation(
                "chunk_overlap must be smaller than chunk_chars",
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config_validation("top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(Error::config_validation(
                "min_score must be between 0.0 and 1.0",
            ));
        }

        // Log level must be one tracing understands
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Require the generation API credential. Absence is a fatal startup
    /// condition with a user-visible diagnostic, checked before any session
    /// work begins. Deliberately not part of `validate()` so that
    /// `config validate` can check a file without the secret present.
    pub fn ensure_api_key(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() {
            return Err(Error::ApiKeyMissing);
        }
        Ok(())
    }

    /// Get the document directory as a PathBuf
    pub fn documents_dir(&self) -> PathBuf {
        PathBuf::from(&self.documents.dir)
    }
}

/// Expand `~` and `$VAR`, leaving the path as-is when expansion fails
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// `config init`: write the commented default template
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".nomads")
                .join("chat.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let config_content = generate_default_config();
    fs::write(&config_path, config_content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

/// The commented template written by `config init`
fn generate_default_config() -> String {
    r#"# Nomads Stakeholder Chat Configuration

[documents]
# Directory read recursively for reference documents (.txt, .md)
dir = "./data"

[openai]
# OpenAI-compatible API base URL
base_url = "https://api.openai.com/v1"

# API key. Prefer setting NOMADS_OPENAI_API_KEY instead of storing it here.
# api_key = "sk-..."

# Chat model used for answers
model = "gpt-4"

# Model used to embed document chunks and queries
embedding_model = "text-embedding-3-small"

# Request timeout in seconds
timeout_secs = 120

# Maximum retries on transient API errors
max_retries = 2

[retrieval]
# Target chunk size in characters
chunk_chars = 1200

# Overlap between consecutive chunks in characters
chunk_overlap = 200

# Number of top-ranked chunks returned per query
top_k = 4

# Minimum cosine similarity for a chunk to be returned (0.0 disables)
min_score = 0.0

[chat]
# Replay prior turns into the generation request (multi-turn memory)
replay_history = true

# Window of prior messages replayed (0 = all)
max_history_messages = 20

# Stream assistant output fragment-by-fragment
streaming = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (uncomment to enable file logging)
# file = "~/.nomads/logs/chat.log"

# Number of rotated log files to keep
max_files = 5

# JSON formatted logs
json_format = false
"#
    .to_string()
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChatConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = ChatConfig::default();
        assert_eq!(config.documents.dir, "./data");
        assert_eq!(config.openai.model, "gpt-4");
        assert_eq!(config.retrieval.top_k, 4);
        assert!(config.chat.replay_history);
        assert!(config.chat.streaming);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: ChatConfig = toml::from_str(
            r#"
[documents]
dir = "/srv/docs"

[openai]
model = "gpt-4o"
"#,
        )
        .unwrap();
        assert_eq!(config.documents.dir, "/srv/docs");
        assert_eq!(config.openai.model, "gpt-4o");
        // Untouched sections fall back to defaults
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = ChatConfig::default();
        config.openai.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.openai.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_retrieval() {
        let mut config = ChatConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.retrieval.chunk_overlap = config.retrieval.chunk_chars;
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.retrieval.min_score = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = ChatConfig::default();
        config.logging.level = "chatty".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ensure_api_key() {
        let mut config = ChatConfig::default();
        assert!(matches!(
            config.ensure_api_key(),
            Err(Error::ApiKeyMissing)
        ));

        config.openai.api_key = "sk-test".to_string();
        assert!(config.ensure_api_key().is_ok());

        config.openai.api_key = "   ".to_string();
        assert!(config.ensure_api_key().is_err());
    }

    #[test]
    fn test_generated_default_config_parses() {
        let content = generate_default_config();
        let config: ChatConfig = toml::from_str(&content).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_missing_config_path_errors() {
        let err = ChatConfig::find_config_file(Some("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}
