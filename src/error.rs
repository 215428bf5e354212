//! Error taxonomy for the stakeholder chat.
//!
//! Each kind carries a numeric code (for log grepping and docs), a CLI exit
//! code, and usually a fix-it suggestion. Every externally-sourced failure
//! (HTTP, API, filesystem) is converted to one of these kinds before it
//! reaches the presentation layer; the terminal rendering code never sees a
//! raw reqwest or io error.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable numeric codes, grouped by hundred per failure domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    ApiKeyMissing = 110,

    // Document source errors (2xx)
    DocumentsMissing = 200,
    DocumentsEmpty = 201,
    DocumentRead = 202,

    // Access errors (3xx)
    AccessDenied = 300,

    // Retrieval errors (4xx)
    RetrievalFailed = 400,
    IndexBuildFailed = 401,

    // Generation errors (5xx)
    GenerationFailed = 500,
    StreamInterrupted = 501,

    // Persona errors (6xx)
    UnknownPersona = 600,
    PersonaConfigInvalid = 601,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Display code, e.g. "E100"
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Process exit code, one per failure domain
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // Document source errors
            300..=399 => 30, // Access errors
            400..=499 => 40, // Retrieval errors
            500..=599 => 50, // Generation errors
            600..=699 => 60, // Persona errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the chat application
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation API credential is absent
    #[error("No API key configured for the generation service")]
    ApiKeyMissing,

    // ─────────────────────────────────────────────────────────────
    // Document Source Errors
    // ─────────────────────────────────────────────────────────────

    /// Document directory does not exist
    #[error("Document directory not found: {path}")]
    DocumentsMissing { path: PathBuf },

    /// Document directory contains no readable documents
    #[error("Document directory is empty: {path}")]
    DocumentsEmpty { path: PathBuf },

    /// A document could not be read
    #[error("Failed to read document: {path}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Access Errors
    // ─────────────────────────────────────────────────────────────

    /// The submitted access secret did not match
    #[error("Access denied")]
    AccessDenied,

    // ─────────────────────────────────────────────────────────────
    // Retrieval Errors
    // ─────────────────────────────────────────────────────────────

    /// A retrieval query failed; the turn is failed but resubmittable
    #[error("Retrieval failed: {message}")]
    Retrieval { message: String },

    /// The retrieval index could not be built at startup
    #[error("Failed to build retrieval index: {message}")]
    IndexBuild { message: String },

    // ─────────────────────────────────────────────────────────────
    // Generation Errors
    // ─────────────────────────────────────────────────────────────

    /// A generation call failed
    #[error("Generation failed: {message}")]
    Generation { message: String },

    /// A streaming generation call failed mid-stream; partial output was kept
    #[error("Stream interrupted after {received} fragment(s): {message}")]
    StreamInterrupted { message: String, received: usize },

    // ─────────────────────────────────────────────────────────────
    // Persona Errors
    // ─────────────────────────────────────────────────────────────

    /// Persona id not present in the registry; unreachable through the closed selector
    #[error("Unknown persona: '{id}'")]
    UnknownPersona { id: String },

    /// A bundled persona config failed to parse
    #[error("Invalid persona config for '{id}': {message}")]
    PersonaConfigInvalid { id: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// The numeric code for this error kind
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::ApiKeyMissing => ErrorCode::ApiKeyMissing,

            Error::DocumentsMissing { .. } => ErrorCode::DocumentsMissing,
            Error::DocumentsEmpty { .. } => ErrorCode::DocumentsEmpty,
            Error::DocumentRead { .. } => ErrorCode::DocumentRead,
            Error::Io(_) => ErrorCode::DocumentRead,
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::AccessDenied => ErrorCode::AccessDenied,

            Error::Retrieval { .. } => ErrorCode::RetrievalFailed,
            Error::IndexBuild { .. } => ErrorCode::IndexBuildFailed,

            Error::Generation { .. } => ErrorCode::GenerationFailed,
            Error::StreamInterrupted { .. } => ErrorCode::StreamInterrupted,

            Error::UnknownPersona { .. } => ErrorCode::UnknownPersona,
            Error::PersonaConfigInvalid { .. } => ErrorCode::PersonaConfigInvalid,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is fatal (the process should exit before serving turns)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::ApiKeyMissing
                | Error::DocumentsMissing { .. }
                | Error::DocumentsEmpty { .. }
                | Error::IndexBuild { .. }
                | Error::UnknownPersona { .. }
                | Error::PersonaConfigInvalid { .. }
                | Error::Internal(_)
        )
    }

    /// Check if a failed turn may simply be resubmitted by the user
    pub fn is_resubmittable(&self) -> bool {
        matches!(
            self,
            Error::Retrieval { .. } | Error::Generation { .. } | Error::StreamInterrupted { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// A short hint telling the user how to get unstuck
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'nomads-chat config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'nomads-chat config validate' to see details."
            ),
            Error::ConfigValidation { .. } | Error::Config(_) => Some(
                "Review the configuration file and fix the invalid values. See documentation for valid options."
            ),
            Error::ApiKeyMissing => Some(
                "Set NOMADS_OPENAI_API_KEY or add 'api_key' under [openai] in the configuration file."
            ),

            Error::DocumentsMissing { .. } => Some(
                "Create the document directory and place your reference documents (.txt/.md) in it, or point [documents] dir at an existing one."
            ),
            Error::DocumentsEmpty { .. } => Some(
                "Add at least one readable .txt or .md document to the directory before starting a session."
            ),

            Error::AccessDenied => Some(
                "Please enter a valid password to continue."
            ),

            Error::Retrieval { .. } => Some(
                "The retrieval service call failed. Check connectivity and resubmit the message."
            ),
            Error::Generation { .. } | Error::StreamInterrupted { .. } => Some(
                "The generation service call failed. Check connectivity and resubmit the message."
            ),

            Error::UnknownPersona { .. } => Some(
                "Run 'nomads-chat persona list' to see the available stakeholders."
            ),

            _ => None,
        }
    }

    /// Terminal rendering: red code line plus an optional yellow hint
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", code.as_str(), self);

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Log rendering, no ANSI escapes
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a retrieval error
    pub fn retrieval(message: impl Into<String>) -> Self {
        Error::Retrieval {
            message: message.into(),
        }
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Error::Generation {
            message: message.into(),
        }
    }

    /// Create an index build error
    pub fn index_build(message: impl Into<String>) -> Self {
        Error::IndexBuild {
            message: message.into(),
        }
    }

    /// Create an unknown persona error
    pub fn unknown_persona(id: impl Into<String>) -> Self {
        Error::UnknownPersona { id: id.into() }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
