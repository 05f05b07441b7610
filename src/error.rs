//! Error types for persona-forge
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI
//!
//! Quality failures (a batch failing its gates, retries running out) are
//! not errors; they are reported through the pipeline's result values.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Data table errors (3xx)
    CatalogInvalid = 300,
    ReferenceInvalid = 301,
    RulesInvalid = 302,
    CriteriaInvalid = 303,

    // Input errors (4xx)
    InvalidParameter = 400,
    BatchParse = 401,
    EmptyBatch = 402,

    // Internal errors (9xx)
    InternalError = 900,
    Serialization = 901,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Data table errors
            400..=499 => 40, // Input errors
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

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
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

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Data Table Errors
    // ─────────────────────────────────────────────────────────────

    /// Characteristic catalog is malformed
    #[error("Invalid characteristic catalog: {message}")]
    CatalogInvalid { message: String },

    /// Reference demographic table is malformed
    #[error("Invalid reference distribution '{distribution}': {message}")]
    ReferenceInvalid { distribution: String, message: String },

    /// Rule table is malformed
    #[error("Invalid rule '{rule}': {message}")]
    RulesInvalid { rule: String, message: String },

    /// Validation criteria table is malformed
    #[error("Invalid validation criteria: {message}")]
    CriteriaInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────

    /// A request parameter is out of range
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// A persona batch file could not be decoded
    #[error("Failed to parse persona batch {path}: {message}")]
    BatchParse { path: PathBuf, message: String },

    /// The persona batch contains no personas
    #[error("Persona batch is empty")]
    EmptyBatch,

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

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::Serialization,
            Error::Json(_) => ErrorCode::Serialization,

            Error::CatalogInvalid { .. } => ErrorCode::CatalogInvalid,
            Error::ReferenceInvalid { .. } => ErrorCode::ReferenceInvalid,
            Error::RulesInvalid { .. } => ErrorCode::RulesInvalid,
            Error::CriteriaInvalid { .. } => ErrorCode::CriteriaInvalid,

            Error::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Error::BatchParse { .. } => ErrorCode::BatchParse,
            Error::EmptyBatch => ErrorCode::EmptyBatch,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'persona-forge config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'persona-forge config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Thresholds and probabilities must lie in [0, 1]; count and max_attempts must be positive."
            ),

            Error::CatalogInvalid { .. }
            | Error::ReferenceInvalid { .. }
            | Error::RulesInvalid { .. } => Some(
                "The bundled data tables under config/ are inconsistent. Check names and options against catalog.toml."
            ),
            Error::CriteriaInvalid { .. } => Some(
                "Each study level needs all eight dimensions, minimum <= target, and weights summing to 1."
            ),

            Error::InvalidParameter { .. } => Some(
                "Batch size must be positive; diversity target and quality threshold must lie in [0, 1]."
            ),
            Error::BatchParse { .. } => Some(
                "The input must be a JSON array of personas, or the output of 'persona-forge generate --json'."
            ),
            Error::EmptyBatch => Some(
                "Provide at least one persona to validate."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Error::CatalogInvalid {
            message: message.into(),
        }
    }

    /// Create a reference distribution error
    pub fn reference(distribution: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ReferenceInvalid {
            distribution: distribution.into(),
            message: message.into(),
        }
    }

    /// Create a rule table error
    pub fn rules(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Error::RulesInvalid {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create a criteria table error
    pub fn criteria(message: impl Into<String>) -> Self {
        Error::CriteriaInvalid {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
