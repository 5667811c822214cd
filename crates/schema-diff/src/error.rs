//! Error types for the schema comparison engine.

use thiserror::Error;

/// Main error type for schema comparison operations.
#[derive(Error, Debug)]
pub enum DiffError {
    /// Configuration error (invalid connection URL, missing schema,
    /// system-schema refusal, unsupported dialect).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error (unreachable host, authentication, TLS handshake).
    #[error("Connection error: {message}\n  Context: {context}")]
    Connect { message: String, context: String },

    /// Unexpected catalog row shape for a specific entity.
    #[error("Catalog error for {entity}: {message}")]
    Catalog { entity: String, message: String },

    /// Unsatisfiable direction/diff combination. Defensive; not reached in
    /// normal paths.
    #[error("Generation error: {0}")]
    Generation(String),

    /// IO error (writing the `--out` file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Comparison was cancelled (SIGINT, etc.).
    #[error("Comparison cancelled")]
    Cancelled,
}

impl DiffError {
    /// Create a Connect error with context about where it occurred.
    pub fn connect(message: impl Into<String>, context: impl Into<String>) -> Self {
        DiffError::Connect {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Catalog error naming the failing entity.
    pub fn catalog(entity: impl Into<String>, message: impl Into<String>) -> Self {
        DiffError::Catalog {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including the error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error. Every engine-level failure maps to 1.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, DiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_carries_context() {
        let err = DiffError::connect("refused", "creating PostgreSQL catalog pool");
        let msg = err.to_string();
        assert!(msg.contains("refused"));
        assert!(msg.contains("creating PostgreSQL catalog pool"));
    }

    #[test]
    fn test_catalog_error_names_entity() {
        let err = DiffError::catalog("foreign key accounts.fk_owner", "referenced column missing");
        assert!(err.to_string().contains("accounts.fk_owner"));
    }

    #[test]
    fn test_format_detailed_walks_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DiffError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error"));
        assert!(detailed.contains("Caused by"));
    }

    #[test]
    fn test_exit_code_is_one() {
        assert_eq!(DiffError::Cancelled.exit_code(), 1);
        assert_eq!(DiffError::Config("x".into()).exit_code(), 1);
    }
}
