//! Error types for the persistence layer.

use thiserror::Error;

/// Main error type for configuration, adapter and snapshot operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Configuration error (unknown provider tag, unwritable config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An adapter could not be opened or was used after close.
    #[error("Connection to {provider} failed: {message}")]
    Connection { provider: String, message: String },

    /// Malformed snapshot or import request, raised before any mutation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A failure inside an import transaction. The transaction was rolled back.
    #[error("Import failed at table {table} and was rolled back: {source}")]
    Transaction {
        table: String,
        #[source]
        source: Box<StoreError>,
    },

    /// Statement error reported by the database driver.
    #[error("Database error: {message}")]
    Database {
        code: Option<String>,
        message: String,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification exposed to upstream callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Connection,
    Validation,
    Transaction,
    Database,
    Io,
}

impl StoreError {
    /// Create a Connection error naming the provider.
    pub fn connection(provider: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Connection {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Create a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    /// Wrap a failure that happened inside an import transaction.
    pub fn transaction(table: impl Into<String>, source: StoreError) -> Self {
        StoreError::Transaction {
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Config(_) => ErrorKind::Config,
            StoreError::Connection { .. } => ErrorKind::Connection,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::Transaction { .. } => ErrorKind::Transaction,
            StoreError::Database { .. } => ErrorKind::Database,
            StoreError::Io(_) | StoreError::Json(_) => ErrorKind::Io,
        }
    }

    /// Driver-specific error code (SQLSTATE, MySQL error number, SQLite code).
    pub fn db_code(&self) -> Option<&str> {
        match self {
            StoreError::Database { code, .. } => code.as_deref(),
            StoreError::Transaction { source, .. } => source.db_code(),
            _ => None,
        }
    }

    /// Message suitable for an outward-facing response.
    ///
    /// Driver codes and statement text are never included.
    pub fn public_message(&self) -> String {
        match self {
            StoreError::Config(msg) => format!("configuration error: {}", msg),
            StoreError::Connection { provider, message } => {
                format!("could not connect to {}: {}", provider, message)
            }
            StoreError::Validation(msg) => format!("invalid request: {}", msg),
            StoreError::Transaction { table, .. } => format!(
                "import failed while writing {}; no changes were applied",
                table
            ),
            StoreError::Database { .. } => "database statement failed".to_string(),
            StoreError::Io(_) | StoreError::Json(_) => "storage I/O failure".to_string(),
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::Validation => 3,
            ErrorKind::Connection => 4,
            ErrorKind::Transaction => 5,
            ErrorKind::Database => 6,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        let code = e.code().map(|c| c.code().to_string());
        let message = match e.as_db_error() {
            Some(db) => db.message().to_string(),
            None => e.to_string(),
        };
        StoreError::Database { code, message }
    }
}

impl From<mysql_async::Error> for StoreError {
    fn from(e: mysql_async::Error) -> Self {
        match e {
            mysql_async::Error::Server(server) => StoreError::Database {
                code: Some(server.code.to_string()),
                message: server.message,
            },
            other => StoreError::Database {
                code: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) => StoreError::Database {
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_string(),
            },
            None => StoreError::Database {
                code: None,
                message: e.to_string(),
            },
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, StoreError>;
