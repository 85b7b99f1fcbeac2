//! Error types for sqlpanel

use thiserror::Error;

/// Result type alias for sqlpanel operations
pub type PanelResult<T> = Result<T, PanelError>;

/// Error types for panel and detail-view operations
#[derive(Debug, Error)]
pub enum PanelError {
    /// The request cannot be served as asked (unknown request, non-SELECT replay,
    /// missing or expired engine)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The referenced panel or query does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Postgres execution error
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// SQLite execution error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// A recorded parameter cannot be bound for re-execution
    #[error("Parameter error: {0}")]
    Param(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking task failed to complete
    #[error("Task join error: {0}")]
    Join(String),
}

impl PanelError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a bad request error
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status code the error maps to when served by the detail routes.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for PanelError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<tokio::task::JoinError> for PanelError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Join(err.to_string())
    }
}
