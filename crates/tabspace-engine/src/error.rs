use tabspace_lib::{ReorderError, TabId, ValidationError};
use thiserror::Error;

/// Failures from a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failures reported by the browser for a single tab call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    #[error("no tab with id {0}")]
    TabNotFound(TabId),

    #[error("browser rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum TabspaceError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("browser operation failed: {0}")]
    Browser(#[from] BrowserError),

    #[error("workspace repository is shutting down")]
    ShuttingDown,
}

impl From<ReorderError> for TabspaceError {
    fn from(err: ReorderError) -> Self {
        TabspaceError::Validation(ValidationError::Reorder(err))
    }
}

impl TabspaceError {
    /// True for failures of the browser or the store, as opposed to bad input.
    pub fn is_external(&self) -> bool {
        matches!(self, TabspaceError::Store(_) | TabspaceError::Browser(_))
    }
}

pub type Result<T, E = TabspaceError> = std::result::Result<T, E>;
