//! Catalogue component-boundary error type.

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt catalogue snapshot: {0}")]
    Corrupt(String),

    #[error("catalogue serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
