//! Error types for the role export pipeline.

use thiserror::Error;

/// Result type alias using `ExportError`.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that can occur while exporting tenant role data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Client construction or other local setup error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `OAuth2` token acquisition error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Microsoft Graph API returned a non-success status.
    #[error("Graph API error: status {status} - {message}")]
    GraphApi { status: u16, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Warehouse query or insert error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The snapshot source yielded no tenants; the run cannot proceed.
    #[error("Snapshot source returned no tenants")]
    EmptySnapshot,
}
