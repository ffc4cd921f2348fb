//! Error types for bookpress operations.

use thiserror::Error;

/// Errors that can occur while ingesting a manuscript or building a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid book config: {0}")]
    InvalidConfig(String),

    #[error("Invalid manuscript: {0}")]
    InvalidManuscript(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedImage(String),

    #[error("Image decode error for asset `{id}`: {reason}")]
    ImageDecode { id: String, reason: String },

    #[error("Font error: {0}")]
    Font(String),

    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, Error>;
