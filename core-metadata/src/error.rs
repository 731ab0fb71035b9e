use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read tags: {0}")]
    TagReadFailed(String),

    #[error("Tag update failed: {0}")]
    TagWriteFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    JsonParse(String),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
