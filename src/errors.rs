use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Not signed in. Run `vault login --email <address>` first.")]
    AuthRequired,

    #[error("Backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        VaultError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
