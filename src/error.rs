use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Email API error: {message}")]
    Email { message: String },

    /// A failure observed by every caller that joined the same batched query.
    #[error(transparent)]
    Batched(Arc<BookingError>),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl BookingError {
    /// Status code used by the read-side HTTP API.
    pub fn status_code(&self) -> u16 {
        match self {
            BookingError::Json(_) | BookingError::MissingField(_) | BookingError::Validation(_) => 400,
            BookingError::NotFound(_) => 404,
            BookingError::Batched(inner) => inner.status_code(),
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batched_errors_keep_the_inner_status() {
        let err = BookingError::Batched(Arc::new(BookingError::NotFound("booking 7".into())));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Not found: booking 7");
    }

    #[test]
    fn validation_is_a_client_error() {
        assert_eq!(BookingError::Validation("bad".into()).status_code(), 400);
        assert_eq!(
            BookingError::Backend { status: 503, message: "down".into() }.status_code(),
            500
        );
    }
}
