use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChecklistApiError>;

#[derive(Debug, Error)]
pub enum ChecklistApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ChecklistApiError {
    fn from(err: reqwest::Error) -> Self {
        ChecklistApiError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ChecklistApiError {
    fn from(err: serde_json::Error) -> Self {
        ChecklistApiError::Parse(err.to_string())
    }
}
