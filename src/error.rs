use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ReportError {
    #[error("Invalid item reference: {0}")]
    InvalidReference(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;

impl From<std::io::Error> for ReportError {
    fn from(e: std::io::Error) -> Self {
        ReportError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::Store(e.to_string())
    }
}

impl ReportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReportError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ReportError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ReportError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReportError::DataIntegrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReportError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
