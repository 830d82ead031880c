use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Seed rejected: {0}")]
    SeedRejected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
