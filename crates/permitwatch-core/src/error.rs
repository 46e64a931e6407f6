// crates/permitwatch-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("HTTP status {status} from API: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("API error payload: {0}")]
    ApiError(String),

    #[error("Malformed page: {0}")]
    MalformedPage(String),

    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("No data returned from API")]
    EmptyResultSet,

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Transient errors are worth retrying; everything else fails the run.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Http(_) => true,
            PipelineError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
