use thiserror::Error;

/// Library-wide error. Validation failures never reach the job table;
/// not-found is kept distinct from every other failure so the API layer
/// can map it without string matching.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
