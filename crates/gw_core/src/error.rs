use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The decoded timeline carried no frames at all. This is the only
    /// condition fatal to a whole analysis run; everything else degrades
    /// to skipped records or empty detector output.
    #[error("timeline contains no frames")]
    EmptyTimeline,

    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error("invalid timeline: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::InvalidJson(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
