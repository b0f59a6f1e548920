use thiserror::Error;

use crate::core::models::report::InvalidReport;

/// Cost Explorer query failed, or returned something we cannot use.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Cost Explorer query failed: {0}")]
    Api(String),
    #[error("malformed Cost Explorer response: {0}")]
    MalformedResponse(String),
    #[error("invalid cost data: {0}")]
    InvalidReport(#[from] InvalidReport),
}

/// Local artifact serialization or filesystem failure.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write report file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize report to JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize report to CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// S3 upload failed after retries.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("S3 upload failed: {0}")]
    Api(String),
    #[error("failed to read artifact for upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A stage failure aborting the run. Each stage maps to a distinct
/// process exit code so callers can tell where the pipeline stopped.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fetch(_) => 1,
            Self::Write(_) => 2,
            Self::Upload(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_pipeline_stage() {
        let fetch = PipelineError::from(FetchError::Api("boom".into()));
        let write = PipelineError::from(WriteError::Io(std::io::Error::other("disk full")));
        let upload = PipelineError::from(UploadError::Api("no bucket".into()));
        assert_eq!(fetch.exit_code(), 1);
        assert_eq!(write.exit_code(), 2);
        assert_eq!(upload.exit_code(), 3);
    }

    #[test]
    fn fetch_error_message_names_cost_explorer() {
        let err = FetchError::Api("AccessDenied".into());
        assert!(err.to_string().contains("Cost Explorer"));
    }
}
