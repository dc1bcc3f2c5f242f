//! Error types for torbox-webdl
//!
//! Every failure of the submit → poll → resolve workflow is one variant of
//! [`Error`]. Each variant carries a human-readable detail (sourced from the
//! Torbox API when it supplied one) and maps to:
//! - a machine-readable error code, used by the message bridge
//! - the terminal workflow state it ends in

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{JobId, WorkflowState};

/// Result type alias for torbox-webdl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for torbox-webdl
///
/// All variants are terminal: the workflow never retries a failed
/// submission or a failed link resolution on its own. The only built-in
/// retry is the fixed-interval status poll.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_base")
        key: Option<String>,
    },

    /// No API key has been stored yet
    #[error("Torbox API key not configured")]
    CredentialMissing,

    /// The create endpoint refused the submission
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// The create endpoint accepted the submission but returned no job reference
    #[error("no web download ID returned from Torbox")]
    MissingJobId,

    /// The status listing could not be fetched or decoded
    #[error("failed to check download status: {0}")]
    StatusQueryFailed(String),

    /// A previously accepted job no longer appears in the status listing
    #[error("download {job_id} not found in Torbox")]
    JobVanished {
        /// The job that disappeared
        job_id: JobId,
    },

    /// The remote service reported the job as failed
    #[error("download failed: {0}")]
    RemoteJobFailed(String),

    /// The job did not reach a terminal status within the attempt budget
    #[error("download timed out after {attempts} status checks")]
    PollTimeout {
        /// Number of status checks performed
        attempts: u32,
    },

    /// The final download link could not be obtained
    #[error("failed to get download link: {0}")]
    LinkResolutionFailed(String),

    /// The caller cancelled the workflow between attempts
    #[error("workflow cancelled")]
    Cancelled,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code (e.g., "submission_rejected")
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::CredentialMissing => "credential_missing",
            Error::SubmissionRejected(_) => "submission_rejected",
            Error::MissingJobId => "missing_job_id",
            Error::StatusQueryFailed(_) => "status_query_failed",
            Error::JobVanished { .. } => "job_vanished",
            Error::RemoteJobFailed(_) => "remote_job_failed",
            Error::PollTimeout { .. } => "poll_timeout",
            Error::LinkResolutionFailed(_) => "link_resolution_failed",
            Error::Cancelled => "cancelled",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// The terminal workflow state a run ends in when it fails with this error
    pub fn terminal_state(&self) -> WorkflowState {
        match self {
            Error::PollTimeout { .. } => WorkflowState::TimedOut,
            Error::JobVanished { .. } => WorkflowState::NotFound,
            Error::Cancelled => WorkflowState::Cancelled,
            _ => WorkflowState::Failed,
        }
    }
}

/// Error payload handed back to the UI layer
///
/// # Example JSON
///
/// ```json
/// {
///   "success": false,
///   "error": "submission rejected: quota exceeded",
///   "code": "submission_rejected"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message, suitable for display
    pub error: String,
    /// Machine-readable error code
    pub code: String,
}

impl ErrorDetail {
    /// Create an error detail from a code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
        }
    }
}

impl From<&Error> for ErrorDetail {
    fn from(error: &Error) -> Self {
        Self::new(error.error_code(), error.to_string())
    }
}
