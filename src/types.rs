//! Core types for torbox-webdl

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier the Torbox API hands out, either as a JSON number or a string
///
/// Two identifiers are equal when their textual forms match, so `5` and
/// `"5"` refer to the same remote object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    /// Numeric identifier
    Number(u64),
    /// Textual identifier
    Text(String),
}

impl PartialEq for RemoteId {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for RemoteId {}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{}", n),
            RemoteId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl RemoteId {
    // Textual form used for comparison; surrounding whitespace never matters
    fn canonical(&self) -> std::borrow::Cow<'_, str> {
        match self {
            RemoteId::Number(n) => std::borrow::Cow::Owned(n.to_string()),
            RemoteId::Text(s) => std::borrow::Cow::Borrowed(s.trim()),
        }
    }

    /// Interpret a JSON value as an identifier
    ///
    /// Zero, empty strings, and non-scalar values carry no identity and
    /// yield `None`.
    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().filter(|n| *n != 0).map(RemoteId::Number),
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Some(RemoteId::Text(s.trim().to_string()))
            }
            _ => None,
        }
    }
}

/// Unique identifier for a Torbox web download job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub RemoteId);

/// Identifier of one file inside a web download job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub RemoteId);

impl FileId {
    /// File reference used when the job lists no file identifier at all
    pub fn sentinel() -> Self {
        Self(RemoteId::Number(0))
    }
}

macro_rules! remote_id_conversions {
    ($name:ident) => {
        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(RemoteId::Number(id))
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(RemoteId::Text(id.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(RemoteId::Text(id))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

remote_id_conversions!(JobId);
remote_id_conversions!(FileId);

/// A link the caller wants Torbox to fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Remote resource URL (must be non-empty; not re-validated downstream)
    pub link: String,
    /// Optional name Torbox should give the download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SubmissionRequest {
    /// Create a submission without a display name
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            display_name: None,
        }
    }

    /// Attach a display name (blank names are dropped)
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.display_name = (!name.trim().is_empty()).then_some(name);
        self
    }
}

/// One file of a web download job
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct JobFile {
    /// File identifier used when requesting the download link
    #[serde(default, deserialize_with = "lenient::file_id")]
    pub id: Option<FileId>,
    /// File name, if reported
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
}

/// A web download job as reported by the `mylist` endpoint
///
/// Decoding is lenient: optional fields that carry an unexpected JSON type
/// are treated as absent instead of failing the whole listing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Job {
    /// Job identifier
    pub id: JobId,
    /// Job name, if reported
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    /// Primary status field
    #[serde(default, deserialize_with = "lenient::string")]
    pub download_state: Option<String>,
    /// Fallback status field
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: Option<String>,
    /// Progress fraction in [0, 1]
    #[serde(default, deserialize_with = "lenient::number")]
    pub progress: Option<f64>,
    /// Files belonging to the job
    #[serde(default, deserialize_with = "lenient::files")]
    pub files: Vec<JobFile>,
    /// Job-level file identifier
    #[serde(default, deserialize_with = "lenient::file_id")]
    pub file_id: Option<FileId>,
    /// Failure detail reported by Torbox
    #[serde(default, deserialize_with = "lenient::string")]
    pub error: Option<String>,
}

impl Job {
    /// Status token: `download_state`, falling back to `status`
    pub fn status_token(&self) -> Option<&str> {
        [&self.download_state, &self.status]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| !s.trim().is_empty())
    }

    /// Progress fraction, 0 when absent or not finite
    pub fn progress_fraction(&self) -> f64 {
        self.progress.filter(|p| p.is_finite()).unwrap_or(0.0)
    }

    /// Progress as a rounded whole percentage
    pub fn percent(&self) -> i64 {
        (self.progress_fraction() * 100.0).round() as i64
    }

    /// File to request a link for: the first listed file, else the
    /// job-level file id, else [`FileId::sentinel`]
    pub fn file_ref(&self) -> FileId {
        self.files
            .first()
            .and_then(|f| f.id.clone())
            .or_else(|| self.file_id.clone())
            .unwrap_or_else(FileId::sentinel)
    }
}

/// Progress notification delivered to a [`ProgressSink`](crate::progress::ProgressSink)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Status token (e.g. "queued", "downloading")
    pub status: String,
    /// Human-readable message
    pub message: String,
}

impl ProgressEvent {
    /// Create a new event
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Event emitted once the submission has been accepted
    pub fn queued() -> Self {
        Self::new("queued", "Download queued, waiting for processing...")
    }

    /// Event emitted after each status check
    pub fn for_job(job: &Job) -> Self {
        let status = job.status_token().unwrap_or("unknown");
        Self::new(status, format!("Status: {} ({}%)", status, job.percent()))
    }
}

/// Final output of a successful workflow run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDownload {
    /// Direct download URL
    pub url: String,
    /// Job that produced the URL
    pub job_id: JobId,
    /// File the URL points at
    pub file_id: FileId,
}

/// Workflow state machine states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Creating the remote job
    Submitting,
    /// Job accepted, no status checked yet
    Queued,
    /// Waiting for the job to reach a terminal status
    Polling,
    /// Job ready and download link resolved
    Completed,
    /// Submission, remote job, or link resolution failed
    Failed,
    /// Attempt budget exhausted
    TimedOut,
    /// Job vanished from the listing
    NotFound,
    /// Caller cancelled the run
    Cancelled,
}

impl WorkflowState {
    /// Whether the workflow can leave this state
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            WorkflowState::Submitting | WorkflowState::Queued | WorkflowState::Polling
        )
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowState::Submitting => "submitting",
            WorkflowState::Queued => "queued",
            WorkflowState::Polling => "polling",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
            WorkflowState::TimedOut => "timed_out",
            WorkflowState::NotFound => "not_found",
            WorkflowState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

// Field decoders that degrade to "absent" instead of rejecting the entry
mod lenient {
    use super::*;
    use serde_json::Value;

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
    }

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn file_id<'de, D>(deserializer: D) -> Result<Option<FileId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(RemoteId::from_json)
            .map(FileId))
    }

    pub fn files<'de, D>(deserializer: D) -> Result<Vec<JobFile>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(entries)) => entries
                .into_iter()
                // Undecodable entries keep their slot so index 0 stays the first file
                .map(|entry| serde_json::from_value(entry).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        })
    }
}
