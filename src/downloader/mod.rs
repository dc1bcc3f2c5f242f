//! Submit → poll → resolve workflow.
//!
//! [`TorboxDownloader`] owns the collaborators of one workflow:
//! - [`pacing`] - the delay between status checks
//! - [`poll`] - the bounded status polling loop
//!
//! A run moves through [`WorkflowState`]s: `Submitting → Queued → Polling`
//! and ends in exactly one terminal state. Nothing is persisted; a run
//! that returns is over.

mod pacing;
mod poll;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use pacing::{Sleeper, TokioSleeper};

use crate::client::{HttpClient, WebDownloadApi};
use crate::config::{Config, PollConfig};
use crate::credentials::{self, CredentialStore};
use crate::error::{Error, Result};
use crate::progress::{self, NoopSink, ProgressSink};
use crate::types::{ProgressEvent, ResolvedDownload, SubmissionRequest, WorkflowState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives Torbox web downloads from link to direct URL (cloneable - all fields are Arc-wrapped)
///
/// Runs share nothing but the read-only credential, so several may be in
/// flight on one runtime, each with its own timer.
#[derive(Clone)]
pub struct TorboxDownloader {
    /// Torbox API operations (trait object so tests can script the service)
    pub(crate) api: Arc<dyn WebDownloadApi>,
    /// Where the API key is read from at the start of every run
    pub(crate) credentials: Arc<dyn CredentialStore>,
    /// Interval and attempt budget of the status poll
    pub(crate) poll: PollConfig,
    /// Delay source between status checks
    pub(crate) sleeper: Arc<dyn Sleeper>,
    /// Default progress observer for [`submit`](Self::submit)
    pub(crate) sink: Arc<dyn ProgressSink>,
}

impl TorboxDownloader {
    /// Create a downloader talking to the real Torbox API
    ///
    /// The credential store is chosen by `config.credentials_path`.
    pub fn new(config: Config) -> Result<Self> {
        let api = HttpClient::new(&config)?;
        let credentials = credentials::store_from_config(&config);
        Ok(Self::with_parts(Arc::new(api), credentials, config.poll))
    }

    /// Assemble a downloader from explicit collaborators
    pub fn with_parts(
        api: Arc<dyn WebDownloadApi>,
        credentials: Arc<dyn CredentialStore>,
        poll: PollConfig,
    ) -> Self {
        Self {
            api,
            credentials,
            poll,
            sleeper: Arc::new(TokioSleeper),
            sink: Arc::new(NoopSink),
        }
    }

    /// Replace the delay source between status checks
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the progress observer used by [`submit`](Self::submit)
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The credential store this downloader reads from
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Submit a link and wait for its direct download URL
    ///
    /// Progress goes to the sink configured with
    /// [`with_progress_sink`](Self::with_progress_sink).
    pub async fn submit(&self, request: SubmissionRequest) -> Result<ResolvedDownload> {
        self.run(request, self.sink.as_ref(), &CancellationToken::new())
            .await
    }

    /// Submit a link, reporting progress to `sink`, until the URL is
    /// resolved, the run fails, or `cancel` fires
    ///
    /// Cancellation is observed before submitting and between status checks.
    pub async fn run(
        &self,
        request: SubmissionRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ResolvedDownload> {
        let result = self.execute(&request, sink, cancel).await;

        match &result {
            Ok(download) => tracing::info!(
                job_id = %download.job_id,
                file_id = %download.file_id,
                state = %WorkflowState::Completed,
                "web download ready"
            ),
            Err(e) => tracing::warn!(
                link = %request.link,
                state = %e.terminal_state(),
                code = e.error_code(),
                error = %e,
                "web download workflow ended without a link"
            ),
        }

        result
    }

    async fn execute(
        &self,
        request: &SubmissionRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ResolvedDownload> {
        let credential = self
            .credentials
            .get()
            .await?
            .ok_or(Error::CredentialMissing)?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tracing::debug!(link = %request.link, state = %WorkflowState::Submitting, "submitting link");
        let job_id = self
            .api
            .create_job(&credential, &request.link, request.display_name.as_deref())
            .await?;

        tracing::info!(job_id = %job_id, state = %WorkflowState::Queued, "web download queued");
        progress::deliver(sink, &ProgressEvent::queued());

        let job = self
            .poll_until_ready(&credential, &job_id, sink, cancel)
            .await?;

        let file_id = job.file_ref();
        let url = self
            .api
            .request_download_link(&credential, &job_id, &file_id)
            .await?;

        Ok(ResolvedDownload {
            url,
            job_id,
            file_id,
        })
    }
}
