//! Bounded status polling.

use super::TorboxDownloader;
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::progress::{self, ProgressSink};
use crate::status::{StatusClass, classify};
use crate::types::{Job, JobId, ProgressEvent, WorkflowState};
use tokio_util::sync::CancellationToken;

impl TorboxDownloader {
    /// Check the job's status until it is ready to download
    ///
    /// Performs at most `poll.max_attempts` status checks with
    /// `poll.interval` between them. Every check emits exactly one progress
    /// event. No pause follows the final check.
    pub(crate) async fn poll_until_ready(
        &self,
        credential: &Credential,
        job_id: &JobId,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Job> {
        let max_attempts = self.poll.max_attempts;
        let interval = self.poll.interval();

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let jobs = self.api.list_jobs(credential).await?;

            let Some(job) = jobs.into_iter().find(|job| &job.id == job_id) else {
                tracing::warn!(
                    job_id = %job_id,
                    attempt,
                    state = %WorkflowState::NotFound,
                    "web download missing from status listing"
                );
                return Err(Error::JobVanished {
                    job_id: job_id.clone(),
                });
            };

            let token = job.status_token();
            let progress = job.progress_fraction();
            progress::deliver(sink, &ProgressEvent::for_job(&job));

            tracing::debug!(
                job_id = %job_id,
                attempt,
                max_attempts,
                status = token.unwrap_or("unknown"),
                progress,
                state = %WorkflowState::Polling,
                "status check"
            );

            match classify(token, progress) {
                StatusClass::Ready => return Ok(job),
                StatusClass::Failed => {
                    let detail = job
                        .error
                        .as_deref()
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or("Unknown error");
                    return Err(Error::RemoteJobFailed(detail.to_string()));
                }
                StatusClass::Pending => {}
            }

            if attempt == max_attempts {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = self.sleeper.sleep(interval) => {}
            }
        }

        Err(Error::PollTimeout {
            attempts: max_attempts,
        })
    }
}
