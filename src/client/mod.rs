//! Torbox web download API client
//!
//! Three stateless request/response operations:
//! - create a web download job from a link
//! - list the account's web download jobs (bypassing Torbox's cache)
//! - request the direct download URL of one file of a job
//!
//! [`WebDownloadApi`] is the seam the downloader drives; [`HttpClient`] is
//! the reqwest implementation talking to the real service.

mod envelope;


use crate::config::Config;
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::types::{FileId, Job, JobId};
use async_trait::async_trait;
use envelope::Envelope;
use reqwest::multipart::Form;

/// Path of the job creation endpoint, relative to the API base
pub const CREATE_PATH: &str = "webdl/createwebdownload";
/// Path of the job listing endpoint, relative to the API base
pub const LIST_PATH: &str = "webdl/mylist";
/// Path of the download link endpoint, relative to the API base
pub const REQUEST_LINK_PATH: &str = "webdl/requestdl";

const SUBMIT_FALLBACK_REASON: &str = "Failed to submit to Torbox";
const LINK_FALLBACK_REASON: &str = "Failed to get download link";

/// Remote operations of the Torbox web download service
///
/// Every call is independent and safe to repeat.
#[async_trait]
pub trait WebDownloadApi: Send + Sync {
    /// Submit `link` for caching and return the new job's id
    ///
    /// # Errors
    ///
    /// - [`Error::SubmissionRejected`] with the service's reason on a non-success status
    /// - [`Error::MissingJobId`] when the response names no job
    async fn create_job(
        &self,
        credential: &Credential,
        link: &str,
        display_name: Option<&str>,
    ) -> Result<JobId>;

    /// Fresh (non-cached) listing of all web download jobs
    ///
    /// # Errors
    ///
    /// [`Error::StatusQueryFailed`] on a non-success status or an unreadable body
    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<Job>>;

    /// Direct download URL for `file_id` of job `job_id`
    ///
    /// # Errors
    ///
    /// [`Error::LinkResolutionFailed`] on a non-success status or when no URL
    /// is present in the response
    async fn request_download_link(
        &self,
        credential: &Credential,
        job_id: &JobId,
        file_id: &FileId,
    ) -> Result<String>;
}

/// reqwest-backed [`WebDownloadApi`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    api_base: String,
}

impl HttpClient {
    /// Build a client for `config.api_base` with `config.request_timeout`
    /// applied to every request
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }
}

#[async_trait]
impl WebDownloadApi for HttpClient {
    async fn create_job(
        &self,
        credential: &Credential,
        link: &str,
        display_name: Option<&str>,
    ) -> Result<JobId> {
        let mut form = Form::new().text("link", link.to_string());
        if let Some(name) = display_name.filter(|name| !name.is_empty()) {
            form = form.text("name", name.to_string());
        }

        tracing::debug!(link = %link, name = ?display_name, "creating web download");

        let response = self
            .http
            .post(self.endpoint(CREATE_PATH))
            .bearer_auth(credential.expose())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = Envelope::parse(&body)
                .ok()
                .and_then(|envelope| envelope.failure_reason())
                .unwrap_or_else(|| SUBMIT_FALLBACK_REASON.to_string());
            tracing::warn!(status = %status, reason = %reason, "Torbox rejected submission");
            return Err(Error::SubmissionRejected(reason));
        }

        let envelope = Envelope::parse(&body).map_err(|e| {
            tracing::warn!(error = %e, "unreadable create response");
            Error::MissingJobId
        })?;

        envelope.job_id().ok_or(Error::MissingJobId)
    }

    async fn list_jobs(&self, credential: &Credential) -> Result<Vec<Job>> {
        let response = self
            .http
            .get(self.endpoint(LIST_PATH))
            .bearer_auth(credential.expose())
            .query(&[("bypass_cache", "true")])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = Envelope::parse(&body)
                .ok()
                .and_then(|envelope| envelope.failure_reason())
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(Error::StatusQueryFailed(reason));
        }

        let envelope = Envelope::parse(&body)
            .map_err(|e| Error::StatusQueryFailed(format!("malformed status listing: {}", e)))?;

        Ok(envelope.into_jobs())
    }

    async fn request_download_link(
        &self,
        credential: &Credential,
        job_id: &JobId,
        file_id: &FileId,
    ) -> Result<String> {
        tracing::debug!(job_id = %job_id, file_id = %file_id, "requesting download link");

        // The token travels as a query parameter; this endpoint takes no auth header
        let response = self
            .http
            .get(self.endpoint(REQUEST_LINK_PATH))
            .query(&[
                ("token", credential.expose().to_string()),
                ("web_id", job_id.to_string()),
                ("file_id", file_id.to_string()),
                ("zip_link", "false".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = Envelope::parse(&body)
                .ok()
                .and_then(|envelope| envelope.failure_reason())
                .unwrap_or_else(|| LINK_FALLBACK_REASON.to_string());
            tracing::warn!(status = %status, reason = %reason, "Torbox refused download link");
            return Err(Error::LinkResolutionFailed(reason));
        }

        Envelope::parse(&body)
            .map_err(|e| Error::LinkResolutionFailed(format!("malformed response: {}", e)))?
            .download_url()
            .ok_or_else(|| Error::LinkResolutionFailed("no download link in response".to_string()))
    }
}
