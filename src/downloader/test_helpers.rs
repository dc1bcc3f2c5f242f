//! Scripted collaborators for downloader tests.

use super::{Sleeper, TorboxDownloader};
use crate::client::WebDownloadApi;
use crate::config::PollConfig;
use crate::credentials::{Credential, CredentialStore, MemoryCredentialStore};
use crate::error::{Error, Result};
use crate::progress::{ProgressSink, SinkError};
use crate::types::{FileId, Job, JobId, ProgressEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const TEST_API_KEY: &str = "test-api-key";

/// Build a [`Job`] from its wire form
pub(crate) fn job(value: serde_json::Value) -> Job {
    serde_json::from_value(value).unwrap()
}

/// A call the downloader made against the scripted service
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    Create { link: String, name: Option<String> },
    List,
    RequestLink { job_id: JobId, file_id: FileId },
}

pub(crate) enum CreateOutcome {
    Accept(JobId),
    Reject(String),
}

pub(crate) enum Listing {
    Jobs(Vec<Job>),
    Fail(String),
}

/// In-memory Torbox stand-in
///
/// Listings are served in order; the last one repeats forever.
pub(crate) struct ScriptedApi {
    create: Mutex<Option<CreateOutcome>>,
    listings: Mutex<VecDeque<Listing>>,
    link: Mutex<std::result::Result<String, String>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedApi {
    pub(crate) fn accepting(job_id: JobId) -> Self {
        Self {
            create: Mutex::new(Some(CreateOutcome::Accept(job_id))),
            listings: Mutex::new(VecDeque::new()),
            link: Mutex::new(Ok("https://cdn.example.com/file.zip".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn rejecting(reason: &str) -> Self {
        let api = Self::accepting(JobId::from(0));
        *api.create.lock().unwrap() = Some(CreateOutcome::Reject(reason.to_string()));
        api
    }

    pub(crate) fn then_list(self, jobs: Vec<Job>) -> Self {
        self.listings.lock().unwrap().push_back(Listing::Jobs(jobs));
        self
    }

    pub(crate) fn then_fail_listing(self, reason: &str) -> Self {
        self.listings
            .lock()
            .unwrap()
            .push_back(Listing::Fail(reason.to_string()));
        self
    }

    pub(crate) fn with_link(self, link: std::result::Result<&str, &str>) -> Self {
        *self.link.lock().unwrap() = link.map(str::to_string).map_err(str::to_string);
        self
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ApiCall::List))
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl WebDownloadApi for ScriptedApi {
    async fn create_job(
        &self,
        credential: &Credential,
        link: &str,
        display_name: Option<&str>,
    ) -> Result<JobId> {
        assert_eq!(credential.expose(), TEST_API_KEY);
        self.record(ApiCall::Create {
            link: link.to_string(),
            name: display_name.map(str::to_string),
        });

        match self.create.lock().unwrap().take() {
            Some(CreateOutcome::Accept(id)) => Ok(id),
            Some(CreateOutcome::Reject(reason)) => Err(Error::SubmissionRejected(reason)),
            None => panic!("create_job called more than once"),
        }
    }

    async fn list_jobs(&self, _credential: &Credential) -> Result<Vec<Job>> {
        self.record(ApiCall::List);

        let mut listings = self.listings.lock().unwrap();
        let listing = if listings.len() > 1 {
            listings.pop_front()
        } else {
            listings.front().map(|listing| match listing {
                Listing::Jobs(jobs) => Listing::Jobs(jobs.clone()),
                Listing::Fail(reason) => Listing::Fail(reason.clone()),
            })
        };

        match listing {
            Some(Listing::Jobs(jobs)) => Ok(jobs),
            Some(Listing::Fail(reason)) => Err(Error::StatusQueryFailed(reason)),
            None => Ok(Vec::new()),
        }
    }

    async fn request_download_link(
        &self,
        _credential: &Credential,
        job_id: &JobId,
        file_id: &FileId,
    ) -> Result<String> {
        self.record(ApiCall::RequestLink {
            job_id: job_id.clone(),
            file_id: file_id.clone(),
        });

        self.link
            .lock()
            .unwrap()
            .clone()
            .map_err(Error::LinkResolutionFailed)
    }
}

/// Sleeper that returns immediately and remembers every requested pause
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Sleeper that never wakes up on its own
pub(crate) struct StalledSleeper;

#[async_trait]
impl Sleeper for StalledSleeper {
    async fn sleep(&self, _duration: Duration) {
        std::future::pending::<()>().await;
    }
}

/// Sink that keeps every event it is given
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn notify(&self, event: &ProgressEvent) -> std::result::Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Sink that fails every delivery
#[derive(Default)]
pub(crate) struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ProgressSink for FailingSink {
    fn notify(&self, _event: &ProgressEvent) -> std::result::Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Closed)
    }
}

/// Sink that panics on every delivery
#[derive(Default)]
pub(crate) struct PanickingSink {
    attempts: AtomicUsize,
}

impl PanickingSink {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ProgressSink for PanickingSink {
    fn notify(&self, _event: &ProgressEvent) -> std::result::Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("progress receiver crashed");
    }
}

/// Poll settings used by most tests
pub(crate) fn poll_budget(max_attempts: u32) -> PollConfig {
    PollConfig {
        interval_ms: 3000,
        max_attempts,
    }
}

/// Downloader wired to `api`, a stored test key, and a recording sleeper
pub(crate) fn create_test_downloader(
    api: ScriptedApi,
    poll: PollConfig,
) -> (TorboxDownloader, Arc<ScriptedApi>, Arc<RecordingSleeper>) {
    let api = Arc::new(api);
    let sleeper = Arc::new(RecordingSleeper::default());
    let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::with_credential(
        Credential::new(TEST_API_KEY),
    ));

    let downloader = TorboxDownloader::with_parts(api.clone(), credentials, poll)
        .with_sleeper(sleeper.clone());

    (downloader, api, sleeper)
}
