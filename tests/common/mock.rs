//! A wiremock stand-in for the Torbox web-download API

use serde_json::{Value, json};
use std::sync::Arc;
use torbox_webdl::{
    Config, Credential, CredentialStore, MemoryCredentialStore, PollConfig, TorboxDownloader,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key the mock expects in the Authorization header and `token` parameter
pub const MOCK_API_KEY: &str = "integration-key";

/// Mock Torbox server
pub struct TorboxMock {
    pub server: MockServer,
}

impl TorboxMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// API base to put in [`Config::api_base`]
    pub fn api_base(&self) -> String {
        format!("{}/v1/api", self.server.uri())
    }

    /// Config pointing at this server that never waits between checks
    pub fn config(&self, max_attempts: u32) -> Config {
        Config {
            api_base: self.api_base(),
            request_timeout: std::time::Duration::from_secs(5),
            poll: PollConfig {
                interval_ms: 0,
                max_attempts,
            },
            credentials_path: None,
        }
    }

    /// Downloader wired to this server with [`MOCK_API_KEY`] in memory
    pub fn downloader(&self, max_attempts: u32) -> TorboxDownloader {
        let config = self.config(max_attempts);
        let client = torbox_webdl::HttpClient::new(&config).expect("mock config is valid");
        TorboxDownloader::with_parts(
            Arc::new(client),
            Arc::new(MemoryCredentialStore::with_credential(Credential::new(
                MOCK_API_KEY,
            ))),
            config.poll,
        )
    }

    /// Accept every submission with `job_id`
    pub async fn accept_submissions(&self, job_id: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/api/webdl/createwebdownload"))
            .and(header("authorization", format!("Bearer {MOCK_API_KEY}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"webdownload_id": job_id, "hash": "abc", "auth_id": "u1"}
            })))
            .mount(&self.server)
            .await;
    }

    /// Reject every submission with `status` and `detail`
    pub async fn reject_submissions(&self, status: u16, detail: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/api/webdl/createwebdownload"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "success": false,
                "error": "BAD_TOKEN",
                "detail": detail
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve each listing once, in order; the last one keeps being served
    pub async fn serve_listings(&self, listings: Vec<Value>) {
        let last = listings.len().saturating_sub(1);
        for (index, jobs) in listings.into_iter().enumerate() {
            let mock = Mock::given(method("GET"))
                .and(path("/v1/api/webdl/mylist"))
                .and(query_param("bypass_cache", "true"))
                .and(header("authorization", format!("Bearer {MOCK_API_KEY}").as_str()))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": jobs})),
                );
            let mock = if index == last {
                mock
            } else {
                mock.up_to_n_times(1)
            };
            mock.mount(&self.server).await;
        }
    }

    /// Answer link requests for `job_id`/`file_id` with `url`
    pub async fn serve_link(&self, job_id: u64, file_id: u64, url: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/api/webdl/requestdl"))
            .and(query_param("token", MOCK_API_KEY))
            .and(query_param("web_id", job_id.to_string().as_str()))
            .and(query_param("file_id", file_id.to_string().as_str()))
            .and(query_param("zip_link", "false"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": url})),
            )
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `endpoint` (e.g. `"webdl/mylist"`)
    pub async fn requests_to(&self, endpoint: &str) -> usize {
        let full = format!("/v1/api/{endpoint}");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == full)
            .count()
    }
}

/// One entry of a `webdl/mylist` listing
pub fn listed_job(id: u64, state: &str, progress: f64) -> Value {
    json!({
        "id": id,
        "name": "file.zip",
        "download_state": state,
        "progress": progress,
        "files": [{"id": 11, "name": "file.zip"}]
    })
}

/// Store `key` in a fresh downloader's credential store
pub async fn store_key(downloader: &TorboxDownloader, key: &str) {
    downloader
        .credentials()
        .set(Credential::new(key))
        .await
        .expect("memory store accepts keys");
}

/// Asserts a store holds nothing
pub async fn assert_no_key(store: &dyn CredentialStore) {
    assert!(store.get().await.expect("store readable").is_none());
}
