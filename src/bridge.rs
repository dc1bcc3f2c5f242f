//! Runtime message bridge
//!
//! Answers the two messages a browser UI surface sends to the background
//! worker:
//!
//! - `{"action":"submitToTorbox","link":"...","name":"..."}` runs a full
//!   workflow and answers `{"success":true,"data":{"url":..,"jobId":..,"fileId":..}}`
//!   or `{"success":false,"error":"..","code":".."}`
//! - `{"action":"getApiKey"}` answers `{"apiKey":".."}` or `{"apiKey":null}`
//!
//! While a submission runs, [`MessageSink`] pushes
//! `{"action":"progressUpdate","status":"..","message":".."}` to the UI.
//!
//! Every failure is turned into a response; the bridge never returns an
//! error to the message channel.

use crate::credentials::{Credential, CredentialStore};
use crate::downloader::TorboxDownloader;
use crate::error::{ErrorDetail, Result};
use crate::progress::{ProgressSink, SinkError};
use crate::types::{ProgressEvent, ResolvedDownload, SubmissionRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Error code for a message that could not be decoded
pub const INVALID_REQUEST: &str = "invalid_request";

/// Incoming runtime message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum BridgeRequest {
    /// Send a link to Torbox and wait for its download URL
    #[serde(rename = "submitToTorbox")]
    SubmitToTorbox {
        /// Link to download
        link: String,
        /// Optional display name (the page's link text)
        #[serde(default)]
        name: Option<String>,
    },
    /// Read the stored API key
    #[serde(rename = "getApiKey")]
    GetApiKey,
}

/// Answer to a `submitToTorbox` message (or to an undecodable one)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Whether a download URL was produced
    pub success: bool,
    /// The resolved download, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResolvedDownload>,
    /// What went wrong, on failure
    #[serde(flatten)]
    pub failure: Option<ErrorDetail>,
}

impl SubmitResponse {
    /// Successful answer carrying `download`
    pub fn ok(download: ResolvedDownload) -> Self {
        Self {
            success: true,
            data: Some(download),
            failure: None,
        }
    }

    /// Failed answer carrying `detail`
    pub fn failed(detail: ErrorDetail) -> Self {
        Self {
            success: false,
            data: None,
            failure: Some(detail),
        }
    }
}

/// Answer to a `getApiKey` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    /// Stored key, `null` when none is stored or it could not be read
    pub api_key: Option<String>,
    /// Why the key could not be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outgoing runtime message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeResponse {
    /// Answer to `submitToTorbox`
    Submit(SubmitResponse),
    /// Answer to `getApiKey`
    ApiKey(ApiKeyResponse),
}

impl BridgeResponse {
    /// Encode for the message channel
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Notification pushed to UI surfaces, tagged by `action`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum BridgeMessage {
    /// A progress event of a running submission
    #[serde(rename = "progressUpdate")]
    ProgressUpdate {
        /// Status token (e.g. "queued", "downloading")
        status: String,
        /// Human-readable message
        message: String,
    },
}

impl BridgeMessage {
    /// Encode for the message channel
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<&ProgressEvent> for BridgeMessage {
    fn from(event: &ProgressEvent) -> Self {
        BridgeMessage::ProgressUpdate {
            status: event.status.clone(),
            message: event.message.clone(),
        }
    }
}

/// Progress sink that forwards events as `progressUpdate` messages
///
/// A dropped receiver (the page went away) reports [`SinkError::Closed`],
/// which the downloader ignores.
#[derive(Debug, Clone)]
pub struct MessageSink {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl MessageSink {
    /// Forward messages into `tx`
    pub fn new(tx: mpsc::UnboundedSender<BridgeMessage>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver of its messages
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BridgeMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for MessageSink {
    fn notify(&self, event: &ProgressEvent) -> std::result::Result<(), SinkError> {
        self.tx
            .send(BridgeMessage::from(event))
            .map_err(|_| SinkError::Closed)
    }
}

/// Message handler in front of a [`TorboxDownloader`]
#[derive(Clone)]
pub struct Bridge {
    downloader: TorboxDownloader,
    credentials: Arc<dyn CredentialStore>,
}

impl Bridge {
    /// Serve messages with `downloader`, sharing its credential store
    pub fn new(downloader: TorboxDownloader) -> Self {
        let credentials = downloader.credentials().clone();
        Self {
            downloader,
            credentials,
        }
    }

    /// Answer one decoded message
    pub async fn handle(&self, request: BridgeRequest, sink: &dyn ProgressSink) -> BridgeResponse {
        self.handle_with_cancel(request, sink, &CancellationToken::new())
            .await
    }

    /// Answer one decoded message, abandoning a running submission when
    /// `cancel` fires
    pub async fn handle_with_cancel(
        &self,
        request: BridgeRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> BridgeResponse {
        match request {
            BridgeRequest::SubmitToTorbox { link, name } => {
                let mut submission = SubmissionRequest::new(link);
                if let Some(name) = name {
                    submission = submission.with_display_name(name);
                }

                let response = match self.downloader.run(submission, sink, cancel).await {
                    Ok(download) => SubmitResponse::ok(download),
                    Err(e) => SubmitResponse::failed(ErrorDetail::from(&e)),
                };
                BridgeResponse::Submit(response)
            }
            BridgeRequest::GetApiKey => BridgeResponse::ApiKey(self.api_key().await),
        }
    }

    /// Decode a raw JSON message and answer it
    ///
    /// A message that is not valid JSON or names an unknown action is
    /// answered with a failed [`SubmitResponse`] coded
    /// [`INVALID_REQUEST`].
    pub async fn handle_json(&self, message: &str, sink: &dyn ProgressSink) -> BridgeResponse {
        match serde_json::from_str::<BridgeRequest>(message) {
            Ok(request) => self.handle(request, sink).await,
            Err(e) => {
                tracing::debug!(error = %e, "undecodable bridge message");
                BridgeResponse::Submit(SubmitResponse::failed(ErrorDetail::new(
                    INVALID_REQUEST,
                    format!("invalid request: {e}"),
                )))
            }
        }
    }

    /// Store an API key entered by the user
    ///
    /// Surrounding whitespace is removed; an empty key is rejected and the
    /// stored key is left untouched.
    pub async fn save_api_key(&self, input: &str) -> Result<()> {
        let credential = Credential::parse(input)?;
        self.credentials.set(credential).await?;
        tracing::info!("API key saved");
        Ok(())
    }

    async fn api_key(&self) -> ApiKeyResponse {
        match self.credentials.get().await {
            Ok(credential) => ApiKeyResponse {
                api_key: credential.map(|c| c.expose().to_string()),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored API key");
                ApiKeyResponse {
                    api_key: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
