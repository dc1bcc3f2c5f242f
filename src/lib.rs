//! # torbox-webdl
//!
//! Turns an arbitrary file link into a direct download URL through the
//! Torbox web-download service.
//!
//! A workflow submits the link, polls the service until the job is cached,
//! then asks for a download link for the job's file. Progress is reported
//! to a [`ProgressSink`] as it happens; the workflow itself never waits on
//! the sink.
//!
//! ## Quick Start
//!
//! ```no_run
//! use torbox_webdl::{
//!     BroadcastSink, Config, Credential, CredentialStore, SubmissionRequest, TorboxDownloader,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = TorboxDownloader::new(Config::default())?;
//!     downloader.credentials().set(Credential::parse("my-api-key")?).await?;
//!
//!     let sink = BroadcastSink::default();
//!     let mut events = sink.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{}", event.message);
//!         }
//!     });
//!
//!     let request = SubmissionRequest::new("https://example.com/file.zip");
//!     let download = downloader
//!         .with_progress_sink(Arc::new(sink))
//!         .submit(request)
//!         .await?;
//!     println!("download from {}", download.url);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Runtime message protocol for browser UI surfaces
pub mod bridge;
/// Torbox HTTP API client
pub mod client;
/// Configuration types
pub mod config;
/// API key storage
pub mod credentials;
/// Submit/poll/resolve orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Progress observers
pub mod progress;
/// Remote status classification
pub mod status;
/// Core types
pub mod types;

// Re-export commonly used types
pub use bridge::{
    ApiKeyResponse, Bridge, BridgeMessage, BridgeRequest, BridgeResponse, MessageSink,
    SubmitResponse,
};
pub use client::{HttpClient, WebDownloadApi};
pub use config::{Config, PollConfig};
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use downloader::{Sleeper, TokioSleeper, TorboxDownloader};
pub use error::{Error, ErrorDetail, Result};
pub use progress::{BroadcastSink, NoopSink, ProgressSink, SinkError};
pub use status::{StatusClass, classify};
pub use types::{
    FileId, Job, JobFile, JobId, ProgressEvent, RemoteId, ResolvedDownload, SubmissionRequest,
    WorkflowState,
};

/// Run one workflow, abandoning it when the process receives a termination
/// signal.
///
/// - **Unix:** SIGTERM and SIGINT end the run.
/// - **Windows/other:** Ctrl+C ends the run.
///
/// An interrupted run returns [`Error::Cancelled`].
///
/// # Example
///
/// ```no_run
/// use torbox_webdl::{Config, NoopSink, SubmissionRequest, TorboxDownloader, submit_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = TorboxDownloader::new(Config::default())?;
///     let request = SubmissionRequest::new("https://example.com/file.zip");
///     let download = submit_with_shutdown(&downloader, request, &NoopSink).await?;
///     println!("{}", download.url);
///     Ok(())
/// }
/// ```
pub async fn submit_with_shutdown(
    downloader: &TorboxDownloader,
    request: SubmissionRequest,
    sink: &dyn ProgressSink,
) -> Result<ResolvedDownload> {
    submit_until(downloader, request, sink, wait_for_signal()).await
}

// Run until done or until `shutdown` resolves, then let the run observe the cancellation
async fn submit_until(
    downloader: &TorboxDownloader,
    request: SubmissionRequest,
    sink: &dyn ProgressSink,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<ResolvedDownload> {
    let cancel = tokio_util::sync::CancellationToken::new();
    let run = downloader.run(request, sink, &cancel);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = shutdown => {
            cancel.cancel();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, cancelling web download"),
                _ = sigint.recv() => tracing::info!("Received SIGINT, cancelling web download"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, cancelling web download");
            } else {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, cancelling web download"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
