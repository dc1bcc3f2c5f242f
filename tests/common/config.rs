//! Live test configuration loaded from .env

use std::sync::Arc;
use torbox_webdl::{
    Config, Credential, HttpClient, MemoryCredentialStore, PollConfig, TorboxDownloader,
};

/// Link submitted when `TORBOX_TEST_LINK` is not set (a small public file)
pub const DEFAULT_TEST_LINK: &str = "https://speed.hetzner.de/100MB.bin";

/// Whether `TORBOX_API_KEY` is available
pub fn has_live_credentials() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("TORBOX_API_KEY")
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false)
}

/// Link to submit in live tests
///
/// Optional environment variable `TORBOX_TEST_LINK` overrides
/// [`DEFAULT_TEST_LINK`].
pub fn live_test_link() -> String {
    dotenvy::dotenv().ok();
    std::env::var("TORBOX_TEST_LINK").unwrap_or_else(|_| DEFAULT_TEST_LINK.to_string())
}

/// Downloader against the real service using `TORBOX_API_KEY`
pub fn create_live_downloader() -> Result<TorboxDownloader, String> {
    dotenvy::dotenv().ok();
    let key = std::env::var("TORBOX_API_KEY").map_err(|_| "TORBOX_API_KEY not set".to_string())?;
    let credential = Credential::parse(&key).map_err(|e| e.to_string())?;

    downloader_with_credential(credential)
}

/// Downloader against the real service with a key the service will refuse
pub fn create_downloader_bad_auth() -> Result<TorboxDownloader, String> {
    downloader_with_credential(Credential::new("definitely-not-a-valid-key"))
}

fn downloader_with_credential(credential: Credential) -> Result<TorboxDownloader, String> {
    let config = Config {
        poll: PollConfig {
            interval_ms: 3000,
            max_attempts: 100,
        },
        ..Default::default()
    };
    let client = HttpClient::new(&config).map_err(|e| e.to_string())?;

    Ok(TorboxDownloader::with_parts(
        Arc::new(client),
        Arc::new(MemoryCredentialStore::with_credential(credential)),
        config.poll,
    ))
}
