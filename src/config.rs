//! Configuration types for torbox-webdl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Status polling configuration
///
/// The defaults give the remote service roughly ten minutes (200 checks,
/// three seconds apart) to finish caching a download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status checks, in milliseconds (default: 3000)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Maximum number of status checks before giving up (default: 200)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl PollConfig {
    /// Delay between status checks
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Main configuration for TorboxDownloader
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Torbox API (default: "https://api.torbox.app/v1/api")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout applied to every HTTP request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Status polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Where [`FileCredentialStore`](crate::credentials::FileCredentialStore)
    /// keeps the API key (None = keep it in memory only)
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout: default_request_timeout(),
            poll: PollConfig::default(),
            credentials_path: None,
        }
    }
}

impl Config {
    /// Check settings that would otherwise only fail at request time
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = url::Url::parse(&self.api_base) {
            return Err(Error::Config {
                message: format!("invalid API base URL '{}': {}", self.api_base, e),
                key: Some("api_base".to_string()),
            });
        }

        if self.poll.max_attempts == 0 {
            return Err(Error::Config {
                message: "at least one status check is required".to_string(),
                key: Some("poll.max_attempts".to_string()),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("request_timeout".to_string()),
            });
        }

        Ok(())
    }
}

fn default_api_base() -> String {
    "https://api.torbox.app/v1/api".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    200
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
