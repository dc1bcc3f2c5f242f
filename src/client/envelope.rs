//! Torbox response envelope
//!
//! Every endpoint answers with a JSON object whose `data` field holds the
//! payload (an object or an array). Error responses carry their reason in
//! `detail` or `error`.

use crate::types::{Job, JobId, RemoteId};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub detail: Value,
    #[serde(default)]
    pub error: Value,
    #[serde(default)]
    pub url: Value,
    #[serde(default)]
    pub download_url: Value,
}

impl Envelope {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Reason text of an error response
    pub fn failure_reason(&self) -> Option<String> {
        text(&self.detail).or_else(|| text(&self.error))
    }

    /// Job reference of a create response
    pub fn job_id(&self) -> Option<JobId> {
        ["webdownload_id", "id"]
            .into_iter()
            .find_map(|field| self.data.get(field).and_then(RemoteId::from_json))
            .map(JobId)
    }

    /// Entries of a list response; anything but an array is an empty listing
    pub fn into_jobs(self) -> Vec<Job> {
        let Value::Array(entries) = self.data else {
            return Vec::new();
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Job>(entry) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable web download entry");
                    None
                }
            })
            .collect()
    }

    /// URL of a request-link response
    pub fn download_url(&self) -> Option<String> {
        text(&self.data)
            .or_else(|| text(&self.url))
            .or_else(|| text(&self.download_url))
    }
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
