//! Shared HTTP plumbing for the archive and document endpoints

use std::time::Duration;

use crate::error::{IngestError, IngestResult};

const USER_AGENT: &str = concat!("fdi-ingest/", env!("CARGO_PKG_VERSION"));

/// Build a client whose requests are bounded by `timeout`
pub fn build_client(timeout: Duration) -> IngestResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| {
            IngestError::Common(fdi_common::Error::Config(format!(
                "Failed to build HTTP client: {}",
                e
            )))
        })
}

/// GET `url` and return the body of a 2xx response
///
/// Any transport failure, timeout, or non-2xx status becomes
/// `IngestError::Transport`.
pub async fn get_bytes(client: &reqwest::Client, url: &str) -> IngestResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::transport(url, format!("HTTP status {}", status)));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| IngestError::transport(url, e))?;

    Ok(body.to_vec())
}
