//! # HTTP retrieval (CLI <-> Core)
//!
//! Implements the core [`Fetcher`] capability over HTTP with `reqwest`. A source
//! identifier is resolved as a path segment below the configured base URL, so
//! the `users` source of `https://jsonplaceholder.typicode.com` is fetched from
//! `https://jsonplaceholder.typicode.com/users`.
//!
//! Every transport failure is mapped onto a [`FetchError`] variant; nothing in
//! here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use userfeed_core::contract::Fetcher;
use userfeed_core::error::FetchError;

pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string(); // avoid "//"
        tracing::info!(
            base_url = %base_url,
            request_timeout_ms = request_timeout.as_millis() as u64,
            "Initialised HTTP fetcher"
        );
        Ok(Self { client, base_url })
    }

    pub fn url_for(&self, source_id: &str) -> String {
        format!("{}/{}", self.base_url, source_id.trim_start_matches('/'))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source_id: &str, deadline: Duration) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(source_id);
        tracing::debug!(url = %url, "Fetching source");

        let response = self
            .client
            .get(&url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(deadline)
                } else {
                    tracing::debug!(error = ?e, url = %url, "Request failed");
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = %status, url = %url, "Non-success status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(deadline)
            } else {
                FetchError::Read(e.to_string())
            }
        })?;
        Ok(body.to_vec())
    }
}
