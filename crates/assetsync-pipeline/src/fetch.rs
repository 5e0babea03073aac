//! HTTP retrieval of attachment bytes.

use std::time::Duration;

use assetsync_core::PipelineConfig;
use bytes::Bytes;
use reqwest::{redirect, Client, StatusCode};

use crate::error::AssetError;
use crate::retry::retry_with_backoff;

const MAX_REDIRECTS: usize = 10;

/// Bytes retrieved for one attachment, held in memory until transformed.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    /// Final URL after redirects.
    pub url: String,
    pub bytes: Bytes,
    /// `Content-Type` declared by the server, if any.
    pub content_type: Option<String>,
}

/// GETs attachment URLs, following redirects, with a per-request timeout and
/// retry on transient failures (transport errors, timeouts, 429, 5xx).
pub struct Fetcher {
    client: Client,
    timeout_secs: u64,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the underlying client cannot be built.
    pub fn new(config: &PipelineConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .connect_timeout(Duration::from_secs(config.fetch_timeout_secs.min(10)))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            timeout_secs: config.fetch_timeout_secs,
            max_retries: config.fetch_max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        })
    }

    /// Fetches `url`, returning the body and declared content type.
    ///
    /// # Errors
    ///
    /// - [`AssetError::Fetch`] for any terminal status other than 200.
    /// - [`AssetError::Timeout`] when no response arrives within the timeout.
    /// - [`AssetError::Transport`] for connection, DNS, TLS or redirect-loop failures.
    pub async fn fetch(&self, url: &str) -> Result<FetchedAsset, AssetError> {
        retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            AssetError::is_retriable_fetch,
            || self.fetch_once(url),
        )
        .await
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedAsset, AssetError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, &e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AssetError::Fetch {
                status: status.as_u16(),
                url: url.to_string(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify(url, &e))?;

        tracing::debug!(
            url,
            final_url = %final_url,
            bytes = bytes.len(),
            content_type = content_type.as_deref().unwrap_or("-"),
            "fetched attachment"
        );

        Ok(FetchedAsset {
            url: final_url,
            bytes,
            content_type,
        })
    }

    fn classify(&self, url: &str, err: &reqwest::Error) -> AssetError {
        if err.is_timeout() {
            AssetError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            AssetError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}
