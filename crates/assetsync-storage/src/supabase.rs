//! Supabase Storage sink.

use std::time::Duration;

use assetsync_pipeline::{BlobSink, CollaboratorError};
use async_trait::async_trait;
use bytes::Bytes;

const SERVICE: &str = "supabase-storage";

/// Uploads objects into one Supabase Storage bucket with upsert semantics.
pub struct SupabaseStorageSink {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorageSink {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        service_key: &str,
        bucket: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{key}",
            self.base_url, self.bucket
        )
    }
}

#[async_trait]
impl BlobSink for SupabaseStorageSink {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, CollaboratorError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Rejected {
                service: SERVICE,
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(bucket = %self.bucket, key, bytes = size, "uploaded blob to supabase");
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.base_url, self.bucket
        )
    }
}
