//! Writes artifacts to the blob sink and swaps a record's asset list.
//!
//! A record's list is replaced only after every artifact uploaded; any
//! failure leaves the stored list untouched. Blobs uploaded before the
//! failure stay in the sink and are named in the error.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use assetsync_core::{PipelineConfig, TargetRecord};
use chrono::Utc;

use crate::collaborators::{BlobSink, TargetStore};
use crate::error::AssetError;
use crate::retry::retry_with_backoff;
use crate::transform::AssetArtifact;

/// Produces blob keys of the form `{prefix}{slug}-{ordinal}-{millis}.{ext}`.
///
/// The millisecond component is strictly increasing per generator, so two
/// keys from one process never collide even within the same millisecond.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last: AtomicI64,
}

impl KeyGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next disambiguator: current UTC milliseconds, bumped past the last
    /// value handed out.
    pub fn next_disambiguator(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }

    /// Key for attachment `ordinal` (1-based) of `target`.
    pub fn key(&self, prefix: &str, target: &TargetRecord, ordinal: usize, extension: &str) -> String {
        format!(
            "{prefix}{slug}-{ordinal}-{stamp}.{extension}",
            slug = target.slug(),
            stamp = self.next_disambiguator(),
        )
    }
}

pub(crate) struct Persister {
    sink: Arc<dyn BlobSink>,
    store: Arc<dyn TargetStore>,
    keys: KeyGenerator,
    key_prefix: String,
    dry_run: bool,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl Persister {
    pub(crate) fn new(
        config: &PipelineConfig,
        sink: Arc<dyn BlobSink>,
        store: Arc<dyn TargetStore>,
    ) -> Self {
        Self {
            sink,
            store,
            keys: KeyGenerator::new(),
            key_prefix: config.key_prefix.clone(),
            dry_run: config.dry_run,
            max_retries: config.fetch_max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }

    /// Uploads every artifact in order, then replaces the target's asset
    /// list in one write. Returns the new URL list.
    ///
    /// In dry-run mode nothing is uploaded or written; the URLs that would
    /// have been stored are computed and returned.
    pub(crate) async fn persist(
        &self,
        target: &TargetRecord,
        artifacts: Vec<AssetArtifact>,
    ) -> Result<Vec<String>, AssetError> {
        let mut urls = Vec::with_capacity(artifacts.len());
        let mut uploaded: Vec<String> = Vec::new();

        for (idx, artifact) in artifacts.into_iter().enumerate() {
            let key = self
                .keys
                .key(&self.key_prefix, target, idx + 1, &artifact.extension);

            if self.dry_run {
                tracing::info!(
                    target_id = %target.id,
                    key = %key,
                    bytes = artifact.len(),
                    content_type = %artifact.content_type,
                    "dry-run: would upload artifact"
                );
                urls.push(self.sink.public_url(&key));
                continue;
            }

            let result = retry_with_backoff(
                self.max_retries,
                self.backoff_base_ms,
                crate::error::CollaboratorError::is_transient,
                || {
                    self.sink
                        .upload(&key, artifact.bytes.clone(), &artifact.content_type)
                },
            )
            .await;

            match result {
                Ok(url) => {
                    tracing::debug!(target_id = %target.id, key = %key, url = %url, "uploaded artifact");
                    uploaded.push(key);
                    urls.push(url);
                }
                Err(source) => {
                    log_orphans(&target.id, &uploaded);
                    return Err(AssetError::Upload { key, source });
                }
            }
        }

        if self.dry_run {
            tracing::info!(
                target_id = %target.id,
                old = ?target.asset_urls,
                new = ?urls,
                "dry-run: would replace asset list"
            );
            return Ok(urls);
        }

        if let Err(source) = self.store.update_asset_list(&target.id, &urls).await {
            log_orphans(&target.id, &uploaded);
            return Err(AssetError::DbUpdate {
                target_id: target.id.clone(),
                source,
            });
        }

        Ok(urls)
    }
}

fn log_orphans(target_id: &str, keys: &[String]) {
    if !keys.is_empty() {
        tracing::warn!(
            target_id,
            orphaned = ?keys,
            "asset list left unchanged; uploaded blobs retained for inspection"
        );
    }
}
