//! Run orchestration: list, match, then process each target record through
//! fetch, transform and persist, folding outcomes into the report.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use assetsync_core::{Attachment, PipelineConfig, SourceRecord, TargetRecord};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::collaborators::{BlobSink, SourceCatalog, TargetStore};
use crate::error::{AssetError, PipelineError};
use crate::fetch::{FetchedAsset, Fetcher};
use crate::matcher::{match_records, MatchedPair};
use crate::persist::Persister;
use crate::report::{
    RecordOutcome, RecordReport, RecordResult, Reporter, RunReport, StageProgress,
};
use crate::transform::{AssetArtifact, Transformer};

/// The asset reconciliation pipeline, bound to its collaborators.
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn SourceCatalog>,
    store: Arc<dyn TargetStore>,
    fetcher: Fetcher,
    transformer: Transformer,
    persister: Persister,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns [`PipelineError::HttpClient`] if the fetch client cannot be built.
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn SourceCatalog>,
        store: Arc<dyn TargetStore>,
        sink: Arc<dyn BlobSink>,
    ) -> Result<Self, PipelineError> {
        let fetcher = Fetcher::new(&config)?;
        let transformer = Transformer::new(&config);
        let persister = Persister::new(&config, sink, Arc::clone(&store));
        Ok(Self {
            config,
            source,
            store,
            fetcher,
            transformer,
            persister,
        })
    }

    /// Runs one full reconciliation pass.
    ///
    /// Per-record failures never abort the run; they end up in the report.
    /// Cancelling `cancel` stops the run before the next record starts and
    /// still returns a report covering the records already processed.
    ///
    /// # Errors
    ///
    /// Only the two bulk listings are fatal: [`PipelineError::ListSources`]
    /// and [`PipelineError::ListTargets`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport, PipelineError> {
        let sources = self
            .source
            .list_records()
            .await
            .map_err(PipelineError::ListSources)?;
        let targets = self
            .store
            .list_records()
            .await
            .map_err(PipelineError::ListTargets)?;

        tracing::info!(
            sources = sources.len(),
            targets = targets.len(),
            dry_run = self.config.dry_run,
            max_concurrent = self.config.max_concurrent_records,
            "starting asset reconciliation run"
        );

        let pairs = match_records(&targets, &sources);
        let mut reporter = Reporter::new(self.config.dry_run, targets.len());
        let mut processed = 0usize;

        let results = stream::iter(pairs)
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|pair| self.process_record(pair, cancel))
            .buffered(self.config.max_concurrent_records.max(1));
        let mut results = pin!(results);

        while let Some(result) = results.next().await {
            processed += 1;
            reporter.record(result);
        }

        let cancelled = processed < targets.len();
        if cancelled {
            tracing::warn!(
                processed,
                total = targets.len(),
                "run cancelled before all records were processed"
            );
        }

        let report = reporter.finish(cancelled);
        tracing::info!(
            matched = report.counts.matched,
            fetched = report.counts.fetched,
            transformed = report.counts.transformed,
            persisted = report.counts.persisted,
            skipped = report.counts.skipped,
            failed = report.counts.failed,
            cancelled,
            "asset reconciliation run finished"
        );
        Ok(report)
    }

    async fn process_record(
        &self,
        pair: MatchedPair<'_>,
        cancel: &CancellationToken,
    ) -> RecordResult {
        let target = pair.target;
        let Some(source) = pair.source else {
            tracing::debug!(target_id = %target.id, name = %target.name, "no source record matched");
            return skipped(target, None, "no matching source record");
        };

        if source.attachments.is_empty() {
            tracing::debug!(
                target_id = %target.id,
                source_id = %source.external_id,
                "matched source has no attachments"
            );
            return skipped(target, Some(source), "matched source has no attachments");
        }

        let result = self.sync_record(target, source).await;
        self.throttle(cancel).await;
        result
    }

    /// Fetch all, transform all, then persist; the first failure ends the
    /// record with that stage's error.
    async fn sync_record(&self, target: &TargetRecord, source: &SourceRecord) -> RecordResult {
        let mut progress = StageProgress {
            matched: true,
            ..StageProgress::default()
        };

        let mut fetched = Vec::with_capacity(source.attachments.len());
        for attachment in &source.attachments {
            match self.fetcher.fetch(&attachment.url).await {
                Ok(asset) => fetched.push((attachment, asset)),
                Err(err) => return failed(target, source, progress, &err),
            }
        }
        progress.fetched = true;

        let mut artifacts = Vec::with_capacity(fetched.len());
        for (attachment, asset) in fetched {
            match self.transform(attachment, asset).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(err) => return failed(target, source, progress, &err),
            }
        }
        progress.transformed = true;

        let digests: Vec<String> = artifacts.iter().map(AssetArtifact::digest).collect();
        match self.persister.persist(target, artifacts).await {
            Ok(asset_urls) => {
                tracing::info!(
                    target_id = %target.id,
                    source_id = %source.external_id,
                    assets = asset_urls.len(),
                    "record synchronized"
                );
                RecordResult {
                    report: RecordReport {
                        target_id: target.id.clone(),
                        target_name: target.name.clone(),
                        source_id: Some(source.external_id.clone()),
                        outcome: RecordOutcome::Persisted { asset_urls },
                        asset_digests: digests,
                    },
                    progress,
                    error_message: None,
                }
            }
            Err(err) => failed(target, source, progress, &err),
        }
    }

    /// Decoding and encoding are CPU-bound, so they run off the async workers.
    async fn transform(
        &self,
        attachment: &Attachment,
        asset: FetchedAsset,
    ) -> Result<AssetArtifact, AssetError> {
        let transformer = self.transformer.clone();
        let filename = attachment.filename.clone();
        let content_type = effective_content_type(asset.content_type, attachment);

        tokio::task::spawn_blocking(move || {
            transformer.transform(asset.bytes, content_type.as_deref(), &filename)
        })
        .await
        .unwrap_or_else(|join_err| {
            Err(AssetError::Decode {
                filename: attachment.filename.clone(),
                message: format!("transform task failed: {join_err}"),
            })
        })
    }

    async fn throttle(&self, cancel: &CancellationToken) {
        if self.config.per_record_delay_ms == 0 {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(self.config.per_record_delay_ms)) => {}
            () = cancel.cancelled() => {}
        }
    }
}

/// Server-declared type wins unless it is missing or generic; then the
/// catalog's declared type is used.
fn effective_content_type(server: Option<String>, attachment: &Attachment) -> Option<String> {
    server
        .filter(|ct| ct != "application/octet-stream" && ct != "binary/octet-stream")
        .or_else(|| attachment.declared_mime_type.clone())
}

fn skipped(target: &TargetRecord, source: Option<&SourceRecord>, reason: &str) -> RecordResult {
    RecordResult {
        report: RecordReport {
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            source_id: source.map(|s| s.external_id.clone()),
            outcome: RecordOutcome::Skipped {
                reason: reason.to_string(),
            },
            asset_digests: vec![],
        },
        progress: StageProgress {
            matched: source.is_some(),
            ..StageProgress::default()
        },
        error_message: None,
    }
}

fn failed(
    target: &TargetRecord,
    source: &SourceRecord,
    progress: StageProgress,
    err: &AssetError,
) -> RecordResult {
    let stage = err.stage();
    tracing::warn!(
        target_id = %target.id,
        source_id = %source.external_id,
        stage = %stage,
        error = %err,
        "record failed; asset list left unchanged"
    );
    RecordResult {
        report: RecordReport {
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            source_id: Some(source.external_id.clone()),
            outcome: RecordOutcome::Failed { stage },
            asset_digests: vec![],
        },
        progress,
        error_message: Some(err.to_string()),
    }
}
