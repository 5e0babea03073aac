//! `sync` subcommand: wire collaborators from config and run the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use assetsync_core::AppConfig;
use assetsync_db::PgTargetStore;
use assetsync_pipeline::{CancellationToken, Pipeline, RecordOutcome, RunReport};

use crate::snapshot::SnapshotCatalog;

#[derive(Debug)]
pub(crate) struct SyncArgs {
    pub source: PathBuf,
    pub dry_run: bool,
    pub report: Option<PathBuf>,
    pub limit: Option<usize>,
}

pub(crate) async fn run_sync(
    config: &AppConfig,
    pool: sqlx::PgPool,
    args: SyncArgs,
) -> anyhow::Result<()> {
    let mut pipeline_config = config.pipeline.clone();
    pipeline_config.dry_run |= args.dry_run;

    let sink = assetsync_storage::build_sink(
        &config.sink,
        pipeline_config.fetch_timeout_secs,
        &pipeline_config.user_agent,
    )?;
    let store = Arc::new(PgTargetStore::new(pool));
    let catalog = Arc::new(SnapshotCatalog::new(args.source, args.limit));

    tracing::info!(
        env = %config.env,
        sink = ?config.sink,
        dry_run = pipeline_config.dry_run,
        "starting sync"
    );

    let pipeline = Pipeline::new(pipeline_config, catalog, store, sink)?;

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
    let result = pipeline.run(&cancel).await;
    watcher.abort();
    let report = result?;

    print_summary(&report);
    if let Some(path) = args.report.as_deref() {
        write_report(path, &report).await?;
        println!("report written to {}", path.display());
    }
    Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::warn!("received ctrl-c, finishing in-flight records");
        cancel.cancel();
    }
}

pub(crate) async fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write report to {}", path.display()))
}

fn print_summary(report: &RunReport) {
    let c = &report.counts;
    let mode = if report.dry_run { "dry run" } else { "live run" };
    println!(
        "{mode}: {} targets, {} matched, {} fetched, {} transformed, {} persisted, {} skipped, {} failed",
        report.total_targets, c.matched, c.fetched, c.transformed, c.persisted, c.skipped, c.failed
    );
    if report.cancelled {
        println!(
            "cancelled after {} of {} records",
            report.records.len(),
            report.total_targets
        );
    }
    for err in &report.errors {
        println!("  failed {} at {}: {}", err.target_id, err.stage, err.message);
    }
    if report.dry_run {
        for record in &report.records {
            if let RecordOutcome::Persisted { asset_urls } = &record.outcome {
                println!("  would set {} -> {asset_urls:?}", record.target_id);
            }
        }
    }
}
