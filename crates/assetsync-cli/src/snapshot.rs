//! Source catalog read from a JSON export file.

use std::path::{Path, PathBuf};

use assetsync_core::SourceRecord;
use assetsync_pipeline::{CollaboratorError, SourceCatalog};
use async_trait::async_trait;

/// A catalog export: a JSON array of records with their attachments.
pub(crate) struct SnapshotCatalog {
    path: PathBuf,
    limit: Option<usize>,
}

impl SnapshotCatalog {
    pub(crate) fn new(path: PathBuf, limit: Option<usize>) -> Self {
        Self { path, limit }
    }
}

#[async_trait]
impl SourceCatalog for SnapshotCatalog {
    async fn list_records(&self) -> Result<Vec<SourceRecord>, CollaboratorError> {
        let mut records = load_snapshot(&self.path).await?;
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        tracing::info!(
            path = %self.path.display(),
            records = records.len(),
            "loaded catalog snapshot"
        );
        Ok(records)
    }
}

pub(crate) async fn load_snapshot(path: &Path) -> Result<Vec<SourceRecord>, CollaboratorError> {
    let raw = tokio::fs::read(path).await?;
    serde_json::from_slice(&raw).map_err(|e| {
        CollaboratorError::Backend(format!("invalid snapshot {}: {e}", path.display()))
    })
}
