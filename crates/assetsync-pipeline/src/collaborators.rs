//! Interfaces the pipeline consumes. Implementations live in adapter crates
//! (local disk and Supabase sinks, the Postgres store) or in tests.

use assetsync_core::{SourceRecord, TargetRecord};
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CollaboratorError;

/// External system of record for product attachments.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Every record in the catalog, fully materialized. Pagination is the
    /// adapter's concern.
    async fn list_records(&self) -> Result<Vec<SourceRecord>, CollaboratorError>;
}

/// The application's product database.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn list_records(&self) -> Result<Vec<TargetRecord>, CollaboratorError>;

    /// Replace the record's asset list with `urls` in a single write.
    async fn update_asset_list(&self, id: &str, urls: &[String]) -> Result<(), CollaboratorError>;
}

/// Name-addressable binary storage.
#[async_trait]
pub trait BlobSink: Send + Sync {
    /// Store `bytes` under `key`, overwriting any existing object, and return
    /// its public URL. Repeating the call with the same key and bytes must be
    /// harmless.
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, CollaboratorError>;

    /// Public URL for `key`. Pure: no network access.
    fn public_url(&self, key: &str) -> String;
}
