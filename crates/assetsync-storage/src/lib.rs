//! Blob sink adapters: a local directory and a Supabase Storage bucket.

mod local;
mod supabase;

use std::sync::Arc;

use assetsync_core::SinkConfig;
use assetsync_pipeline::BlobSink;

pub use local::LocalDiskSink;
pub use supabase::SupabaseStorageSink;

/// Builds the sink selected by `config`.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the Supabase HTTP client cannot be built.
pub fn build_sink(
    config: &SinkConfig,
    timeout_secs: u64,
    user_agent: &str,
) -> Result<Arc<dyn BlobSink>, reqwest::Error> {
    let sink: Arc<dyn BlobSink> = match config {
        SinkConfig::Local {
            root,
            public_base_url,
        } => Arc::new(LocalDiskSink::new(root.clone(), public_base_url)),
        SinkConfig::Supabase {
            url,
            service_key,
            bucket,
        } => Arc::new(SupabaseStorageSink::new(
            url,
            service_key,
            bucket,
            timeout_secs,
            user_agent,
        )?),
    };
    Ok(sink)
}
