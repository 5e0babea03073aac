use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Tuning knobs for one reconciliation run.
///
/// Every field has a default (see [`PipelineConfig::default`]) so tests and
/// callers only override what they care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Longest allowed image edge in pixels; larger images are downscaled.
    pub max_edge_length: u32,
    /// JPEG quality (1-100) for the first encoding pass.
    pub jpeg_quality: u8,
    /// Hard upper bound on artifact size.
    pub max_file_size_bytes: u64,
    /// Edge bound for the single retry pass when the first pass is over budget.
    pub fallback_max_edge_length: u32,
    pub fallback_jpeg_quality: u8,
    /// When set, persistence only logs the intended change.
    pub dry_run: bool,
    /// Pause inserted after each record completes.
    pub per_record_delay_ms: u64,
    /// Records processed at once. `1` keeps the run strictly sequential.
    pub max_concurrent_records: usize,
    pub fetch_timeout_secs: u64,
    /// Additional attempts after the first failure for transient fetch/upload errors.
    pub fetch_max_retries: u32,
    /// Base delay for exponential backoff: `retry_backoff_base_ms * 2^attempt`.
    pub retry_backoff_base_ms: u64,
    pub user_agent: String,
    /// Prepended verbatim to every generated blob key (e.g. `"products/"`).
    pub key_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_edge_length: 1200,
            jpeg_quality: 85,
            max_file_size_bytes: 5 * 1024 * 1024,
            fallback_max_edge_length: 800,
            fallback_jpeg_quality: 70,
            dry_run: false,
            per_record_delay_ms: 300,
            max_concurrent_records: 1,
            fetch_timeout_secs: 15,
            fetch_max_retries: 2,
            retry_backoff_base_ms: 500,
            user_agent: "assetsync/0.1 (catalog-asset-sync)".to_string(),
            key_prefix: String::new(),
        }
    }
}

/// Where artifacts are written.
#[derive(Clone, PartialEq, Eq)]
pub enum SinkConfig {
    /// Local directory served under `public_base_url`.
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    /// Supabase Storage bucket.
    Supabase {
        url: String,
        service_key: String,
        bucket: String,
    },
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkConfig::Local {
                root,
                public_base_url,
            } => f
                .debug_struct("Local")
                .field("root", root)
                .field("public_base_url", public_base_url)
                .finish(),
            SinkConfig::Supabase { url, bucket, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("service_key", &"[redacted]")
                .field("bucket", bucket)
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub sink: SinkConfig,
    pub pipeline: PipelineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("sink", &self.sink)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
