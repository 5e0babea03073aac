use thiserror::Error;

use crate::report::Stage;

/// Failure reported by a collaborator (source catalog, target store, blob sink).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{service} rejected the request with status {status}: {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl CollaboratorError {
    /// Transient failures worth retrying with the same request: network
    /// errors, timeouts, 429 and 5xx rejections.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            CollaboratorError::Rejected { status, .. } => *status == 429 || *status >= 500,
            CollaboratorError::Io(_)
            | CollaboratorError::NotFound(_)
            | CollaboratorError::Backend(_) => false,
        }
    }
}

/// Per-record failure. Always caught at the stage boundary and turned into a
/// report entry; never aborts the run.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP {status} fetching {url}: {message}")]
    Fetch {
        status: u16,
        url: String,
        message: String,
    },

    #[error("transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("no response from {url} within {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("could not decode image {filename}: {message}")]
    Decode { filename: String, message: String },

    #[error("artifact for {filename} is {size} bytes after re-encoding, over the {budget}-byte budget")]
    EncodingBudgetExceeded {
        filename: String,
        size: u64,
        budget: u64,
    },

    #[error("upload of {key} failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("asset list update for {target_id} failed: {source}")]
    DbUpdate {
        target_id: String,
        #[source]
        source: CollaboratorError,
    },
}

impl AssetError {
    /// Stage this error is attributed to in the run report.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            AssetError::Fetch { .. } | AssetError::Transport { .. } | AssetError::Timeout { .. } => {
                Stage::Fetch
            }
            AssetError::Decode { .. } | AssetError::EncodingBudgetExceeded { .. } => {
                Stage::Transform
            }
            AssetError::Upload { .. } | AssetError::DbUpdate { .. } => Stage::Persist,
        }
    }

    /// Whether a fetch attempt that produced this error should be retried.
    pub(crate) fn is_retriable_fetch(&self) -> bool {
        match self {
            AssetError::Transport { .. } | AssetError::Timeout { .. } => true,
            AssetError::Fetch { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Run-level failure. Only the two bulk listings are fatal.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to list source catalog records: {0}")]
    ListSources(#[source] CollaboratorError),

    #[error("failed to list target store records: {0}")]
    ListTargets(#[source] CollaboratorError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
