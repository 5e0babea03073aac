//! Asset reconciliation: match catalog records to product rows, fetch and
//! normalize their attachments, store them in a blob sink, and rewrite each
//! product's asset list.
//!
//! The stages run in a fixed order (match, fetch, transform, persist) and
//! every target record ends with exactly one outcome in the [`RunReport`].

pub mod collaborators;
pub mod error;
pub mod fetch;
pub mod matcher;
pub mod persist;
pub mod pipeline;
pub mod report;
pub(crate) mod retry;
pub mod transform;

pub use collaborators::{BlobSink, SourceCatalog, TargetStore};
pub use error::{AssetError, CollaboratorError, PipelineError};
pub use fetch::{FetchedAsset, Fetcher};
pub use matcher::{match_records, MatchBasis, MatchedPair};
pub use persist::KeyGenerator;
pub use pipeline::Pipeline;
pub use report::{ErrorRecord, RecordOutcome, RecordReport, RunCounts, RunReport, Stage};
pub use transform::{AssetArtifact, Transformer};

pub use tokio_util::sync::CancellationToken;
