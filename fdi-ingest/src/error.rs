//! Error types for fdi-ingest
//!
//! Fatal errors (`MalformedArchive`, `Parse`, a `Transport` failure on the
//! archive) abort the run. A `Transport` failure on a single document is
//! captured in the failure manifest and never leaves the retriever.

use fdi_common::events::PipelineState;
use thiserror::Error;

/// Ingest error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// Network failure, timeout, or non-2xx status on a GET
    #[error("Transport error for {url}: {cause}")]
    Transport { url: String, cause: String },

    /// Archive does not hold exactly one XML entry
    #[error("Malformed archive: expected exactly one XML entry, found {found}")]
    MalformedArchive { found: usize },

    /// XML entry is not well-formed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Expected record field is missing
    #[error("Field absent: {0}")]
    FieldAbsent(&'static str),

    /// Archive container could not be read
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// fdi-common error
    #[error("Common error: {0}")]
    Common(#[from] fdi_common::Error),
}

impl From<quick_xml::Error> for IngestError {
    fn from(e: quick_xml::Error) -> Self {
        IngestError::Parse(e.to_string())
    }
}

impl IngestError {
    pub(crate) fn transport(url: &str, cause: impl ToString) -> Self {
        IngestError::Transport {
            url: url.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type for ingest operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Fatal error surfaced by the pipeline, tagged with the failing stage
#[derive(Debug, Error)]
#[error("Pipeline aborted during {stage}: {source}")]
pub struct PipelineError {
    pub stage: PipelineState,
    #[source]
    pub source: IngestError,
}

impl PipelineError {
    pub fn new(stage: PipelineState, source: IngestError) -> Self {
        Self { stage, source }
    }
}
