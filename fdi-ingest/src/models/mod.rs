//! Data models for disclosure ingest

pub mod pipeline_run;
pub mod record;
pub mod record_set;
pub mod retrieval;

pub use pipeline_run::{PipelineRun, StateTransition};
pub use record::{FieldValue, Record, DOC_ID_FIELD, DOWNLOAD_ERROR_FIELD, FILING_DATE_FIELD};
pub use record_set::RecordSet;
pub use retrieval::{FailureManifest, RetrievalOutcome, RetrievalReport};
