//! fdi-ingest library interface
//!
//! Downloads the yearly financial disclosure archive, normalizes its XML
//! entry into date-ordered records, and fetches one document per record
//! while keeping a manifest of the fetches that failed.

pub mod error;
pub mod models;
pub mod services;
pub mod settings;

pub use crate::error::{IngestError, IngestResult, PipelineError};
pub use crate::models::{FieldValue, FailureManifest, Record, RecordSet, RetrievalReport};
pub use crate::services::{
    ArchiveFetcher, ArchiveHandle, ArchiveNormalizer, DocumentRetriever, Pipeline,
    PipelineReport, RetrievalStrategy,
};
pub use crate::settings::{IngestSettings, SettingsOverrides};
pub use fdi_common::events::{EventBus, IngestEvent, PipelineState};
