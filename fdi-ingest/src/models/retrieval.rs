//! Document retrieval results

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::record::{Record, DOWNLOAD_ERROR_FIELD};
use super::record_set::RecordSet;
use crate::error::IngestResult;

/// Result of one document fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// Document written to `path`
    Retrieved { doc_id: String, path: PathBuf },
    /// Fetch or write failed; the run went on
    Failed { doc_id: String, cause: String },
}

impl RetrievalOutcome {
    pub fn doc_id(&self) -> &str {
        match self {
            RetrievalOutcome::Retrieved { doc_id, .. } | RetrievalOutcome::Failed { doc_id, .. } => {
                doc_id
            }
        }
    }

    pub fn is_retrieved(&self) -> bool {
        matches!(self, RetrievalOutcome::Retrieved { .. })
    }
}

/// Records whose document could not be fetched, each with `download_error`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureManifest {
    entries: Vec<Record>,
}

impl FailureManifest {
    /// Add a copy of `record` annotated with the failure cause
    pub fn push(&mut self, record: &Record, cause: impl Into<String>) {
        let cause: String = cause.into();
        let mut entry = record.clone();
        entry.insert(DOWNLOAD_ERROR_FIELD, cause);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Record] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.entries
    }

    /// Pretty-printed JSON array, the on-disk manifest format
    pub fn to_json(&self) -> IngestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> IngestResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Strip `download_error` and order the records for another attempt
    pub fn into_retry_set(self) -> RecordSet {
        let records = self
            .entries
            .into_iter()
            .map(|mut record| {
                record.remove(DOWNLOAD_ERROR_FIELD);
                record
            })
            .collect();
        RecordSet::from_unordered(records)
    }
}

/// Partitioned result of a retrieval pass
#[derive(Debug, Clone, Default)]
pub struct RetrievalReport {
    /// Records in the input set
    pub considered: usize,
    /// Records without a `DocID`
    pub skipped: usize,
    /// Records whose document was written
    pub retrieved: Vec<Record>,
    /// Records whose fetch failed, with `download_error`
    pub failed: Vec<Record>,
    /// Where the failure manifest was written, if any
    pub manifest_path: Option<PathBuf>,
}

impl RetrievalReport {
    pub fn attempted(&self) -> usize {
        self.retrieved.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
