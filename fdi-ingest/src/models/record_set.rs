//! Date-ordered record collection

use std::cmp::Reverse;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::record::Record;
use crate::error::IngestResult;

/// Records ordered by `FilingDate`, newest first
///
/// Records without a parsable date follow every dated record and keep their
/// input order. The set cannot be modified once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Order records by filing date (stable)
    pub fn from_unordered(mut records: Vec<Record>) -> Self {
        // None < Some(_), so Reverse puts undated records last
        records.sort_by_cached_key(|record| Reverse(record.filing_date()));
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the filing-date ordering holds
    pub fn is_ordered(&self) -> bool {
        self.records
            .windows(2)
            .all(|pair| match (pair[0].filing_date(), pair[1].filing_date()) {
                (Some(a), Some(b)) => a >= b,
                (None, Some(_)) => false,
                _ => true,
            })
    }

    /// Count of records carrying a non-empty `DocID`
    pub fn with_doc_id_count(&self) -> usize {
        self.records.iter().filter(|r| r.doc_id().is_some()).count()
    }

    /// Persist as a pretty-printed JSON array
    pub fn write_json(&self, path: &Path) -> IngestResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), records = self.len(), "Wrote record set");
        Ok(())
    }

    /// Load a JSON array written by [`RecordSet::write_json`]
    ///
    /// The ordering is re-established on load.
    pub fn load_json(path: &Path) -> IngestResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl<'de> Deserialize<'de> for RecordSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<Record>::deserialize(deserializer)?;
        Ok(Self::from_unordered(records))
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
