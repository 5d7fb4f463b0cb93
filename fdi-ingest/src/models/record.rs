//! Disclosure record model
//!
//! A record is a field-name → value tree. Leaf fields hold the element text,
//! nested fields hold another record built from the element's children.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

/// Field holding the filing date in `month/day/year` form
pub const FILING_DATE_FIELD: &str = "FilingDate";

/// Field holding the document identifier
pub const DOC_ID_FIELD: &str = "DocID";

/// Field added to failed records in the failure manifest
pub const DOWNLOAD_ERROR_FIELD: &str = "download_error";

const FILING_DATE_FORMAT: &str = "%m/%d/%Y";

/// Value of one record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text of an element without child elements ("" when empty)
    Leaf(String),
    /// Element with child elements
    Nested(Record),
}

impl FieldValue {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            FieldValue::Leaf(text) => Some(text),
            FieldValue::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&Record> {
        match self {
            FieldValue::Leaf(_) => None,
            FieldValue::Nested(record) => Some(record),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Leaf(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Leaf(text)
    }
}

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        FieldValue::Nested(record)
    }
}

/// One normalized disclosure record
///
/// Field order follows the source document. Keys are unique: inserting an
/// existing key replaces its value and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field, returning the replaced value if the key existed
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining fields
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Leaf text of a field; `None` when absent or nested
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_leaf)
    }

    /// Leaf text of a field, or `FieldAbsent`
    pub fn require_str(&self, key: &'static str) -> IngestResult<&str> {
        self.get_str(key).ok_or(IngestError::FieldAbsent(key))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Parsed `FilingDate`, `None` when missing or not `month/day/year`
    pub fn filing_date(&self) -> Option<NaiveDate> {
        let raw = self.get_str(FILING_DATE_FIELD)?;
        if !has_month_day_year_shape(raw) {
            return None;
        }
        NaiveDate::parse_from_str(raw, FILING_DATE_FORMAT).ok()
    }

    /// Non-empty `DocID`, the key used to address the record's document
    pub fn doc_id(&self) -> Option<&str> {
        self.require_doc_id().ok()
    }

    /// Non-empty `DocID`, or `FieldAbsent` when it is missing, nested or empty
    pub fn require_doc_id(&self) -> IngestResult<&str> {
        self.require_str(DOC_ID_FIELD)
            .ok()
            .filter(|id| !id.is_empty())
            .ok_or(IngestError::FieldAbsent(DOC_ID_FIELD))
    }
}

/// `M/D/YYYY` with 1-2 digit month and day and a 4 digit year
///
/// chrono alone also accepts short or signed years and padded numbers.
fn has_month_day_year_shape(raw: &str) -> bool {
    let digits = |part: &str, min: usize, max: usize| {
        (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };

    let mut parts = raw.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(month), Some(day), Some(year), None) => {
            digits(month, 1, 2) && digits(day, 1, 2) && digits(year, 4, 4)
        }
        _ => false,
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = Record::new()
            .with("Prefix", "Hon.")
            .with("Last", "Doe")
            .with("First", "Jane");

        let old = record.insert("Last", "Roe");

        assert_eq!(old, Some(FieldValue::Leaf("Doe".to_string())));
        assert_eq!(record.len(), 3);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Prefix", "Last", "First"]);
        assert_eq!(record.get_str("Last"), Some("Roe"));
    }

    #[test]
    fn test_filing_date_accepts_unpadded_and_padded() {
        let a = Record::new().with(FILING_DATE_FIELD, "3/1/2024");
        let b = Record::new().with(FILING_DATE_FIELD, "03/01/2024");
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);

        assert_eq!(a.filing_date(), expected);
        assert_eq!(b.filing_date(), expected);
    }

    #[test]
    fn test_filing_date_rejects_other_shapes() {
        for raw in [
            "2024-03-01",
            "",
            "13/1/2024",
            "3/1",
            "soon",
            "1/1/24",
            " 3/1/2024",
            "3/ 1/2024",
            "1/1/+2024",
            "1/1/20245",
            "001/1/2024",
            "3/1/2024/",
        ] {
            let record = Record::new().with(FILING_DATE_FIELD, raw);
            assert_eq!(record.filing_date(), None, "{:?} should not parse", raw);
        }
        assert_eq!(Record::new().filing_date(), None);
    }

    #[test]
    fn test_filing_date_ignores_nested_value() {
        let record = Record::new().with(
            FILING_DATE_FIELD,
            Record::new().with("Value", "3/1/2024"),
        );
        assert_eq!(record.filing_date(), None);
    }

    #[test]
    fn test_doc_id_requires_non_empty_leaf() {
        assert_eq!(Record::new().with(DOC_ID_FIELD, "20024517").doc_id(), Some("20024517"));
        assert_eq!(Record::new().with(DOC_ID_FIELD, "").doc_id(), None);
        assert_eq!(Record::new().doc_id(), None);
    }

    #[test]
    fn test_require_str_reports_field_absent() {
        let err = Record::new().require_str(DOC_ID_FIELD).unwrap_err();
        assert!(matches!(err, IngestError::FieldAbsent("DocID")));
    }

    #[test]
    fn test_require_doc_id_treats_empty_and_nested_as_absent() {
        let empty = Record::new().with(DOC_ID_FIELD, "");
        let nested = Record::new().with(DOC_ID_FIELD, Record::new().with("Value", "1"));

        for record in [empty, nested, Record::new()] {
            let err = record.require_doc_id().unwrap_err();
            assert!(matches!(err, IngestError::FieldAbsent(DOC_ID_FIELD)));
            assert_eq!(err.to_string(), "Field absent: DocID");
        }
        assert_eq!(
            Record::new().with(DOC_ID_FIELD, "20024517").require_doc_id().unwrap(),
            "20024517"
        );
    }

    #[test]
    fn test_json_shape_preserves_nesting_and_order() {
        let record = Record::new()
            .with("Last", "Doe")
            .with("Office", Record::new().with("State", "CA").with("District", "12"))
            .with(FILING_DATE_FIELD, "5/2/2024");

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"Last":"Doe","Office":{"State":"CA","District":"12"},"FilingDate":"5/2/2024"}"#
        );

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keys().collect::<Vec<_>>(), vec!["Last", "Office", "FilingDate"]);
        assert_eq!(
            back.get("Office").and_then(FieldValue::as_nested).and_then(|o| o.get_str("State")),
            Some("CA")
        );
    }
}
