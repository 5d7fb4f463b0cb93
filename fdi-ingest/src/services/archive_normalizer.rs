//! Archive → ordered record set
//!
//! The archive must hold exactly one `.xml` entry (name matched
//! case-insensitively). Every element named by the record tag, at any depth
//! below the document root, becomes one [`Record`]:
//! - a child without child elements contributes `Leaf(text)` under its tag
//! - a child with child elements contributes `Nested(..)` built the same way
//!
//! The resulting records are ordered by `FilingDate`, newest first.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, info};
use zip::ZipArchive;

use super::archive_fetcher::ArchiveHandle;
use crate::error::{IngestError, IngestResult};
use crate::models::{FieldValue, Record, RecordSet};

const XML_EXTENSION: &str = ".xml";

/// Element of the parsed XML document
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn to_record(&self) -> Record {
        self.children
            .iter()
            .map(|child| {
                let value = if child.children.is_empty() {
                    FieldValue::Leaf(child.text.clone())
                } else {
                    FieldValue::Nested(child.to_record())
                };
                (child.name.clone(), value)
            })
            .collect()
    }

    /// Pre-order walk of the descendants (self excluded) named `tag`
    fn collect_named<'a>(&'a self, tag: &str, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == tag {
                out.push(child);
            }
            child.collect_named(tag, out);
        }
    }
}

/// Disclosure archive normalizer
pub struct ArchiveNormalizer {
    record_tag: String,
}

impl ArchiveNormalizer {
    /// `record_tag` names the element holding one record (e.g. `Member`)
    pub fn new(record_tag: impl Into<String>) -> Self {
        Self {
            record_tag: record_tag.into(),
        }
    }

    /// Normalize an archive on disk, optionally persisting the result to `sink`
    pub fn normalize(&self, archive: &ArchiveHandle, sink: Option<&Path>) -> IngestResult<RecordSet> {
        let file = File::open(&archive.path)?;
        let records = self.normalize_reader(BufReader::new(file))?;

        info!(
            archive = %archive.path.display(),
            records = records.len(),
            "Normalized disclosure archive"
        );

        if let Some(sink) = sink {
            records.write_json(sink)?;
            info!(path = %sink.display(), "Wrote normalized records");
        }

        Ok(records)
    }

    /// Normalize archive bytes held in memory
    pub fn normalize_bytes(&self, bytes: &[u8]) -> IngestResult<RecordSet> {
        self.normalize_reader(Cursor::new(bytes))
    }

    fn normalize_reader<R: Read + Seek>(&self, reader: R) -> IngestResult<RecordSet> {
        let xml = read_single_xml_entry(reader)?;
        let root = parse_document(&xml)?;

        let mut nodes = Vec::new();
        root.collect_named(&self.record_tag, &mut nodes);
        debug!(tag = %self.record_tag, nodes = nodes.len(), "Located record nodes");

        let records = nodes.into_iter().map(XmlElement::to_record).collect();
        Ok(RecordSet::from_unordered(records))
    }
}

/// Read the archive's only XML entry; the container is closed before returning
fn read_single_xml_entry<R: Read + Seek>(reader: R) -> IngestResult<String> {
    let mut archive = ZipArchive::new(reader)?;

    let xml_entries: Vec<String> = archive
        .file_names()
        .filter(|name| name.to_lowercase().ends_with(XML_EXTENSION))
        .map(str::to_string)
        .collect();

    if xml_entries.len() != 1 {
        return Err(IngestError::MalformedArchive {
            found: xml_entries.len(),
        });
    }

    let name = &xml_entries[0];
    debug!(entry = %name, "Reading XML entry");

    let mut entry = archive.by_name(name)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;

    let text = String::from_utf8(bytes)
        .map_err(|e| IngestError::Parse(format!("{} is not valid UTF-8: {}", name, e)))?;

    Ok(text)
}

/// Parse a well-formed XML document into its root element
fn parse_document(xml: &str) -> IngestResult<XmlElement> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(IngestError::Parse(
                        "junk after document element".to_string(),
                    ));
                }
                stack.push(XmlElement::new(element_name(e.name().as_ref())?));
            }
            Event::Empty(e) => {
                let element = XmlElement::new(element_name(e.name().as_ref())?);
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(e) => {
                let element = stack.pop().ok_or_else(|| {
                    IngestError::Parse(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(IngestError::Parse(
                            "text outside of the document element".to_string(),
                        ))
                    }
                }
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                let text = std::str::from_utf8(&bytes)
                    .map_err(|err| IngestError::Parse(format!("CDATA is not valid UTF-8: {}", err)))?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(text),
                    None => {
                        return Err(IngestError::Parse(
                            "CDATA outside of the document element".to_string(),
                        ))
                    }
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(IngestError::Parse(format!(
            "unexpected end of document: <{}> is not closed",
            open.name
        )));
    }

    root.ok_or_else(|| IngestError::Parse("no element found".to_string()))
}

fn element_name(raw: &[u8]) -> IngestResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| IngestError::Parse(format!("element name is not valid UTF-8: {}", e)))
}

/// Hang a finished element on its parent, or make it the document root
fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> IngestResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(IngestError::Parse(
                "junk after document element".to_string(),
            ))
        }
    }
    Ok(())
}
