//! Test helpers
//!
//! - Archive builders (zip + disclosure XML)
//! - A local HTTP server standing in for the archive and document endpoints

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fdi_ingest::IngestSettings;
use tokio::task::JoinHandle;
use zip::write::FileOptions;
use zip::ZipWriter;

/// One `<Member>` element: (DocID, FilingDate); `None` omits the element
pub type MemberFixture<'a> = (Option<&'a str>, Option<&'a str>);

/// Disclosure XML document with one `<Member>` per entry
pub fn disclosure_xml(members: &[MemberFixture]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<FinancialDisclosure>\n");
    for (index, (doc_id, date)) in members.iter().enumerate() {
        xml.push_str("  <Member>\n");
        xml.push_str("    <Prefix>Hon.</Prefix>\n");
        xml.push_str(&format!("    <Last>Member{}</Last>\n", index));
        xml.push_str("    <FilingType>P</FilingType>\n");
        xml.push_str("    <StateDst>CA12</StateDst>\n");
        xml.push_str("    <Year>2024</Year>\n");
        if let Some(date) = date {
            xml.push_str(&format!("    <FilingDate>{}</FilingDate>\n", date));
        }
        if let Some(doc_id) = doc_id {
            xml.push_str(&format!("    <DocID>{}</DocID>\n", doc_id));
        }
        xml.push_str("  </Member>\n");
    }
    xml.push_str("</FinancialDisclosure>\n");
    xml
}

/// Zip archive holding the given (name, content) entries
pub fn build_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Archive with the usual `2024FD.txt` + `2024FD.xml` layout
pub fn disclosure_archive(members: &[MemberFixture]) -> Vec<u8> {
    build_archive(&[
        ("2024FD.txt", "Prefix\tLast\tFirst\n"),
        ("2024FD.xml", &disclosure_xml(members)),
    ])
}

/// Settings pointing both endpoints at `server` and output into `dir`
pub fn settings_for(server: &FixtureServer, dir: &Path, workers: usize) -> IngestSettings {
    IngestSettings {
        output_dir: dir.to_path_buf(),
        archive_url_template: server.archive_template(),
        document_url_template: server.document_template(),
        archive_timeout: Duration::from_secs(5),
        document_timeout: Duration::from_secs(1),
        workers,
        record_tag: "Member".to_string(),
        log_level: "debug".to_string(),
    }
}

#[derive(Clone)]
struct FixtureState {
    archive: Option<Arc<Vec<u8>>>,
    missing_docs: Arc<HashSet<String>>,
    slow_docs: Arc<HashSet<String>>,
    document_hits: Arc<Mutex<Vec<String>>>,
}

/// Local stand-in for the disclosure web server
///
/// - `GET /archives/{file}` serves the configured archive, or 404 when none
/// - `GET /docs/{year}/{doc_id}.pdf` serves a small PDF-like body, 404 for
///   ids in `missing_docs`, and stalls for 3 s for ids in `slow_docs`
pub struct FixtureServer {
    pub base_url: String,
    document_hits: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start(archive: Option<Vec<u8>>, missing_docs: &[&str]) -> Self {
        Self::start_with_slow(archive, missing_docs, &[]).await
    }

    pub async fn start_with_slow(
        archive: Option<Vec<u8>>,
        missing_docs: &[&str],
        slow_docs: &[&str],
    ) -> Self {
        let document_hits = Arc::new(Mutex::new(Vec::new()));
        let state = FixtureState {
            archive: archive.map(Arc::new),
            missing_docs: Arc::new(missing_docs.iter().map(|s| s.to_string()).collect()),
            slow_docs: Arc::new(slow_docs.iter().map(|s| s.to_string()).collect()),
            document_hits: Arc::clone(&document_hits),
        };

        let app = Router::new()
            .route("/archives/:file", get(serve_archive))
            .route("/docs/:year/:file", get(serve_document))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            document_hits,
            handle,
        }
    }

    pub fn archive_template(&self) -> String {
        format!("{}/archives/{{year}}FD.zip", self.base_url)
    }

    pub fn document_template(&self) -> String {
        format!("{}/docs/{{year}}/{{doc_id}}.pdf", self.base_url)
    }

    /// Document ids requested so far, in arrival order
    pub fn document_hits(&self) -> Vec<String> {
        self.document_hits.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_archive(State(state): State<FixtureState>, UrlPath(_file): UrlPath<String>) -> Response {
    match &state.archive {
        Some(bytes) => (StatusCode::OK, bytes.as_ref().clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve_document(
    State(state): State<FixtureState>,
    UrlPath((year, file)): UrlPath<(String, String)>,
) -> Response {
    let doc_id = file.trim_end_matches(".pdf").to_string();
    state.document_hits.lock().unwrap().push(doc_id.clone());

    if state.slow_docs.contains(&doc_id) {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    if state.missing_docs.contains(&doc_id) {
        return StatusCode::NOT_FOUND.into_response();
    }

    (StatusCode::OK, pdf_body(&year, &doc_id)).into_response()
}

pub fn pdf_body(year: &str, doc_id: &str) -> Vec<u8> {
    format!("%PDF-1.4\n% {} {}\n%%EOF\n", year, doc_id).into_bytes()
}
