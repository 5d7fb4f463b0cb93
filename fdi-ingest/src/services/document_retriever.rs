//! Per-record document retrieval
//!
//! Every record carrying a `DocID` gets one GET. Each attempt ends as either
//! `Retrieved` (body written to `<doc_id>.pdf`) or `Failed` (record copied to
//! the failure manifest with `download_error`). Records without a `DocID` are
//! skipped and counted separately. A failed attempt never stops the pass.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use fdi_common::config::OutputFolderInitializer;
use fdi_common::events::{EventBus, IngestEvent};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::http;
use crate::error::{IngestError, IngestResult};
use crate::models::{FailureManifest, Record, RecordSet, RetrievalOutcome, RetrievalReport};

const DOCUMENT_EXTENSION: &str = "pdf";

/// How documents are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// One request at a time, in record-set order
    Sequential,
    /// Up to `workers` requests in flight; completion order is not preserved
    Concurrent { workers: usize },
}

impl RetrievalStrategy {
    pub fn from_workers(workers: usize) -> Self {
        if workers <= 1 {
            RetrievalStrategy::Sequential
        } else {
            RetrievalStrategy::Concurrent { workers }
        }
    }
}

/// Publishes per-document events for one pipeline run
#[derive(Clone)]
pub struct RunObserver {
    pub event_bus: EventBus,
    pub run_id: Uuid,
}

/// Document endpoint client
pub struct DocumentRetriever {
    http_client: reqwest::Client,
    url_template: String,
    layout: OutputFolderInitializer,
    strategy: RetrievalStrategy,
}

impl DocumentRetriever {
    pub fn new(
        url_template: impl Into<String>,
        timeout: Duration,
        layout: OutputFolderInitializer,
        strategy: RetrievalStrategy,
    ) -> IngestResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            url_template: url_template.into(),
            layout,
            strategy,
        })
    }

    pub fn strategy(&self) -> RetrievalStrategy {
        self.strategy
    }

    pub fn document_url(&self, year: i32, doc_id: &str) -> String {
        self.url_template
            .replace("{year}", &year.to_string())
            .replace("{doc_id}", doc_id)
    }

    pub fn document_path(&self, doc_id: &str) -> PathBuf {
        self.layout
            .documents_dir()
            .join(format!("{}.{}", doc_id, DOCUMENT_EXTENSION))
    }

    /// Fetch the document of every record in `records`
    pub async fn retrieve(&self, records: &RecordSet, year: i32) -> IngestResult<RetrievalReport> {
        self.retrieve_observed(records, year, None).await
    }

    /// Re-attempt the records of a failure manifest
    pub async fn retry(&self, manifest: FailureManifest, year: i32) -> IngestResult<RetrievalReport> {
        info!(records = manifest.len(), "Retrying failed documents");
        let records = manifest.into_retry_set();
        self.retrieve(&records, year).await
    }

    /// [`retrieve`](Self::retrieve), publishing each outcome on the run's event bus
    ///
    /// Only a failure to write the manifest is returned as an error; every
    /// per-document failure ends up in the report.
    pub async fn retrieve_observed(
        &self,
        records: &RecordSet,
        year: i32,
        observer: Option<&RunObserver>,
    ) -> IngestResult<RetrievalReport> {
        tokio::fs::create_dir_all(self.layout.documents_dir()).await?;

        let mut report = RetrievalReport {
            considered: records.len(),
            ..RetrievalReport::default()
        };

        let mut candidates = Vec::with_capacity(records.len());
        for record in records {
            match record.require_doc_id() {
                Ok(doc_id) => candidates.push((record, doc_id)),
                Err(e) => {
                    report.skipped += 1;
                    debug!(error = %e, "Skipping record");
                }
            }
        }

        info!(
            candidates = candidates.len(),
            skipped = report.skipped,
            strategy = ?self.strategy,
            "Retrieving documents"
        );

        let attempts = stream::iter(candidates).map(|(record, doc_id)| async move {
            let outcome = self.attempt(year, doc_id, observer).await;
            (record, outcome)
        });

        let outcomes: Vec<(&Record, RetrievalOutcome)> = match self.strategy {
            RetrievalStrategy::Sequential => attempts.buffered(1).collect().await,
            RetrievalStrategy::Concurrent { workers } => {
                attempts.buffer_unordered(workers.max(1)).collect().await
            }
        };

        let mut manifest = FailureManifest::default();
        for (record, outcome) in outcomes {
            match outcome {
                RetrievalOutcome::Retrieved { .. } => report.retrieved.push(record.clone()),
                RetrievalOutcome::Failed { cause, .. } => manifest.push(record, cause),
            }
        }

        let manifest_path = self.layout.failure_manifest_path();
        if manifest.is_empty() {
            match tokio::fs::remove_file(&manifest_path).await {
                Ok(()) => debug!(path = %manifest_path.display(), "Removed stale failure manifest"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %manifest_path.display(),
                    error = %e,
                    "Could not remove stale failure manifest"
                ),
            }
        } else {
            tokio::fs::write(&manifest_path, manifest.to_json()?).await?;
            info!(path = %manifest_path.display(), entries = manifest.len(), "Wrote failure manifest");
            report.manifest_path = Some(manifest_path);
        }
        report.failed = manifest.into_records();

        info!(
            total = report.considered,
            retrieved = report.retrieved.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Document retrieval complete"
        );

        Ok(report)
    }

    async fn attempt(
        &self,
        year: i32,
        doc_id: &str,
        observer: Option<&RunObserver>,
    ) -> RetrievalOutcome {
        match self.download(year, doc_id).await {
            Ok(path) => {
                info!(doc_id, path = %path.display(), "Retrieved document");
                if let Some(observer) = observer {
                    observer.event_bus.emit_lossy(IngestEvent::DocumentRetrieved {
                        run_id: observer.run_id,
                        doc_id: doc_id.to_string(),
                        path: path.display().to_string(),
                        timestamp: Utc::now(),
                    });
                }
                RetrievalOutcome::Retrieved {
                    doc_id: doc_id.to_string(),
                    path,
                }
            }
            Err(e) => {
                let cause = e.to_string();
                warn!(doc_id, error = %cause, "Failed to retrieve document");
                if let Some(observer) = observer {
                    observer.event_bus.emit_lossy(IngestEvent::DocumentFailed {
                        run_id: observer.run_id,
                        doc_id: doc_id.to_string(),
                        cause: cause.clone(),
                        timestamp: Utc::now(),
                    });
                }
                RetrievalOutcome::Failed {
                    doc_id: doc_id.to_string(),
                    cause,
                }
            }
        }
    }

    async fn download(&self, year: i32, doc_id: &str) -> IngestResult<PathBuf> {
        validate_doc_id(doc_id)?;

        let url = self.document_url(year, doc_id);
        let body = http::get_bytes(&self.http_client, &url).await?;

        let path = self.document_path(doc_id);
        tokio::fs::write(&path, &body).await?;
        Ok(path)
    }
}

/// The identifier becomes a file name, so it must not escape the document folder
fn validate_doc_id(doc_id: &str) -> IngestResult<()> {
    let invalid = doc_id == "."
        || doc_id == ".."
        || doc_id.chars().any(|c| matches!(c, '/' | '\\' | '\0'));

    if invalid {
        return Err(IngestError::Common(fdi_common::Error::InvalidInput(format!(
            "document identifier {:?} cannot be used as a file name",
            doc_id
        ))));
    }
    Ok(())
}
