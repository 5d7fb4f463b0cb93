//! Ingest pipeline orchestrator
//!
//! # State Progression
//! IDLE → ACQUIRING → NORMALIZING → RETRIEVING → DONE
//!
//! A fatal error in any working state moves the run to ABORTED and is
//! returned as a [`PipelineError`] naming that state. Per-document failures
//! are not fatal: they are reported in the [`RetrievalReport`].

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use fdi_common::config::OutputFolderInitializer;
use fdi_common::events::{EventBus, IngestEvent, PipelineState};
use tracing::{error, info};

use super::archive_fetcher::{ArchiveFetcher, ArchiveHandle};
use super::archive_normalizer::ArchiveNormalizer;
use super::document_retriever::{DocumentRetriever, RunObserver};
use crate::error::{IngestError, PipelineError};
use crate::models::{PipelineRun, RetrievalReport};
use crate::settings::IngestSettings;

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run: PipelineRun,
    pub archive: ArchiveHandle,
    pub records_path: PathBuf,
    pub record_count: usize,
    pub retrieval: RetrievalReport,
}

/// Sequences fetch → normalize → retrieve for one year
pub struct Pipeline {
    layout: OutputFolderInitializer,
    fetcher: ArchiveFetcher,
    normalizer: Arc<ArchiveNormalizer>,
    retriever: DocumentRetriever,
    event_bus: EventBus,
}

impl Pipeline {
    pub fn new(settings: &IngestSettings, event_bus: EventBus) -> Result<Self, IngestError> {
        let layout = settings.layout();

        Ok(Self {
            fetcher: ArchiveFetcher::new(
                settings.archive_url_template.clone(),
                settings.archive_timeout,
                layout.clone(),
            )?,
            normalizer: Arc::new(ArchiveNormalizer::new(settings.record_tag.clone())),
            retriever: DocumentRetriever::new(
                settings.document_url_template.clone(),
                settings.document_timeout,
                layout.clone(),
                settings.retrieval_strategy(),
            )?,
            layout,
            event_bus,
        })
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Run the whole pipeline for `year`
    pub async fn run(&self, year: i32) -> Result<PipelineReport, PipelineError> {
        let mut run = PipelineRun::new(year);
        info!(run_id = %run.run_id, year, "Starting ingest run");

        self.layout
            .ensure_directory_exists()
            .map_err(|e| self.abort_before_start(&run, e.into()))?;

        // ACQUIRING
        self.advance(&mut run, PipelineState::Acquiring);
        let archive = match self.fetcher.fetch(year).await {
            Ok(archive) => archive,
            Err(e) => return Err(self.abort(&mut run, e)),
        };

        // NORMALIZING
        self.advance(&mut run, PipelineState::Normalizing);
        let records_path = self.layout.records_path();
        let normalizer = Arc::clone(&self.normalizer);
        let blocking_archive = archive.clone();
        let sink = records_path.clone();
        let normalized = tokio::task::spawn_blocking(move || {
            normalizer.normalize(&blocking_archive, Some(&sink))
        })
        .await;

        let records = match normalized {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => return Err(self.abort(&mut run, e)),
            Err(join_error) => {
                let e = IngestError::Common(fdi_common::Error::Internal(format!(
                    "normalizer task failed: {}",
                    join_error
                )));
                return Err(self.abort(&mut run, e));
            }
        };

        // RETRIEVING
        self.advance(&mut run, PipelineState::Retrieving);
        let observer = RunObserver {
            event_bus: self.event_bus.clone(),
            run_id: run.run_id,
        };
        let retrieval = match self
            .retriever
            .retrieve_observed(&records, year, Some(&observer))
            .await
        {
            Ok(report) => report,
            Err(e) => return Err(self.abort(&mut run, e)),
        };

        // DONE
        self.advance(&mut run, PipelineState::Done);
        self.event_bus.emit_lossy(IngestEvent::RunCompleted {
            run_id: run.run_id,
            considered: retrieval.considered,
            retrieved: retrieval.retrieved.len(),
            failed: retrieval.failed.len(),
            skipped: retrieval.skipped,
            timestamp: Utc::now(),
        });

        info!(
            run_id = %run.run_id,
            records = records.len(),
            retrieved = retrieval.retrieved.len(),
            failed = retrieval.failed.len(),
            "Ingest run complete"
        );

        Ok(PipelineReport {
            archive,
            records_path,
            record_count: records.len(),
            retrieval,
            run,
        })
    }

    fn advance(&self, run: &mut PipelineRun, next: PipelineState) {
        if let Some(transition) = run.transition_to(next) {
            info!(
                run_id = %run.run_id,
                from = %transition.old_state,
                to = %transition.new_state,
                "Pipeline state changed"
            );
            self.event_bus.emit_lossy(IngestEvent::StateChanged {
                run_id: run.run_id,
                old_state: transition.old_state,
                new_state: transition.new_state,
                timestamp: transition.transitioned_at,
            });
        }
    }

    fn abort(&self, run: &mut PipelineRun, source: IngestError) -> PipelineError {
        let stage = run.state;
        error!(run_id = %run.run_id, stage = %stage, error = %source, "Ingest run aborted");

        self.advance(run, PipelineState::Aborted);
        self.event_bus.emit_lossy(IngestEvent::RunAborted {
            run_id: run.run_id,
            stage,
            error: source.to_string(),
            timestamp: Utc::now(),
        });

        PipelineError::new(stage, source)
    }

    /// Output folder could not be created; the run never left `Idle`
    fn abort_before_start(&self, run: &PipelineRun, source: IngestError) -> PipelineError {
        error!(run_id = %run.run_id, error = %source, "Cannot prepare output folder");
        self.event_bus.emit_lossy(IngestEvent::RunAborted {
            run_id: run.run_id,
            stage: PipelineState::Idle,
            error: source.to_string(),
            timestamp: Utc::now(),
        });
        PipelineError::new(PipelineState::Idle, source)
    }
}
