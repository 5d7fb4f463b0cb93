//! Service modules for the disclosure ingest pipeline

pub mod archive_fetcher;
pub mod archive_normalizer;
pub mod document_retriever;
pub mod http;
pub mod pipeline_orchestrator;

pub use archive_fetcher::{ArchiveFetcher, ArchiveHandle};
pub use archive_normalizer::ArchiveNormalizer;
pub use document_retriever::{DocumentRetriever, RetrievalStrategy, RunObserver};
pub use pipeline_orchestrator::{Pipeline, PipelineReport};
