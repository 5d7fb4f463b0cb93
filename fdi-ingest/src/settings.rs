//! Settings resolution for fdi-ingest
//!
//! **Priority:** CLI → ENV → TOML → compiled defaults. Environment overrides
//! for the numeric settings arrive through the CLI layer (clap `env`); the
//! output folder goes through [`OutputFolderResolver`].

use std::path::PathBuf;
use std::time::Duration;

use fdi_common::config::{CompiledDefaults, OutputFolderInitializer, OutputFolderResolver, TomlConfig};
use tracing::info;

use crate::services::RetrievalStrategy;

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub output_dir: Option<PathBuf>,
    pub archive_timeout_secs: Option<u64>,
    pub document_timeout_secs: Option<u64>,
    pub workers: Option<usize>,
}

/// Fully resolved ingest settings
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub output_dir: PathBuf,
    pub archive_url_template: String,
    pub document_url_template: String,
    pub archive_timeout: Duration,
    pub document_timeout: Duration,
    pub workers: usize,
    pub record_tag: String,
    pub log_level: String,
}

impl IngestSettings {
    pub fn resolve(toml_config: &TomlConfig, overrides: SettingsOverrides) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let output_dir = OutputFolderResolver::new(toml_config)
            .with_cli_arg(overrides.output_dir)
            .resolve();

        let archive_timeout_secs = overrides
            .archive_timeout_secs
            .or(toml_config.archive_timeout_secs)
            .unwrap_or(defaults.archive_timeout_secs);
        let document_timeout_secs = overrides
            .document_timeout_secs
            .or(toml_config.document_timeout_secs)
            .unwrap_or(defaults.document_timeout_secs);
        let workers = overrides
            .workers
            .or(toml_config.workers)
            .unwrap_or(defaults.workers)
            .max(1);

        Self {
            output_dir,
            archive_url_template: toml_config
                .archive_url_template
                .clone()
                .unwrap_or(defaults.archive_url_template),
            document_url_template: toml_config
                .document_url_template
                .clone()
                .unwrap_or(defaults.document_url_template),
            archive_timeout: Duration::from_secs(archive_timeout_secs),
            document_timeout: Duration::from_secs(document_timeout_secs),
            workers,
            record_tag: toml_config
                .record_tag
                .clone()
                .unwrap_or(defaults.record_tag),
            log_level: toml_config.logging.level.clone(),
        }
    }

    pub fn layout(&self) -> OutputFolderInitializer {
        OutputFolderInitializer::new(self.output_dir.clone())
    }

    pub fn retrieval_strategy(&self) -> RetrievalStrategy {
        RetrievalStrategy::from_workers(self.workers)
    }

    pub fn log_summary(&self) {
        info!("Output folder: {}", self.output_dir.display());
        info!(
            archive_timeout_secs = self.archive_timeout.as_secs(),
            document_timeout_secs = self.document_timeout.as_secs(),
            workers = self.workers,
            record_tag = %self.record_tag,
            "Ingest settings"
        );
    }
}
