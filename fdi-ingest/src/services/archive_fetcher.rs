//! Yearly disclosure archive download
//!
//! One GET per run, bounded by the archive timeout. No retry: the pipeline
//! treats a failed download as fatal for the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fdi_common::config::OutputFolderInitializer;
use tracing::{debug, info};

use super::http;
use crate::error::IngestResult;

/// Archive persisted on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    /// Year the archive was fetched for (unknown for local files)
    pub year: Option<i32>,
    /// Location of the archive blob
    pub path: PathBuf,
    /// Size of the blob in bytes
    pub size_bytes: u64,
}

impl ArchiveHandle {
    /// Reference an archive that is already on disk
    pub fn from_path(path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref().to_path_buf();
        let size_bytes = std::fs::metadata(&path)?.len();
        Ok(Self {
            year: None,
            path,
            size_bytes,
        })
    }
}

/// Archive endpoint client
pub struct ArchiveFetcher {
    http_client: reqwest::Client,
    url_template: String,
    layout: OutputFolderInitializer,
}

impl ArchiveFetcher {
    pub fn new(
        url_template: impl Into<String>,
        timeout: Duration,
        layout: OutputFolderInitializer,
    ) -> IngestResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            url_template: url_template.into(),
            layout,
        })
    }

    pub fn archive_url(&self, year: i32) -> String {
        self.url_template.replace("{year}", &year.to_string())
    }

    /// Download the archive for `year` and write it under the output folder
    pub async fn fetch(&self, year: i32) -> IngestResult<ArchiveHandle> {
        let url = self.archive_url(year);
        debug!(year, url = %url, "Requesting disclosure archive");

        let body = http::get_bytes(&self.http_client, &url).await?;

        tokio::fs::create_dir_all(self.layout.root()).await?;
        let path = self.layout.archive_path(year);
        tokio::fs::write(&path, &body).await?;

        info!(
            year,
            path = %path.display(),
            bytes = body.len(),
            "Downloaded disclosure archive"
        );

        Ok(ArchiveHandle {
            year: Some(year),
            path,
            size_bytes: body.len() as u64,
        })
    }
}
