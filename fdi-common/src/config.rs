//! Configuration loading and output folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops a run: it is logged and the
//! compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the output folder
pub const OUTPUT_DIR_ENV: &str = "FDI_OUTPUT_DIR";

/// Environment variable pointing at an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "FDI_CONFIG";

/// Remote archive address; `{year}` is substituted
pub const DEFAULT_ARCHIVE_URL_TEMPLATE: &str =
    "https://disclosures-clerk.house.gov/public_disc/financial-pdfs/{year}FD.zip";

/// Remote document address; `{year}` and `{doc_id}` are substituted
pub const DEFAULT_DOCUMENT_URL_TEMPLATE: &str =
    "https://disclosures-clerk.house.gov/public_disc/ptr-pdfs/{year}/{doc_id}.pdf";

/// Element name of one disclosure record in the archive's XML entry
pub const DEFAULT_RECORD_TAG: &str = "Member";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent values fall through to
/// [`CompiledDefaults`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder for every persisted artifact
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Archive URL template (`{year}` placeholder)
    #[serde(default)]
    pub archive_url_template: Option<String>,

    /// Document URL template (`{year}` and `{doc_id}` placeholders)
    #[serde(default)]
    pub document_url_template: Option<String>,

    /// Archive request timeout in seconds
    #[serde(default)]
    pub archive_timeout_secs: Option<u64>,

    /// Per-document request timeout in seconds
    #[serde(default)]
    pub document_timeout_secs: Option<u64>,

    /// Concurrent document fetches (1 = sequential)
    #[serde(default)]
    pub workers: Option<usize>,

    /// XML element name holding one record
    #[serde(default)]
    pub record_tag: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))
    }

    /// Load the config file if one can be found, otherwise return defaults
    ///
    /// Lookup order: `explicit` path, then `FDI_CONFIG`, then
    /// `<config_dir>/fdi/config.toml`.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let Some(path) = candidate else {
            debug!("No config directory available, using compiled defaults");
            return Self::default();
        };

        if !path.exists() {
            if explicit.is_some() {
                warn!("Config file {} not found, using compiled defaults", path.display());
            } else {
                debug!("No config file at {}, using compiled defaults", path.display());
            }
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using compiled defaults", e);
                Self::default()
            }
        }
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fdi").join("config.toml"))
}

/// Compiled-in fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub output_dir: PathBuf,
    pub archive_url_template: String,
    pub document_url_template: String,
    pub archive_timeout_secs: u64,
    pub document_timeout_secs: u64,
    pub workers: usize,
    pub record_tag: String,
}

impl CompiledDefaults {
    /// Defaults for the platform the binary runs on
    ///
    /// Output lands in `<Downloads>/CongressionalFDs`, or a relative
    /// `CongressionalFDs` folder when no download directory is known.
    pub fn for_current_platform() -> Self {
        let output_dir = dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
            .map(|d| d.join("CongressionalFDs"))
            .unwrap_or_else(|| PathBuf::from("CongressionalFDs"));

        Self {
            output_dir,
            archive_url_template: DEFAULT_ARCHIVE_URL_TEMPLATE.to_string(),
            document_url_template: DEFAULT_DOCUMENT_URL_TEMPLATE.to_string(),
            archive_timeout_secs: 30,
            document_timeout_secs: 10,
            workers: 1,
            record_tag: DEFAULT_RECORD_TAG.to_string(),
        }
    }
}

/// Output folder resolution (CLI → ENV → TOML → compiled default)
pub struct OutputFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl OutputFolderResolver {
    pub fn new(toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg: None,
            toml_value: toml_config.output_dir.clone(),
        }
    }

    /// Command-line value, takes priority over everything else
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(OUTPUT_DIR_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().output_dir
    }
}

/// Owns the output folder layout and creates it on demand
#[derive(Debug, Clone)]
pub struct OutputFolderInitializer {
    root: PathBuf,
}

impl OutputFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the output folder and the document subfolder (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            info!("Creating output folder: {}", self.root.display());
        }
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.documents_dir())?;
        Ok(())
    }

    /// Raw archive location for a year, e.g. `2024FD.zip`
    pub fn archive_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("{}FD.zip", year))
    }

    /// Normalized record set (JSON array)
    pub fn records_path(&self) -> PathBuf {
        self.root.join("financial_disclosure.json")
    }

    /// Folder holding one file per retrieved document
    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("DownloadedPDFs")
    }

    /// Failure manifest, written only when a document fetch fails
    pub fn failure_manifest_path(&self) -> PathBuf {
        self.root.join("failed_files.json")
    }
}
