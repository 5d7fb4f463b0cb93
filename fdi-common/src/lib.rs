//! # FDI Common Library
//!
//! Shared code for the financial disclosure ingest tools including:
//! - Error types
//! - Configuration loading and output folder resolution
//! - Pipeline event types (IngestEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
