//! # Shelfmark Common Library
//!
//! Shared code for the Shelfmark ingest pipeline:
//! - Canonical bibliographic data model (metadata, TOC, page list)
//! - Enrichment configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
