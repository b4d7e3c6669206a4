//! Error types for the pages2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pages2PdfError`]: **Fatal**: the assembly cannot proceed at all
//!   (unreadable page for an unexpected reason, invalid document, output
//!   cannot be written). Returned as `Err(Pages2PdfError)` from
//!   [`crate::PageAssembler::convert`].
//!
//! * [`PageError`]: **Non-fatal**: a single page is corrupt or missing.
//!   Scanning continues, the page is recorded in
//!   [`crate::output::PageFailures`], and the whole call degrades to
//!   [`crate::ConversionResult::Failure`] without writing any output.
//!
//! A `Failure` result is the normal "re-fetch these pages and run again"
//! signal, not an error.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pages2pdf library.
///
/// Page-level corrupt/missing conditions use [`PageError`] and never surface
/// here.
#[derive(Debug, Error)]
pub enum Pages2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The document description itself is unusable (empty id, zero pages…).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A page could not be opened or decoded for a reason other than being
    /// corrupt or missing (permission denied, decoder limits, …).
    #[error("Page {page} ('{path}') failed with an unexpected error: {detail}")]
    UnclassifiedPage {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// A corrupt page was found but could not be deleted.
    #[error("Failed to remove corrupt page '{path}': {source}\nRemove it manually before re-fetching.")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Building the PDF container failed.
    #[error("PDF encoding failed: {0}")]
    PdfEncode(String),

    /// Output file already exists and overwriting is disabled.
    #[error("Output file already exists: '{path}'\nRemove it or allow overwriting.")]
    OutputExists { path: PathBuf },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Both variants mean "this page has to be fetched again". Corrupt pages have
/// already been deleted by the time this value is observed (unless deletion
/// was disabled in the configuration).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageError {
    /// The file exists but the image codec could not decode it.
    #[error("Page {page}: corrupt image '{path}': {detail}")]
    Corrupt {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// No file exists at the expected path.
    #[error("Page {page}: image '{path}' not found")]
    Missing { page: usize, path: PathBuf },
}

impl PageError {
    /// 1-indexed page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Corrupt { page, .. } | PageError::Missing { page, .. } => *page,
        }
    }

    /// Path of the page file.
    pub fn path(&self) -> &std::path::Path {
        match self {
            PageError::Corrupt { path, .. } | PageError::Missing { path, .. } => path,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, PageError::Corrupt { .. })
    }
}
