//! Result types returned by [`crate::PageAssembler::convert`].

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one assembly call.
///
/// `Failure` is not an error: it lists the pages that have to be fetched
/// again before the document can be assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    /// Every page decoded and the PDF was written.
    Success(ConversionReport),
    /// At least one page was corrupt or missing. No output was written.
    Failure(PageFailures),
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success(_))
    }
}

/// Statistics for a successful assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub id: String,
    pub title: String,
    /// Where the PDF was written.
    pub output_path: PathBuf,
    pub page_count: usize,
    /// Size of the PDF file.
    pub bytes_written: u64,
    /// Time spent reading and decoding page files.
    pub decode_duration_ms: u64,
    /// Time spent JPEG-encoding pages and building the PDF.
    pub encode_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Pages that prevented assembly, in page order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFailures {
    pub id: String,
    pub page_count: usize,
    pub errors: Vec<PageError>,
}

impl PageFailures {
    /// Pages whose files existed but could not be decoded.
    pub fn corrupt_pages(&self) -> Vec<usize> {
        self.errors
            .iter()
            .filter(|e| e.is_corrupt())
            .map(PageError::page)
            .collect()
    }

    /// Pages whose files did not exist.
    pub fn missing_pages(&self) -> Vec<usize> {
        self.errors
            .iter()
            .filter(|e| !e.is_corrupt())
            .map(PageError::page)
            .collect()
    }

    /// Every failed page, ascending. This is the list to hand back to the
    /// fetcher.
    pub fn pages_to_refetch(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.errors.iter().map(PageError::page).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}
