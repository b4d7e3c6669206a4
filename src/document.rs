//! The logical document: identifier, title and page count, plus the naming
//! scheme that maps it onto page files and an output file.

use crate::error::Pages2PdfError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A multi-page document identified by `id` and rendered as one PDF.
///
/// Page files live at `<working_dir>/<id>/<id>-<n>.<ext>` for `n` in
/// `1..=page_count`; the output is named `<id> <title>.pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    title: String,
    page_count: usize,
}

impl Document {
    /// Create a document, validating the id and the page count.
    ///
    /// The title is used verbatim and is not checked for characters that are
    /// unsafe in file names.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        page_count: usize,
    ) -> Result<Self, Pages2PdfError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Pages2PdfError::InvalidDocument(
                "document id must not be empty".into(),
            ));
        }
        // The id doubles as a directory name; keep it to one path component.
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(Pages2PdfError::InvalidDocument(format!(
                "document id '{id}' must be a single path component"
            )));
        }
        if page_count == 0 {
            return Err(Pages2PdfError::InvalidDocument(format!(
                "document '{id}' must have at least one page"
            )));
        }
        Ok(Self {
            id,
            title: title.into(),
            page_count,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Page numbers in document order.
    pub fn pages(&self) -> impl Iterator<Item = usize> {
        1..=self.page_count
    }

    /// Directory holding this document's page files.
    pub fn page_dir(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(&self.id)
    }

    /// File name of page `page`, e.g. `42-3.jpg`.
    pub fn page_file_name(&self, page: usize, extension: &str) -> String {
        format!("{}-{}.{}", self.id, page, extension)
    }

    /// Full path of page `page` below `working_dir`.
    pub fn page_path(&self, working_dir: &Path, page: usize, extension: &str) -> PathBuf {
        self.page_dir(working_dir)
            .join(self.page_file_name(page, extension))
    }

    /// Output file name, e.g. `42 Sample.pdf`.
    pub fn output_file_name(&self) -> String {
        format!("{} {}.pdf", self.id, self.title)
    }

    /// Name written into the PDF Info dictionary.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.id, self.title)
    }
}
