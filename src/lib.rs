//! # pages2pdf
//!
//! Assemble a document's per-page image files into a single PDF.
//!
//! ## Why this crate?
//!
//! Page downloaders leave behind one image per page, and some of those
//! images are truncated or are error pages saved with a `.jpg` name. This
//! crate scans every page and deletes the ones that fail to decode. JPEGs
//! that stop before their end-of-image marker count as failed too, since
//! decoders would quietly pad the missing rows with grey. A PDF is only
//! written when the whole document is intact. A failed call returns the
//! exact list of pages to fetch again, so "re-fetch, re-run" converges.
//!
//! ## Pipeline Overview
//!
//! ```text
//! <id>/<id>-1.jpg … <id>/<id>-N.jpg
//!  │
//!  ├─ 1. Load     read + decode; classify corrupt / missing
//!  ├─ 2. Flatten  composite alpha onto an opaque background
//!  ├─ 3. Encode   baseline JPEG per page (DCTDecode)
//!  ├─ 4. PDF      one page per image, in page order (lopdf)
//!  └─ 5. Output   atomic write of "<id> <title>.pdf"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pages2pdf::{AssemblerConfig, ConversionResult, Document, FsStore, PageAssembler};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssemblerConfig::builder()
//!         .working_dir(".")
//!         .resolve_output_dir(&FsStore, pages2pdf::DEFAULT_ALTERNATE_DIR)
//!         .build()?;
//!     let document = Document::new("42", "Sample", 3)?;
//!
//!     match PageAssembler::new(config).convert(&document)? {
//!         ConversionResult::Success(report) => {
//!             println!("wrote {}", report.output_path.display());
//!         }
//!         ConversionResult::Failure(failures) => {
//!             println!("re-fetch pages {:?}", failures.pages_to_refetch());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pages2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pages2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::PageAssembler;
pub use config::{resolve_output_dir, AssemblerConfig, AssemblerConfigBuilder, DEFAULT_ALTERNATE_DIR};
pub use document::Document;
pub use error::{PageError, Pages2PdfError};
pub use output::{ConversionReport, ConversionResult, PageFailures};
pub use progress::{AssemblyProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{FsStore, MemoryStore, PageStore};
