//! Progress-callback trait for per-page assembly events.
//!
//! Inject an [`Arc<dyn AssemblyProgressCallback>`] via
//! [`crate::config::AssemblerConfigBuilder::progress_callback`] to receive
//! events as the assembler scans each page. Callers can forward them to a
//! terminal progress bar, a channel, or a database record without the library
//! knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use pages2pdf::{AssemblyProgressCallback, AssemblerConfig, PageError};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl AssemblyProgressCallback for CountingCallback {
//!     fn on_page_error(&self, _page: usize, _total: usize, error: &PageError) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{error}");
//!     }
//! }
//!
//! let config = AssemblerConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PageError;
use std::path::Path;
use std::sync::Arc;

/// Called by the assembler as it processes each page.
///
/// Implementations must be `Send + Sync` because the assembler may run on a
/// blocking thread via [`crate::PageAssembler::convert_async`]. Pages are
/// reported strictly in order. All methods default to no-ops.
pub trait AssemblyProgressCallback: Send + Sync {
    /// Called once before the first page is read.
    fn on_assembly_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page file is read.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page decoded successfully.
    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page is corrupt or missing.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &PageError) {
        let _ = (page_num, total_pages, error);
    }

    /// Called before the PDF is written. Not called when any page failed.
    fn on_save_start(&self, output_path: &Path) {
        let _ = output_path;
    }

    /// Called once after all pages have been scanned (and the PDF written,
    /// if every page decoded).
    ///
    /// # Arguments
    /// * `total_pages`: pages in the document
    /// * `success_count`: pages that decoded without error
    fn on_assembly_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssemblyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssemblerConfig`].
pub type ProgressCallback = Arc<dyn AssemblyProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        saved: AtomicUsize,
    }

    impl AssemblyProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &PageError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_save_start(&self, _output_path: &Path) {
            self.saved.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_assembly_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2);
        cb.on_page_error(
            2,
            2,
            &PageError::Missing {
                page: 2,
                path: PathBuf::from("x/x-2.jpg"),
            },
        );
        cb.on_save_start(Path::new("x y.pdf"));
        cb.on_assembly_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2);
        tracker.on_page_start(2, 2);
        tracker.on_page_error(
            2,
            2,
            &PageError::Missing {
                page: 2,
                path: PathBuf::from("x/x-2.jpg"),
            },
        );

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.saved.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_assembly_start(10);
        cb.on_page_start(1, 10);
    }
}
