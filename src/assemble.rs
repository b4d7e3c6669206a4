//! The page assembler: scan every page of a document, then write one PDF or
//! report which pages must be fetched again.
//!
//! ## All-or-nothing output
//!
//! A PDF is written only when every page decodes. A corrupt or missing page
//! does not stop the scan: the remaining pages are still read, so one call
//! reports every bad page at once. Corrupt files are deleted as they are
//! found so the next fetch pass downloads them again.
//!
//! Decoded pages are kept in memory until the trailing batch encode. Once the
//! first page fails, decoded pixels are dropped as they arrive since no output
//! will be written.

use crate::config::AssemblerConfig;
use crate::document::Document;
use crate::error::{PageError, Pages2PdfError};
use crate::output::{ConversionReport, ConversionResult, PageFailures};
use crate::pipeline::load::{self, PageImage, PageOutcome};
use crate::pipeline::{flatten, pdf};
use crate::storage::{FsStore, PageStore};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Assembles page images into PDFs according to an [`AssemblerConfig`].
///
/// Cheap to clone: the store is shared.
#[derive(Clone)]
pub struct PageAssembler {
    config: AssemblerConfig,
    store: Arc<dyn PageStore>,
}

impl std::fmt::Debug for PageAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageAssembler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PageAssembler {
    /// Assembler over the local filesystem.
    pub fn new(config: AssemblerConfig) -> Self {
        Self::with_store(config, Arc::new(FsStore))
    }

    /// Assembler over an arbitrary [`PageStore`].
    pub fn with_store(config: AssemblerConfig, store: Arc<dyn PageStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Where the PDF for `document` is (or would be) written.
    pub fn output_path(&self, document: &Document) -> PathBuf {
        self.config
            .output_dir()
            .join(document.output_file_name())
    }

    /// Path of page `page` of `document`.
    pub fn page_path(&self, document: &Document, page: usize) -> PathBuf {
        document.page_path(&self.config.working_dir, page, &self.config.image_extension)
    }

    /// Assemble `document` into a PDF.
    ///
    /// # Returns
    /// * `Ok(ConversionResult::Success)`: every page decoded; the PDF was
    ///   written to [`Self::output_path`].
    /// * `Ok(ConversionResult::Failure)`: one or more pages were corrupt or
    ///   missing; nothing was written and corrupt pages were deleted.
    ///
    /// # Errors
    /// Returns `Err(Pages2PdfError)` only for fatal conditions:
    /// - a page failed to open or decode for any other reason
    /// - a corrupt page could not be deleted
    /// - the output exists and overwriting is disabled
    /// - the PDF could not be built or written
    pub fn convert(&self, document: &Document) -> Result<ConversionResult, Pages2PdfError> {
        let total_start = Instant::now();
        let config = &self.config;
        let total = document.page_count();
        let output_path = self.output_path(document);

        if !config.overwrite && self.store.exists(&output_path) {
            return Err(Pages2PdfError::OutputExists { path: output_path });
        }

        info!("Assembling {} ({} pages)", document.display_name(), total);
        if let Some(ref cb) = config.progress_callback {
            cb.on_assembly_start(total);
        }

        // ── Step 1: Scan pages in order ──────────────────────────────────
        let decode_start = Instant::now();
        let mut decoded: Vec<PageImage> = Vec::with_capacity(total);
        let mut errors: Vec<PageError> = Vec::new();
        let mut ok_pages = 0usize;

        for page in document.pages() {
            let path = self.page_path(document, page);
            let file_name = document.page_file_name(page, &config.image_extension);
            info!("Converting {}", file_name);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page, total);
            }

            let error = match load::load_page(self.store.as_ref(), &path, page)? {
                PageOutcome::Decoded(img) => {
                    ok_pages += 1;
                    if errors.is_empty() {
                        decoded.push(PageImage {
                            page,
                            image: flatten::flatten(img, config.background),
                        });
                    }
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_complete(page, total);
                    }
                    continue;
                }
                PageOutcome::Corrupt { detail } => {
                    if config.delete_corrupt {
                        self.remove_corrupt(&path)?;
                        warn!("{}: removed corrupted image ({})", file_name, detail);
                    } else {
                        warn!("{}: corrupted image kept ({})", file_name, detail);
                    }
                    PageError::Corrupt { page, path, detail }
                }
                PageOutcome::Missing => {
                    warn!("{}: image not found", file_name);
                    PageError::Missing { page, path }
                }
            };

            if let Some(ref cb) = config.progress_callback {
                cb.on_page_error(page, total, &error);
            }
            if errors.is_empty() {
                decoded.clear();
                decoded.shrink_to_fit();
            }
            errors.push(error);
        }
        let decode_duration_ms = decode_start.elapsed().as_millis() as u64;

        // ── Step 2: Bail out without output if any page failed ───────────
        if !errors.is_empty() {
            let failures = PageFailures {
                id: document.id().to_string(),
                page_count: total,
                errors,
            };
            warn!(
                "{}: {} of {} pages need re-fetching: {:?}",
                document.display_name(),
                failures.errors.len(),
                total,
                failures.pages_to_refetch()
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_assembly_complete(total, ok_pages);
            }
            return Ok(ConversionResult::Failure(failures));
        }

        // ── Step 3: Encode all pages into one PDF ────────────────────────
        let encode_start = Instant::now();
        let options = pdf::PdfOptions {
            dpi: config.dpi,
            jpeg_quality: config.jpeg_quality,
            title: config.write_metadata.then(|| document.display_name()),
        };
        let bytes = pdf::assemble_pdf(&decoded, &options)?;
        drop(decoded);
        let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

        // ── Step 4: Write ────────────────────────────────────────────────
        info!("Saving {}...", document.output_file_name());
        if let Some(ref cb) = config.progress_callback {
            cb.on_save_start(&output_path);
        }
        // Only the configured directory is created. A title that contains a
        // path separator fails here instead of growing a directory tree.
        let output_dir = config.output_dir();
        self.store
            .create_dir_all(output_dir)
            .map_err(|e| Pages2PdfError::OutputWriteFailed {
                path: output_dir.to_path_buf(),
                source: e,
            })?;
        self.store
            .write_atomic(&output_path, &bytes)
            .map_err(|e| Pages2PdfError::OutputWriteFailed {
                path: output_path.clone(),
                source: e,
            })?;

        let report = ConversionReport {
            id: document.id().to_string(),
            title: document.title().to_string(),
            output_path,
            page_count: total,
            bytes_written: bytes.len() as u64,
            decode_duration_ms,
            encode_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Assembly complete: {} pages, {} bytes, {}ms total",
            report.page_count, report.bytes_written, report.total_duration_ms
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_assembly_complete(total, ok_pages);
        }

        Ok(ConversionResult::Success(report))
    }

    /// Run [`Self::convert`] on tokio's blocking pool.
    ///
    /// Decoding and JPEG encoding are CPU-bound and the store does blocking
    /// I/O, so neither may run on an async worker thread.
    pub async fn convert_async(
        &self,
        document: Document,
    ) -> Result<ConversionResult, Pages2PdfError> {
        let assembler = self.clone();
        tokio::task::spawn_blocking(move || assembler.convert(&document))
            .await
            .map_err(|e| Pages2PdfError::Internal(format!("assembly task failed: {e}")))?
    }

    /// Page numbers whose files are absent, ascending.
    ///
    /// After a `Failure` this is exactly the set a fetch pass must download:
    /// missing pages were never there and corrupt pages have been deleted.
    pub fn pending_pages(&self, document: &Document) -> Vec<usize> {
        document
            .pages()
            .filter(|&page| !self.store.exists(&self.page_path(document, page)))
            .collect()
    }

    fn remove_corrupt(&self, path: &Path) -> Result<(), Pages2PdfError> {
        match self.store.remove(path) {
            Ok(()) => Ok(()),
            // Already gone; the goal state is reached.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} vanished before removal", path.display());
                Ok(())
            }
            Err(source) => Err(Pages2PdfError::CleanupFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::AssemblyProgressCallback;
    use crate::storage::MemoryStore;
    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    fn jpeg(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb([30, 60, 90]));
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 90)
            .encode_image(&img)
            .unwrap();
        buf
    }

    fn rgba_png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([255, 0, 0, 64]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn setup() -> (Arc<MemoryStore>, PageAssembler) {
        let store = Arc::new(MemoryStore::new());
        let config = AssemblerConfig::builder().working_dir("w").build().unwrap();
        let assembler = PageAssembler::with_store(config, store.clone());
        (store, assembler)
    }

    fn textured_jpeg(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x * 5) as u8, (y * 3) as u8, (x ^ y) as u8]));
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 90)
            .encode_image(&img)
            .unwrap();
        buf
    }

    fn pdf_page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn all_pages_valid_writes_pdf() {
        let (store, asm) = setup();
        let doc = Document::new("5", "Five", 3).unwrap();
        for p in 1..=3 {
            store.insert(asm.page_path(&doc, p), jpeg(8 * p as u32, 8));
        }

        let result = asm.convert(&doc).unwrap();
        let ConversionResult::Success(report) = result else {
            panic!("expected success");
        };
        assert_eq!(report.output_path, PathBuf::from("w/5 Five.pdf"));
        assert_eq!(report.page_count, 3);

        let bytes = store.get(&report.output_path).unwrap();
        assert_eq!(report.bytes_written, bytes.len() as u64);
        assert_eq!(pdf_page_count(&bytes), 3);
    }

    #[test]
    fn missing_middle_page_fails_without_output() {
        let (store, asm) = setup();
        let doc = Document::new("42", "Sample", 3).unwrap();
        let p1 = jpeg(4, 4);
        let p3 = jpeg(6, 6);
        store.insert(asm.page_path(&doc, 1), p1.clone());
        store.insert(asm.page_path(&doc, 3), p3.clone());

        let ConversionResult::Failure(f) = asm.convert(&doc).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(f.missing_pages(), vec![2]);
        assert!(f.corrupt_pages().is_empty());
        assert!(store.get(Path::new("w/42 Sample.pdf")).is_none());
        assert_eq!(store.get(&asm.page_path(&doc, 1)), Some(p1));
        assert_eq!(store.get(&asm.page_path(&doc, 3)), Some(p3));
    }

    #[test]
    fn rgba_pages_are_flattened() {
        let (store, asm) = setup();
        let doc = Document::new("7", "Doc", 2).unwrap();
        store.insert(asm.page_path(&doc, 1), rgba_png(5, 5));
        store.insert(asm.page_path(&doc, 2), rgba_png(7, 3));

        assert!(asm.convert(&doc).unwrap().is_success());

        let bytes = store.get(Path::new("w/7 Doc.pdf")).unwrap();
        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(pdf.get_pages().len(), 2);
        let images: Vec<_> = pdf
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Subtype")
                    .and_then(|v| v.as_name())
                    .is_ok_and(|n| n == b"Image")
            })
            .collect();
        assert_eq!(images.len(), 2);
        for img in images {
            assert_eq!(img.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
            assert!(img.dict.get(b"SMask").is_err());
        }
    }

    #[test]
    fn truncated_last_page_is_deleted() {
        let (store, asm) = setup();
        let doc = Document::new("9", "Nine", 2).unwrap();
        let good = jpeg(16, 16);
        store.insert(asm.page_path(&doc, 1), good.clone());
        // Cut inside the entropy-coded scan, after every header segment.
        let full = textured_jpeg(64, 64);
        store.insert(asm.page_path(&doc, 2), full[..full.len() * 3 / 4].to_vec());

        let ConversionResult::Failure(f) = asm.convert(&doc).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(f.corrupt_pages(), vec![2]);
        assert_eq!(store.get(&asm.page_path(&doc, 1)), Some(good));
        assert_eq!(store.paths(), vec![asm.page_path(&doc, 1)]);
    }

    #[test]
    fn scan_continues_after_first_failure() {
        let (store, asm) = setup();
        let doc = Document::new("3", "T", 4).unwrap();
        store.insert(asm.page_path(&doc, 2), b"not an image".to_vec());
        store.insert(asm.page_path(&doc, 3), jpeg(4, 4));

        let ConversionResult::Failure(f) = asm.convert(&doc).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(f.pages_to_refetch(), vec![1, 2, 4]);
        assert_eq!(f.corrupt_pages(), vec![2]);
        assert_eq!(asm.pending_pages(&doc), vec![1, 2, 4]);
    }

    #[test]
    fn keep_corrupt_leaves_file() {
        let store = Arc::new(MemoryStore::new());
        let config = AssemblerConfig::builder()
            .working_dir("w")
            .delete_corrupt(false)
            .build()
            .unwrap();
        let asm = PageAssembler::with_store(config, store.clone());
        let doc = Document::new("1", "One", 1).unwrap();
        store.insert(asm.page_path(&doc, 1), b"garbage".to_vec());

        assert!(!asm.convert(&doc).unwrap().is_success());
        assert!(store.get(&asm.page_path(&doc, 1)).is_some());
    }

    #[test]
    fn unclassified_error_propagates() {
        let (store, asm) = setup();
        let doc = Document::new("1", "One", 2).unwrap();
        store.insert(asm.page_path(&doc, 1), jpeg(4, 4));
        store.insert(asm.page_path(&doc, 2), jpeg(4, 4));
        store.fail_reads(asm.page_path(&doc, 1), io::ErrorKind::PermissionDenied);

        let err = asm.convert(&doc).unwrap_err();
        assert!(matches!(err, Pages2PdfError::UnclassifiedPage { page: 1, .. }));
        assert!(store.get(&asm.page_path(&doc, 1)).is_some());
    }

    #[test]
    fn undecodable_known_format_is_kept_and_fatal() {
        let (store, asm) = setup();
        let doc = Document::new("8", "Eight", 2).unwrap();
        // 1x1 24-bit BMP; the format is recognised but no decoder is built in.
        let mut bmp = b"BM".to_vec();
        for v in [58u32, 0, 54, 40, 1, 1] {
            bmp.extend_from_slice(&v.to_le_bytes());
        }
        bmp.extend_from_slice(&1u16.to_le_bytes());
        bmp.extend_from_slice(&24u16.to_le_bytes());
        for v in [0u32, 4, 2835, 2835, 0, 0] {
            bmp.extend_from_slice(&v.to_le_bytes());
        }
        bmp.extend_from_slice(&[0, 0, 0xFF, 0]);
        store.insert(asm.page_path(&doc, 1), jpeg(4, 4));
        store.insert(asm.page_path(&doc, 2), bmp.clone());

        let err = asm.convert(&doc).unwrap_err();
        assert!(matches!(err, Pages2PdfError::UnclassifiedPage { page: 2, .. }));
        assert_eq!(store.get(&asm.page_path(&doc, 2)), Some(bmp));
        assert!(store.get(&asm.output_path(&doc)).is_none());
    }

    #[test]
    fn gif_page_under_jpg_name_is_assembled() {
        let (store, asm) = setup();
        let doc = Document::new("8", "Gif", 1).unwrap();
        let mut gif = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([0, 200, 0, 255])))
            .write_to(&mut Cursor::new(&mut gif), ImageFormat::Gif)
            .unwrap();
        store.insert(asm.page_path(&doc, 1), gif);

        assert!(asm.convert(&doc).unwrap().is_success());
        assert_eq!(pdf_page_count(&store.get(&asm.output_path(&doc)).unwrap()), 1);
    }

    #[test]
    fn title_with_separator_fails_without_nested_dir() {
        let (store, asm) = setup();
        let doc = Document::new("7", "AC/DC", 1).unwrap();
        store.insert(asm.page_path(&doc, 1), jpeg(4, 4));

        let err = asm.convert(&doc).unwrap_err();
        assert!(matches!(err, Pages2PdfError::OutputWriteFailed { .. }));
        assert_eq!(asm.config().output_dir(), Path::new("w"));
        assert!(!store.is_dir(Path::new("w/7 AC")));
        assert_eq!(store.paths(), vec![asm.page_path(&doc, 1)]);
    }

    #[test]
    fn alternate_output_dir() {
        let store = Arc::new(MemoryStore::new());
        store.create_dir("w/hentai");
        let config = AssemblerConfig::builder()
            .working_dir("w")
            .resolve_output_dir(&*store, crate::config::DEFAULT_ALTERNATE_DIR)
            .build()
            .unwrap();
        let asm = PageAssembler::with_store(config, store.clone());
        let doc = Document::new("2", "Two", 1).unwrap();
        store.insert(asm.page_path(&doc, 1), jpeg(4, 4));

        assert!(asm.convert(&doc).unwrap().is_success());
        assert!(store.get(Path::new("w/hentai/2 Two.pdf")).is_some());
        assert!(store.get(Path::new("w/2 Two.pdf")).is_none());
    }

    #[test]
    fn no_overwrite_rejects_before_scanning() {
        let store = Arc::new(MemoryStore::new());
        let config = AssemblerConfig::builder()
            .working_dir("w")
            .overwrite(false)
            .build()
            .unwrap();
        let asm = PageAssembler::with_store(config, store.clone());
        let doc = Document::new("1", "One", 1).unwrap();
        store.insert("w/1 One.pdf", b"old".to_vec());
        store.insert(asm.page_path(&doc, 1), b"garbage".to_vec());

        let err = asm.convert(&doc).unwrap_err();
        assert!(matches!(err, Pages2PdfError::OutputExists { .. }));
        // Corrupt page untouched because nothing was scanned.
        assert!(store.get(&asm.page_path(&doc, 1)).is_some());
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl AssemblyProgressCallback for Recorder {
        fn on_assembly_start(&self, total: usize) {
            self.0.lock().unwrap().push(format!("start {total}"));
        }
        fn on_page_complete(&self, page: usize, _total: usize) {
            self.0.lock().unwrap().push(format!("ok {page}"));
        }
        fn on_page_error(&self, page: usize, _total: usize, _error: &PageError) {
            self.0.lock().unwrap().push(format!("err {page}"));
        }
        fn on_save_start(&self, _path: &Path) {
            self.0.lock().unwrap().push("save".into());
        }
        fn on_assembly_complete(&self, total: usize, ok: usize) {
            self.0.lock().unwrap().push(format!("done {ok}/{total}"));
        }
    }

    #[test]
    fn progress_events_in_order() {
        let store = Arc::new(MemoryStore::new());
        let recorder = Arc::new(Recorder::default());
        let config = AssemblerConfig::builder()
            .working_dir("w")
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let asm = PageAssembler::with_store(config, store.clone());
        let doc = Document::new("4", "Four", 2).unwrap();
        store.insert(asm.page_path(&doc, 1), jpeg(4, 4));

        asm.convert(&doc).unwrap();
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["start 2", "ok 1", "err 2", "done 1/2"]
        );

        store.insert(asm.page_path(&doc, 2), jpeg(4, 4));
        recorder.0.lock().unwrap().clear();
        asm.convert(&doc).unwrap();
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["start 2", "ok 1", "ok 2", "save", "done 2/2"]
        );
    }

    #[test]
    fn metadata_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let config = AssemblerConfig::builder()
            .working_dir("w")
            .write_metadata(false)
            .build()
            .unwrap();
        let asm = PageAssembler::with_store(config, store.clone());
        let doc = Document::new("6", "Six", 1).unwrap();
        store.insert(asm.page_path(&doc, 1), jpeg(4, 4));

        asm.convert(&doc).unwrap();
        let pdf = lopdf::Document::load_mem(&store.get(Path::new("w/6 Six.pdf")).unwrap()).unwrap();
        assert!(pdf.trailer.get(b"Info").is_err());
    }
}
