//! Configuration types for page assembly.
//!
//! All assembly behaviour is controlled through [`AssemblerConfig`], built via
//! its [`AssemblerConfigBuilder`]. Every knob lives in one struct so a config
//! can be cloned onto a blocking thread and logged as a whole.
//!
//! The output directory is part of the configuration rather than something
//! the assembler probes for itself: callers resolve it once (usually with
//! [`resolve_output_dir`]) and inject the result.

use crate::error::Pages2PdfError;
use crate::progress::AssemblyProgressCallback;
use crate::storage::PageStore;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Name of the directory that, when present in the working directory,
/// receives finished PDFs instead of the working directory itself.
pub const DEFAULT_ALTERNATE_DIR: &str = "hentai";

/// Configuration for assembling one document.
///
/// Built via [`AssemblerConfig::builder()`] or using
/// [`AssemblerConfig::default()`].
///
/// # Example
/// ```rust
/// use pages2pdf::AssemblerConfig;
///
/// let config = AssemblerConfig::builder()
///     .working_dir("downloads")
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_dir(), std::path::Path::new("downloads"));
/// ```
#[derive(Clone)]
pub struct AssemblerConfig {
    /// Directory containing one sub-directory of page files per document.
    /// Default: `.`.
    pub working_dir: PathBuf,

    /// Directory the finished PDF is written to. `None` means `working_dir`.
    pub output_dir: Option<PathBuf>,

    /// Extension of page files, without the dot. Default: `jpg`.
    ///
    /// Only used to build paths; the image format is sniffed from content.
    pub image_extension: String,

    /// JPEG quality used when embedding pages into the PDF. Range 1–100.
    /// Default: 90.
    pub jpeg_quality: u8,

    /// Pixel density used to size PDF pages. Default: 72, so one pixel maps
    /// to one PDF point.
    pub dpi: u32,

    /// Opaque colour that transparent pixels are composited onto. Default:
    /// white.
    pub background: [u8; 3],

    /// Delete page files that fail to decode. Default: true.
    pub delete_corrupt: bool,

    /// Replace an existing output file. Default: true.
    pub overwrite: bool,

    /// Write a PDF Info dictionary (title, creator, producer). Default: true.
    pub write_metadata: bool,

    /// Optional per-page progress events.
    pub progress_callback: Option<Arc<dyn AssemblyProgressCallback>>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            output_dir: None,
            image_extension: "jpg".to_string(),
            jpeg_quality: 90,
            dpi: 72,
            background: [255, 255, 255],
            delete_corrupt: true,
            overwrite: true,
            write_metadata: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AssemblerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblerConfig")
            .field("working_dir", &self.working_dir)
            .field("output_dir", &self.output_dir)
            .field("image_extension", &self.image_extension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("dpi", &self.dpi)
            .field("background", &self.background)
            .field("delete_corrupt", &self.delete_corrupt)
            .field("overwrite", &self.overwrite)
            .field("write_metadata", &self.write_metadata)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn AssemblyProgressCallback>"),
            )
            .finish()
    }
}

impl AssemblerConfig {
    /// Create a new builder for `AssemblerConfig`.
    pub fn builder() -> AssemblerConfigBuilder {
        AssemblerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective output directory.
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.working_dir)
    }
}

/// Builder for [`AssemblerConfig`].
#[derive(Debug)]
pub struct AssemblerConfigBuilder {
    config: AssemblerConfig,
}

impl AssemblerConfigBuilder {
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    /// Pick the output directory with [`resolve_output_dir`] against the
    /// current working directory. Call after [`Self::working_dir`].
    pub fn resolve_output_dir(mut self, store: &dyn PageStore, alternate: &str) -> Self {
        let dir = resolve_output_dir(store, &self.config.working_dir, alternate);
        self.config.output_dir = Some(dir);
        self
    }

    pub fn image_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.image_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(36, 600);
        self
    }

    pub fn background(mut self, rgb: [u8; 3]) -> Self {
        self.config.background = rgb;
        self
    }

    pub fn delete_corrupt(mut self, v: bool) -> Self {
        self.config.delete_corrupt = v;
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    pub fn write_metadata(mut self, v: bool) -> Self {
        self.config.write_metadata = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn AssemblyProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblerConfig, Pages2PdfError> {
        let c = &self.config;
        if c.image_extension.is_empty() {
            return Err(Pages2PdfError::InvalidConfig(
                "image extension must not be empty".into(),
            ));
        }
        if c.image_extension.contains(['/', '\\']) {
            return Err(Pages2PdfError::InvalidConfig(format!(
                "image extension '{}' must not contain path separators",
                c.image_extension
            )));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(Pages2PdfError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.dpi == 0 {
            return Err(Pages2PdfError::InvalidConfig("DPI must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Choose where finished PDFs go.
///
/// Returns `<working_dir>/<alternate>` when that directory exists in `store`,
/// otherwise `working_dir`.
pub fn resolve_output_dir(store: &dyn PageStore, working_dir: &Path, alternate: &str) -> PathBuf {
    let candidate = working_dir.join(alternate);
    if !alternate.is_empty() && store.is_dir(&candidate) {
        debug!("Alternate output directory found: {}", candidate.display());
        candidate
    } else {
        working_dir.to_path_buf()
    }
}
