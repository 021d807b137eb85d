//! Configuration types for PDF extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Every call to [`crate::extract`]
//! receives its configuration explicitly; nothing is read from process-wide
//! state during a pass.
//!
//! # Injected collaborators
//! Rendering and OCR are external engines. A pre-built [`PageRenderer`] or
//! [`OcrEngine`] can be injected; when absent the pipeline falls back to
//! [`crate::pipeline::render::PdfiumRenderer`] and
//! [`crate::pipeline::ocr::TesseractOcr`].

use crate::error::ExtractError;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default mean-confidence threshold below which an OCR page is flagged.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 60.0;

/// Configuration for one extraction pass.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pagesift::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .use_ocr(true)
///     .ocr_language("deu")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.ocr_language, "deu");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Run OCR on pages whose selectable text is empty. Default: true.
    pub use_ocr: bool,

    /// Language tag passed to the OCR engine (tesseract `-l`). Default: "eng".
    pub ocr_language: String,

    /// User password for encrypted documents. The empty password is always
    /// tried first.
    pub password: Option<String>,

    /// DPI used when rendering a page for OCR. Range: 72–400. Default: 200.
    pub ocr_dpi: u32,

    /// DPI used when rasterising a page that carries vector content.
    /// Range: 72–400. Default: 200.
    pub raster_dpi: u32,

    /// Maximum rendered width or height in pixels. Default: 4000.
    ///
    /// Caps a high-DPI render of an oversized page so pdfium never allocates
    /// an unbounded bitmap.
    pub max_rendered_pixels: u32,

    /// Pages processed concurrently on the blocking pool. Default: number of
    /// available CPUs. `1` reproduces strictly sequential processing.
    pub concurrency: usize,

    /// Render vector pages and attach the raster to their vector visuals.
    /// Default: true.
    pub rasterize_vectors: bool,

    /// Threshold used by coverage reporting to flag low-confidence OCR pages.
    /// Range: 0–100. Default: 60.0.
    pub low_confidence_threshold: f64,

    /// Path or name of the tesseract executable. Default: `tesseract` on PATH.
    pub tesseract_cmd: PathBuf,

    /// Explicit pdfium shared library. When `None`, the working directory and
    /// then the system library path are searched.
    pub pdfium_library: Option<PathBuf>,

    /// Pre-constructed page renderer. Takes precedence over `pdfium_library`.
    pub renderer: Option<Arc<dyn PageRenderer>>,

    /// Pre-constructed OCR engine. When `None`, tesseract is used.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Progress and warning events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            use_ocr: true,
            ocr_language: "eng".to_string(),
            password: None,
            ocr_dpi: 200,
            raster_dpi: 200,
            max_rendered_pixels: 4000,
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            rasterize_vectors: true,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            tesseract_cmd: PathBuf::from("tesseract"),
            pdfium_library: None,
            renderer: None,
            ocr_engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("use_ocr", &self.use_ocr)
            .field("ocr_language", &self.ocr_language)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ocr_dpi", &self.ocr_dpi)
            .field("raster_dpi", &self.raster_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("rasterize_vectors", &self.rasterize_vectors)
            .field("low_confidence_threshold", &self.low_confidence_threshold)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("pdfium_library", &self.pdfium_library)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PageRenderer>"))
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn use_ocr(mut self, v: bool) -> Self {
        self.config.use_ocr = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    /// Set the OCR and vector rasterisation DPI together.
    pub fn dpi(self, dpi: u32) -> Self {
        self.ocr_dpi(dpi).raster_dpi(dpi)
    }

    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.config.ocr_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn raster_dpi(mut self, dpi: u32) -> Self {
        self.config.raster_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn rasterize_vectors(mut self, v: bool) -> Self {
        self.config.rasterize_vectors = v;
        self
    }

    pub fn low_confidence_threshold(mut self, t: f64) -> Self {
        self.config.low_confidence_threshold = t;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.ocr_language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if !(0.0..=100.0).contains(&c.low_confidence_threshold) {
            return Err(ExtractError::InvalidConfig(format!(
                "Confidence threshold must be 0–100, got {}",
                c.low_confidence_threshold
            )));
        }
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
