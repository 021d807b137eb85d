//! Page rasterisation: render one page of a PDF to a `DynamicImage` via pdfium.
//!
//! Rendering feeds two consumers: OCR on pages without a text layer, and the
//! whole-page raster attached to vector visuals. Both go through the
//! [`PageRenderer`] trait so callers (and tests) can substitute their own
//! rasteriser.
//!
//! ## Why a process-wide lock?
//!
//! The pdfium C++ library keeps global state and is not re-entrant. Pages are
//! processed on several blocking-pool threads, so every render through
//! [`PdfiumRenderer`] takes the same mutex. Text and visual extraction do not
//! touch pdfium and keep running in parallel.
//!
//! The same mutex holds the pdfium document of the current extraction pass
//! ([`RenderRequest::pass_id`]). The PDF is parsed once per pass, not once
//! per rendered page, and released by [`PageRenderer::finish_pass`].
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 200 DPI would produce a
//! 6,600 × 9,300 px bitmap. `max_pixels` caps the longest edge regardless of
//! physical size, keeping memory bounded.

use crate::error::EngineError;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Bound once per process; the first successful binding wins.
static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Guards every pdfium call and caches the document of one pass.
static PDFIUM_LOCK: Mutex<Option<LoadedDocument>> = Mutex::new(None);

struct LoadedDocument {
    pass_id: u64,
    document: PdfDocument<'static>,
}

/// What to render.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Identifies the extraction pass. Requests sharing an id carry the same
    /// bytes and password, so a renderer may keep the parsed document.
    pub pass_id: u64,
    /// The complete, original PDF bytes.
    pub pdf_bytes: &'a [u8],
    /// Password that unlocked the document, if any.
    pub password: Option<&'a str>,
    /// 1-based page number.
    pub page_number: usize,
    pub dpi: u32,
    /// Maximum width or height of the output in pixels.
    pub max_pixels: u32,
}

/// Rasterises a single PDF page.
///
/// Implementations must be `Send + Sync`; they are called from several
/// blocking-pool threads at once.
pub trait PageRenderer: Send + Sync {
    fn render_page(&self, request: &RenderRequest<'_>) -> Result<DynamicImage, EngineError>;

    /// Called once after the last page of pass `pass_id`.
    fn finish_pass(&self, _pass_id: u64) {}
}

/// [`PageRenderer`] backed by the pdfium shared library.
///
/// The library is bound on first use, from the configured path if any, then
/// `./`, then the system library path. A missing library surfaces as
/// [`EngineError::Unavailable`] on every page rather than failing the run.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }

    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        let explicit = match &self.library {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
        };
        explicit
            .or_else(|_| Pdfium::bind_to_system_library())
            .map(Pdfium::new)
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_page(&self, request: &RenderRequest<'_>) -> Result<DynamicImage, EngineError> {
        let mut loaded = PDFIUM_LOCK.lock().unwrap_or_else(|p| p.into_inner());

        let pdfium = PDFIUM.get_or_try_init(|| self.bind()).map_err(|e| {
            EngineError::Unavailable(format!("pdfium library could not be loaded: {:?}", e))
        })?;

        if !matches!(&*loaded, Some(cached) if cached.pass_id == request.pass_id) {
            // Release the previous pass before parsing the next one.
            *loaded = None;
            let document = pdfium
                .load_pdf_from_byte_vec(request.pdf_bytes.to_vec(), request.password)
                .map_err(|e| {
                    EngineError::Failed(format!("pdfium could not open the PDF: {:?}", e))
                })?;
            debug!("pdfium opened the document for pass {}", request.pass_id);
            *loaded = Some(LoadedDocument {
                pass_id: request.pass_id,
                document,
            });
        }
        let Some(cached) = loaded.as_ref() else {
            return Err(EngineError::Failed("pdfium document cache is empty".into()));
        };

        let page_index = request
            .page_number
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or(EngineError::PageOutOfRange {
                page: request.page_number,
            })?;
        let page = cached
            .document
            .pages()
            .get(page_index)
            .map_err(|_| EngineError::PageOutOfRange {
                page: request.page_number,
            })?;

        let bitmap = page
            .render_with_config(&render_config(request.dpi, request.max_pixels))
            .map_err(|e| EngineError::Failed(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {} dpi → {}x{} px",
            request.page_number,
            request.dpi,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn finish_pass(&self, pass_id: u64) {
        let mut loaded = PDFIUM_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        if matches!(&*loaded, Some(cached) if cached.pass_id == pass_id) {
            *loaded = None;
            debug!("pdfium document for pass {} released", pass_id);
        }
    }
}

fn render_config(dpi: u32, max_pixels: u32) -> PdfRenderConfig {
    let max = i32::try_from(max_pixels).unwrap_or(i32::MAX);
    PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max)
        .set_maximum_height(max)
}
