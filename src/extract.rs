//! Extraction entry points.
//!
//! ## Why per-page blocking tasks?
//!
//! Every stage after opening is CPU-bound or shells out (lopdf parsing,
//! tesseract, pdfium), so each page runs on tokio's blocking pool while the
//! async side only schedules them. At most `concurrency` pages are in flight;
//! they complete in any order and are sorted back into page order before the
//! text stream, diagnostics, visuals and warnings are assembled. With
//! `concurrency = 1` the result is identical to a sequential pass.
//!
//! The result is all-or-nothing: fatal conditions (corrupt file, missing
//! password) return `Err`, everything page-local degrades into a
//! [`PageWarning`] and the pass carries on.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, PageWarning};
use crate::output::{
    ExtractedVisual, ExtractionOutput, ExtractionStats, PageExtractionDiagnostic, VisualKind,
};
use crate::pages;
use crate::pipeline::diagnostics::{aggregate, PageText};
use crate::pipeline::encode::encode_png;
use crate::pipeline::ocr::{ocr_page, OcrEngine, TesseractOcr};
use crate::pipeline::open::{open_document, OpenedDocument};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer, RenderRequest};
use crate::pipeline::{input, text, visuals};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract text, visuals and diagnostics from PDF bytes.
///
/// # Returns
/// `Ok(ExtractionOutput)` whenever the document opens, even if individual
/// pages degraded (check `output.warnings`).
///
/// # Errors
/// * [`ExtractError::CorruptDocument`] when the bytes are not a readable PDF
/// * [`ExtractError::PasswordRequired`] when the document is encrypted and
///   neither the empty password nor `config.password` unlocks it
///
/// # Example
/// ```rust,no_run
/// use pagesift::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("document.pdf")?;
/// let output = extract(&bytes, &ExtractionConfig::default()).await?;
/// println!("{}", output.text);
/// for d in &output.diagnostics {
///     println!("page {}: {}", d.page_number, d.source_label());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    input::check_magic(bytes)?;
    let pdf_bytes: Arc<[u8]> = Arc::from(bytes);
    info!("Starting extraction ({} bytes)", pdf_bytes.len());

    // ── Step 1: Open / decrypt ───────────────────────────────────────────
    let opened = {
        let pdf_bytes = Arc::clone(&pdf_bytes);
        let password = config.password.clone();
        tokio::task::spawn_blocking(move || open_document(&pdf_bytes, password.as_deref()))
            .await
            .map_err(|e| ExtractError::Internal(format!("open task panicked: {e}")))?
            .into_result(config.password.is_some())?
    };
    let total_pages = opened.page_count();
    info!(
        "PDF has {} pages{}",
        total_pages,
        if opened.was_encrypted { " (encrypted)" } else { "" }
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total_pages);
    }

    // ── Step 2: Process pages ────────────────────────────────────────────
    let ctx = Arc::new(PageContext {
        pass_id: NEXT_PASS_ID.fetch_add(1, Ordering::Relaxed),
        renderer: resolve_renderer(config),
        ocr_engine: resolve_ocr_engine(config),
        document: opened,
        pdf_bytes,
        config: config.clone(),
    });

    let results: Vec<Result<PageOutcome, ExtractError>> =
        stream::iter((0..total_pages).map(|index| {
            let ctx = Arc::clone(&ctx);
            async move {
                let page_number = index + 1;
                if let Some(ref cb) = ctx.config.progress_callback {
                    cb.on_page_start(page_number, total_pages);
                }
                let worker_ctx = Arc::clone(&ctx);
                let outcome = tokio::task::spawn_blocking(move || process_page(&worker_ctx, index))
                    .await
                    .map_err(|e| {
                        ExtractError::Internal(format!("page {page_number} worker panicked: {e}"))
                    })?;
                if let Some(ref cb) = ctx.config.progress_callback {
                    for warning in &outcome.warnings {
                        cb.on_page_warning(warning);
                    }
                    cb.on_page_complete(page_number, total_pages, &outcome.diagnostic);
                }
                Ok::<_, ExtractError>(outcome)
            }
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    {
        let renderer = Arc::clone(&ctx.renderer);
        let pass_id = ctx.pass_id;
        if let Err(e) = tokio::task::spawn_blocking(move || renderer.finish_pass(pass_id)).await {
            warn!("Renderer cleanup for pass {} failed: {}", pass_id, e);
        }
    }

    let mut outcomes = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    outcomes.sort_by_key(|o| o.page_number);

    // ── Step 3: Assemble ─────────────────────────────────────────────────
    let text = pages::assemble(outcomes.iter().map(|o| o.block.as_str()));

    let mut diagnostics = Vec::with_capacity(outcomes.len());
    let mut visuals = Vec::new();
    let mut warnings = Vec::new();
    let mut ocr_duration_ms = 0;
    let mut raster_duration_ms = 0;
    for outcome in outcomes {
        diagnostics.push(outcome.diagnostic);
        visuals.extend(outcome.visuals);
        warnings.extend(outcome.warnings);
        ocr_duration_ms += outcome.ocr_ms;
        raster_duration_ms += outcome.raster_ms;
    }

    let ocr_page_count = diagnostics.iter().filter(|d| d.used_ocr).count();
    let stats = ExtractionStats {
        total_pages,
        text_pages: diagnostics.iter().filter(|d| d.has_text).count(),
        ocr_pages: ocr_page_count,
        empty_pages: diagnostics.iter().filter(|d| d.has_no_text()).count(),
        image_count: diagnostics.iter().map(|d| d.image_count).sum(),
        vector_count: diagnostics.iter().map(|d| d.vector_count).sum(),
        warning_count: warnings.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ocr_duration_ms,
        raster_duration_ms,
    };

    info!(
        "Extraction complete: {} pages ({} OCR, {} empty), {} visuals, {} warnings, {}ms",
        total_pages,
        ocr_page_count,
        stats.empty_pages,
        visuals.len(),
        warnings.len(),
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total_pages, ocr_page_count);
    }

    Ok(ExtractionOutput {
        text,
        page_count: total_pages,
        ocr_page_count,
        diagnostics,
        visuals,
        warnings,
        stats,
    })
}

/// Read a PDF from disk and run [`extract`] on it.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let bytes = input::read_pdf_file(path.as_ref()).await?;
    extract(&bytes, config).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call it from inside
/// an async context.
pub fn extract_sync(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(bytes, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

static NEXT_PASS_ID: AtomicU64 = AtomicU64::new(1);

/// Shared, read-only state for every page worker.
struct PageContext {
    pass_id: u64,
    document: OpenedDocument,
    pdf_bytes: Arc<[u8]>,
    renderer: Arc<dyn PageRenderer>,
    ocr_engine: Arc<dyn OcrEngine>,
    config: ExtractionConfig,
}

impl PageContext {
    fn render_request(&self, page_number: usize, dpi: u32) -> RenderRequest<'_> {
        RenderRequest {
            pass_id: self.pass_id,
            pdf_bytes: &self.pdf_bytes,
            password: self.document.password.as_deref(),
            page_number,
            dpi,
            max_pixels: self.config.max_rendered_pixels,
        }
    }
}

/// Everything one page contributes to the output.
struct PageOutcome {
    page_number: usize,
    block: String,
    diagnostic: PageExtractionDiagnostic,
    visuals: Vec<ExtractedVisual>,
    warnings: Vec<PageWarning>,
    ocr_ms: u64,
    raster_ms: u64,
}

/// Injected renderer first, then pdfium.
fn resolve_renderer(config: &ExtractionConfig) -> Arc<dyn PageRenderer> {
    match config.renderer {
        Some(ref renderer) => Arc::clone(renderer),
        None => Arc::new(PdfiumRenderer::new(config.pdfium_library.clone())),
    }
}

/// Injected OCR engine first, then the tesseract executable.
fn resolve_ocr_engine(config: &ExtractionConfig) -> Arc<dyn OcrEngine> {
    match config.ocr_engine {
        Some(ref engine) => Arc::clone(engine),
        None => Arc::new(TesseractOcr::new(config.tesseract_cmd.clone())),
    }
}

/// Run every stage for the page at `index` (0-based). Never fails.
fn process_page(ctx: &PageContext, index: usize) -> PageOutcome {
    let page_number = index + 1;
    let doc = &ctx.document.doc;
    let mut warnings = Vec::new();

    // ── Text, then OCR if the text layer is empty ────────────────────────
    let (selectable, text_warning) = text::extract_page_text(doc, page_number);
    warnings.extend(text_warning);

    let mut ocr_ms = 0;
    let ocr = if selectable.is_empty() && ctx.config.use_ocr {
        let start = Instant::now();
        let result = ocr_page(
            ctx.renderer.as_ref(),
            ctx.ocr_engine.as_ref(),
            &ctx.render_request(page_number, ctx.config.ocr_dpi),
            &ctx.config.ocr_language,
        );
        ocr_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Page {}: OCR failed: {}", page_number, e);
                warnings.push(PageWarning::OcrFailed {
                    page: page_number,
                    detail: e.to_string(),
                });
                None
            }
        }
    } else {
        None
    };
    let page_text = PageText::resolve(selectable, ocr);

    // ── Visuals ──────────────────────────────────────────────────────────
    let mut inventory = visuals::build_inventory(doc, ctx.document.page_ids[index], page_number);
    warnings.append(&mut inventory.warnings);
    let vector_count = inventory.vector_count();

    let mut raster_ms = 0;
    if ctx.config.rasterize_vectors && vector_count > 0 {
        let start = Instant::now();
        match rasterize_page(ctx, page_number) {
            Ok(png) => {
                for visual in inventory
                    .visuals
                    .iter_mut()
                    .filter(|v| v.kind == VisualKind::Vector)
                {
                    visual.rasterized_data = Some(png.clone());
                    visual.rasterized_format = Some("png".to_string());
                }
            }
            Err(detail) => {
                warn!("Page {}: vector rasterisation failed: {}", page_number, detail);
                warnings.push(PageWarning::VectorRenderFailed {
                    page: page_number,
                    detail,
                });
            }
        }
        raster_ms = start.elapsed().as_millis() as u64;
    }

    // ── Diagnostics ──────────────────────────────────────────────────────
    let diagnostic = aggregate(page_number, &page_text, inventory.image_count, vector_count);
    debug!(
        "Page {}: source={} chars={} images={} vectors={}",
        page_number,
        diagnostic.source_label(),
        diagnostic.text_length,
        diagnostic.image_count,
        diagnostic.vector_count
    );

    PageOutcome {
        page_number,
        block: pages::page_block(page_number, &page_text),
        diagnostic,
        visuals: inventory.visuals,
        warnings,
        ocr_ms,
        raster_ms,
    }
}

fn rasterize_page(ctx: &PageContext, page_number: usize) -> Result<Vec<u8>, String> {
    let image = ctx
        .renderer
        .render_page(&ctx.render_request(page_number, ctx.config.raster_dpi))
        .map_err(|e| e.to_string())?;
    encode_png(&image).map_err(|e| e.to_string())
}
