//! # pagesift
//!
//! Extract page-delimited text, OCR fallback, visuals and coverage
//! diagnostics from PDF documents.
//!
//! ## Why this crate?
//!
//! Real-world PDFs mix selectable text, scanned pages, embedded photos and
//! vector drawings, and some are encrypted. A plain text dump silently loses
//! whatever is not in the text layer. This crate extracts what it can from
//! each page, falls back to OCR where the text layer is empty, inventories
//! images and vector graphics, and records per page *where* the text came
//! from, so callers can tell a clean extraction from one with holes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Open      parse, decrypt (empty password, then the caller's)
//!  ├─ 2. Text      selectable text per page, whitespace-normalised
//!  ├─ 3. OCR       pages without text: pdfium render → tesseract
//!  ├─ 4. Visuals   image XObjects, vector path operators, form XObjects
//!  ├─ 5. Raster    whole-page PNG for pages with vector content
//!  └─ 6. Output    "--- Page N ---" text stream + diagnostics + visuals
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagesift::{extract_file, coverage, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder().ocr_language("eng").build()?;
//!     let output = extract_file("document.pdf", &config).await?;
//!     println!("{}", output.text);
//!     for warning in coverage::summarize_coverage_warnings(
//!         &output.diagnostics,
//!         config.low_confidence_threshold,
//!     ) {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## External engines
//!
//! OCR and page rasterisation need the `tesseract` executable and the pdfium
//! shared library (`PDFIUM_LIB_PATH`, the working directory, or the system
//! library path). Both are optional at runtime: when missing, the affected
//! pages degrade and a [`PageWarning`] says why.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagesift` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagesift = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod coverage;
pub mod error;
pub mod extract;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_LOW_CONFIDENCE_THRESHOLD};
pub use error::{EngineError, ExtractError, PageWarning};
pub use extract::{extract, extract_file, extract_sync};
pub use output::{
    ExtractedVisual, ExtractionOutput, ExtractionStats, PageExtractionDiagnostic, VisualKind,
};
pub use pipeline::ocr::{OcrEngine, OcrOutput, TesseractOcr};
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderRequest};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
