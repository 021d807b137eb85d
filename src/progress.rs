//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline processes each page, including every
//! [`PageWarning`] the moment it is recorded.
//!
//! # Example
//!
//! ```rust
//! use pagesift::{ExtractionConfig, ExtractionProgressCallback, PageExtractionDiagnostic};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct OcrCounter {
//!     ocr_pages: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for OcrCounter {
//!     fn on_page_complete(&self, _page: usize, _total: usize, diag: &PageExtractionDiagnostic) {
//!         if diag.used_ocr {
//!             self.ocr_pages.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(OcrCounter { ocr_pages: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PageWarning;
use crate::output::PageExtractionDiagnostic;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the page
/// events arrive from several blocking-pool threads, in completion order
/// rather than page order. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the document opened, before any page is processed.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a worker picks up a page (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called with the finished diagnostic for a page.
    fn on_page_complete(
        &self,
        page_num: usize,
        total_pages: usize,
        diagnostic: &PageExtractionDiagnostic,
    ) {
        let _ = (page_num, total_pages, diagnostic);
    }

    /// Called for every non-fatal degradation recorded on a page.
    fn on_page_warning(&self, warning: &PageWarning) {
        let _ = warning;
    }

    /// Called once after all pages have been processed.
    ///
    /// * `ocr_pages`: pages whose text came from OCR
    fn on_extraction_complete(&self, total_pages: usize, ocr_pages: usize) {
        let _ = (total_pages, ocr_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
