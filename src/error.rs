//! Error types for the pagesift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] is **fatal**: the document cannot be processed at all
//!   (unparseable bytes, missing or wrong password, unreadable file). Returned
//!   as `Err(ExtractError)` from the top-level `extract*` functions, and no
//!   partial result is produced.
//!
//! * [`PageWarning`] is **non-fatal**: one stage of one page degraded (text
//!   layer unreadable, OCR engine missing, image stream undecodable, render
//!   failed). The page still yields its diagnostic; the warning is collected
//!   into [`crate::output::ExtractionOutput::warnings`] and forwarded to the
//!   progress callback.
//!
//! A bad page never sacrifices the rest of the document: only the document
//! opener produces fatal errors.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pagesift library.
///
/// Page-level failures use [`PageWarning`] and are stored in
/// [`crate::output::ExtractionOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The byte stream is not a parseable PDF container, or its encryption
    /// dictionary is malformed.
    #[error("The PDF could not be read: {detail}\nIt may be corrupted. Please re-upload and try again.")]
    CorruptDocument { detail: String },

    /// The PDF is encrypted and neither the empty password nor the supplied
    /// one unlocks it. `supplied` tells the caller whether a password was
    /// tried, so the message can differ; recovery is the same either way.
    #[error("{}", password_message(.supplied))]
    PasswordRequired { supplied: bool },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (runtime creation, panicked worker).
    #[error("Internal error: {0}")]
    Internal(String),
}

fn password_message(supplied: &bool) -> &'static str {
    if *supplied {
        "The PDF password is incorrect. Please try again."
    } else {
        "This PDF is encrypted. Enter the password and try again."
    }
}

impl ExtractError {
    /// True when re-invoking extraction with a (different) password can succeed.
    pub fn needs_password(&self) -> bool {
        matches!(self, ExtractError::PasswordRequired { .. })
    }
}

/// Failure reported by an external engine ([`crate::PageRenderer`] or
/// [`crate::OcrEngine`]). The pipeline always turns it into a [`PageWarning`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not be loaded or launched (pdfium library missing,
    /// tesseract not on PATH).
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine does not know the requested page.
    #[error("page {page} is out of range")]
    PageOutOfRange { page: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The engine ran and reported an error.
    #[error("{0}")]
    Failed(String),
}

/// A non-fatal, locally recovered failure for a single page.
///
/// The page's diagnostic already reflects the degradation (e.g. `has_text`
/// false, confidence absent, no rasterised fallback); the warning carries the
/// reason.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageWarning {
    /// The selectable-text layer could not be read.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Rendering the page for OCR, or the OCR engine itself, failed.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// An embedded image could not be materialised; its visual has empty data.
    #[error("Page {page}: image '{name}' could not be decoded: {detail}")]
    ImageDecodeFailed {
        page: usize,
        name: String,
        detail: String,
    },

    /// The page content program (or a form XObject) could not be decoded.
    #[error("Page {page}: content stream could not be decoded: {detail}")]
    ContentDecodeFailed { page: usize, detail: String },

    /// The whole-page raster fallback for vector content failed.
    #[error("Page {page}: vector rasterisation failed: {detail}")]
    VectorRenderFailed { page: usize, detail: String },
}

impl PageWarning {
    /// The 1-based page this warning belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageWarning::TextExtractionFailed { page, .. }
            | PageWarning::OcrFailed { page, .. }
            | PageWarning::ImageDecodeFailed { page, .. }
            | PageWarning::ContentDecodeFailed { page, .. }
            | PageWarning::VectorRenderFailed { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_required_without_password_asks_for_one() {
        let e = ExtractError::PasswordRequired { supplied: false };
        assert!(e.to_string().contains("Enter the password"), "got: {e}");
        assert!(e.needs_password());
    }

    #[test]
    fn password_required_with_password_reports_incorrect() {
        let e = ExtractError::PasswordRequired { supplied: true };
        assert!(e.to_string().contains("incorrect"), "got: {e}");
        assert!(e.needs_password());
    }

    #[test]
    fn corrupt_document_display() {
        let e = ExtractError::CorruptDocument {
            detail: "invalid file header".into(),
        };
        assert!(e.to_string().contains("invalid file header"));
        assert!(!e.needs_password());
    }

    #[test]
    fn page_warning_reports_its_page() {
        let w = PageWarning::ImageDecodeFailed {
            page: 4,
            name: "Im1".into(),
            detail: "unsupported filter".into(),
        };
        assert_eq!(w.page(), 4);
        assert!(w.to_string().contains("Im1"));
    }

    #[test]
    fn page_warning_round_trips_through_json() {
        let w = PageWarning::OcrFailed {
            page: 2,
            detail: "tesseract not found".into(),
        };
        let json = serde_json::to_string(&w).expect("serialise");
        let back: PageWarning = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, w);
    }
}
