//! Output types produced by an extraction pass.
//!
//! Everything here is plain owned data: the result holds no handle to the
//! source document, so it can be sent across threads, cached, or serialised
//! to JSON (byte payloads are encoded as base64 strings).

use crate::error::PageWarning;
use crate::pipeline::encode::base64_bytes;
use serde::{Deserialize, Serialize};

/// Per-page extraction record. One per page, in page order, never mutated
/// after the pass that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageExtractionDiagnostic {
    /// 1-based page number.
    pub page_number: usize,
    /// Selectable text extraction yielded non-empty normalised text.
    pub has_text: bool,
    /// OCR ran and yielded non-empty text. Never true when `has_text` is.
    pub used_ocr: bool,
    /// Mean OCR token confidence in `[0, 100]`. Absent unless `used_ocr` and
    /// at least one token carried a real (non-negative) confidence.
    pub ocr_confidence: Option<f64>,
    /// Raster images detected, whether or not their bytes were recovered.
    pub image_count: usize,
    /// Vector visual units produced (inline content + form objects).
    pub vector_count: usize,
    /// Character length of the text assigned to the page.
    pub text_length: usize,
}

impl PageExtractionDiagnostic {
    /// Short label for where the page text came from.
    pub fn source_label(&self) -> &'static str {
        if self.has_text {
            "Text"
        } else if self.used_ocr {
            "OCR"
        } else {
            "No text"
        }
    }

    /// True when OCR produced the page text with a confidence below `threshold`.
    pub fn is_low_confidence(&self, threshold: f64) -> bool {
        self.used_ocr && self.ocr_confidence.is_some_and(|c| c < threshold)
    }

    /// True when OCR produced the page text but reported no usable confidence.
    pub fn is_missing_confidence(&self) -> bool {
        self.used_ocr && self.ocr_confidence.is_none()
    }

    /// True when neither the text layer nor OCR produced anything.
    pub fn has_no_text(&self) -> bool {
        !self.has_text && !self.used_ocr
    }
}

/// What kind of graphical unit a visual is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    /// An embedded raster image.
    Image,
    /// Drawing-operator content or a nested form object.
    Vector,
}

impl VisualKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualKind::Image => "image",
            VisualKind::Vector => "vector",
        }
    }
}

/// Format tag carried by vector visuals, whose `data` is a content program
/// rather than an image file.
pub const VECTOR_FORMAT: &str = "vector";

/// One extractable graphical unit.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedVisual {
    /// Owning page (1-based).
    pub page_number: usize,
    /// Resource name, or a synthesised `page-<n>-image-<i>` style identifier.
    pub name: String,
    pub kind: VisualKind,
    /// Lowercase format tag (`png`, `jpeg`, `jp2`), [`VECTOR_FORMAT`] for
    /// vector content, or absent when the image could not be materialised.
    pub image_format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Native bytes: encoded raster, or raw content-stream bytes for vectors.
    /// Empty when materialisation failed; the record is still emitted.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Whole-page raster attached to vector visuals when rendering succeeded.
    #[serde(with = "base64_bytes::option")]
    pub rasterized_data: Option<Vec<u8>>,
    pub rasterized_format: Option<String>,
    /// Caption-like lines associated after extraction; empty from the core.
    #[serde(default)]
    pub captions: Vec<String>,
}

impl ExtractedVisual {
    /// True when the visual can be handed to an image-consuming subsystem:
    /// raster images with bytes, or vector visuals carrying a page raster.
    pub fn is_viewable(&self) -> bool {
        match self.kind {
            VisualKind::Image => !self.data.is_empty(),
            VisualKind::Vector => self
                .rasterized_data
                .as_ref()
                .is_some_and(|d| !d.is_empty()),
        }
    }
}

impl std::fmt::Debug for ExtractedVisual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractedVisual")
            .field("page_number", &self.page_number)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("image_format", &self.image_format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field(
                "rasterized_data",
                &self.rasterized_data.as_ref().map(|d| d.len()),
            )
            .field("rasterized_format", &self.rasterized_format)
            .field("captions", &self.captions)
            .finish()
    }
}

/// Counters and timings for one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub text_pages: usize,
    pub ocr_pages: usize,
    pub empty_pages: usize,
    pub image_count: usize,
    pub vector_count: usize,
    pub warning_count: usize,
    pub total_duration_ms: u64,
    /// Summed wall-clock time spent rendering + recognising OCR pages.
    pub ocr_duration_ms: u64,
    /// Summed wall-clock time spent rasterising vector pages.
    pub raster_duration_ms: u64,
}

/// The complete result of extracting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Page-delimited text stream (see [`crate::pages`]).
    pub text: String,
    pub page_count: usize,
    pub ocr_page_count: usize,
    pub diagnostics: Vec<PageExtractionDiagnostic>,
    pub visuals: Vec<ExtractedVisual>,
    /// Every locally recovered per-page failure, in page order.
    pub warnings: Vec<PageWarning>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Split into the `(text, page_count, ocr_page_count, diagnostics, visuals)`
    /// tuple consumed by reporting collaborators.
    pub fn into_parts(
        self,
    ) -> (
        String,
        usize,
        usize,
        Vec<PageExtractionDiagnostic>,
        Vec<ExtractedVisual>,
    ) {
        (
            self.text,
            self.page_count,
            self.ocr_page_count,
            self.diagnostics,
            self.visuals,
        )
    }

    /// Visuals that can be forwarded to visual-description tooling.
    pub fn viewable_visuals(&self) -> impl Iterator<Item = &ExtractedVisual> {
        self.visuals.iter().filter(|v| v.is_viewable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visual(kind: VisualKind, data: Vec<u8>, raster: Option<Vec<u8>>) -> ExtractedVisual {
        ExtractedVisual {
            page_number: 1,
            name: "v".into(),
            kind,
            image_format: None,
            width: None,
            height: None,
            data,
            rasterized_data: raster,
            rasterized_format: None,
            captions: Vec::new(),
        }
    }

    #[test]
    fn vector_visual_is_viewable_only_with_raster() {
        assert!(!visual(VisualKind::Vector, b"0 0 m 1 1 l S".to_vec(), None).is_viewable());
        assert!(visual(VisualKind::Vector, b"0 0 m".to_vec(), Some(vec![1, 2])).is_viewable());
    }

    #[test]
    fn image_visual_without_bytes_is_not_viewable() {
        assert!(!visual(VisualKind::Image, Vec::new(), None).is_viewable());
        assert!(visual(VisualKind::Image, vec![0x89, b'P'], None).is_viewable());
    }

    #[test]
    fn visual_kind_serialises_lowercase() {
        let json = serde_json::to_string(&VisualKind::Vector).unwrap();
        assert_eq!(json, "\"vector\"");
    }

    #[test]
    fn visual_data_serialises_as_base64() {
        let v = visual(VisualKind::Image, b"abc".to_vec(), None);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["data"], "YWJj");
        assert!(json["rasterized_data"].is_null());
        let back: ExtractedVisual = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn diagnostic_confidence_helpers() {
        let diag = PageExtractionDiagnostic {
            page_number: 3,
            has_text: false,
            used_ocr: true,
            ocr_confidence: Some(42.0),
            image_count: 1,
            vector_count: 0,
            text_length: 10,
        };
        assert!(diag.is_low_confidence(60.0));
        assert!(!diag.is_missing_confidence());
        assert_eq!(diag.source_label(), "OCR");
    }
}
