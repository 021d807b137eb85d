//! Diagnostics aggregation: per-page stage results → one immutable record.

use crate::output::PageExtractionDiagnostic;
use crate::pipeline::ocr::OcrOutput;

/// Where a page's text came from. Exactly one source wins, so a page can
/// never be both "has text" and "used OCR".
#[derive(Debug, Clone, PartialEq)]
pub enum PageText {
    /// Non-empty, normalised selectable text.
    Selectable(String),
    /// Non-empty OCR text.
    Ocr {
        text: String,
        confidence: Option<f64>,
    },
    /// Neither source produced anything.
    Missing,
}

impl PageText {
    /// Resolve the text stages in priority order. OCR output is only
    /// consulted when the selectable text is empty.
    pub fn resolve(selectable: String, ocr: Option<OcrOutput>) -> Self {
        if !selectable.is_empty() {
            return PageText::Selectable(selectable);
        }
        match ocr {
            Some(OcrOutput { text, confidence }) if !text.is_empty() => {
                PageText::Ocr { text, confidence }
            }
            _ => PageText::Missing,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            PageText::Selectable(text) | PageText::Ocr { text, .. } => text,
            PageText::Missing => "",
        }
    }

    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// Build the diagnostic for one page. Pure; never fails.
pub fn aggregate(
    page_number: usize,
    text: &PageText,
    image_count: usize,
    vector_count: usize,
) -> PageExtractionDiagnostic {
    let (has_text, used_ocr, ocr_confidence) = match text {
        PageText::Selectable(_) => (true, false, None),
        PageText::Ocr { confidence, .. } => (false, true, *confidence),
        PageText::Missing => (false, false, None),
    };
    PageExtractionDiagnostic {
        page_number,
        has_text,
        used_ocr,
        ocr_confidence,
        image_count,
        vector_count,
        text_length: text.char_len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectable_text_wins_over_ocr() {
        let text = PageText::resolve(
            "Hello".into(),
            Some(OcrOutput {
                text: "Other".into(),
                confidence: Some(90.0),
            }),
        );
        let d = aggregate(1, &text, 0, 0);
        assert!(d.has_text);
        assert!(!d.used_ocr);
        assert_eq!(d.ocr_confidence, None);
        assert_eq!(d.text_length, 5);
    }

    #[test]
    fn empty_ocr_output_is_missing() {
        let text = PageText::resolve(
            String::new(),
            Some(OcrOutput {
                text: String::new(),
                confidence: Some(12.0),
            }),
        );
        assert_eq!(text, PageText::Missing);
        let d = aggregate(2, &text, 1, 0);
        assert!(d.has_no_text());
        assert_eq!(d.ocr_confidence, None);
        assert_eq!(d.text_length, 0);
    }

    #[test]
    fn ocr_text_keeps_confidence_and_counts_chars() {
        let text = PageText::resolve(
            String::new(),
            Some(OcrOutput {
                text: "Größe".into(),
                confidence: None,
            }),
        );
        let d = aggregate(3, &text, 0, 2);
        assert!(d.used_ocr);
        assert!(d.is_missing_confidence());
        assert_eq!(d.text_length, 5);
        assert_eq!(d.vector_count, 2);
    }
}
