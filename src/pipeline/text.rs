//! Selectable-text extraction for one page.

use crate::error::PageWarning;
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Collapse runs of spaces/tabs to one space and trim the ends.
/// Newlines are kept.
pub fn normalize_whitespace(text: &str) -> String {
    RE_HORIZONTAL_WS.replace_all(text, " ").trim().to_string()
}

/// Extract the normalised text layer of `page_number` (1-based).
///
/// A failure is never fatal: the page gets empty text, which routes it to
/// OCR, and the reason is returned as a warning.
pub fn extract_page_text(doc: &Document, page_number: usize) -> (String, Option<PageWarning>) {
    let Ok(lopdf_page) = u32::try_from(page_number) else {
        return (String::new(), None);
    };
    match doc.extract_text(&[lopdf_page]) {
        Ok(raw) => {
            let text = normalize_whitespace(&raw);
            debug!("Page {}: {} chars of selectable text", page_number, text.chars().count());
            (text, None)
        }
        Err(e) => {
            warn!("Page {}: text extraction failed: {}", page_number, e);
            (
                String::new(),
                Some(PageWarning::TextExtractionFailed {
                    page: page_number,
                    detail: e.to_string(),
                }),
            )
        }
    }
}
