//! Coverage reporting: turn per-page diagnostics into human-readable text.
//!
//! The report is meant to be pasted next to the extracted text (for a
//! reviewer or a downstream model) so that missing or unreliable evidence is
//! flagged instead of silently absent.

use crate::output::{ExtractedVisual, PageExtractionDiagnostic, VisualKind};
use crate::pages::UnresolvedLabels;
use serde::{Deserialize, Serialize};

/// At most this many unlabeled mentions are listed before eliding the rest.
const MAX_LISTED_MENTIONS: usize = 5;

fn join_pages(pages: &[usize]) -> String {
    pages
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn pages_where(
    diagnostics: &[PageExtractionDiagnostic],
    pred: impl Fn(&PageExtractionDiagnostic) -> bool,
) -> Vec<usize> {
    diagnostics
        .iter()
        .filter(|d| pred(d))
        .map(|d| d.page_number)
        .collect()
}

/// Render the multi-line coverage report.
///
/// `visuals` is optional so the report can be built before visual
/// extraction results are available; the visual lines then read zero.
pub fn build_coverage_report(
    diagnostics: &[PageExtractionDiagnostic],
    unresolved: &UnresolvedLabels,
    visuals: Option<&[ExtractedVisual]>,
    low_confidence_threshold: f64,
) -> String {
    let total_pages = diagnostics.len();
    let ocr_pages = pages_where(diagnostics, |d| d.used_ocr);
    let missing_conf_pages = pages_where(diagnostics, |d| d.is_missing_confidence());
    let no_text_pages = pages_where(diagnostics, |d| d.has_no_text());
    let low_conf_pages =
        pages_where(diagnostics, |d| d.is_low_confidence(low_confidence_threshold));
    let image_pages = pages_where(diagnostics, |d| d.image_count > 0);
    let vector_pages = pages_where(diagnostics, |d| d.vector_count > 0);

    let visuals = visuals.unwrap_or_default();
    let captioned_visuals = visuals.iter().filter(|v| !v.captions.is_empty()).count();
    let vector_visuals = visuals
        .iter()
        .filter(|v| v.kind == VisualKind::Vector)
        .count();

    let mut lines = vec![
        "Content coverage report (auto-generated):".to_string(),
        format!("- Total pages: {}", total_pages),
        format!(
            "- Pages with selectable text: {}",
            total_pages - no_text_pages.len() - ocr_pages.len()
        ),
        format!("- Pages with OCR text: {}", ocr_pages.len()),
        format!("- Pages with no extractable text: {}", no_text_pages.len()),
        format!("- Pages with embedded images detected: {}", image_pages.len()),
        format!("- Pages with vector graphics detected: {}", vector_pages.len()),
        format!("- Extracted visuals: {}", visuals.len()),
    ];

    if !ocr_pages.is_empty() {
        lines.push(format!("- OCR pages: {}", join_pages(&ocr_pages)));
    }
    if !no_text_pages.is_empty() {
        lines.push(format!("- No-text pages: {}", join_pages(&no_text_pages)));
    }
    if !low_conf_pages.is_empty() {
        lines.push(format!(
            "- Low OCR confidence pages (<{:.0}): {}",
            low_confidence_threshold,
            join_pages(&low_conf_pages)
        ));
    }
    if !missing_conf_pages.is_empty() {
        lines.push(format!(
            "- OCR confidence missing on pages: {}",
            join_pages(&missing_conf_pages)
        ));
    }
    if !image_pages.is_empty() {
        lines.push(format!("- Image pages: {}", join_pages(&image_pages)));
    }
    if !vector_pages.is_empty() {
        lines.push(format!("- Vector-graphic pages: {}", join_pages(&vector_pages)));
    }
    if !visuals.is_empty() {
        lines.push(format!(
            "- Extracted visuals with caption matches: {}",
            captioned_visuals
        ));
    }
    if vector_visuals > 0 {
        lines.push(format!("- Extracted vector graphics: {}", vector_visuals));
    }

    if !unresolved.missing_captions.is_empty() {
        lines.push(format!(
            "- Figure/table references without clear captions: {}",
            unresolved.missing_captions.join(", ")
        ));
    }
    if !unresolved.unlabeled_mentions.is_empty() {
        lines.push("- Figure/table mentions without labels:".to_string());
        for mention in unresolved.unlabeled_mentions.iter().take(MAX_LISTED_MENTIONS) {
            lines.push(format!("  - {}", mention));
        }
        let extra = unresolved
            .unlabeled_mentions
            .len()
            .saturating_sub(MAX_LISTED_MENTIONS);
        if extra > 0 {
            lines.push(format!("  - ...and {} more", extra));
        }
    }

    lines.push(
        "Page labels like figures/tables/sections may be missing; do not fabricate them."
            .to_string(),
    );
    lines.push(
        "Use this report to flag missing/unreadable evidence. Do not invent details from unread pages."
            .to_string(),
    );
    lines.join("\n")
}

/// Short warnings for the pages a reader should worry about. Empty when the
/// document extracted cleanly.
pub fn summarize_coverage_warnings(
    diagnostics: &[PageExtractionDiagnostic],
    low_confidence_threshold: f64,
) -> Vec<String> {
    let total_pages = diagnostics.len();
    let no_text_pages = pages_where(diagnostics, |d| d.has_no_text());
    let missing_conf_pages = pages_where(diagnostics, |d| d.is_missing_confidence());
    let low_conf_pages =
        pages_where(diagnostics, |d| d.is_low_confidence(low_confidence_threshold));

    let mut warnings = Vec::new();
    if !no_text_pages.is_empty() {
        warnings.push(format!(
            "{} of {} pages have no extractable text ({}).",
            no_text_pages.len(),
            total_pages,
            join_pages(&no_text_pages)
        ));
    }
    if !low_conf_pages.is_empty() {
        warnings.push(format!(
            "Low OCR confidence detected on pages: {}.",
            join_pages(&low_conf_pages)
        ));
    }
    if !missing_conf_pages.is_empty() {
        warnings.push(format!(
            "OCR confidence unavailable on pages: {} (OCR quality unknown).",
            join_pages(&missing_conf_pages)
        ));
    }
    warnings
}

/// One row of the per-page diagnostics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDiagnosticRow {
    #[serde(rename = "Page")]
    pub page: usize,
    #[serde(rename = "Source")]
    pub source: String,
    /// One decimal place, or `—` when absent.
    #[serde(rename = "OCR confidence")]
    pub ocr_confidence: String,
    #[serde(rename = "Images")]
    pub images: usize,
    #[serde(rename = "Vectors")]
    pub vectors: usize,
    #[serde(rename = "Text chars")]
    pub text_chars: usize,
}

pub fn page_diagnostic_rows(diagnostics: &[PageExtractionDiagnostic]) -> Vec<PageDiagnosticRow> {
    diagnostics
        .iter()
        .map(|d| PageDiagnosticRow {
            page: d.page_number,
            source: d.source_label().to_string(),
            ocr_confidence: d
                .ocr_confidence
                .map_or_else(|| "—".to_string(), |c| format!("{:.1}", c)),
            images: d.image_count,
            vectors: d.vector_count,
            text_chars: d.text_length,
        })
        .collect()
}

/// Render rows as a fixed-width text table.
pub fn format_diagnostic_table(rows: &[PageDiagnosticRow]) -> String {
    let mut out = format!(
        "{:>5}  {:<8}  {:>14}  {:>6}  {:>7}  {:>10}\n",
        "Page", "Source", "OCR confidence", "Images", "Vectors", "Text chars"
    );
    for r in rows {
        out.push_str(&format!(
            "{:>5}  {:<8}  {:>14}  {:>6}  {:>7}  {:>10}\n",
            r.page, r.source, r.ocr_confidence, r.images, r.vectors, r.text_chars
        ));
    }
    out
}
