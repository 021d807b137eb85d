//! The page-delimited text stream and the caption heuristics built on it.
//!
//! ## Wire format
//!
//! Every page contributes one block:
//!
//! ```text
//! --- Page <N> ---
//! <normalised selectable text>
//! ```
//!
//! or `[OCR]` on its own line followed by OCR text, or the sentinel
//! `[No extractable text found on this page]`. Each block is prefixed with
//! `"\n\n"`, blocks are joined with `"\n"`, and the whole stream is trimmed.
//! Consumers locate page boundaries by matching `--- Page (\d+) ---`, so the
//! format is bit-exact.
//!
//! Page text is not escaped: a page whose own text contains a literal
//! `--- Page 7 ---` line will mis-split. Changing that would change the wire
//! format, so it is left as a known ambiguity.

use crate::output::ExtractedVisual;
use crate::pipeline::diagnostics::PageText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Body of a page where neither the text layer nor OCR produced anything.
pub const NO_TEXT_SENTINEL: &str = "[No extractable text found on this page]";
/// Marker line prefixing OCR-derived text.
pub const OCR_MARKER: &str = "[OCR]";

static RE_PAGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"--- Page (\d+) ---").unwrap());
static RE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Figure|Fig\.|Table)\s*\d+").unwrap());
static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(Figure|Fig\.|Table)\s*(\d+)").unwrap());
static RE_LOOSE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(Figure|Fig\.|Table)\b").unwrap());

/// `--- Page <N> ---`
pub fn page_marker(page_number: usize) -> String {
    format!("--- Page {} ---", page_number)
}

/// One page's block: marker line, newline, body.
pub fn page_block(page_number: usize, text: &PageText) -> String {
    let marker = page_marker(page_number);
    match text {
        PageText::Selectable(t) => format!("{}\n{}", marker, t),
        PageText::Ocr { text, .. } => format!("{}\n{}\n{}", marker, OCR_MARKER, text),
        PageText::Missing => format!("{}\n{}", marker, NO_TEXT_SENTINEL),
    }
}

/// Join page blocks (in page order) into the text stream.
pub fn assemble<I, S>(blocks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    blocks
        .into_iter()
        .map(|b| format!("\n\n{}", b.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Split a text stream back into `(page_number, "--- Page N ---\n" + body)`.
///
/// Anything before the first marker is dropped, and bodies are trimmed.
pub fn split_pages(text: &str) -> Vec<(usize, String)> {
    let markers: Vec<_> = RE_PAGE_MARKER.captures_iter(text).collect();
    markers
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let page_number: usize = caps.get(1)?.as_str().parse().ok()?;
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = text[whole.end()..end].trim();
            Some((page_number, format!("{}\n{}", page_marker(page_number), body)))
        })
        .collect()
}

/// Caption-like lines (`Figure N`, `Fig. N`, `Table N` at line start),
/// keyed by page. Pages without captions are absent.
pub fn find_page_captions(text: &str) -> BTreeMap<usize, Vec<String>> {
    let mut captions: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (page_number, page_text) in split_pages(text) {
        for line in page_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if RE_CAPTION.is_match(line) {
                captions
                    .entry(page_number)
                    .or_default()
                    .push(line.to_string());
            }
        }
    }
    captions
}

/// Give every visual the captions found on its page.
pub fn attach_captions(visuals: &mut [ExtractedVisual], captions: &BTreeMap<usize, Vec<String>>) {
    for visual in visuals {
        visual.captions = captions
            .get(&visual.page_number)
            .cloned()
            .unwrap_or_default();
    }
}

/// Figure/table labels that are referenced but never captioned, and
/// caption-looking lines that carry no number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedLabels {
    /// Normalised labels (`Figure 3`, `Table 1`), sorted.
    pub missing_captions: Vec<String>,
    /// Lines starting with `Figure`/`Fig.`/`Table` but with no number.
    pub unlabeled_mentions: Vec<String>,
}

impl UnresolvedLabels {
    pub fn is_empty(&self) -> bool {
        self.missing_captions.is_empty() && self.unlabeled_mentions.is_empty()
    }
}

fn normalised_label(caps: &regex::Captures<'_>) -> Option<String> {
    let kind = if caps.get(1)?.as_str().to_lowercase().starts_with("fig") {
        "Figure"
    } else {
        "Table"
    };
    Some(format!("{} {}", kind, caps.get(2)?.as_str()))
}

pub fn find_unresolved_labels(text: &str) -> UnresolvedLabels {
    let mut referenced = BTreeSet::new();
    let mut captioned = BTreeSet::new();
    let mut unlabeled_mentions = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        let starts_like_caption = ["figure", "fig.", "table"]
            .iter()
            .any(|p| lower.starts_with(p));

        let labels: Vec<String> = RE_LABEL
            .captures_iter(line)
            .filter_map(|c| normalised_label(&c))
            .collect();

        if !labels.is_empty() {
            if starts_like_caption {
                captioned.extend(labels.iter().cloned());
            }
            referenced.extend(labels);
        } else if starts_like_caption && RE_LOOSE_LABEL.is_match(line) {
            unlabeled_mentions.push(line.to_string());
        }
    }

    UnresolvedLabels {
        missing_captions: referenced.difference(&captioned).cloned().collect(),
        unlabeled_mentions,
    }
}
