//! OCR fallback: rendered page image → text + mean token confidence.
//!
//! ## Why TSV output?
//!
//! `tesseract ... stdout tsv` reports every recognised word together with its
//! confidence and its block/paragraph/line position, so one invocation gives
//! both the text and the confidence score. Non-word rows (page, block,
//! paragraph, line) carry the sentinel confidence `-1`; only real word
//! confidences are averaged.

use crate::error::EngineError;
use crate::pipeline::encode::encode_png;
use crate::pipeline::render::{PageRenderer, RenderRequest};
use image::DynamicImage;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Text and confidence recognised on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    /// Recognised text, trimmed. May be empty.
    pub text: String,
    /// Mean of the non-negative token confidences, in `[0, 100]`.
    pub confidence: Option<f64>,
}

/// Recognises text in a page image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<OcrOutput, EngineError>;
}

/// [`OcrEngine`] that shells out to the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    cmd: PathBuf,
}

impl TesseractOcr {
    pub fn new(cmd: impl Into<PathBuf>) -> Self {
        Self { cmd: cmd.into() }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<OcrOutput, EngineError> {
        let png = encode_png(image)?;
        let mut input = tempfile::Builder::new()
            .prefix("pagesift-ocr-")
            .suffix(".png")
            .tempfile()?;
        input.write_all(&png)?;
        input.flush()?;

        let output = Command::new(&self.cmd)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("tsv")
            .output()
            .map_err(|e| {
                EngineError::Unavailable(format!(
                    "failed to run '{}': {}",
                    self.cmd.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Render `request` and run OCR on the result.
pub fn ocr_page(
    renderer: &dyn PageRenderer,
    engine: &dyn OcrEngine,
    request: &RenderRequest<'_>,
    language: &str,
) -> Result<OcrOutput, EngineError> {
    let image = renderer.render_page(request)?;
    let output = engine.recognize(&image, language)?;
    debug!(
        "Page {}: OCR produced {} chars (confidence {:?})",
        request.page_number,
        output.text.chars().count(),
        output.confidence
    );
    Ok(OcrOutput {
        text: output.text.trim().to_string(),
        confidence: output.confidence.map(|c| c.clamp(0.0, 100.0)),
    })
}

/// Mean of the non-negative confidences, clamped to `[0, 100]`.
/// `None` when there are none.
pub fn mean_confidence(confidences: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = confidences
        .into_iter()
        .filter(|c| c.is_finite() && *c >= 0.0)
        .fold((0.0, 0usize), |(s, n), c| (s + c, n + 1));
    (count > 0).then(|| (sum / count as f64).clamp(0.0, 100.0))
}

// Column layout of tesseract's TSV output.
const COL_LEVEL: usize = 0;
const COL_BLOCK: usize = 2;
const COL_PAR: usize = 3;
const COL_LINE: usize = 4;
const COL_CONF: usize = 10;
const COL_TEXT: usize = 11;
const WORD_LEVEL: &str = "5";

/// Parse tesseract TSV into text and mean word confidence.
///
/// Words on the same line are joined with a space, lines with `\n`, and
/// paragraphs or blocks with a blank line.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut last_pos: Option<(&str, &str, &str)> = None;

    for row in tsv.lines() {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() <= COL_TEXT || cols[COL_LEVEL] != WORD_LEVEL {
            continue;
        }
        let word = cols[COL_TEXT].trim();
        if word.is_empty() {
            continue;
        }
        if let Ok(conf) = cols[COL_CONF].trim().parse::<f64>() {
            confidences.push(conf);
        }

        let pos = (cols[COL_BLOCK], cols[COL_PAR], cols[COL_LINE]);
        match last_pos {
            None => {}
            Some((block, par, _)) if block != pos.0 || par != pos.1 => text.push_str("\n\n"),
            Some((_, _, line)) if line != pos.2 => text.push('\n'),
            Some(_) => text.push(' '),
        }
        text.push_str(word);
        last_pos = Some(pos);
    }

    OcrOutput {
        text: text.trim().to_string(),
        confidence: mean_confidence(confidences),
    }
}
