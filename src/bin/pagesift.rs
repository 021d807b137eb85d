//! CLI binary for pagesift.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use pagesift::coverage::{
    build_coverage_report, format_diagnostic_table, page_diagnostic_rows,
    summarize_coverage_warnings,
};
use pagesift::pages::{
    attach_captions, find_page_captions, find_unresolved_labels, UnresolvedLabels,
};
use pagesift::{
    extract_file, ExtractedVisual, ExtractionConfig, ExtractionOutput, ExtractionProgressCallback,
    PageExtractionDiagnostic, PageWarning, ProgressCallback, VisualKind,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// page. Pages may complete out of order when `--concurrency > 1`.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    warnings: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner only until `on_extraction_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            warnings: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn take_elapsed_ms(&self, page_num: usize) -> u128 {
        self.start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, diag: &PageExtractionDiagnostic) {
        let elapsed_ms = self.take_elapsed_ms(page_num);
        let mark = if diag.has_no_text() {
            yellow("○")
        } else {
            green("✓")
        };
        let confidence = diag
            .ocr_confidence
            .map(|c| format!(" conf {c:.0}"))
            .unwrap_or_default();

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}{}  {}  {}",
            mark,
            page_num,
            total,
            diag.source_label(),
            confidence,
            dim(&format!(
                "{:>5} chars  {} img  {} vec",
                diag.text_length, diag.image_count, diag.vector_count
            )),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_warning(&self, warning: &PageWarning) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!("  {} {}", yellow("⚠"), warning));
    }

    fn on_extraction_complete(&self, total_pages: usize, ocr_pages: usize) {
        self.bar.finish_and_clear();
        let warnings = self.warnings.load(Ordering::SeqCst);
        eprintln!(
            "{} {} pages extracted ({} via OCR){}",
            if warnings == 0 { green("✔") } else { yellow("⚠") },
            bold(&total_pages.to_string()),
            ocr_pages,
            if warnings == 0 {
                String::new()
            } else {
                format!(", {} warnings", warnings)
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Page-delimited text on stdout
  pagesift document.pdf

  # Text plus the coverage report and per-page diagnostics table
  pagesift --report scan.pdf

  # Encrypted document, German OCR
  pagesift --password s3cret --ocr-lang deu contract.pdf

  # Everything as JSON, visuals written to a directory
  pagesift --json --visuals-dir ./visuals paper.pdf > paper.json

EXTERNAL ENGINES:
  tesseract   OCR for pages without a text layer (--tesseract to override)
  pdfium      page rendering for OCR and vector rasterisation
              (PDFIUM_LIB_PATH, ./, or the system library path)
  Missing engines degrade the affected pages with a warning.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     Path to libpdfium
  PAGESIFT_*          Every flag can be set through the environment
  RUST_LOG            Override the log filter (e.g. pagesift=debug)
"#;

/// Extract page-delimited text, OCR fallback, visuals and coverage diagnostics from PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pagesift",
    version,
    about = "Extract text, visuals and coverage diagnostics from PDF files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write the text stream (or JSON) to this file instead of stdout.
    #[arg(short, long, env = "PAGESIFT_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGESIFT_PASSWORD")]
    password: Option<String>,

    /// Do not run OCR on pages without selectable text.
    #[arg(long, env = "PAGESIFT_NO_OCR")]
    no_ocr: bool,

    /// OCR language tag (tesseract -l).
    #[arg(long, env = "PAGESIFT_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Rendering DPI for OCR and vector rasterisation (72–400).
    #[arg(long, env = "PAGESIFT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Pages processed in parallel. Default: number of CPUs.
    #[arg(short, long, env = "PAGESIFT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Do not rasterise pages that carry vector graphics.
    #[arg(long, env = "PAGESIFT_NO_VECTOR_RASTER")]
    no_vector_raster: bool,

    /// OCR confidence below which a page is flagged (0–100).
    #[arg(long, env = "PAGESIFT_LOW_CONFIDENCE", default_value_t = 60.0)]
    low_confidence: f64,

    /// Output structured JSON instead of the text stream.
    #[arg(long, env = "PAGESIFT_JSON")]
    json: bool,

    /// Append the coverage report and per-page diagnostics table.
    #[arg(long, env = "PAGESIFT_REPORT")]
    report: bool,

    /// Write every viewable visual to this directory.
    #[arg(long, env = "PAGESIFT_VISUALS_DIR")]
    visuals_dir: Option<PathBuf>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Path to the tesseract executable.
    #[arg(long, env = "PAGESIFT_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Disable progress bar.
    #[arg(long, env = "PAGESIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGESIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGESIFT_QUIET")]
    quiet: bool,
}

/// JSON document printed by `--json`.
#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    output: &'a ExtractionOutput,
    coverage_warnings: Vec<String>,
    unresolved_labels: UnresolvedLabels,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let mut output = match extract_file(&cli.input, &config).await {
        Ok(output) => output,
        Err(e) if e.needs_password() => {
            anyhow::bail!("{e}\nHint: pass --password or set PAGESIFT_PASSWORD.")
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Extraction failed for {}", cli.input.display()))
        }
    };

    let captions = find_page_captions(&output.text);
    attach_captions(&mut output.visuals, &captions);
    let unresolved = find_unresolved_labels(&output.text);
    let coverage_warnings =
        summarize_coverage_warnings(&output.diagnostics, config.low_confidence_threshold);

    // ── Visuals ──────────────────────────────────────────────────────────
    if let Some(ref dir) = cli.visuals_dir {
        let written = write_visuals(dir, output.viewable_visuals()).await?;
        if !cli.quiet {
            eprintln!(
                "{} {} visuals written to {}",
                green("✔"),
                written,
                bold(&dir.display().to_string())
            );
        }
    }

    // ── Render output ────────────────────────────────────────────────────
    let rendered = if cli.json {
        let doc = JsonOutput {
            output: &output,
            coverage_warnings: coverage_warnings.clone(),
            unresolved_labels: unresolved,
        };
        serde_json::to_string_pretty(&doc).context("Failed to serialise output")?
    } else if cli.report {
        let rows = page_diagnostic_rows(&output.diagnostics);
        format!(
            "{}\n\n{}\n\n{}",
            output.text,
            build_coverage_report(
                &output.diagnostics,
                &unresolved,
                Some(output.visuals.as_slice()),
                config.low_confidence_threshold,
            ),
            format_diagnostic_table(&rows)
        )
    } else {
        output.text.clone()
    };

    match cli.output {
        Some(ref path) => {
            tokio::fs::write(path, rendered.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendered.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        for warning in &coverage_warnings {
            eprintln!("{} {}", yellow("⚠"), warning);
        }
        if !show_progress {
            eprintln!(
                "Extracted {} pages ({} OCR) in {}ms, {} visuals, {} warnings",
                output.page_count,
                output.ocr_page_count,
                output.stats.total_duration_ms,
                output.visuals.len(),
                output.warnings.len()
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .use_ocr(!cli.no_ocr)
        .ocr_language(cli.ocr_lang.clone())
        .dpi(cli.dpi)
        .rasterize_vectors(!cli.no_vector_raster)
        .low_confidence_threshold(cli.low_confidence)
        .tesseract_cmd(cli.tesseract.clone());

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write viewable visuals as `p<page>-<name>.<ext>`; returns the count.
async fn write_visuals<'a>(
    dir: &Path,
    visuals: impl Iterator<Item = &'a ExtractedVisual>,
) -> Result<usize> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let files = visual_files(visuals);
    for (name, bytes) in &files {
        let path = dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(files.len())
}

/// File name and payload for every visual worth writing.
///
/// Images are numbered per page (`p003-02-Im1.png`) since nested forms often
/// reuse resource names. All vector visuals of a page share one raster,
/// which is written once as `p003-raster.png`.
fn visual_files<'a>(
    visuals: impl Iterator<Item = &'a ExtractedVisual>,
) -> Vec<(String, &'a [u8])> {
    let mut files = Vec::new();
    let mut image_index: HashMap<usize, usize> = HashMap::new();
    let mut rastered_pages = HashSet::new();
    for visual in visuals {
        match visual.kind {
            VisualKind::Image => {
                let index = image_index.entry(visual.page_number).or_insert(0);
                *index += 1;
                files.push((
                    format!(
                        "p{:03}-{:02}-{}.{}",
                        visual.page_number,
                        index,
                        sanitize(&visual.name),
                        file_extension(visual.image_format.as_deref())
                    ),
                    visual.data.as_slice(),
                ));
            }
            VisualKind::Vector => {
                let Some(ref raster) = visual.rasterized_data else {
                    continue;
                };
                if rastered_pages.insert(visual.page_number) {
                    files.push((
                        format!(
                            "p{:03}-raster.{}",
                            visual.page_number,
                            file_extension(visual.rasterized_format.as_deref())
                        ),
                        raster.as_slice(),
                    ));
                }
            }
        }
    }
    files
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_extension(format: Option<&str>) -> &str {
    match format {
        Some("jpeg") => "jpg",
        Some(other) => other,
        None => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesift::output::VECTOR_FORMAT;

    fn visual(page_number: usize, name: &str, kind: VisualKind) -> ExtractedVisual {
        let vector = kind == VisualKind::Vector;
        ExtractedVisual {
            page_number,
            name: name.to_string(),
            kind,
            image_format: Some(if vector { VECTOR_FORMAT } else { "png" }.to_string()),
            width: None,
            height: None,
            data: vec![1, 2, 3],
            rasterized_data: vector.then(|| vec![9, 9]),
            rasterized_format: vector.then(|| "png".to_string()),
            captions: Vec::new(),
        }
    }

    #[test]
    fn repeated_image_names_get_distinct_files() {
        let visuals = [
            visual(1, "Im1", VisualKind::Image),
            visual(1, "Im1", VisualKind::Image),
            visual(2, "Im1", VisualKind::Image),
        ];
        let names: Vec<String> = visual_files(visuals.iter())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["p001-01-Im1.png", "p001-02-Im1.png", "p002-01-Im1.png"]);
    }

    #[test]
    fn page_raster_is_written_once() {
        let visuals = [
            visual(4, "page-4-vector", VisualKind::Vector),
            visual(4, "Fm1", VisualKind::Vector),
            visual(4, "Fm2", VisualKind::Vector),
        ];
        let files = visual_files(visuals.iter());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "p004-raster.png");
        assert_eq!(files[0].1, &[9, 9]);
    }

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize("../Im 1"), "___Im_1");
    }
}
