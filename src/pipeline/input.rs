//! Input resolution: read a user-supplied path into memory.
//!
//! Extraction works on bytes so that callers holding an upload buffer never
//! touch the file system. This module covers the CLI and `extract_file`
//! case: map I/O failures onto the fatal error type and reject files that do
//! not start with the `%PDF` magic before handing them to the parser.

use crate::error::ExtractError;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Read a local PDF file, validating existence, permissions and magic bytes.
pub async fn read_pdf_file(path: &Path) -> Result<Vec<u8>, ExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    check_magic(&bytes)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Reject buffers that cannot be a PDF container.
///
/// The header may be preceded by junk per the PDF format's 1024-byte
/// allowance, so the marker is searched for rather than anchored.
pub fn check_magic(bytes: &[u8]) -> Result<(), ExtractError> {
    let window = &bytes[..bytes.len().min(1024)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Ok(());
    }
    let shown: Vec<u8> = bytes.iter().take(4).copied().collect();
    Err(ExtractError::CorruptDocument {
        detail: format!(
            "missing %PDF header (file starts with {:?})",
            String::from_utf8_lossy(&shown)
        ),
    })
}
