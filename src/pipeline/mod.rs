//! Pipeline stages for PDF extraction.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. Rendering and OCR sit behind traits so the engines can be swapped
//! without touching the other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ open ──▶ ┌─ per page ──────────────────────────────────────────┐
//! (bytes)  (lopdf)   │ text ──▶ [ocr] ──▶ visuals ──▶ [render] ──▶ diagnostics │
//!                    └──────────────────────────────────────────────────────┘
//! ```
//!
//! 1. [`input`]   read the file, sanity-check the `%PDF` header
//! 2. [`open`]    parse and decrypt (empty password first, then the caller's)
//! 3. [`text`]    selectable text per page, whitespace-normalised
//! 4. [`ocr`]     only for pages with no text: render, then recognise
//! 5. [`visuals`] raster images, vector drawing operators, form XObjects
//! 6. [`render`]  whole-page raster for pages carrying vector content
//! 7. [`diagnostics`] fold the stage results into one record per page
//!
//! [`encode`] holds the PNG/base64 helpers shared by several stages.

pub mod diagnostics;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod open;
pub mod render;
pub mod text;
pub mod visuals;
