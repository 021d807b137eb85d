//! Visual inventory: raster images, vector drawing content and form objects.
//!
//! Two independent passes run over each page:
//!
//! * **Raster**: every image XObject reachable from the page resources,
//!   including those nested inside form XObjects, is counted and
//!   materialised. JPEG and JPEG 2000 payloads pass through untouched; raw
//!   samples are decoded and re-encoded as PNG.
//! * **Vector**: the page content program is scanned for path construction
//!   and painting operators. If any is present, the raw program becomes one
//!   vector visual. Each form XObject in the page resources becomes another.
//!
//! Nothing here fails the page. An undecodable image still yields a visual
//! with empty `data` plus an [`PageWarning::ImageDecodeFailed`].

use crate::error::PageWarning;
use crate::output::{ExtractedVisual, VisualKind, VECTOR_FORMAT};
use crate::pipeline::encode::encode_png;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Path construction and painting operators that mark vector content.
pub const PATH_OPERATORS: &[&str] = &[
    "m", "l", "c", "v", "y", "h", "re", "S", "s", "f", "F", "f*", "B", "B*", "b", "b*",
];

/// Form XObjects may nest; deeper chains are ignored.
const MAX_FORM_DEPTH: usize = 8;
/// Bound on `/Parent` hops when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 64;

// Fallback when the content program does not tokenise: a path operator as a
// whole token, delimited by whitespace or PDF delimiters.
static RE_PATH_OPERATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s\])>}])(?:re|[mlcvyhSsF]|[fBb]\*?)(?:$|[\s\[(</{%])").unwrap()
});

/// Everything the inventory found on one page.
#[derive(Debug, Default)]
pub struct PageVisuals {
    /// Image XObjects detected, whether or not they materialised.
    pub image_count: usize,
    /// Image visuals first, then the content-stream vector visual, then forms.
    pub visuals: Vec<ExtractedVisual>,
    pub warnings: Vec<PageWarning>,
}

impl PageVisuals {
    pub fn vector_count(&self) -> usize {
        self.visuals
            .iter()
            .filter(|v| v.kind == VisualKind::Vector)
            .count()
    }
}

/// Build the visual inventory for one page.
pub fn build_inventory(doc: &Document, page_id: ObjectId, page_number: usize) -> PageVisuals {
    let mut out = PageVisuals::default();
    let resources = inherited(doc, page_id, b"Resources").and_then(|o| resolve_dict(doc, o));

    // ── Raster pass ──────────────────────────────────────────────────────
    let mut seen = HashSet::new();
    if let Some(res) = resources {
        collect_images(doc, res, page_number, 0, &mut seen, &mut out);
    }
    out.image_count = out.visuals.len();

    // ── Vector pass: page content program ────────────────────────────────
    match page_content_bytes(doc, page_id) {
        Ok(content) if contains_path_operators(&content) => {
            let (width, height) = media_box_size(doc, page_id).unzip();
            out.visuals.push(ExtractedVisual {
                page_number,
                name: format!("page-{}-vector", page_number),
                kind: VisualKind::Vector,
                image_format: Some(VECTOR_FORMAT.to_string()),
                width,
                height,
                data: content,
                rasterized_data: None,
                rasterized_format: None,
                captions: Vec::new(),
            });
        }
        Ok(_) => {}
        Err(detail) => {
            warn!("Page {}: content stream unreadable: {}", page_number, detail);
            out.warnings.push(PageWarning::ContentDecodeFailed {
                page: page_number,
                detail,
            });
        }
    }

    // ── Vector pass: form XObjects ───────────────────────────────────────
    if let Some(res) = resources {
        collect_forms(doc, res, page_number, &mut out);
    }

    debug!(
        "Page {}: {} images, {} vector visuals",
        page_number,
        out.image_count,
        out.vector_count()
    );
    out
}

/// True when the content program contains at least one path operator.
pub fn contains_path_operators(content: &[u8]) -> bool {
    match Content::decode(content) {
        Ok(parsed) => parsed
            .operations
            .iter()
            .any(|op| PATH_OPERATORS.contains(&op.operator.as_str())),
        Err(e) => {
            trace!("Content did not tokenise ({}), scanning raw bytes", e);
            RE_PATH_OPERATOR.is_match(&String::from_utf8_lossy(content))
        }
    }
}

// ── Raster images ────────────────────────────────────────────────────────

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    page_number: usize,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    out: &mut PageVisuals,
) {
    if depth > MAX_FORM_DEPTH {
        return;
    }
    for (name, id, stream) in xobjects(doc, resources) {
        if let Some(id) = id {
            if !seen.insert(id) {
                continue;
            }
        }
        match subtype(stream) {
            Some(b"Image") => {
                let index = out.visuals.len() + 1;
                let visual = image_visual(doc, stream, name, page_number, index, &mut out.warnings);
                out.visuals.push(visual);
            }
            Some(b"Form") => {
                if let Some(nested) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(doc, o))
                {
                    collect_images(doc, nested, page_number, depth + 1, seen, out);
                }
            }
            _ => {}
        }
    }
}

fn image_visual(
    doc: &Document,
    stream: &Stream,
    name: String,
    page_number: usize,
    index: usize,
    warnings: &mut Vec<PageWarning>,
) -> ExtractedVisual {
    let name = if name.is_empty() {
        format!("page-{}-image-{}", page_number, index)
    } else {
        name
    };
    let width = dict_u32(&stream.dict, b"Width");
    let height = dict_u32(&stream.dict, b"Height");

    let (data, format) = match materialize_image(doc, stream) {
        Ok((data, format)) => (data, Some(format.to_string())),
        Err(detail) => {
            warn!(
                "Page {}: image '{}' could not be decoded: {}",
                page_number, name, detail
            );
            warnings.push(PageWarning::ImageDecodeFailed {
                page: page_number,
                name: name.clone(),
                detail,
            });
            (Vec::new(), None)
        }
    };

    ExtractedVisual {
        page_number,
        name,
        kind: VisualKind::Image,
        image_format: format,
        width,
        height,
        data,
        rasterized_data: None,
        rasterized_format: None,
        captions: Vec::new(),
    }
}

/// Recover an image stream as encoded bytes plus a lowercase format tag.
///
/// JPEG and JPEG 2000 payloads pass through. Everything else is decoded to
/// 8-bit samples (unpacking 1/2/4/16-bit data and expanding `/Indexed`
/// palettes) and re-encoded as PNG.
pub fn materialize_image(
    doc: &Document,
    stream: &Stream,
) -> Result<(Vec<u8>, &'static str), String> {
    let dict = &stream.dict;

    match first_filter(dict) {
        Some(b"DCTDecode") => return Ok((stream.content.clone(), "jpeg")),
        Some(b"JPXDecode") => return Ok((stream.content.clone(), "jp2")),
        Some(f @ (b"CCITTFaxDecode" | b"JBIG2Decode")) => {
            return Err(format!("unsupported filter {}", String::from_utf8_lossy(f)));
        }
        _ => {}
    }

    let width = dict_u32(dict, b"Width").ok_or("missing /Width")?;
    let height = dict_u32(dict, b"Height").ok_or("missing /Height")?;
    let is_mask = dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false);
    let bits = if is_mask {
        1
    } else {
        dict.get(b"BitsPerComponent")
            .and_then(Object::as_i64)
            .unwrap_or(8)
    };
    let color_space = color_space(doc, dict, is_mask)?;
    let bits = match (bits, &color_space) {
        (16, ColorSpace::Indexed { .. }) => {
            return Err("16-bit samples are not valid for /Indexed".to_string())
        }
        (1 | 2 | 4 | 8 | 16, _) => bits as u8,
        (other, _) => return Err(format!("unsupported bits per component: {}", other)),
    };

    let samples = stream_bytes(stream).map_err(|e| format!("stream decode failed: {}", e))?;
    let values = unpack_samples(&samples, width, height, color_space.components(), bits)?;
    let (pixels, components) = match &color_space {
        ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } => (
            expand_palette(&values, base.components(), *hival, lookup),
            base.components(),
        ),
        cs => {
            let mut values = scale_to_8bit(values, bits);
            if decode_inverted(dict) {
                values.iter_mut().for_each(|v| *v = 255 - *v);
            }
            (values, cs.components())
        }
    };

    let image = image_from_samples(&pixels, width, height, components)?;
    let png = encode_png(&image).map_err(|e| e.to_string())?;
    Ok((png, "png"))
}

/// Unpack rows of `bits`-wide samples into one byte per sample. Rows start
/// on byte boundaries; 16-bit samples keep their high byte. Values are not
/// rescaled.
fn unpack_samples(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits: u8,
) -> Result<Vec<u8>, String> {
    let overflow = || "image dimensions overflow".to_string();
    let row_values = (width as usize)
        .checked_mul(components)
        .ok_or_else(overflow)?;
    let row_bytes = row_values
        .checked_mul(bits as usize)
        .ok_or_else(overflow)?
        .div_ceil(8);
    let needed = row_bytes
        .checked_mul(height as usize)
        .ok_or_else(overflow)?;
    if needed == 0 {
        return Err(format!("empty image: {}x{}", width, height));
    }
    if data.len() < needed {
        return Err(format!(
            "sample data too short: {} bytes for {}x{}x{} at {} bits",
            data.len(),
            width,
            height,
            components,
            bits
        ));
    }

    let mut out = Vec::with_capacity(row_values * height as usize);
    for row in data[..needed].chunks_exact(row_bytes) {
        match bits {
            8 => out.extend_from_slice(row),
            16 => out.extend(row.chunks_exact(2).map(|pair| pair[0])),
            _ => {
                let width = bits as usize;
                let mask = (1u8 << bits) - 1;
                let unpacked = row.iter().flat_map(|&byte| {
                    (1..=8 / width).map(move |i| (byte >> (8 - width * i)) & mask)
                });
                out.extend(unpacked.take(row_values));
            }
        }
    }
    Ok(out)
}

fn scale_to_8bit(mut values: Vec<u8>, bits: u8) -> Vec<u8> {
    if bits < 8 {
        let max = (1u16 << bits) - 1;
        values
            .iter_mut()
            .for_each(|v| *v = (*v as u16 * 255 / max) as u8);
    }
    values
}

/// `/Decode [1 0 ...]` swaps dark and light.
fn decode_inverted(dict: &Dictionary) -> bool {
    let Ok(decode) = dict.get(b"Decode").and_then(Object::as_array) else {
        return false;
    };
    matches!(
        (decode.first().and_then(object_to_f64), decode.get(1).and_then(object_to_f64)),
        (Some(lo), Some(hi)) if lo > hi
    )
}

/// Replace each palette index with its `base_components` lookup entry.
/// Indices above `hival` are clamped.
fn expand_palette(indices: &[u8], base_components: usize, hival: usize, lookup: &[u8]) -> Vec<u8> {
    indices
        .iter()
        .flat_map(|&index| {
            let start = (index as usize).min(hival) * base_components;
            lookup[start..start + base_components].iter().copied()
        })
        .collect()
}

fn image_from_samples(
    samples: &[u8],
    width: u32,
    height: u32,
    components: usize,
) -> Result<DynamicImage, String> {
    let needed = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(components))
        .ok_or("image dimensions overflow")?;
    if samples.len() < needed {
        return Err(format!(
            "sample data too short: {} bytes for {}x{}x{}",
            samples.len(),
            width,
            height,
            components
        ));
    }
    let samples = &samples[..needed];
    let image = match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb = samples
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 255 - cmyk[3] as u16;
                    [0, 1, 2].map(|i| ((255 - cmyk[i] as u16) * k / 255) as u8)
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        n => return Err(format!("unsupported component count: {}", n)),
    };
    image.ok_or_else(|| "sample buffer does not match dimensions".to_string())
}

// ── Colour spaces ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// One index per pixel into `lookup`, which holds `hival + 1` entries of
    /// `base` colour.
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

fn color_space(doc: &Document, dict: &Dictionary, is_mask: bool) -> Result<ColorSpace, String> {
    if is_mask {
        return Ok(ColorSpace::Gray);
    }
    match dict.get(b"ColorSpace") {
        Ok(cs) => parse_color_space(doc, cs, true),
        // Some producers omit the colour space.
        Err(_) => Ok(ColorSpace::Gray),
    }
}

fn parse_color_space(
    doc: &Document,
    cs: &Object,
    allow_indexed: bool,
) -> Result<ColorSpace, String> {
    let (_, cs) = doc.dereference(cs).map_err(|e| e.to_string())?;
    let (name, params): (&[u8], &[Object]) = match cs {
        Object::Name(n) => (n.as_slice(), &[] as &[Object]),
        Object::Array(arr) => match arr.split_first() {
            Some((head, rest)) => (
                head.as_name().map_err(|_| "malformed colour space".to_string())?,
                rest,
            ),
            None => return Err("empty colour space array".to_string()),
        },
        _ => return Err("malformed colour space".to_string()),
    };

    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
        // ICC profiles carry their component count in /N.
        b"ICCBased" => {
            let n = params
                .first()
                .and_then(|o| doc.dereference(o).ok())
                .and_then(|(_, o)| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok())
                .unwrap_or(3);
            match n {
                1 => Ok(ColorSpace::Gray),
                3 => Ok(ColorSpace::Rgb),
                4 => Ok(ColorSpace::Cmyk),
                n => Err(format!("unsupported ICC component count: {}", n)),
            }
        }
        b"Indexed" | b"I" if allow_indexed => {
            let [base, hival, lookup, ..] = params else {
                return Err("malformed /Indexed colour space".to_string());
            };
            let base = parse_color_space(doc, base, false)?;
            let hival = doc
                .dereference(hival)
                .ok()
                .and_then(|(_, o)| o.as_i64().ok())
                .ok_or("malformed /Indexed hival")?
                .clamp(0, 255) as usize;
            let lookup = palette_bytes(doc, lookup)?;
            let needed = (hival + 1) * base.components();
            if lookup.len() < needed {
                return Err(format!(
                    "palette too short: {} bytes for {} entries",
                    lookup.len(),
                    hival + 1
                ));
            }
            Ok(ColorSpace::Indexed {
                base: Box::new(base),
                hival,
                lookup,
            })
        }
        other => Err(format!(
            "unsupported colour space {}",
            String::from_utf8_lossy(other)
        )),
    }
}

/// The `/Indexed` lookup table, given inline as a string or as a stream.
fn palette_bytes(doc: &Document, obj: &Object) -> Result<Vec<u8>, String> {
    let (_, obj) = doc.dereference(obj).map_err(|e| e.to_string())?;
    match obj {
        Object::String(bytes, _) => Ok(bytes.clone()),
        Object::Stream(stream) => {
            stream_bytes(stream).map_err(|e| format!("palette stream: {}", e))
        }
        _ => Err("malformed /Indexed lookup table".to_string()),
    }
}

// ── Form XObjects ────────────────────────────────────────────────────────

fn collect_forms(
    doc: &Document,
    resources: &Dictionary,
    page_number: usize,
    out: &mut PageVisuals,
) {
    let mut index = 0;
    for (name, _, stream) in xobjects(doc, resources) {
        if !matches!(subtype(stream), Some(b"Form")) {
            continue;
        }
        index += 1;
        let name = if name.is_empty() {
            format!("page-{}-form-{}", page_number, index)
        } else {
            name
        };
        let data = stream_bytes(stream).unwrap_or_else(|e| {
            warn!("Page {}: form '{}' content unreadable: {}", page_number, name, e);
            out.warnings.push(PageWarning::ContentDecodeFailed {
                page: page_number,
                detail: format!("form '{}': {}", name, e),
            });
            Vec::new()
        });
        let (width, height) = stream
            .dict
            .get(b"BBox")
            .ok()
            .and_then(rect_size)
            .unzip();
        out.visuals.push(ExtractedVisual {
            page_number,
            name,
            kind: VisualKind::Vector,
            image_format: Some(VECTOR_FORMAT.to_string()),
            width,
            height,
            data,
            rasterized_data: None,
            rasterized_format: None,
            captions: Vec::new(),
        });
    }
}

// ── lopdf helpers ────────────────────────────────────────────────────────

/// `(resource name, object id, stream)` for every stream in `/XObject`.
fn xobjects<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
) -> Vec<(String, Option<ObjectId>, &'a Stream)> {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))
    else {
        return Vec::new();
    };
    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let (id, target) = doc.dereference(obj).ok()?;
            let stream = target.as_stream().ok()?;
            Some((String::from_utf8_lossy(name).into_owned(), id, stream))
        })
        .collect()
}

fn subtype(stream: &Stream) -> Option<&[u8]> {
    stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
}

fn first_filter(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
}

/// Stream payload with filters removed; unfiltered streams are returned as is.
fn stream_bytes(stream: &Stream) -> Result<Vec<u8>, lopdf::Error> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content()
    } else {
        Ok(stream.content.clone())
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    doc.dereference(obj).ok()?.1.as_dict().ok()
}

/// Look up `key` on the page, walking up the page tree via `/Parent`.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Concatenated, decompressed `/Contents` of a page.
pub fn page_content_bytes(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, String> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("page dictionary: {}", e))?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };

    let (_, contents) = doc
        .dereference(contents)
        .map_err(|e| format!("/Contents: {}", e))?;
    let streams: Vec<&Object> = match contents {
        Object::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut content = Vec::new();
    for item in streams {
        let (_, obj) = doc
            .dereference(item)
            .map_err(|e| format!("/Contents item: {}", e))?;
        let stream = obj
            .as_stream()
            .map_err(|e| format!("/Contents item is not a stream: {}", e))?;
        let bytes = stream_bytes(stream).map_err(|e| e.to_string())?;
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&bytes);
    }
    Ok(content)
}

fn media_box_size(doc: &Document, page_id: ObjectId) -> Option<(u32, u32)> {
    let obj = inherited(doc, page_id, b"MediaBox")?;
    let (_, obj) = doc.dereference(obj).ok()?;
    rect_size(obj)
}

fn rect_size(obj: &Object) -> Option<(u32, u32)> {
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let n: Vec<f64> = arr.iter().filter_map(object_to_f64).collect();
    if n.len() != 4 {
        return None;
    }
    Some((
        (n[2] - n[0]).abs().round() as u32,
        (n[3] - n[1]).abs().round() as u32,
    ))
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn decode(stream: &Stream) -> image::DynamicImage {
        let (data, format) = materialize_image(&Document::new(), stream).unwrap();
        assert_eq!(format, "png");
        image::load_from_memory(&data).unwrap()
    }

    fn palette_space(base: &str, hival: i64, lookup: Vec<u8>) -> Object {
        Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(base.as_bytes().to_vec()),
            Object::Integer(hival),
            Object::String(lookup, StringFormat::Hexadecimal),
        ])
    }

    #[test]
    fn detects_path_operators_in_tokenised_content() {
        assert!(contains_path_operators(b"q 1 0 0 1 0 0 cm 10 10 m 20 20 l S Q"));
        assert!(contains_path_operators(b"0 0 100 50 re f*"));
    }

    #[test]
    fn text_only_content_has_no_vectors() {
        assert!(!contains_path_operators(
            b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET"
        ));
        assert!(!contains_path_operators(b""));
    }

    #[test]
    fn operator_names_inside_words_do_not_match_fallback() {
        assert!(!RE_PATH_OPERATOR.is_match("(lemma) Tj"));
        assert!(RE_PATH_OPERATOR.is_match("1 2 m\n3 4 l"));
        assert!(RE_PATH_OPERATOR.is_match("0 0 5 5 re B*"));
    }

    #[test]
    fn jpeg_streams_pass_through() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "Filter" => "DCTDecode",
            },
            vec![0xFF, 0xD8, 0xFF, 0xD9],
        );
        let (data, format) = materialize_image(&Document::new(), &stream).unwrap();
        assert_eq!(format, "jpeg");
        assert_eq!(data, vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn raw_rgb_samples_become_png() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let (data, format) = materialize_image(&Document::new(), &stream).unwrap();
        assert_eq!(format, "png");
        let img = image::load_from_memory(&data).unwrap();
        assert_eq!((img.width(), img.height()), (2, 1));
    }

    #[test]
    fn short_sample_data_is_an_error() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 10,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0; 5],
        );
        assert!(materialize_image(&Document::new(), &stream).is_err());
    }

    #[test]
    fn unsupported_filters_are_reported() {
        let stream = Stream::new(
            dictionary! { "Subtype" => "Image", "Filter" => "JBIG2Decode" },
            vec![1, 2, 3],
        );
        let err = materialize_image(&Document::new(), &stream).unwrap_err();
        assert!(err.contains("JBIG2Decode"));
    }

    #[test]
    fn huge_dimensions_fail_without_panicking() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4_294_967_295_i64,
                "Height" => 4_294_967_295_i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![0; 12],
        );
        let err = materialize_image(&Document::new(), &stream).unwrap_err();
        assert!(err.contains("overflow") || err.contains("too short"), "{err}");
    }

    #[test]
    fn indexed_rgb_palette_is_expanded() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => palette_space("DeviceRGB", 1, vec![255, 0, 0, 0, 0, 255]),
                "BitsPerComponent" => 8,
            },
            vec![1, 0],
        );
        let img = decode(&stream).to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn one_bit_palette_indices_are_unpacked() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 3,
                "Height" => 1,
                "ColorSpace" => palette_space("DeviceGray", 1, vec![10, 200]),
                "BitsPerComponent" => 1,
            },
            vec![0b0100_0000],
        );
        let img = decode(&stream).to_luma8();
        assert_eq!(img.as_raw(), &vec![10, 200, 10]);
    }

    #[test]
    fn short_palette_is_an_error() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => palette_space("DeviceRGB", 3, vec![0; 6]),
                "BitsPerComponent" => 8,
            },
            vec![0],
        );
        let err = materialize_image(&Document::new(), &stream).unwrap_err();
        assert!(err.contains("palette too short"), "{err}");
    }

    #[test]
    fn one_bit_gray_scan_is_unpacked_per_row() {
        // 10 pixels wide: each row pads to two bytes.
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 10,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
            },
            vec![0b1010_1010, 0b1100_0000, 0b0000_0000, 0b0100_0000],
        );
        let img = decode(&stream).to_luma8();
        let row0: Vec<u8> = (0..10).map(|x| img.get_pixel(x, 0).0[0]).collect();
        let row1: Vec<u8> = (0..10).map(|x| img.get_pixel(x, 1).0[0]).collect();
        assert_eq!(row0, vec![255, 0, 255, 0, 255, 0, 255, 0, 255, 255]);
        assert_eq!(row1, vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn four_bit_gray_is_rescaled() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 4,
            },
            vec![0xF5],
        );
        let img = decode(&stream).to_luma8();
        assert_eq!(img.as_raw(), &vec![255, 85]);
    }

    #[test]
    fn inverted_decode_array_swaps_black_and_white() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 1,
                "Decode" => vec![1.into(), 0.into()],
            },
            vec![0b1000_0000],
        );
        let img = decode(&stream).to_luma8();
        assert_eq!(img.as_raw(), &vec![0, 255]);
    }

    #[test]
    fn image_masks_read_as_one_bit_gray() {
        let stream = Stream::new(
            dictionary! {
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 1,
                "ImageMask" => true,
            },
            vec![0b0110_0000],
        );
        let img = decode(&stream).to_luma8();
        assert_eq!(img.as_raw(), &vec![0, 255, 255, 0]);
    }
}
