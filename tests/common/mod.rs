//! Shared fixtures: in-memory PDFs built with lopdf, plus fake engines.
#![allow(dead_code)]

use image::DynamicImage;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pagesift::{EngineError, OcrEngine, OcrOutput, PageRenderer, RenderRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ── Page content ─────────────────────────────────────────────────────────────

/// What one fixture page carries.
#[derive(Debug, Clone)]
pub enum PageSpec {
    /// One BT/ET block per line of text.
    Text(Vec<&'static str>),
    /// No content at all: a "scanned" page with nothing in the text layer.
    Blank,
    /// A 2×2 raw RGB image XObject named `Im1`, optionally with a text line.
    RawImage(Option<&'static str>),
    /// A DCT (JPEG) image XObject whose payload is passed through verbatim.
    JpegImage(&'static [u8]),
    /// A text line followed by a stroked path.
    Vector(&'static str),
    /// A form XObject `Fm1` drawing a path, invoked from the page.
    Form,
    /// A form XObject `Fm1` whose own resources hold the raw image `Im1`.
    FormWithImage,
    /// An image XObject `Scan` behind a filter the pipeline does not decode.
    UndecodableImage,
    /// An image XObject `Huge` claiming 4294967295×4294967295 pixels.
    OversizedImage,
    /// A 2×2, 1-bit `/Indexed` image `Pal` over a red/green palette.
    PaletteImage,
    /// A text line, then a path split across two more content streams.
    SplitContents(&'static str),
}

pub fn text(lines: &[&'static str]) -> PageSpec {
    PageSpec::Text(lines.to_vec())
}

/// 2×2 RGB: red, green, blue, white.
pub const RGB_SAMPLES: [u8; 12] = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];

/// Stand-in JPEG payload; the pipeline never decodes DCT data.
pub const FAKE_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9,
];

fn raw_image(doc: &mut Document) -> ObjectId {
    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2_i64,
            "Height" => 2_i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        RGB_SAMPLES.to_vec(),
    ))
}

fn text_ops(lines: &[&str]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("BT /F1 12 Tf 72 {} Td ({}) Tj ET\n", 720 - 20 * i, line))
        .collect()
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page: &PageSpec,
) -> ObjectId {
    let mut xobjects = Dictionary::new();
    let contents: Vec<String> = match page {
        PageSpec::Text(lines) => vec![text_ops(lines)],
        PageSpec::Blank => vec![String::new()],
        PageSpec::RawImage(caption) => {
            xobjects.set("Im1", raw_image(doc));
            let mut ops = text_ops(caption.as_slice());
            ops.push_str("q 100 0 0 100 72 400 cm /Im1 Do Q\n");
            vec![ops]
        }
        PageSpec::JpegImage(payload) => {
            let image = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1_i64,
                    "Height" => 1_i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8_i64,
                    "Filter" => "DCTDecode",
                },
                payload.to_vec(),
            ));
            xobjects.set("Photo", image);
            vec!["q 50 0 0 50 72 400 cm /Photo Do Q\n".to_string()]
        }
        PageSpec::Vector(line) => {
            let mut ops = text_ops(&[*line]);
            ops.push_str("2 w 72 300 m 300 500 l S\n100 100 50 50 re f\n");
            vec![ops]
        }
        PageSpec::Form => {
            let form = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 120.into(), 80.into()],
                },
                b"0 0 m 120 80 l S".to_vec(),
            ));
            xobjects.set("Fm1", form);
            vec!["q /Fm1 Do Q\n".to_string()]
        }
        PageSpec::FormWithImage => {
            let image = raw_image(doc);
            let form = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Im1" => image },
                    },
                },
                b"q 100 0 0 100 0 0 cm /Im1 Do Q".to_vec(),
            ));
            xobjects.set("Fm1", form);
            vec!["q /Fm1 Do Q\n".to_string()]
        }
        PageSpec::UndecodableImage => {
            let image = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 8_i64,
                    "Height" => 8_i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 1_i64,
                    "Filter" => "CCITTFaxDecode",
                },
                vec![0x00, 0x01, 0x02],
            ));
            xobjects.set("Scan", image);
            vec!["q 100 0 0 100 72 400 cm /Scan Do Q\n".to_string()]
        }
        PageSpec::OversizedImage => {
            let image = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 4_294_967_295_i64,
                    "Height" => 4_294_967_295_i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8_i64,
                },
                RGB_SAMPLES.to_vec(),
            ));
            xobjects.set("Huge", image);
            vec!["q 100 0 0 100 72 400 cm /Huge Do Q\n".to_string()]
        }
        PageSpec::PaletteImage => {
            let palette = Object::String(vec![255, 0, 0, 0, 255, 0], StringFormat::Hexadecimal);
            let image = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 2_i64,
                    "Height" => 2_i64,
                    "ColorSpace" => vec![
                        Object::Name(b"Indexed".to_vec()),
                        Object::Name(b"DeviceRGB".to_vec()),
                        Object::Integer(1),
                        palette,
                    ],
                    "BitsPerComponent" => 1_i64,
                },
                vec![0b0100_0000, 0b1000_0000],
            ));
            xobjects.set("Pal", image);
            vec!["q 100 0 0 100 72 400 cm /Pal Do Q\n".to_string()]
        }
        PageSpec::SplitContents(line) => vec![
            text_ops(&[*line]),
            "2 w 72 300 m\n".to_string(),
            "300 500 l S\n".to_string(),
        ],
    };

    let mut content_ids: Vec<Object> = contents
        .into_iter()
        .map(|ops| {
            let id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
            Object::Reference(id)
        })
        .collect();
    let contents = if content_ids.len() == 1 {
        content_ids.remove(0)
    } else {
        Object::Array(content_ids)
    };
    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };
    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => contents,
        "Resources" => resources,
    })
}

/// Build an unencrypted document with one page per entry.
pub fn build_document(pages: &[PageSpec]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|page| Object::Reference(add_page(&mut doc, pages_id, font_id, page)))
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// One page that carries neither `/Resources` nor `/MediaBox`: both live on
/// the `Pages` node (MediaBox 300×400, font `F1`, raw image `Im1`). The page
/// draws the image and a path.
pub fn build_inherited_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let image_id = raw_image(&mut doc);

    let mut ops = text_ops(&["Inherited resources"]);
    ops.push_str("q 10 0 0 10 20 20 cm /Im1 Do Q\n0 0 m 50 50 l S\n");
    let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => dictionary! { "Im1" => image_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    save(&mut doc)
}

pub fn save(doc: &mut Document) -> Vec<u8> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save PDF");
    buf
}

pub fn build_pdf(pages: &[PageSpec]) -> Vec<u8> {
    save(&mut build_document(pages))
}

// ── RC4 (Standard security handler, revision 2) ──────────────────────────────

const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

fn rc4_transform(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            byte ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
        })
        .collect()
}

/// Build a document and encrypt it with 40-bit RC4 under `user_password`
/// (owner password identical). An empty `user_password` gives a document
/// that is encrypted but opens without a password.
pub fn build_encrypted_pdf(pages: &[PageSpec], user_password: &[u8]) -> Vec<u8> {
    let mut doc = build_document(pages);
    let file_id = b"testfileid123456";
    let permissions: i32 = -4;

    let mut padded_pw = Vec::with_capacity(32);
    let pw_len = user_password.len().min(32);
    padded_pw.extend_from_slice(&user_password[..pw_len]);
    padded_pw.extend_from_slice(&PAD_BYTES[..32 - pw_len]);

    let o_key_digest = md5::compute(&padded_pw);
    let o_value = rc4_transform(&o_key_digest[..5], &padded_pw);

    let mut key_input = Vec::with_capacity(128);
    key_input.extend_from_slice(&padded_pw);
    key_input.extend_from_slice(&o_value);
    key_input.extend_from_slice(&(permissions as u32).to_le_bytes());
    key_input.extend_from_slice(file_id);
    let key_digest = md5::compute(&key_input);
    let enc_key = key_digest[..5].to_vec();

    let u_value = rc4_transform(&enc_key, &PAD_BYTES);

    for (&obj_id, obj) in doc.objects.iter_mut() {
        let mut obj_key_input = Vec::with_capacity(10);
        obj_key_input.extend_from_slice(&enc_key);
        obj_key_input.extend_from_slice(&obj_id.0.to_le_bytes()[..3]);
        obj_key_input.extend_from_slice(&obj_id.1.to_le_bytes()[..2]);
        let obj_key_digest = md5::compute(&obj_key_input);
        let obj_key = &obj_key_digest[..(enc_key.len() + 5).min(16)];

        match obj {
            Object::Stream(stream) => {
                let encrypted = rc4_transform(obj_key, &stream.content);
                stream.set_content(encrypted);
            }
            Object::String(content, _) => {
                *content = rc4_transform(obj_key, content);
            }
            _ => {}
        }
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1_i64,
        "R" => 2_i64,
        "Length" => 40_i64,
        "O" => Object::String(o_value, StringFormat::Literal),
        "U" => Object::String(u_value, StringFormat::Literal),
        "P" => permissions as i64,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.to_vec(), StringFormat::Literal),
            Object::String(file_id.to_vec(), StringFormat::Literal),
        ]),
    );
    save(&mut doc)
}

// ── Fake engines ─────────────────────────────────────────────────────────────

/// Renders a small solid image, or fails every call when `fail` is set.
/// Records the pages and passes it was asked for.
#[derive(Default)]
pub struct FakeRenderer {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub pages: Mutex<Vec<usize>>,
    pub passes: Mutex<Vec<u64>>,
    pub finished: Mutex<Vec<u64>>,
}

impl FakeRenderer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRenderer for FakeRenderer {
    fn render_page(&self, request: &RenderRequest<'_>) -> Result<DynamicImage, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().unwrap().push(request.page_number);
        self.passes.lock().unwrap().push(request.pass_id);
        if self.fail {
            return Err(EngineError::Unavailable("no renderer in tests".into()));
        }
        Ok(DynamicImage::new_rgb8(8, 8))
    }

    fn finish_pass(&self, pass_id: u64) {
        self.finished.lock().unwrap().push(pass_id);
    }
}

/// Returns the same text and confidence for every image.
pub struct FakeOcr {
    pub text: &'static str,
    pub confidence: Option<f64>,
    pub languages: Mutex<Vec<String>>,
}

impl FakeOcr {
    pub fn new(text: &'static str, confidence: Option<f64>) -> Self {
        Self {
            text,
            confidence,
            languages: Mutex::new(Vec::new()),
        }
    }
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, _image: &DynamicImage, language: &str) -> Result<OcrOutput, EngineError> {
        self.languages.lock().unwrap().push(language.to_string());
        Ok(OcrOutput {
            text: self.text.to_string(),
            confidence: self.confidence,
        })
    }
}
