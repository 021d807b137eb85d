//! Document opening: raw bytes → page-addressable lopdf document.
//!
//! ## Password handling
//!
//! Encrypted documents are tried with the empty user password first, since
//! many "protected" PDFs only restrict permissions and open without one. Only
//! when that fails is the caller's password tried. The result is a tagged
//! [`OpenOutcome`] rather than an error so the caller can branch on "ask for a
//! password" without string matching; [`OpenOutcome::into_result`] converts
//! it at the pipeline boundary.
//!
//! ## Why not `Document::decrypt`?
//!
//! lopdf's document-level decrypt reads the `/CF` crypt filter dictionary
//! unconditionally, which only exists from `/V 4` on. The common RC4
//! handlers (`/V 1` and `/V 2`) therefore fail. Key derivation and the
//! password check still go through `lopdf::encryption`; this module only
//! walks the objects, picks the cipher from `/V` and `/StmF`, and also
//! decrypts strings nested inside dictionaries and arrays.

use crate::error::ExtractError;
use lopdf::encryption::{self, DecryptionError};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info, trace};

/// An opened, decrypted document plus what the rest of the pipeline needs.
pub struct OpenedDocument {
    pub doc: Document,
    /// Page object ids in page order (index 0 is page 1).
    pub page_ids: Vec<ObjectId>,
    /// The non-empty password that unlocked the document, if one was needed.
    /// The renderer reopens the same bytes with it.
    pub password: Option<String>,
    pub was_encrypted: bool,
}

impl OpenedDocument {
    fn new(doc: Document, password: Option<&str>, was_encrypted: bool) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self {
            doc,
            page_ids,
            password: password.map(str::to_string),
            was_encrypted,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }
}

impl std::fmt::Debug for OpenedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedDocument")
            .field("pages", &self.page_ids.len())
            .field("was_encrypted", &self.was_encrypted)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Result of trying to open a document.
#[derive(Debug)]
pub enum OpenOutcome {
    Opened(OpenedDocument),
    /// Encrypted, and neither the empty nor the supplied password unlocks it.
    NeedsPassword,
    /// Not a parseable PDF, or its encryption data is malformed.
    Corrupt(String),
}

impl OpenOutcome {
    /// Convert to the fatal error type. `supplied` records whether the caller
    /// gave a password, which only changes the message.
    pub fn into_result(self, supplied: bool) -> Result<OpenedDocument, ExtractError> {
        match self {
            OpenOutcome::Opened(doc) => Ok(doc),
            OpenOutcome::NeedsPassword => Err(ExtractError::PasswordRequired { supplied }),
            OpenOutcome::Corrupt(detail) => Err(ExtractError::CorruptDocument { detail }),
        }
    }
}

/// Open a PDF from bytes, decrypting it if necessary.
pub fn open_document(bytes: &[u8], password: Option<&str>) -> OpenOutcome {
    let mut doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => return OpenOutcome::Corrupt(e.to_string()),
    };

    if !doc.is_encrypted() {
        let opened = OpenedDocument::new(doc, None, false);
        info!("PDF loaded: {} pages", opened.page_count());
        return OpenOutcome::Opened(opened);
    }

    // The key is derived and checked before any object is touched, so a
    // rejected password leaves the document as parsed.
    match decrypt_document(&mut doc, "") {
        Ok(()) => {
            let opened = OpenedDocument::new(doc, None, true);
            info!(
                "PDF loaded: {} pages (decrypted with empty password)",
                opened.page_count()
            );
            return OpenOutcome::Opened(opened);
        }
        Err(DecryptionError::IncorrectPassword) => debug!("Empty password rejected"),
        Err(e) => return OpenOutcome::Corrupt(e.to_string()),
    }

    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return OpenOutcome::NeedsPassword;
    };

    match decrypt_document(&mut doc, password) {
        Ok(()) => {
            let opened = OpenedDocument::new(doc, Some(password), true);
            info!(
                "PDF loaded: {} pages (decrypted with supplied password)",
                opened.page_count()
            );
            OpenOutcome::Opened(opened)
        }
        Err(DecryptionError::IncorrectPassword) => OpenOutcome::NeedsPassword,
        Err(e) => OpenOutcome::Corrupt(e.to_string()),
    }
}

// ── Decryption ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cipher {
    Rc4,
    Aes,
    /// `/StmF /Identity`: streams and strings are stored in the clear.
    Identity,
}

/// Cipher for `/V 1..4` handlers. `/V 4` names its stream filter in `/StmF`
/// and describes it under `/CF`; earlier versions are always RC4.
fn cipher_for(encrypt: &Dictionary) -> Cipher {
    let version = encrypt.get(b"V").and_then(Object::as_i64).unwrap_or(0);
    if version < 4 {
        return Cipher::Rc4;
    }
    let filter = encrypt
        .get(b"StmF")
        .and_then(Object::as_name)
        .unwrap_or(b"Identity".as_slice());
    if filter == b"Identity" {
        return Cipher::Identity;
    }
    let method = encrypt
        .get(b"CF")
        .and_then(Object::as_dict)
        .and_then(|cf| cf.get(filter))
        .and_then(Object::as_dict)
        .and_then(|f| f.get(b"CFM"))
        .and_then(Object::as_name)
        .unwrap_or(b"V2".as_slice());
    match method {
        b"AESV2" => Cipher::Aes,
        b"None" => Cipher::Identity,
        _ => Cipher::Rc4,
    }
}

/// Check `password` and, if it is right, decrypt every string and stream in
/// place and drop `/Encrypt` from the trailer.
fn decrypt_document(doc: &mut Document, password: &str) -> Result<(), DecryptionError> {
    let encrypt_id = doc
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .map_err(|_| DecryptionError::MissingEncryptDictionary)?;
    let (cipher, encrypt_metadata) = {
        let encrypt = doc
            .get_encrypted()
            .map_err(|_| DecryptionError::MissingEncryptDictionary)?;
        let metadata = encrypt
            .get(b"EncryptMetadata")
            .and_then(Object::as_bool)
            .unwrap_or(true);
        (cipher_for(encrypt), metadata)
    };
    let key = encryption::get_encryption_key(doc, password, true)?;

    if cipher != Cipher::Identity {
        for (&id, obj) in doc.objects.iter_mut() {
            if id == encrypt_id {
                continue;
            }
            match obj.type_name().ok() {
                Some(b"XRef") => continue,
                Some(b"Metadata") if !encrypt_metadata => continue,
                _ => {}
            }
            decrypt_object_tree(obj, &key, id, cipher);
        }
    }

    doc.trailer.remove(b"Encrypt");
    Ok(())
}

fn decrypt_object_tree(obj: &mut Object, key: &[u8], id: ObjectId, cipher: Cipher) {
    match obj {
        Object::String(bytes, _) => {
            if let Some(plain) = decrypt_bytes(bytes, key, id, cipher) {
                *bytes = plain;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                decrypt_object_tree(item, key, id, cipher);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                decrypt_object_tree(value, key, id, cipher);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                decrypt_object_tree(value, key, id, cipher);
            }
            if let Some(plain) = decrypt_bytes(&stream.content, key, id, cipher) {
                stream.set_content(plain);
            }
        }
        _ => {}
    }
}

fn decrypt_bytes(data: &[u8], key: &[u8], id: ObjectId, cipher: Cipher) -> Option<Vec<u8>> {
    // AES payloads are an IV plus whole blocks; anything else would panic
    // inside the block decryptor.
    if cipher == Cipher::Aes && (data.len() < 32 || data.len() % 16 != 0) {
        trace!("Object {:?}: {} bytes is not an AES payload, left as is", id, data.len());
        return None;
    }
    let wrapped = Object::String(data.to_vec(), StringFormat::Literal);
    encryption::decrypt_object(key, id, &wrapped, cipher == Cipher::Aes).ok()
}
