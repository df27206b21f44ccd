//! Class image construction.
//!
//! A class image is the flat blob the engine's class loader walks: one record per
//! class file, concatenated in archive order with no header, padding or terminator.
//!
//! ```text
//! total_len:u32be | name_len:u16be | name[name_len] | code_len:u32be | code[code_len]
//! ```
//!
//! `total_len` counts every byte after itself, so a reader can skip a record
//! without looking at the name or code lengths.

use std::fmt;

use sha2::{Digest as _, Sha256};
use waba_contracts::CLASS_FILE_SUFFIX;

mod reader;
mod record;
mod source;

pub use reader::{decode_entries, find_class, records, ImageReader, Record};
pub use record::{encode_records, record_total_len, ClassEntry, RECORD_HEADER_LEN};
pub use source::{EntrySource, MemoryEntrySource, ZipEntrySource};

#[derive(Debug)]
pub enum ImageError {
    Archive(String),
    Decompress {
        entry: String,
        message: String,
    },
    NameTooLong {
        name: String,
        len: usize,
    },
    CodeTooLarge {
        name: String,
        len: usize,
    },
    ImageTooLarge {
        len: u64,
    },
    Alloc {
        bytes: usize,
    },
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },
    LengthMismatch {
        offset: usize,
        total_len: u32,
        expected: u64,
    },
    InvalidName {
        offset: usize,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Archive(msg) => write!(f, "read archive directory: {msg}"),
            ImageError::Decompress { entry, message } => {
                write!(f, "decompress archive entry {entry:?}: {message}")
            }
            ImageError::NameTooLong { name, len } => write!(
                f,
                "class name too long for an image record: {len} > {} bytes ({name:?})",
                u16::MAX
            ),
            ImageError::CodeTooLarge { name, len } => write!(
                f,
                "class file too large for an image record: {len} bytes ({name:?})"
            ),
            ImageError::ImageTooLarge { len } => {
                write!(f, "class image too large: {len} bytes")
            }
            ImageError::Alloc { bytes } => {
                write!(f, "failed to allocate {bytes} bytes for the class image")
            }
            ImageError::Truncated { offset, need, have } => write!(
                f,
                "truncated image record at offset {offset}: need {need} bytes, have {have}"
            ),
            ImageError::LengthMismatch {
                offset,
                total_len,
                expected,
            } => write!(
                f,
                "inconsistent image record at offset {offset}: total_len={total_len}, fields add up to {expected}"
            ),
            ImageError::InvalidName { offset } => {
                write!(f, "image record at offset {offset} has a non UTF-8 name")
            }
        }
    }
}

impl std::error::Error for ImageError {}

/// A serialized class image together with the class names it contains, in image order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltImage {
    bytes: Vec<u8>,
    names: Vec<String>,
}

impl BuiltImage {
    /// The "no classes loaded" image.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<String>) {
        (self.bytes, self.names)
    }

    pub fn digest_hex(&self) -> String {
        sha256_hex(&self.bytes)
    }
}

/// Builds the class image for an archive.
///
/// `None` means no archive was supplied and yields the empty image. Entries are
/// visited in directory order; only names ending in `.class` are kept, with the
/// suffix stripped and any directory separators left in place.
pub fn build_image(source: Option<&mut dyn EntrySource>) -> Result<BuiltImage, ImageError> {
    let Some(source) = source else {
        tracing::debug!("no archive supplied, building empty class image");
        return Ok(BuiltImage::empty());
    };

    let mut entries: Vec<ClassEntry> = Vec::new();
    for entry_name in source.entry_names()? {
        let Some(class_name) = entry_name.strip_suffix(CLASS_FILE_SUFFIX) else {
            continue;
        };
        let bytecode = source.decompress(&entry_name)?;
        tracing::debug!(class = class_name, bytes = bytecode.len(), "class entry");
        entries.push(ClassEntry::new(class_name, bytecode));
    }

    let bytes = encode_records(&entries)?;
    let names: Vec<String> = entries.into_iter().map(|e| e.name).collect();
    tracing::debug!(
        classes = names.len(),
        image_bytes = bytes.len(),
        "class image built"
    );
    Ok(BuiltImage { bytes, names })
}

/// Opens `archive` as a zip/jar held in memory and builds its class image.
pub fn build_image_from_archive(archive: Option<&[u8]>) -> Result<BuiltImage, ImageError> {
    match archive {
        Some(bytes) => {
            let mut source = ZipEntrySource::from_bytes(bytes)?;
            build_image(Some(&mut source as &mut dyn EntrySource))
        }
        None => build_image(None),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex_lower(&Sha256::digest(bytes))
}

fn hex_lower(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0F) as usize] as char);
    }
    out
}
