use waba_contracts::MAX_CLASS_NAME_BYTES;

use crate::ImageError;

/// Bytes of fixed-width fields in a record: total_len + name_len + code_len.
pub const RECORD_HEADER_LEN: usize = 4 + 2 + 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    pub bytecode: Vec<u8>,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>, bytecode: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytecode,
        }
    }
}

/// The `total_len` field for `entry`: every record byte after the field itself.
pub fn record_total_len(entry: &ClassEntry) -> Result<u32, ImageError> {
    let name_len = entry.name.len();
    if name_len > MAX_CLASS_NAME_BYTES {
        return Err(ImageError::NameTooLong {
            name: entry.name.clone(),
            len: name_len,
        });
    }
    let code_len = entry.bytecode.len();
    let total = 2u64 + name_len as u64 + 4 + code_len as u64;
    u32::try_from(total).map_err(|_| ImageError::CodeTooLarge {
        name: entry.name.clone(),
        len: code_len,
    })
}

/// Serializes `entries` into one image, in the given order.
///
/// Every record is sized before anything is written so the image is allocated once
/// at its exact length.
pub fn encode_records(entries: &[ClassEntry]) -> Result<Vec<u8>, ImageError> {
    let mut totals: Vec<u32> = Vec::with_capacity(entries.len());
    let mut image_len: u64 = 0;
    for entry in entries {
        let total = record_total_len(entry)?;
        image_len += 4 + u64::from(total);
        totals.push(total);
    }
    let image_len =
        usize::try_from(image_len).map_err(|_| ImageError::ImageTooLarge { len: image_len })?;

    let mut out: Vec<u8> = Vec::new();
    out.try_reserve_exact(image_len)
        .map_err(|_| ImageError::Alloc { bytes: image_len })?;

    for (entry, total) in entries.iter().zip(totals) {
        let name = entry.name.as_bytes();
        out.extend_from_slice(&total.to_be_bytes());
        // Both casts were range-checked by record_total_len.
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&(entry.bytecode.len() as u32).to_be_bytes());
        out.extend_from_slice(&entry.bytecode);
    }
    debug_assert_eq!(out.len(), image_len);

    Ok(out)
}
