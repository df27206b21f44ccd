use crate::{ClassEntry, ImageError};

/// One record of a class image, borrowed from the image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    /// Offset of the record's `total_len` field within the image.
    pub offset: usize,
    pub total_len: u32,
    pub name: &'a [u8],
    pub code: &'a [u8],
}

impl<'a> Record<'a> {
    pub fn name_str(&self) -> Result<&'a str, ImageError> {
        std::str::from_utf8(self.name).map_err(|_| ImageError::InvalidName {
            offset: self.offset,
        })
    }
}

/// Walks a class image record by record, advancing by `total_len`.
///
/// Each record is checked for internal consistency before it is yielded; the
/// first malformed record ends the walk with an error.
#[derive(Debug, Clone)]
pub struct ImageReader<'a> {
    image: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ImageReader<'a> {
    pub fn new(image: &'a [u8]) -> Self {
        Self {
            image,
            pos: 0,
            done: false,
        }
    }

    fn read_record(&self) -> Result<Record<'a>, ImageError> {
        let offset = self.pos;
        let rest = &self.image[offset..];
        if rest.len() < 4 {
            return Err(ImageError::Truncated {
                offset,
                need: 4,
                have: rest.len(),
            });
        }
        let total_len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let body_len = total_len as usize;
        let body = rest[4..].get(..body_len).ok_or(ImageError::Truncated {
            offset,
            need: 4 + body_len,
            have: rest.len(),
        })?;

        let mismatch = |expected: u64| ImageError::LengthMismatch {
            offset,
            total_len,
            expected,
        };

        if body.len() < 2 {
            return Err(mismatch(2));
        }
        let name_len = u16::from_be_bytes([body[0], body[1]]) as usize;
        let code_len_at = 2 + name_len;
        if body.len() < code_len_at + 4 {
            return Err(mismatch(code_len_at as u64 + 4));
        }
        let name = &body[2..code_len_at];
        let code_len = u32::from_be_bytes([
            body[code_len_at],
            body[code_len_at + 1],
            body[code_len_at + 2],
            body[code_len_at + 3],
        ]);
        let expected = code_len_at as u64 + 4 + u64::from(code_len);
        if expected != u64::from(total_len) {
            return Err(mismatch(expected));
        }
        let code = &body[code_len_at + 4..];

        Ok(Record {
            offset,
            total_len,
            name,
            code,
        })
    }
}

impl<'a> Iterator for ImageReader<'a> {
    type Item = Result<Record<'a>, ImageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.image.len() {
            return None;
        }
        match self.read_record() {
            Ok(record) => {
                self.pos += 4 + record.total_len as usize;
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

pub fn records(image: &[u8]) -> ImageReader<'_> {
    ImageReader::new(image)
}

/// Looks up a class the way the engine's loader does: the first record whose name
/// bytes equal `name` exactly.
pub fn find_class<'a>(image: &'a [u8], name: &str) -> Result<Option<&'a [u8]>, ImageError> {
    for record in records(image) {
        let record = record?;
        if record.name == name.as_bytes() {
            return Ok(Some(record.code));
        }
    }
    Ok(None)
}

/// Decodes a whole image back into owned entries, in image order.
pub fn decode_entries(image: &[u8]) -> Result<Vec<ClassEntry>, ImageError> {
    let mut out = Vec::new();
    for record in records(image) {
        let record = record?;
        out.push(ClassEntry::new(record.name_str()?, record.code.to_vec()));
    }
    Ok(out)
}
