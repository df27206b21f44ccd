use std::io::{Cursor, Read, Seek};

use crate::ImageError;

/// Most bytes reserved up front from an entry's declared size; the rest grows as read.
const PREALLOC_LIMIT: u64 = 1 << 20;

/// Access to the entries of an archive: its directory and each entry's decoded bytes.
pub trait EntrySource {
    /// Entry names in directory order.
    fn entry_names(&mut self) -> Result<Vec<String>, ImageError>;

    fn decompress(&mut self, name: &str) -> Result<Vec<u8>, ImageError>;
}

/// Zip/jar archive backed source.
pub struct ZipEntrySource<R: Read + Seek> {
    archive: zip::ZipArchive<R>,
}

impl<R: Read + Seek> ZipEntrySource<R> {
    pub fn new(reader: R) -> Result<Self, ImageError> {
        let archive =
            zip::ZipArchive::new(reader).map_err(|e| ImageError::Archive(e.to_string()))?;
        Ok(Self { archive })
    }
}

impl<'a> ZipEntrySource<Cursor<&'a [u8]>> {
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ImageError> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> EntrySource for ZipEntrySource<R> {
    fn entry_names(&mut self) -> Result<Vec<String>, ImageError> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(i)
                .map_err(|e| ImageError::Archive(format!("entry #{i}: {e}")))?;
            names.push(file.name().to_string());
        }
        Ok(names)
    }

    fn decompress(&mut self, name: &str) -> Result<Vec<u8>, ImageError> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| ImageError::Decompress {
                entry: name.to_string(),
                message: e.to_string(),
            })?;
        let declared = file.size();
        let hint = usize::try_from(declared.min(PREALLOC_LIMIT)).unwrap_or(0);
        let mut out: Vec<u8> = Vec::new();
        out.try_reserve_exact(hint)
            .map_err(|_| ImageError::Alloc { bytes: hint })?;
        file.read_to_end(&mut out)
            .map_err(|e| ImageError::Decompress {
                entry: name.to_string(),
                message: e.to_string(),
            })?;
        if out.len() as u64 != declared {
            return Err(ImageError::Decompress {
                entry: name.to_string(),
                message: format!(
                    "archive declares {declared} bytes, entry holds {}",
                    out.len()
                ),
            });
        }
        Ok(out)
    }
}

/// Entries that are already decoded, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntrySource {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryEntrySource {
    pub fn new(entries: Vec<(String, Vec<u8>)>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.entries.push((name.into(), bytes));
    }
}

impl EntrySource for MemoryEntrySource {
    fn entry_names(&mut self) -> Result<Vec<String>, ImageError> {
        Ok(self.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    fn decompress(&mut self, name: &str) -> Result<Vec<u8>, ImageError> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| ImageError::Decompress {
                entry: name.to_string(),
                message: "no such entry".to_string(),
            })
    }
}
