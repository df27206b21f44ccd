//! The two allocations a session hands to the engine: the shared in/out region and
//! the class image. Both are released before they are replaced.

use serde::Serialize;

use crate::HostError;

/// Address and size of the shared region as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RegionHandle {
    pub addr: usize,
    pub capacity: usize,
}

/// Fixed-capacity in/out region. Never resized once allocated.
#[derive(Debug)]
pub struct SharedBuffer {
    region: Box<[u8]>,
}

impl SharedBuffer {
    pub fn allocate(capacity: usize) -> Result<Self, HostError> {
        if capacity == 0 {
            return Err(HostError::Config(
                "io buffer needs at least one byte for the count".to_string(),
            ));
        }
        let region = alloc_zeroed(capacity, "io buffer")?;
        tracing::debug!(capacity, "io buffer allocated");
        Ok(Self { region })
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    pub fn handle(&self) -> RegionHandle {
        RegionHandle {
            addr: self.region.as_ptr() as usize,
            capacity: self.region.len(),
        }
    }

    /// Marks the region as holding no strings. Only the count byte changes.
    pub fn reset(&mut self) {
        self.region[0] = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.region
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.region
    }
}

/// Host-owned copy of the installed class image.
#[derive(Debug, Default)]
pub struct ImageSlot {
    bytes: Option<Vec<u8>>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the current image, then takes ownership of `image` without copying it.
    pub fn replace(&mut self, image: Vec<u8>) {
        self.clear();
        if !image.is_empty() {
            self.bytes = Some(image);
        }
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.bytes.take() {
            tracing::debug!(bytes = old.len(), "class image released");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.bytes.is_some()
    }

    /// The installed image, or an empty slice when nothing is loaded.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(&[])
    }
}

fn alloc_zeroed(len: usize, what: &'static str) -> Result<Box<[u8]>, HostError> {
    let mut v: Vec<u8> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| HostError::Alloc { what, bytes: len })?;
    v.resize(len, 0);
    Ok(v.into_boxed_slice())
}
