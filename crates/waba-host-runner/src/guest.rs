//! Engine-side view of the shared region.
//!
//! These are the accessors an engine's native bindings use while a static entry
//! point runs: `get_input` reads the block the host wrote, `set_output` replaces it
//! with the results. Unlike the host-side writer, `set_output` refuses strings that
//! do not fit instead of truncating them.

use std::fmt;

use waba_contracts::MAX_PARAMS;

use crate::params::{check_no_interior_nul, read_strings, ParamError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestError {
    /// No shared region has been installed.
    NoRegion,
    TooManyValues { count: usize },
    InteriorNul { index: usize },
    OutOfSpace {
        index: usize,
        need: usize,
        capacity: usize,
    },
    Params(ParamError),
}

impl fmt::Display for GuestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestError::NoRegion => f.write_str("no io buffer installed"),
            GuestError::TooManyValues { count } => {
                write!(f, "too many output values: {count} > {MAX_PARAMS}")
            }
            GuestError::InteriorNul { index } => {
                write!(f, "output value #{index} contains a NUL byte")
            }
            GuestError::OutOfSpace {
                index,
                need,
                capacity,
            } => write!(
                f,
                "output value #{index} needs the region to hold {need} bytes, capacity is {capacity}"
            ),
            GuestError::Params(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GuestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuestError::Params(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParamError> for GuestError {
    fn from(e: ParamError) -> Self {
        GuestError::Params(e)
    }
}

/// Reads the input strings. A negative `max` reads all of them.
pub fn get_input(region: Option<&[u8]>, max: i32) -> Result<Vec<String>, GuestError> {
    let region = region.ok_or(GuestError::NoRegion)?;
    let Some(&count) = region.first() else {
        return Err(ParamError::EmptyRegion.into());
    };
    let mut count = usize::from(count);
    if let Ok(max) = usize::try_from(max) {
        count = count.min(max);
    }
    Ok(read_strings(region, count)?)
}

/// Replaces the region's contents with `values`.
///
/// The count byte is written only after every string is in place, so a failed call
/// leaves the previous count untouched.
pub fn set_output<S: AsRef<str>>(
    region: Option<&mut [u8]>,
    values: &[S],
) -> Result<(), GuestError> {
    let region = region.ok_or(GuestError::NoRegion)?;
    let count = u8::try_from(values.len()).map_err(|_| GuestError::TooManyValues {
        count: values.len(),
    })?;
    if region.is_empty() {
        return Err(ParamError::EmptyRegion.into());
    }
    if let Err(ParamError::InteriorNul { index }) = check_no_interior_nul(values) {
        return Err(GuestError::InteriorNul { index });
    }

    let capacity = region.len();
    let mut ptr = 1usize;
    for (index, value) in values.iter().enumerate() {
        let bytes = value.as_ref().as_bytes();
        let need = ptr + bytes.len() + 1;
        if need > capacity {
            return Err(GuestError::OutOfSpace {
                index,
                need,
                capacity,
            });
        }
        region[ptr..ptr + bytes.len()].copy_from_slice(bytes);
        region[ptr + bytes.len()] = 0;
        ptr = need;
    }
    region[0] = count;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{read_params, write_params};

    #[test]
    fn missing_region_is_reported() {
        assert_eq!(get_input(None, -1), Err(GuestError::NoRegion));
        assert_eq!(set_output(None, &["x"]), Err(GuestError::NoRegion));
    }

    #[test]
    fn reads_what_the_host_wrote() {
        let mut region = [0u8; 32];
        write_params(&mut region, &["a", "bc", "def"]).unwrap();
        assert_eq!(get_input(Some(&region[..]), -1).unwrap(), ["a", "bc", "def"]);
        assert_eq!(get_input(Some(&region[..]), 2).unwrap(), ["a", "bc"]);
        assert_eq!(get_input(Some(&region[..]), 10).unwrap().len(), 3);
        assert!(get_input(Some(&region[..]), 0).unwrap().is_empty());
    }

    #[test]
    fn output_is_read_back_by_host() {
        let mut region = [0u8; 32];
        write_params(&mut region, &["in"]).unwrap();
        set_output(Some(&mut region[..]), &["12", "ok"]).unwrap();
        assert_eq!(read_params(&region).unwrap(), ["12", "ok"]);
    }

    #[test]
    fn output_must_fit_exactly() {
        let mut region = [0u8; 4];
        set_output(Some(&mut region[..]), &["abc"]).unwrap_err();
        set_output(Some(&mut region[..]), &["ab"]).unwrap();
        assert_eq!(region, [1, b'a', b'b', 0]);
    }

    #[test]
    fn failed_output_keeps_previous_count() {
        let mut region = [0u8; 8];
        write_params(&mut region, &["x"]).unwrap();
        let err = set_output(Some(&mut region[..]), &["ok", "too long"]).unwrap_err();
        assert_eq!(
            err,
            GuestError::OutOfSpace {
                index: 1,
                need: 13,
                capacity: 8
            }
        );
        assert_eq!(region[0], 1);
    }

    #[test]
    fn interior_nul_output_keeps_previous_block() {
        let mut region = [0u8; 16];
        write_params(&mut region, &["in"]).unwrap();
        let before = region;
        assert_eq!(
            set_output(Some(&mut region[..]), &["a\0b"]),
            Err(GuestError::InteriorNul { index: 0 })
        );
        assert_eq!(region, before);
        assert_eq!(read_params(&region).unwrap(), ["in"]);
    }

    #[test]
    fn too_many_values_is_rejected() {
        let mut region = [0u8; 1024];
        let values = vec![""; 256];
        assert_eq!(
            set_output(Some(&mut region[..]), &values),
            Err(GuestError::TooManyValues { count: 256 })
        );
    }
}
