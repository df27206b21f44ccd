//! Parameter blocks in the shared region.
//!
//! ```text
//! count:u8 | (utf8 bytes | 0x00) * count
//! ```
//!
//! The host writes the input block before an invocation and reads the output block
//! the engine left behind afterwards. Strings are packed from offset 1 with no
//! padding; bytes past the last terminator are ignored.

use std::fmt;

use serde::Serialize;
use waba_contracts::MAX_PARAMS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    EmptyRegion,
    TooManyParams { count: usize },
    /// The string holds a NUL byte, which the block uses as its terminator.
    InteriorNul { index: usize },
    Unterminated { index: usize, offset: usize },
    InvalidUtf8 { index: usize, offset: usize },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::EmptyRegion => f.write_str("region has no room for the count byte"),
            ParamError::TooManyParams { count } => {
                write!(f, "too many parameters: {count} > {MAX_PARAMS}")
            }
            ParamError::InteriorNul { index } => {
                write!(f, "string #{index} contains a NUL byte")
            }
            ParamError::Unterminated { index, offset } => write!(
                f,
                "string #{index} at offset {offset} has no terminator before the end of the region"
            ),
            ParamError::InvalidUtf8 { index, offset } => {
                write!(f, "string #{index} at offset {offset} is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for ParamError {}

/// What `write_params` managed to put in the region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Strings declared in the count byte.
    pub count: usize,
    /// Bytes of the region in use, count byte included.
    pub bytes_used: usize,
    /// Strings shortened (or dropped) to respect the region capacity.
    pub truncated: usize,
}

/// Exact size of the block `params` encode to when nothing is truncated.
pub fn encoded_len<S: AsRef<str>>(params: &[S]) -> usize {
    1 + params
        .iter()
        .map(|p| p.as_ref().len() + 1)
        .sum::<usize>()
}

/// Splits a comma-separated field into parameters. An empty field is one empty
/// parameter.
pub fn split_params(text: &str) -> Vec<String> {
    text.split(',').map(str::to_string).collect()
}

/// Resets the region and writes `params` as the input block.
///
/// Strings containing a NUL byte are rejected before anything past the count byte
/// is written. A string that does not fit is cut at the last whole character that
/// leaves room for its terminator; once the region is full the remaining strings
/// are written as nothing at all. The count byte still declares every string passed in.
pub fn write_params<S: AsRef<str>>(
    region: &mut [u8],
    params: &[S],
) -> Result<WriteSummary, ParamError> {
    let Some(count_byte) = region.first_mut() else {
        return Err(ParamError::EmptyRegion);
    };
    *count_byte = 0;
    let count = u8::try_from(params.len()).map_err(|_| ParamError::TooManyParams {
        count: params.len(),
    })?;
    check_no_interior_nul(params)?;

    let capacity = region.len();
    let mut ptr = 1usize;
    let mut truncated = 0usize;
    for (index, param) in params.iter().enumerate() {
        let s = param.as_ref();
        let remaining = capacity - ptr;
        if remaining == 0 {
            truncated += 1;
            tracing::warn!(index, len = s.len(), "io buffer full, parameter dropped");
            continue;
        }

        let fit = utf8_prefix_len(s, remaining - 1);
        if fit < s.len() {
            truncated += 1;
            tracing::warn!(
                index,
                len = s.len(),
                kept = fit,
                "parameter truncated to fit io buffer"
            );
        }
        region[ptr..ptr + fit].copy_from_slice(&s.as_bytes()[..fit]);
        region[ptr + fit] = 0;
        ptr += fit + 1;
    }
    region[0] = count;

    Ok(WriteSummary {
        count: params.len(),
        bytes_used: ptr,
        truncated,
    })
}

/// Reads the block currently in the region.
pub fn read_params(region: &[u8]) -> Result<Vec<String>, ParamError> {
    let Some(&count) = region.first() else {
        return Err(ParamError::EmptyRegion);
    };
    read_strings(region, usize::from(count))
}

/// Reads `count` strings starting at offset 1, never past the end of `region`.
pub(crate) fn read_strings(region: &[u8], count: usize) -> Result<Vec<String>, ParamError> {
    let mut out = Vec::with_capacity(count);
    let mut ptr = 1usize;
    for index in 0..count {
        let rest = region.get(ptr..).unwrap_or(&[]);
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(ParamError::Unterminated { index, offset: ptr });
        };
        let s = std::str::from_utf8(&rest[..len])
            .map_err(|_| ParamError::InvalidUtf8 { index, offset: ptr })?;
        out.push(s.to_string());
        ptr += len + 1;
    }
    Ok(out)
}

pub(crate) fn check_no_interior_nul<S: AsRef<str>>(params: &[S]) -> Result<(), ParamError> {
    match params.iter().position(|p| p.as_ref().as_bytes().contains(&0)) {
        Some(index) => Err(ParamError::InteriorNul { index }),
        None => Ok(()),
    }
}

fn utf8_prefix_len(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}
