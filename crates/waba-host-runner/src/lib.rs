//! Host side of the engine boundary.
//!
//! A [`HostSession`] owns the engine, the installed class image and the shared
//! in/out region. Loading an archive installs a fresh class image; every invocation
//! writes the parameter block, calls the engine's static entry point and reads the
//! result block back from the same region.

use std::fmt;

use waba_image::ImageError;

pub mod buffer;
pub mod echo;
pub mod engine;
pub mod guest;
pub mod params;
pub mod report;
pub mod session;

pub use buffer::{ImageSlot, RegionHandle, SharedBuffer};
pub use echo::{EchoEngine, EngineCall};
pub use engine::{Engine, EngineOp, StatusCode};
pub use guest::{get_input, set_output, GuestError};
pub use params::{
    encoded_len, read_params, split_params, write_params, ParamError, WriteSummary,
};
pub use session::{HostSession, Invocation};

#[derive(Debug)]
pub enum HostError {
    Image(ImageError),
    Params(ParamError),
    Alloc { what: &'static str, bytes: usize },
    Config(String),
    Engine { op: EngineOp, status: StatusCode },
    MissingClassName,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Image(e) => write!(f, "class image: {e}"),
            HostError::Params(e) => write!(f, "io buffer: {e}"),
            HostError::Alloc { what, bytes } => {
                write!(f, "failed to allocate {bytes} bytes for the {what}")
            }
            HostError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            HostError::Engine { op, status } => {
                write!(f, "engine {op} failed with status {}", status.code())
            }
            HostError::MissingClassName => f.write_str("no class name selected"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HostError::Image(e) => Some(e),
            HostError::Params(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for HostError {
    fn from(e: ImageError) -> Self {
        HostError::Image(e)
    }
}

impl From<ParamError> for HostError {
    fn from(e: ParamError) -> Self {
        HostError::Params(e)
    }
}
