use std::fmt;

use serde::Serialize;
use waba_contracts::STATUS_OK;

use crate::buffer::RegionHandle;

/// Status word returned by every engine entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(STATUS_OK);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self.0 == STATUS_OK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    SetImage,
    SetIoBuffer,
    InvokeStaticEntry,
}

impl EngineOp {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineOp::SetImage => "set_image",
            EngineOp::SetIoBuffer => "set_io_buffer",
            EngineOp::InvokeStaticEntry => "invoke_static_entry",
        }
    }
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The calls a host makes into a bytecode engine.
pub trait Engine {
    /// Installs the class image; an empty image means no classes are loaded.
    fn set_image(&mut self, image: &[u8]) -> StatusCode;

    /// Installs the shared in/out region. Called once per session.
    fn set_io_buffer(&mut self, region: RegionHandle) -> StatusCode;

    /// Runs `class_name`'s static entry point with the legacy single argument.
    /// The structured parameter and result blocks travel through `io`.
    fn invoke_static_entry(&mut self, class_name: &str, arg: &str, io: &mut [u8]) -> StatusCode;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn set_image(&mut self, image: &[u8]) -> StatusCode {
        (**self).set_image(image)
    }

    fn set_io_buffer(&mut self, region: RegionHandle) -> StatusCode {
        (**self).set_io_buffer(region)
    }

    fn invoke_static_entry(&mut self, class_name: &str, arg: &str, io: &mut [u8]) -> StatusCode {
        (**self).invoke_static_entry(class_name, arg, io)
    }
}

pub(crate) fn check_status(op: EngineOp, status: StatusCode) -> Result<(), crate::HostError> {
    tracing::debug!(op = op.as_str(), status = status.code(), "engine call returned");
    if status.is_ok() {
        Ok(())
    } else {
        Err(crate::HostError::Engine { op, status })
    }
}
