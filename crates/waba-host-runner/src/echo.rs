use serde::Serialize;
use waba_contracts::STATUS_ENTRY_FAILED;
use waba_image::find_class;

use crate::buffer::RegionHandle;
use crate::engine::{Engine, StatusCode};
use crate::guest::{get_input, set_output};

/// One call received by an [`EchoEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum EngineCall {
    SetImage { len: usize },
    SetIoBuffer(RegionHandle),
    Invoke { class_name: String, arg: String },
}

/// In-process engine that returns its inputs as outputs.
///
/// Invoking a class that is not in the installed image fails with the entry-point
/// failure status, as does invoking before a region was installed.
#[derive(Debug, Default)]
pub struct EchoEngine {
    image: Vec<u8>,
    io: Option<RegionHandle>,
    calls: Vec<EngineCall>,
}

impl EchoEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn io_region(&self) -> Option<RegionHandle> {
        self.io
    }
}

impl Engine for EchoEngine {
    fn set_image(&mut self, image: &[u8]) -> StatusCode {
        self.calls.push(EngineCall::SetImage { len: image.len() });
        self.image.clear();
        self.image.extend_from_slice(image);
        StatusCode::OK
    }

    fn set_io_buffer(&mut self, region: RegionHandle) -> StatusCode {
        self.calls.push(EngineCall::SetIoBuffer(region));
        self.io = Some(region);
        StatusCode::OK
    }

    fn invoke_static_entry(&mut self, class_name: &str, arg: &str, io: &mut [u8]) -> StatusCode {
        self.calls.push(EngineCall::Invoke {
            class_name: class_name.to_string(),
            arg: arg.to_string(),
        });
        tracing::info!(class_name, arg, "echo entry point");

        match find_class(&self.image, class_name) {
            Ok(Some(code)) => tracing::debug!(code_len = code.len(), "class found"),
            Ok(None) => {
                tracing::warn!(class_name, "class not in image");
                return StatusCode(STATUS_ENTRY_FAILED);
            }
            Err(err) => {
                tracing::warn!(error = %err, "class image is malformed");
                return StatusCode(STATUS_ENTRY_FAILED);
            }
        }

        let Some(installed) = self.io else {
            tracing::warn!("no io buffer installed");
            return StatusCode(STATUS_ENTRY_FAILED);
        };
        if installed.capacity != io.len() {
            tracing::warn!(
                installed = installed.capacity,
                got = io.len(),
                "io region does not match the installed buffer"
            );
            return StatusCode(STATUS_ENTRY_FAILED);
        }

        let result = get_input(Some(&io[..]), -1)
            .and_then(|values| set_output(Some(&mut io[..]), &values));
        match result {
            Ok(()) => StatusCode::OK,
            Err(err) => {
                tracing::warn!(error = %err, "echo failed");
                StatusCode(STATUS_ENTRY_FAILED)
            }
        }
    }
}
