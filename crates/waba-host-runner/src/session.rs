use serde::Serialize;
use waba_image::{build_image, build_image_from_archive, BuiltImage, EntrySource};
use waba_runner_common::config::HostConfig;

use crate::buffer::{ImageSlot, RegionHandle, SharedBuffer};
use crate::engine::{check_status, Engine, EngineOp, StatusCode};
use crate::params::{read_params, write_params, WriteSummary};
use crate::HostError;

/// Result of one successful invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub status: StatusCode,
    /// Strings the entry point left in the shared region.
    pub outputs: Vec<String>,
    pub input_summary: WriteSummary,
}

/// Owns an engine together with the class image and shared region installed on it.
pub struct HostSession<E: Engine> {
    engine: E,
    config: HostConfig,
    image: ImageSlot,
    buffer: Option<SharedBuffer>,
    class_names: Vec<String>,
}

impl<E: Engine> HostSession<E> {
    pub fn new(engine: E, config: HostConfig) -> Self {
        Self {
            engine,
            config,
            image: ImageSlot::new(),
            buffer: None,
            class_names: Vec::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Names of the classes in the installed image, in archive order.
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn image_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    /// Builds an image from a zip archive and installs it. `None` installs the
    /// empty image.
    ///
    /// When building fails the previously installed image stays in place.
    pub fn load_archive(&mut self, archive: Option<&[u8]>) -> Result<Vec<String>, HostError> {
        let built = build_image_from_archive(archive)?;
        self.install_image(built)
    }

    /// Same as [`HostSession::load_archive`] for an already opened archive.
    pub fn load_entries(&mut self, source: &mut dyn EntrySource) -> Result<Vec<String>, HostError> {
        let built = build_image(Some(source))?;
        self.install_image(built)
    }

    /// Installs the empty image: no classes are loaded afterwards.
    pub fn unload(&mut self) -> Result<(), HostError> {
        self.install_image(BuiltImage::empty())?;
        Ok(())
    }

    fn install_image(&mut self, built: BuiltImage) -> Result<Vec<String>, HostError> {
        let (bytes, names) = built.into_parts();
        let len = bytes.len();
        self.class_names.clear();
        self.image.replace(bytes);
        if let Err(err) = check_status(
            EngineOp::SetImage,
            self.engine.set_image(self.image.as_bytes()),
        ) {
            self.image.clear();
            return Err(err);
        }
        tracing::debug!(classes = names.len(), bytes = len, "class image installed");
        self.class_names = names;
        Ok(self.class_names.clone())
    }

    /// Allocates the shared region and hands it to the engine on first use.
    pub fn ensure_buffer(&mut self) -> Result<RegionHandle, HostError> {
        let buffer = ensure_shared_buffer(
            &mut self.buffer,
            &mut self.engine,
            self.config.io_buffer_size,
        )?;
        Ok(buffer.handle())
    }

    /// Marks the shared region as empty.
    pub fn reset(&mut self) -> Result<(), HostError> {
        self.ensure_buffer_mut()?.reset();
        Ok(())
    }

    /// The current contents of the shared region, if one was allocated.
    pub fn io_bytes(&self) -> Option<&[u8]> {
        self.buffer.as_ref().map(SharedBuffer::as_slice)
    }

    /// Writes `params`, runs `class_name`'s static entry point and reads back the
    /// strings it left in the shared region.
    ///
    /// `arg` is passed through to the engine untouched.
    pub fn invoke<S: AsRef<str>>(
        &mut self,
        class_name: &str,
        arg: &str,
        params: &[S],
    ) -> Result<Invocation, HostError> {
        if class_name.is_empty() {
            return Err(HostError::MissingClassName);
        }

        let buffer = ensure_shared_buffer(
            &mut self.buffer,
            &mut self.engine,
            self.config.io_buffer_size,
        )?;
        let input_summary = write_params(buffer.as_mut_slice(), params)?;
        tracing::debug!(
            class_name,
            count = input_summary.count,
            bytes = input_summary.bytes_used,
            "parameters written"
        );

        let status = self
            .engine
            .invoke_static_entry(class_name, arg, buffer.as_mut_slice());
        check_status(EngineOp::InvokeStaticEntry, status)?;

        let outputs = read_params(buffer.as_slice())?;
        Ok(Invocation {
            status,
            outputs,
            input_summary,
        })
    }

    fn ensure_buffer_mut(&mut self) -> Result<&mut SharedBuffer, HostError> {
        ensure_shared_buffer(
            &mut self.buffer,
            &mut self.engine,
            self.config.io_buffer_size,
        )
    }
}

fn ensure_shared_buffer<'a, E: Engine>(
    slot: &'a mut Option<SharedBuffer>,
    engine: &mut E,
    capacity: usize,
) -> Result<&'a mut SharedBuffer, HostError> {
    let buffer = match slot.take() {
        Some(buffer) => buffer,
        None => {
            let mut buffer = SharedBuffer::allocate(capacity)?;
            buffer.reset();
            check_status(EngineOp::SetIoBuffer, engine.set_io_buffer(buffer.handle()))?;
            buffer
        }
    };
    Ok(slot.insert(buffer))
}
