//! Machine-readable reports printed by the CLI.

use serde::Serialize;
use waba_contracts::{
    WABA_CLASSES_REPORT_SCHEMA_VERSION, WABA_INSPECT_REPORT_SCHEMA_VERSION,
    WABA_RUN_REPORT_SCHEMA_VERSION,
};
use waba_image::{records, sha256_hex, ImageError};

use crate::params::WriteSummary;
use crate::session::Invocation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassesReport {
    pub schema_version: &'static str,
    pub classes: Vec<String>,
    pub image_bytes: usize,
    pub image_sha256: String,
}

impl ClassesReport {
    pub fn new(classes: &[String], image: &[u8]) -> Self {
        Self {
            schema_version: WABA_CLASSES_REPORT_SCHEMA_VERSION,
            classes: classes.to_vec(),
            image_bytes: image.len(),
            image_sha256: sha256_hex(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRow {
    pub offset: usize,
    pub total_len: u32,
    /// Lossy UTF-8 rendering of the name bytes.
    pub name: String,
    pub code_len: usize,
    pub code_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub schema_version: &'static str,
    pub image_bytes: usize,
    pub image_sha256: String,
    pub records: Vec<RecordRow>,
}

impl InspectReport {
    /// Walks `image` with the reference reader. Fails on the first malformed record.
    pub fn from_image(image: &[u8]) -> Result<Self, ImageError> {
        let mut rows = Vec::new();
        for record in records(image) {
            let record = record?;
            rows.push(RecordRow {
                offset: record.offset,
                total_len: record.total_len,
                name: String::from_utf8_lossy(record.name).into_owned(),
                code_len: record.code.len(),
                code_sha256: sha256_hex(record.code),
            });
        }
        Ok(Self {
            schema_version: WABA_INSPECT_REPORT_SCHEMA_VERSION,
            image_bytes: image.len(),
            image_sha256: sha256_hex(image),
            records: rows,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub schema_version: &'static str,
    pub engine: String,
    pub class_name: String,
    pub arg: String,
    pub io_buffer_size: usize,
    pub status: i32,
    pub outputs: Vec<String>,
    pub input: WriteSummary,
}

impl RunReport {
    pub fn new(
        engine: &str,
        class_name: &str,
        arg: &str,
        io_buffer_size: usize,
        invocation: Invocation,
    ) -> Self {
        Self {
            schema_version: WABA_RUN_REPORT_SCHEMA_VERSION,
            engine: engine.to_string(),
            class_name: class_name.to_string(),
            arg: arg.to_string(),
            io_buffer_size,
            status: invocation.status.code(),
            outputs: invocation.outputs,
            input: invocation.input_summary,
        }
    }
}
