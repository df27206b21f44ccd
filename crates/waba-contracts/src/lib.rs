//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for the wire constants shared by
//! the host and the engine, and for the schema/version strings that appear in
//! machine-readable reports.

/// Default capacity of the shared in/out region, in bytes.
pub const BUFFER_SIZE: usize = 1024;

/// Upper bound accepted for a configured in/out region.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Most strings a parameter block can describe (the count is one byte).
pub const MAX_PARAMS: usize = u8::MAX as usize;

/// Archive entries with this suffix are class files.
pub const CLASS_FILE_SUFFIX: &str = ".class";

/// Longest class name a record can carry (`name_len` is a `u16`).
pub const MAX_CLASS_NAME_BYTES: usize = u16::MAX as usize;

/// Status returned by the engine on success.
pub const STATUS_OK: i32 = 0;

/// Status returned by the engine when an entry point cannot be started.
pub const STATUS_ENTRY_FAILED: i32 = -1;

pub const WABA_CLASSES_REPORT_SCHEMA_VERSION: &str = "waba.classes.report@0.1.0";
pub const WABA_INSPECT_REPORT_SCHEMA_VERSION: &str = "waba.inspect.report@0.1.0";
pub const WABA_RUN_REPORT_SCHEMA_VERSION: &str = "waba.run.report@0.1.0";
