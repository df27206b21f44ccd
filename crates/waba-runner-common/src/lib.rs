pub mod config;
pub mod engine_kind;
