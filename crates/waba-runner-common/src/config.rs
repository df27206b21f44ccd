use anyhow::Context;
use serde::Serialize;
use waba_contracts::{BUFFER_SIZE, MAX_BUFFER_SIZE};

pub const ENV_IO_BUFFER_SIZE: &str = "WABA_IO_BUFFER_SIZE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostConfig {
    /// Capacity of the shared in/out region, fixed for the session.
    pub io_buffer_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            io_buffer_size: BUFFER_SIZE,
        }
    }
}

impl HostConfig {
    /// Defaults, overridden by the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let raw = std::env::var(ENV_IO_BUFFER_SIZE).ok();
        Self::from_env_values(raw.as_deref())
    }

    fn from_env_values(io_buffer_size: Option<&str>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();
        if let Some(raw) = io_buffer_size {
            cfg.io_buffer_size = parse_io_buffer_size(raw).with_context(|| {
                format!("invalid environment variable {ENV_IO_BUFFER_SIZE}={raw:?}")
            })?;
        }
        Ok(cfg)
    }

    /// Applies CLI overrides on top of `self`.
    pub fn with_overrides(mut self, io_buffer_size: Option<usize>) -> anyhow::Result<Self> {
        if let Some(size) = io_buffer_size {
            check_io_buffer_size(size)?;
            self.io_buffer_size = size;
        }
        Ok(self)
    }
}

pub fn parse_io_buffer_size(raw: &str) -> anyhow::Result<usize> {
    let size: usize = raw
        .trim()
        .parse()
        .context("expected a positive integer byte count")?;
    check_io_buffer_size(size)?;
    Ok(size)
}

fn check_io_buffer_size(size: usize) -> anyhow::Result<()> {
    if size < 2 || size > MAX_BUFFER_SIZE {
        anyhow::bail!(
            "io buffer size must be between 2 and {MAX_BUFFER_SIZE} bytes, got {size}"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_protocol_buffer_size() {
        assert_eq!(HostConfig::default().io_buffer_size, 1024);
        assert_eq!(HostConfig::from_env_values(None).unwrap(), HostConfig::default());
    }

    #[test]
    fn env_value_overrides_default() {
        let cfg = HostConfig::from_env_values(Some(" 4096 ")).unwrap();
        assert_eq!(cfg.io_buffer_size, 4096);
    }

    #[test]
    fn env_value_is_validated() {
        for bad in ["0", "1", "-5", "lots", "65537"] {
            let err = HostConfig::from_env_values(Some(bad)).unwrap_err();
            assert!(
                format!("{err:#}").contains(ENV_IO_BUFFER_SIZE),
                "{bad}: {err:#}"
            );
        }
    }

    #[test]
    fn cli_override_wins() {
        let cfg = HostConfig::default().with_overrides(Some(64)).unwrap();
        assert_eq!(cfg.io_buffer_size, 64);
        assert!(HostConfig::default().with_overrides(Some(1)).is_err());
        assert_eq!(
            HostConfig::default().with_overrides(None).unwrap(),
            HostConfig::default()
        );
    }
}
