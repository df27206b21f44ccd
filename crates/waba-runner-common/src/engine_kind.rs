use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub const ENV_ENGINE: &str = "WABA_ENGINE";

/// Selects which `Engine` implementation a runner drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// In-process engine that answers every call by echoing its inputs.
    #[default]
    Echo,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Echo => "echo",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct EngineKindParseError {
    value: String,
}

impl fmt::Display for EngineKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid engine {:?} (expected one of: echo)", self.value)
    }
}

impl std::error::Error for EngineKindParseError {}

impl FromStr for EngineKind {
    type Err = EngineKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "echo" => Ok(EngineKind::Echo),
            _ => Err(EngineKindParseError { value: s }),
        }
    }
}

#[cfg(feature = "clap")]
impl clap::ValueEnum for EngineKind {
    fn value_variants<'a>() -> &'a [Self] {
        const ALL: [EngineKind; 1] = [EngineKind::Echo];
        &ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            EngineKind::Echo => Some(clap::builder::PossibleValue::new("echo")),
        }
    }
}

/// Picks the engine from the CLI flag, then `WABA_ENGINE`, then the default.
pub fn resolve_engine_kind(cli: Option<EngineKind>) -> anyhow::Result<EngineKind> {
    if let Some(kind) = cli {
        return Ok(kind);
    }
    let Ok(raw) = std::env::var(ENV_ENGINE) else {
        return Ok(EngineKind::default());
    };
    resolve_engine_kind_from_env_value(&raw)
}

fn resolve_engine_kind_from_env_value(raw: &str) -> anyhow::Result<EngineKind> {
    EngineKind::from_str(raw).map_err(|e| {
        anyhow::anyhow!("invalid environment variable {ENV_ENGINE}={raw:?}: {e}")
    })
}
