use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use waba_host_runner::report::{ClassesReport, InspectReport, RunReport};
use waba_host_runner::{split_params, EchoEngine, HostSession};
use waba_image::build_image_from_archive;
use waba_runner_common::config::HostConfig;
use waba_runner_common::engine_kind::{resolve_engine_kind, EngineKind};

const ENV_LOG: &str = "WABA_LOG";
const ENV_LOG_FORMAT: &str = "WABA_LOG_FORMAT";

#[derive(Parser)]
#[command(name = "waba-host-runner")]
#[command(
    about = "Packs class archives into engine images and runs static entry points.",
    long_about = None
)]
struct Cli {
    /// Capacity of the shared in/out region (overrides WABA_IO_BUFFER_SIZE).
    #[arg(long, global = true, value_name = "BYTES")]
    io_buffer_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the classes an archive contributes to the image.
    Classes {
        /// Omit to report the "no classes loaded" state.
        #[arg(long)]
        jar: Option<PathBuf>,
    },
    /// Dump every record of the image built from an archive.
    Inspect {
        #[arg(long)]
        jar: PathBuf,
    },
    /// Load an archive and invoke one class's static entry point.
    Run {
        #[arg(long)]
        jar: PathBuf,

        #[arg(long = "class")]
        class_name: String,

        /// Single argument passed to the entry point as is.
        #[arg(long, default_value = "")]
        arg: String,

        /// Comma-separated parameters written to the shared region. Defaults to `--arg`
        /// split on commas.
        #[arg(long)]
        params: Option<String>,

        #[arg(long, value_enum)]
        engine: Option<EngineKind>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    let format = std::env::var(ENV_LOG_FORMAT).unwrap_or_default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = match format.as_str() {
        "json" => subscriber.json().try_init(),
        "pretty" => subscriber.pretty().try_init(),
        _ => subscriber.compact().try_init(),
    };
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = HostConfig::from_env()?.with_overrides(cli.io_buffer_size)?;

    match cli.command {
        Command::Classes { jar } => {
            let archive = jar.as_deref().map(read_archive).transpose()?;
            let built =
                build_image_from_archive(archive.as_deref()).context("build class image")?;
            let report = ClassesReport::new(built.names(), built.bytes());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Inspect { jar } => {
            let archive = read_archive(&jar)?;
            let built = build_image_from_archive(Some(archive.as_slice()))
                .context("build class image")?;
            let report = InspectReport::from_image(built.bytes()).context("walk class image")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Run {
            jar,
            class_name,
            arg,
            params,
            engine,
        } => {
            let kind = resolve_engine_kind(engine)?;
            let params = split_params(params.as_deref().unwrap_or(&arg));
            let archive = read_archive(&jar)?;

            let mut session = match kind {
                EngineKind::Echo => HostSession::new(EchoEngine::new(), config),
            };
            let classes = session
                .load_archive(Some(archive.as_slice()))
                .with_context(|| format!("load archive: {}", jar.display()))?;
            tracing::info!(engine = kind.as_str(), classes = classes.len(), "archive loaded");

            let invocation = session
                .invoke(&class_name, &arg, &params)
                .with_context(|| format!("invoke {class_name:?}"))?;
            let report = RunReport::new(
                kind.as_str(),
                &class_name,
                &arg,
                config.io_buffer_size,
                invocation,
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_archive(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read archive: {}", path.display()))
}
