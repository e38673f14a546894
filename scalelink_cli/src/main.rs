mod cli;
mod error_fmt;
mod inspect;
mod stream;

use clap::Parser;
use cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use error_fmt::{CliError, exit_code_for_error, format_error_json, humanize};
use eyre::WrapErr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(feature = "hardware")]
type Backend = scalelink_usb::libusb::LibUsbRegistry;
#[cfg(not(feature = "hardware"))]
type Backend = scalelink_usb::SimulatedScale;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        tracing::error!(error = %format!("{e:#}"), "exiting with error");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    let reader_cfg = scalelink_core::conversions::reader_cfg(&cfg)
        .map_err(|e| CliError::Config(format!("{e:#}")))?;
    let backend = backend()?;

    match cli.cmd {
        Commands::Stream {
            count,
            duration_ms,
            show_absent,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }
            let opts = stream::StreamOpts {
                count,
                duration: duration_ms.map(Duration::from_millis),
                show_absent,
                json: cli.json,
            };
            stream::run_stream(backend, reader_cfg, opts, &shutdown)?;
        }
        Commands::List => {
            inspect::run_list(backend.as_ref(), &reader_cfg, cli.json)?;
        }
        Commands::SelfCheck => {
            inspect::run_self_check(backend.as_ref(), &reader_cfg.device, cli.json)?;
        }
    }
    Ok(())
}

/// Explicit path must exist; the default path may be absent (built-in defaults).
fn load_config(path: Option<&Path>) -> eyre::Result<scalelink_config::Config> {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG), false),
    };
    if !explicit && !path.exists() {
        return Ok(scalelink_config::Config::default());
    }
    scalelink_config::load_file(path).map_err(|e| CliError::Config(format!("{e:#}")).into())
}

#[cfg(feature = "hardware")]
fn backend() -> eyre::Result<Arc<Backend>> {
    let registry = Backend::new().wrap_err("failed to initialize libusb")?;
    Ok(Arc::new(registry))
}

#[cfg(not(feature = "hardware"))]
fn backend() -> eyre::Result<Arc<Backend>> {
    let opts = scalelink_usb::SimOptions::from_env();
    tracing::info!(?opts, "using simulated scale");
    Ok(Arc::new(Backend::with_options(opts)))
}

fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &scalelink_config::Logging,
) -> eyre::Result<()> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().map_or_else(|| "scalelink.log".into(), |n| n.to_owned());
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("failed to install tracing subscriber")?;
    Ok(())
}
