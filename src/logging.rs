//! Tracing setup: a console layer, an optional rolling file layer, and an
//! `EnvFilter` that respects both the config file and `RUST_LOG`.
//!
//! CLI flags win over the config file: `-q` forces errors-only, `-v`/`-vv`
//! raise the level to debug/trace regardless of what the file says.

use std::fs;
use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

/// Keeps the non-blocking file writer alive; dropping it flushes pending
/// log lines, so the caller holds it until exit.
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber from config settings and CLI flags.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let level = effective_level(&settings.level, verbose, quiet);
    let filter = make_filter(level);

    let console = console_layer(settings.json_format);

    let mut file_guard = None;
    let file = match settings.file {
        Some(ref path) => {
            let (layer, guard) = file_layer(path, settings.max_files, settings.json_format)?;
            file_guard = Some(guard);
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    tracing::info!(
        level = %level,
        file = ?settings.file,
        json = settings.json_format,
        "Logging initialized"
    );

    Ok(LogGuards {
        _file_guard: file_guard,
    })
}

/// CLI flags beat the configured level; an unparseable level falls back
/// to info rather than failing startup.
fn effective_level(configured: &str, verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => configured.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// RUST_LOG, when set, takes over entirely; otherwise the resolved level
/// applies globally with the chattiest HTTP internals capped at warn.
fn make_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", level)))
}

fn console_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().compact().with_target(true).with_ansi(true).boxed()
    }
}

/// Daily-rotated file layer. The parent directory is created on demand so a
/// fresh install can point at `~/.nomads/logs/` without manual setup.
fn file_layer<S>(
    path: &str,
    max_files: u32,
    json: bool,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let path = Path::new(path);
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| {
        Error::Config(format!(
            "Failed to create log directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("chat");

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(stem)
        .filename_suffix("log")
        .max_log_files(max_files as usize)
        .build(dir)
        .map_err(|e| Error::Config(format!("Failed to create log file appender: {}", e)))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = if json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .boxed()
    };

    Ok((layer, guard))
}

/// Minimal console-only setup for subcommands that do not load config.
pub fn init_simple(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt::layer().compact())
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}
