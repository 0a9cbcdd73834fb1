use anyhow::{Context, Result};
use atlas_ingest::{LogFormat, LoggingConfig};
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

/// Command-line overrides applied on top of the config's level
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbosity {
    pub verbose: bool,
    pub quiet: bool,
}

/// Install the global logger. `RUST_LOG` wins over the configured level;
/// `--quiet` and `--verbose` win over both.
pub fn init(config: &LoggingConfig, verbosity: Verbosity) -> Result<()> {
    let level = log::LevelFilter::from_str(&config.level).unwrap_or(log::LevelFilter::Info);
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.as_str().to_ascii_lowercase()),
    );
    if verbosity.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbosity.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ignore and globset log every visited path at debug level
    if !verbosity.verbose {
        builder.filter_module("ignore", log::LevelFilter::Warn);
        builder.filter_module("globset", log::LevelFilter::Warn);
    }

    if config.format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "timestamp": buf.timestamp().to_string(),
                "level": record.level().as_str(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    }

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    // a second init in the same process keeps the first logger
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
    Ok(())
}
