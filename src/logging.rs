use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LogConfig;
use crate::error::{Error, Result};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives are honored; the crate's own level is `info`, or
/// `debug` when verbose. Output goes to stdout unless a log file is
/// configured, in which case it is appended to.
pub fn init(config: &LogConfig) -> Result<()> {
    let level = if config.verbose { "debug" } else { "info" };
    let directive = format!("replicator={level}")
        .parse()
        .map_err(|e| Error::Config(format!("invalid log directive: {e}")))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let (writer, ansi) = match config.file() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::Config(format!("logging already initialized: {e}")))
}
