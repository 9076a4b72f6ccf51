use deps::*;

use eyre::WrapErr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Installs the global subscriber. Keep the guard alive or buffered file output is lost.
pub fn init(config: &LogConfig) -> eyre::Result<WorkerGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .wrap_err_with(|| format!("bad log filter {:?}", config.filter))?,
    };

    std::fs::create_dir_all(&config.directory).wrap_err_with(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .wrap_err("unable to install the tracing subscriber")?;
    Ok(guard)
}
