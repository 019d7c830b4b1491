//! Tracing setup.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crawlq_config::LoggingConfig;

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when `config.dir` is set,
/// a daily-rotated log file.
pub(crate) fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("crawlq")
                .filename_suffix("log")
                .max_log_files(config.max_files.max(1))
                .build(dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let _ = GUARD.set(guard);

            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            Some(if config.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            })
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}
