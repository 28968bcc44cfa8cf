use std::path::Path;

use anyhow::Result;
use tracing::metadata::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::Layer, prelude::*, registry, EnvFilter};

/// Flushes buffered log lines when dropped, keep it alive until exit
pub struct Guard {
    _stdout: WorkerGuard,
    _file: Option<WorkerGuard>,
}

/// stdout always, plus an hourly rolling file in `log_dir` if one is given.
/// the level defaults to INFO and can be changed with `RUST_LOG`
pub fn init_logging(log_dir: Option<&Path>) -> Result<Guard> {
    let global_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let (stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = Layer::new().with_writer(stdout).compact().with_target(false);
    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::hourly(dir, "sensor-emitter.log");
            let (logfile, guard) = tracing_appender::non_blocking(appender);
            let layer = Layer::new()
                .with_writer(logfile)
                .with_ansi(false)
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    registry()
        .with(global_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;
    Ok(Guard {
        _stdout: stdout_guard,
        _file: file_guard,
    })
}
