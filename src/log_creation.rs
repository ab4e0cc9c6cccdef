/// this file sets up the unified logging for both pipelines and the per phase progress bars.
///
/// Events go to stderr, and to `<log_dir>/harvest.log` as well when a log directory is given.
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::create_dir_all;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "harvest.log";

/// Installs the global subscriber. Keep the returned guard alive until exit or buffered
/// file output is lost.
pub fn init_logging(log_dir: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(
                tracing_appender::rolling::never(dir, LOG_FILE),
            );
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // a subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(guard)
}

pub fn progress_bar(len: u64, label: &'static str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{msg:>16} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, eta {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    let bar = ProgressBar::new(len).with_style(style);
    bar.set_message(label);
    bar
}
