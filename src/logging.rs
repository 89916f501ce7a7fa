use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "nanny_booking=info";

/// Initializes console logging plus a daily-rotated JSON log file under `log_dir`.
///
/// The returned guard flushes the file writer when dropped, so the caller keeps
/// it alive for the life of the process.
pub fn init_logging(log_dir: &str) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    if let Err(e) = fs::create_dir_all(log_dir) {
        // Console-only when the log directory is unusable
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
            .init();
        tracing::warn!("Could not create log directory '{}': {}", log_dir, e);
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, "nanny_booking.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_writes_under_the_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let guard = init_logging(log_dir.to_str().unwrap());
        assert!(guard.is_some());
        tracing::info!("logging initialised");
        drop(guard);

        let files: Vec<_> = fs::read_dir(&log_dir).unwrap().flatten().collect();
        assert!(files
            .iter()
            .any(|f| f.file_name().to_string_lossy().starts_with("nanny_booking.log")));
    }
}
