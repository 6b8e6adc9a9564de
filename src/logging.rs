//! Tracing setup for applications embedding the scheduler.
//!
//! Two outputs: a daily-rotated text file under the given directory and a
//! compact stdout layer. Level filtering comes from `RUST_LOG` (default
//! "info").

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the tracing subscriber.
///
/// Panics if a subscriber is already installed; call once at startup.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let file_appender = tracing_appender::rolling::daily(log_path, "frontier.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter.clone());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    // The guard must outlive the program for the background writer to flush.
    Box::leak(Box::new(file_guard));

    tracing::info!("logging initialized, files under {}", log_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    #[test]
    fn test_log_dir_creation() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("logs");
        // init_logging installs a global subscriber and cannot run twice in
        // one test binary; exercise the directory handling only.
        std::fs::create_dir_all(&log_path).unwrap();
        assert!(log_path.exists());
    }
}
