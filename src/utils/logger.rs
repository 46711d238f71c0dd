use tracing_appender::non_blocking::WorkerGuard;

/// Initialize logging based on TINYTHIS_DEBUG environment variable
pub fn init_logging() -> Option<WorkerGuard> {
    if std::env::var("TINYTHIS_DEBUG").is_ok() {
        let log_dir = dirs::data_local_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("tinythis");

        let _ = std::fs::create_dir_all(&log_dir);

        let file_appender = tracing_appender::rolling::daily(&log_dir, "tinythis.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into()),
            )
            .init();

        tracing::info!("tinythis logging initialized");
        Some(guard)
    } else {
        None
    }
}
