use crate::modules::auth::credential::get_data_dir;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.to_rfc3339())
    }
}

pub fn get_log_dir() -> Result<PathBuf, String> {
    let data_dir = get_data_dir()?;
    let log_dir = data_dir.join("logs");

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;
    }

    Ok(log_dir)
}
pub fn init_logger(days_to_keep: u64) {
    let _ = tracing_log::LogTracer::init();

    let log_dir = match get_log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to initialize log directory: {}", e);
            return;
        }
    };
    let file_appender = tracing_appender::rolling::daily(log_dir, "metricgate.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(LocalTimer);
    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(LocalTimer);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    std::mem::forget(_guard);

    info!("Log system initialized (console + daily file)");
    if let Err(e) = cleanup_old_logs(days_to_keep) {
        warn!("Failed to cleanup old logs: {}", e);
    }
}
const MAX_TOTAL_SIZE_BYTES: u64 = 256 * 1024 * 1024;
const TARGET_SIZE_BYTES: u64 = 128 * 1024 * 1024;

pub fn cleanup_old_logs(days_to_keep: u64) -> Result<usize, String> {
    let log_dir = get_log_dir()?;
    cleanup_log_dir(&log_dir, days_to_keep, MAX_TOTAL_SIZE_BYTES, TARGET_SIZE_BYTES)
}

struct LogFile {
    path: PathBuf,
    bytes: u64,
    modified: SystemTime,
}

fn list_log_files(log_dir: &Path) -> Result<Vec<LogFile>, String> {
    let entries =
        fs::read_dir(log_dir).map_err(|e| format!("Failed to read log directory: {}", e))?;
    Ok(entries
        .flatten()
        .filter_map(|entry| {
            let meta = entry.metadata().ok().filter(|m| m.is_file())?;
            Some(LogFile {
                path: entry.path(),
                bytes: meta.len(),
                modified: meta.modified().unwrap_or_else(|_| SystemTime::now()),
            })
        })
        .collect())
}

fn remove_log(file: &LogFile, reason: &str) -> bool {
    match fs::remove_file(&file.path) {
        Ok(()) => {
            info!(file = ?file.path.file_name(), reason, "Removed log file");
            true
        }
        Err(e) => {
            warn!(file = ?file.path, reason, "Could not remove log file: {}", e);
            false
        }
    }
}

/// Drops files older than `days_to_keep`, then the oldest survivors while the directory
/// is above `max_total_bytes`, stopping once it fits in `target_bytes`.
fn cleanup_log_dir(
    log_dir: &Path,
    days_to_keep: u64,
    max_total_bytes: u64,
    target_bytes: u64,
) -> Result<usize, String> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let retention = Duration::from_secs(days_to_keep.saturating_mul(24 * 60 * 60));
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut removed = 0usize;
    let mut freed = 0u64;
    let mut kept = Vec::new();
    for file in list_log_files(log_dir)? {
        if file.modified < cutoff && remove_log(&file, "retention") {
            removed += 1;
            freed += file.bytes;
        } else {
            kept.push(file);
        }
    }

    let mut dir_bytes: u64 = kept.iter().map(|f| f.bytes).sum();
    if dir_bytes > max_total_bytes {
        kept.sort_by_key(|f| f.modified);
        for file in &kept {
            if dir_bytes <= target_bytes {
                break;
            }
            if remove_log(file, "size_cap") {
                removed += 1;
                freed += file.bytes;
                dir_bytes -= file.bytes;
            }
        }
    }

    if removed > 0 {
        info!(removed, freed_bytes = freed, "Old logs pruned");
    }
    Ok(removed)
}
