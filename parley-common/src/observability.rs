//! `tracing` setup for the binary and integration tests.
//!
//! Events go to a daily rolling file (`<app>.<date>.log`). A stderr copy is
//! optional, since the interactive UI owns the terminal. The first
//! successful [`init_logging`] call wins; later calls return the same path.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable consulted when no explicit log directory is set.
pub const LOG_DIR_ENV: &str = "PARLEY_LOG_DIR";

static INSTALLED: OnceLock<(PathBuf, WorkerGuard)> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used as the log file prefix and the default directory name.
    pub app_name: &'static str,
    /// Explicit log directory. Falls back to `PARLEY_LOG_DIR`, then the
    /// platform data dir.
    pub log_dir: Option<PathBuf>,
    /// Mirror events to stderr. Keep off while the TUI is running.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Rotated files kept on disk.
    pub keep_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "parley",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
            keep_files: 7,
        }
    }
}

/// Install the global subscriber and return today's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some((path, _)) = INSTALLED.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(config.app_name)
        .filename_suffix("log")
        .max_log_files(config.keep_files.max(1))
        .build(&dir)
        .context("opening rolling log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(match config.format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    });
    if config.emit_stderr {
        layers.push(match config.format {
            LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        });
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter.as_str()));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    let path = todays_log_file(&dir, config.app_name);
    let _ = INSTALLED.set((path.clone(), guard));
    Ok(path)
}

fn todays_log_file(dir: &Path, app_name: &str) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    dir.join(format!("{app_name}.{date}.log"))
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from));
    match configured {
        Some(dir) => expand_home(&dir),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(app_name),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = resolve_log_dir("parley", Some(Path::new("/tmp/parley-logs")));
        assert_eq!(dir, PathBuf::from("/tmp/parley-logs"));
    }

    #[test]
    fn tilde_is_expanded_against_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/logs")), home.join("logs"));
        }
    }

    #[test]
    fn other_paths_pass_through() {
        assert_eq!(
            expand_home(Path::new("relative/logs")),
            PathBuf::from("relative/logs")
        );
        assert_eq!(
            expand_home(Path::new("/abs/~user")),
            PathBuf::from("/abs/~user")
        );
    }

    #[test]
    fn log_file_name_carries_the_date() {
        let path = todays_log_file(Path::new("/var/log/parley"), "parley");
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("parley.20"));
        assert!(name.ends_with(".log"));
    }
}
