//! Logging infrastructure - structured tracing for the registry
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Per-operation events at TRACE (zero-cost when filtered out)
//! - Table growth at DEBUG, lifecycle at INFO, allocation failure at WARN
//! - Console (stderr) or file output, optional JSON
//!
//! Nothing here allocates through the registry, so logging from inside the
//! allocation path cannot recurse.

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;
use crate::registry::{Slot, TeardownReport};

mod macros;
pub use macros::*;

/// Set once the global subscriber is installed (or installation was attempted)
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the non-blocking file writer flushing for the process lifetime
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable file logging
    pub file_output: bool,
    /// Log file path (if file_output enabled)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Start from the `[logging]` config section, then apply env overrides
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        let config = Self {
            level: settings.level.parse().unwrap_or(Level::INFO),
            file_output: settings.file.is_some(),
            log_path: settings.file.clone(),
            json_format: settings.json,
        };
        config.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // SLOTALLOC_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("SLOTALLOC_LOG_LEVEL") {
            self.level = parse_level(&level_str);
        }

        // SLOTALLOC_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("SLOTALLOC_LOG_FILE") {
            self.file_output = true;
            self.log_path = Some(path);
        }

        if std::env::var_os("SLOTALLOC_LOG_JSON").is_some() {
            self.json_format = true;
        }

        self
    }
}

fn parse_level(s: &str) -> Level {
    match s.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Idempotent. If the host already installed a global subscriber, ours is
/// silently skipped and events go to theirs.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("slotalloc={}", config.level.as_str().to_lowercase()))
        });

        let file_writer = match (config.file_output, config.log_path.as_deref()) {
            (true, Some(path)) => Some(file_appender(Path::new(path))),
            _ => None,
        };

        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(cfg!(debug_assertions))
            .with_line_number(cfg!(debug_assertions));

        let layer = match (file_writer, config.json_format) {
            (Some(writer), true) => layer.json().with_writer(writer).boxed(),
            (Some(writer), false) => layer.with_ansi(false).with_writer(writer).boxed(),
            (None, true) => layer.json().with_writer(io::stderr).boxed(),
            (None, false) => layer.with_writer(io::stderr).boxed(),
        };

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init();
    });
}

fn file_appender(path: &Path) -> tracing_appender::non_blocking::NonBlocking {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "slotalloc.log".into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    writer
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Registry events
// ============================================================================

/// Log tracked allocation
#[inline]
pub fn log_allocation(slot: Slot, size: usize, payload: *const u8) {
    trace!(
        event = "allocation",
        slot = slot.index(),
        size_bytes = size,
        address = ?payload,
        "Memory allocated"
    );
}

/// Log tracked reallocation
#[inline]
pub fn log_reallocation(slot: Slot, new_size: usize, moved: bool) {
    trace!(
        event = "reallocation",
        slot = slot.index(),
        size_bytes = new_size,
        moved,
        "Memory reallocated"
    );
}

/// Log tracked release
#[inline]
pub fn log_release(slot: Slot, payload: *const u8) {
    trace!(
        event = "release",
        slot = slot.index(),
        address = ?payload,
        "Memory released"
    );
}

/// Log raw allocator refusal
pub fn log_allocation_failure(requested: usize) {
    warn!(
        event = "allocation_failure",
        requested_bytes = requested,
        "Raw allocator returned no memory"
    );
}

/// Log slot table growth
pub fn log_table_growth(old_capacity: usize, new_capacity: usize) {
    debug!(
        event = "table_growth",
        old_capacity,
        new_capacity,
        "Slot table grown"
    );
}

/// Log registry creation
pub fn log_registry_init(initial_capacity: usize) {
    info!(
        event = "registry_init",
        initial_capacity,
        "Allocation registry initialized"
    );
}

/// Log bulk release at shutdown
pub fn log_teardown(report: &TeardownReport) {
    info!(
        event = "registry_teardown",
        freed = report.freed,
        capacity = report.capacity,
        "Allocation registry torn down"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.file_output);
        assert!(!config.json_format);
    }

    #[test]
    fn settings_map_onto_log_config() {
        let settings = LoggingConfig {
            level: "debug".into(),
            json: true,
            file: Some("/tmp/slotalloc-test.log".into()),
        };
        let config = LogConfig::from_settings(&settings);
        if std::env::var_os("SLOTALLOC_LOG_LEVEL").is_none() {
            assert_eq!(config.level, Level::DEBUG);
        }
        assert!(config.json_format);
        assert!(config.file_output);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("LOUD"), Level::INFO);
        assert_eq!(parse_level("Trace"), Level::TRACE);
    }

    #[test]
    fn test_init_idempotent() {
        init();
        init(); // Should not panic
        assert!(is_initialized());
    }
}
