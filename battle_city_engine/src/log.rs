//! Internal logging system for the Battle City engine
//!
//! - Customizable logger via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - File and line information for ERROR logs

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// # Example
///
/// ```no_run
/// use battle_city_engine::battle_city::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "battle_city::Engine", "battle_city::vulkan")
    pub source: String,

    pub message: String,

    /// Source file (only for ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose information (per-frame, per-uniform)
    Trace,

    /// Development information
    Debug,

    /// Important informational messages
    Info,

    /// Potential issues
    Warn,

    /// Critical issues, reported with file:line
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the default logger
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    /// Build the uncolored line for an entry
    pub fn format_entry(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");

        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, entry.severity.label(), entry.source, entry.message, file, line
            ),
            _ => format!(
                "[{}] [{}] [{}] {}",
                timestamp, entry.severity.label(), entry.source, entry.message
            ),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let label = entry.severity.label();
        let severity_str = match entry.severity {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            eprintln!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            );
        } else {
            println!(
                "[{}] [{}] [{}] {}",
                timestamp, severity_str, source, entry.message
            );
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// ```no_run
/// battle_city_engine::engine_trace!("battle_city::Sprite", "render at {:?}", (0.0, 0.0));
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::battle_city::Engine::log(
            $crate::battle_city::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::battle_city::Engine::log(
            $crate::battle_city::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
///
/// ```no_run
/// battle_city_engine::engine_info!("battle_city::Engine", "Renderer initialized");
/// ```
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::battle_city::Engine::log(
            $crate::battle_city::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::battle_city::Engine::log(
            $crate::battle_city::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::battle_city::Engine::log_detailed(
            $crate::battle_city::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR and evaluate to `Error::BackendError` carrying the same message
///
/// ```no_run
/// # use battle_city_engine::engine_err;
/// # fn f() -> battle_city_engine::battle_city::Result<()> {
/// let value: Option<u32> = None;
/// value.ok_or_else(|| engine_err!("battle_city::vulkan", "No queue family found"))?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::battle_city::Engine::log_detailed(
            $crate::battle_city::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::battle_city::Error::BackendError(message)
    }};
}

/// Log an ERROR and return early with `Err(Error::BackendError(..))`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {{
        return Err($crate::engine_err!($source, $($arg)*));
    }};
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
