//! Utilities: logging (dynamic level) and duration formatting for diagnostics.
//!
//! Key items:
//!   init_logging / derive_level / logging::enabled
//!   log_error! / log_info! / log_debug! / log_trace!
//!   human_duration

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Logging helpers.
///
/// Output goes to stderr so that dispatch reports on stdout stay machine-readable.
pub mod logging {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Info = 1,
        Debug = 2,
        Trace = 3,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "ERROR",
                LogLevel::Info => "INFO",
                LogLevel::Debug => "DEBUG",
                LogLevel::Trace => "TRACE",
            }
        }
    }

    static GLOBAL_LEVEL: OnceLock<AtomicU8> = OnceLock::new();

    fn inner_cell() -> &'static AtomicU8 {
        GLOBAL_LEVEL.get_or_init(|| AtomicU8::new(LogLevel::Info as u8))
    }

    /// Set the process-wide level. Later calls override earlier ones.
    pub fn init_logging(level: LogLevel) {
        inner_cell().store(level as u8, Ordering::Relaxed);
    }

    pub fn current_log_level() -> LogLevel {
        match inner_cell().load(Ordering::Relaxed) {
            0 => LogLevel::Error,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// `-q` wins over any `-v` count.
    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn timestamp() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    /// Checked by the macros before formatting, so per-candidate trace lines
    /// in the dispatch loop cost nothing at the default level.
    pub fn enabled(level: LogLevel) -> bool {
        level <= current_log_level()
    }

    pub fn log(level: LogLevel, msg: impl AsRef<str>) {
        if enabled(level) {
            eprintln!("[{}][{}] {}", level.as_str(), timestamp(), msg.as_ref());
        }
    }

    #[macro_export]
    macro_rules! log_at {
        ($level:expr, $($t:tt)*) => {
            if $crate::utils::logging::enabled($level) {
                $crate::utils::logging::log($level, format!($($t)*));
            }
        };
    }
    #[macro_export]
    macro_rules! log_error {
        ($($t:tt)*) => { $crate::log_at!($crate::utils::logging::LogLevel::Error, $($t)*) };
    }
    #[macro_export]
    macro_rules! log_info {
        ($($t:tt)*) => { $crate::log_at!($crate::utils::logging::LogLevel::Info, $($t)*) };
    }
    #[macro_export]
    macro_rules! log_debug {
        ($($t:tt)*) => { $crate::log_at!($crate::utils::logging::LogLevel::Debug, $($t)*) };
    }
    #[macro_export]
    macro_rules! log_trace {
        ($($t:tt)*) => { $crate::log_at!($crate::utils::logging::LogLevel::Trace, $($t)*) };
    }
}

pub use logging::{LogLevel, derive_level, init_logging};

/// Render a duration the way diagnostics print it: `1m 05s`, `4.2s`, `350ms`.
pub fn human_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        return format!("{ms}ms");
    }
    let secs = d.as_secs();
    if secs < 60 {
        return format!("{:.1}s", d.as_secs_f64());
    }
    format!("{}m {:02}s", secs / 60, secs % 60)
}
