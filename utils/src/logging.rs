// Category-based logging infrastructure
//
// This needs to be stateless apart from the level, which is
// decided once from the environment on first use.
use lazy_static::lazy_static;

#[allow(dead_code, non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    // in order of highest priority
    critical, // Urgent and must always be displayed
    error,
    debug,     // debugging related, not verbose
    info,      // more verbose
    profiling, // profiling related timing
}

impl LogLevel {
    pub fn get_name(&self) -> &'static str {
        match self {
            LogLevel::critical => "critical",
            LogLevel::error => "error",
            LogLevel::debug => "debug",
            LogLevel::info => "info",
            LogLevel::profiling => "profiling",
        }
    }

    pub fn get_level(&self) -> u32 {
        match self {
            LogLevel::critical => 0,
            LogLevel::error => 1,
            LogLevel::debug => 2,
            LogLevel::info => 3,
            LogLevel::profiling => 4,
        }
    }

    /// Parse a level from either its name or its number
    pub fn from_name(name: &str) -> Option<LogLevel> {
        match name.trim().to_ascii_lowercase().as_str() {
            "critical" | "0" => Some(LogLevel::critical),
            "error" | "1" => Some(LogLevel::error),
            "debug" | "2" => Some(LogLevel::debug),
            "info" | "3" => Some(LogLevel::info),
            "profiling" | "4" => Some(LogLevel::profiling),
            _ => None,
        }
    }

    /// Errors belong on stderr, everything else on stdout
    pub fn is_diagnostic(&self) -> bool {
        self.get_level() <= LogLevel::error.get_level()
    }
}

lazy_static! {
    /// The most verbose level that will be printed.
    ///
    /// Set with WAYVK_LOG_LEVEL, defaults to debug. An unparseable value
    /// falls back to the default, since logging has to work before the
    /// config is validated.
    pub static ref MAX_LOG_LEVEL: u32 = std::env::var("WAYVK_LOG_LEVEL")
        .ok()
        .and_then(|v| LogLevel::from_name(&v))
        .unwrap_or(LogLevel::debug)
        .get_level();
}

pub fn enabled(level: LogLevel) -> bool {
    level.get_level() <= *MAX_LOG_LEVEL
}

#[macro_export]
macro_rules! log_internal {
    ($loglevel:expr, $($format_args:tt)+) => ({
        let level = $loglevel;
        if $crate::logging::enabled(level) {
            let msg = format!("[{:?}]<{}> {}:{} - {}",
                     $crate::timing::get_current_millis(),
                     level.get_name(),
                     file!(),
                     line!(),
                     format!($($format_args)+)
            );
            if level.is_diagnostic() {
                eprintln!("{}", msg);
            } else {
                println!("{}", msg);
            }
        }
    })
}

#[macro_export]
macro_rules! critical {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::critical, $($format_args)+)
    })
}

#[macro_export]
macro_rules! error {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::error, $($format_args)+)
    })
}

#[macro_export]
macro_rules! debug {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::debug, $($format_args)+)
    })
}

#[macro_export]
macro_rules! info {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::info, $($format_args)+)
    })
}

#[macro_export]
macro_rules! profiling {
    ($($format_args:tt)+) => ({
        $crate::log_internal!($crate::logging::LogLevel::profiling, $($format_args)+)
    })
}
