//! Logging macros over [`Logger`](crate::log::Logger).
//!
//! ```ignore
//! log_debug!(logger, "insert, collection={}, id={}", name, id);
//! log_warn!(logger, marker: &marker, "slow mongoDB query, elapsed={:?}", elapsed);
//! ```
//!
//! Arguments are formatted only when the logger's level is enabled.

/// Trace-level record.
#[macro_export]
macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => {
        $logger.trace(::std::format_args!($($arg)+))
    };
}

/// Debug-level record.
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.debug(::std::format_args!($($arg)+))
    };
}

/// Info-level record.
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.info(::std::format_args!($($arg)+))
    };
}

/// Warn-level record, optionally marked with an error code.
#[macro_export]
macro_rules! log_warn {
    ($logger:expr, marker: $marker:expr, $($arg:tt)+) => {
        $logger.warn_with($marker, ::std::format_args!($($arg)+))
    };
    ($logger:expr, $($arg:tt)+) => {
        $logger.warn(::std::format_args!($($arg)+))
    };
}

/// Error-level record, optionally marked with an error code.
#[macro_export]
macro_rules! log_error {
    ($logger:expr, marker: $marker:expr, $($arg:tt)+) => {
        $logger.error_with($marker, ::std::format_args!($($arg)+))
    };
    ($logger:expr, $($arg:tt)+) => {
        $logger.error(::std::format_args!($($arg)+))
    };
}
