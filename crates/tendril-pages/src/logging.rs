//! Logging macros for tendril-pages
//!
//! Every macro emits a `tracing` event with the `tendril` target, so the
//! host application decides where records go by installing a subscriber.
//! Arguments are passed through unchanged: structured fields and format
//! strings both work.
//!
//! ## Macro Overview
//!
//! | Macro | Level | Compiled in |
//! |-------|-------|-------------|
//! | `debug_log!` | DEBUG | `debug-hooks` feature + `debug_assertions` |
//! | `info_log!` | INFO | always |
//! | `warn_log!` | WARN | always |
//! | `error_log!` | ERROR | always |
//!
//! ## Example
//!
//! ```ignore
//! use tendril_pages::{debug_log, info_log, warn_log, error_log};
//!
//! // Only emitted when both `debug-hooks` and `debug_assertions` are enabled
//! debug_log!(directive = name, "applying directive");
//!
//! info_log!("app mounted");
//! warn_log!(expression = exp, error = %err, "error when evaluating expression");
//! error_log!(selector, "mount target not found");
//! ```

/// Logs a debug event (requires `debug-hooks` feature + `debug_assertions`)
///
/// Used for per-directive tracing that is too chatty for normal builds.
#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__tracing::debug!(target: "tendril", $($arg)*);
	}};
}

/// No-op debug_log when conditions are not met
#[macro_export]
#[cfg(not(all(debug_assertions, feature = "debug-hooks")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info event
#[macro_export]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__tracing::info!(target: "tendril", $($arg)*);
	}};
}

/// Logs a warning event
///
/// Recoverable failures (a bad expression, an unknown directive) end up here.
#[macro_export]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__tracing::warn!(target: "tendril", $($arg)*);
	}};
}

/// Logs an error event
#[macro_export]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__tracing::error!(target: "tendril", $($arg)*);
	}};
}
