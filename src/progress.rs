//! Progress sinks
//!
//! The driver reports `(total, completed)` pairs through an injected
//! [`ProgressFn`](crate::driver::ProgressFn). Sinks must be cheap: they run
//! on worker threads between file operations.

use crate::driver::ProgressFn;
use std::io::Write;
use std::sync::Arc;

/// Single-line overwritten `\r  NN% [completed/total]` display on stderr.
///
/// Stderr so that a machine-readable report on stdout stays clean.
pub fn console() -> ProgressFn {
    Arc::new(|total, completed| {
        let percent = if total == 0 {
            100
        } else {
            completed * 100 / total
        };
        eprint!("\r {percent:>3}% [{completed}/{total}]");
        let _ = std::io::stderr().flush();
    })
}

/// Discards every update; used for JSON output and in tests.
pub fn silent() -> ProgressFn {
    Arc::new(|_, _| {})
}
