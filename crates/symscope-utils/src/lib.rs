//! # Symscope Utilities
//!
//! Logging setup shared by the symscope binaries.
//!
//! Library code in `symscope-core` only emits `tracing` events; this crate
//! decides where they go. Console output is written to stderr so that
//! command output on stdout stays machine-readable.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogLevel, LoggingError, LoggingGuard, init_logging, init_logging_with_level};
pub use tracing::{debug, error, info, trace, warn};
