//! jasm-utils: state directory and log file setup for the jasm daemon
//!
//! This crate provides:
//! - A unified error type ([`JasmError`], [`Result`])
//! - XDG state directory resolution ([`paths`] module)
//! - Append-only log files and the stderr+file fan-out ([`LogHandle`], [`Tee`])
//! - Leveled loggers and the process-wide registry ([`init_log`], [`Loggers`],
//!   [`infof!`], ...)

pub mod error;
pub mod logger;
pub mod logging;
pub mod paths;
pub mod sink;

// Re-export main types at crate root for convenience
pub use error::{JasmError, Result};
pub use logger::{LevelLogger, LineMeta};
pub use logging::{
    bridge_subscriber, close_log, debug_enabled, error_logger, init_client_log,
    init_client_log_with_config, init_log, init_log_with_config, init_tracing, install,
    installed, set_debug, InstalledWriter, LogConfig, Loggers,
};
pub use paths::state_dir;
pub use sink::{LogHandle, SharedWriter, Tee};
