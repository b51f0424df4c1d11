//! Logging infrastructure for jasm
//!
//! [`init_log`] opens `jasmd.log` in the state directory and installs a
//! [`Loggers`] registry whose four leveled loggers write every line to
//! both stderr and that file. The free functions ([`info`], [`warn`], ...)
//! and macros ([`infof!`](crate::infof), ...) dispatch to the installed
//! registry and do nothing at all until one is installed.
//!
//! ```no_run
//! let log = jasm_utils::init_log()?;
//! jasm_utils::infof!("listening on {}", "/run/jasm.sock");
//! jasm_utils::close_log(log);
//! # Ok::<(), jasm_utils::JasmError>(())
//! ```

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::ChronoLocal, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::logger::{LevelLogger, LineMeta};
use crate::paths::{self, APP_DIR};
use crate::sink::{LogHandle, SharedWriter, Tee};
use crate::{JasmError, Result};

/// Daemon log file name
pub const LOG_FILE: &str = "jasmd.log";

/// Client activity log file name
pub const CLIENT_LOG_FILE: &str = "jasmd_clients.log";

/// Tag prepended to info lines
pub const INFO_TAG: &str = "[jasmd] ";
pub const WARN_TAG: &str = "WARNING: ";
pub const DEBUG_TAG: &str = "DEBUG: ";
pub const ERROR_TAG: &str = "ERROR: ";

static LOGGERS: ArcSwapOption<Loggers> = ArcSwapOption::const_empty();

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Enable or disable debug-level output process-wide
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Whether debug-level output is enabled
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Where the log files live and how info lines are tagged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Overrides `XDG_STATE_HOME`
    pub state_home: Option<PathBuf>,
    /// Overrides the home directory lookup
    pub home: Option<PathBuf>,
    /// Directory created under the state base
    pub app_dir: String,
    /// Daemon log file name
    pub log_file: String,
    /// Client activity log file name
    pub client_log_file: String,
    /// Tag prepended to info lines
    pub info_tag: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            state_home: None,
            home: None,
            app_dir: APP_DIR.into(),
            log_file: LOG_FILE.into(),
            client_log_file: CLIENT_LOG_FILE.into(),
            info_tag: INFO_TAG.into(),
        }
    }
}

impl LogConfig {
    /// Config rooted at an explicit state base, ignoring the environment
    pub fn with_state_home(state_home: impl Into<PathBuf>) -> Self {
        Self {
            state_home: Some(state_home.into()),
            ..Self::default()
        }
    }

    /// Resolve and create the state directory
    pub fn state_dir(&self) -> Result<PathBuf> {
        self.state_dir_from(paths::state_home_from_env())
    }

    /// Resolve with `env_state_home` standing in for `XDG_STATE_HOME`
    fn state_dir_from(&self, env_state_home: Option<OsString>) -> Result<PathBuf> {
        let state_home = self
            .state_home
            .clone()
            .map(OsString::from)
            .or(env_state_home);
        let home = self.home.clone();
        paths::resolve_state_dir(state_home, || home.or_else(paths::home_dir), &self.app_dir)
    }
}

/// The four leveled loggers sharing one output
#[derive(Debug, Clone)]
pub struct Loggers {
    debug: LevelLogger,
    info: LevelLogger,
    warn: LevelLogger,
    error: LevelLogger,
    out: SharedWriter,
}

impl Loggers {
    /// Build the registry over any writer
    pub fn with_writer(writer: impl Write + Send + 'static, info_tag: &str) -> Self {
        let out = SharedWriter::new(writer);
        Self {
            info: LevelLogger::new(info_tag, LineMeta::NONE, out.clone()),
            warn: LevelLogger::new(WARN_TAG, LineMeta::FULL, out.clone()),
            debug: LevelLogger::new(DEBUG_TAG, LineMeta::FULL, out.clone()),
            error: LevelLogger::new(ERROR_TAG, LineMeta::FULL, out.clone()),
            out,
        }
    }

    /// Build the registry writing to stderr and `file`
    pub fn stderr_and(file: LogHandle, info_tag: &str) -> Self {
        Self::with_writer(Tee::new(io::stderr(), file), info_tag)
    }

    /// Logs only while the debug toggle is on
    #[track_caller]
    pub fn debug(&self, msg: &str) {
        if debug_enabled() {
            self.debug.log(msg);
        }
    }

    #[track_caller]
    pub fn debug_fmt(&self, args: fmt::Arguments<'_>) {
        if debug_enabled() {
            self.debug.log_fmt(args);
        }
    }

    #[track_caller]
    pub fn info(&self, msg: &str) {
        self.info.log(msg);
    }

    #[track_caller]
    pub fn info_fmt(&self, args: fmt::Arguments<'_>) {
        self.info.log_fmt(args);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str) {
        self.warn.log(msg);
    }

    #[track_caller]
    pub fn warn_fmt(&self, args: fmt::Arguments<'_>) {
        self.warn.log_fmt(args);
    }

    #[track_caller]
    pub fn error(&self, msg: &str) {
        self.error.log(msg);
    }

    #[track_caller]
    pub fn error_fmt(&self, args: fmt::Arguments<'_>) {
        self.error.log_fmt(args);
    }

    pub fn error_logger(&self) -> &LevelLogger {
        &self.error
    }
}

/// Make `loggers` the process-wide registry, replacing any previous one
pub fn install(loggers: Loggers) -> Arc<Loggers> {
    let loggers = Arc::new(loggers);
    LOGGERS.store(Some(Arc::clone(&loggers)));
    loggers
}

/// The process-wide registry, if one has been installed
pub fn installed() -> Option<Arc<Loggers>> {
    LOGGERS.load_full()
}

/// Open the daemon log and install loggers writing to stderr and it
///
/// The caller owns the returned handle and passes it to [`close_log`] on
/// shutdown. On error nothing is installed and the previous registry, if
/// any, stays in place.
pub fn init_log() -> Result<LogHandle> {
    init_log_with_config(&LogConfig::default())
}

pub fn init_log_with_config(config: &LogConfig) -> Result<LogHandle> {
    let path = config.state_dir()?.join(&config.log_file);
    let handle = LogHandle::open(&path).map_err(|source| JasmError::OpenLog {
        path: path.clone(),
        source,
    })?;

    install(Loggers::stderr_and(handle.clone(), &config.info_tag));
    tracing::debug!(path = %path.display(), "daemon loggers installed");
    Ok(handle)
}

/// Open the client activity log
///
/// Nothing in this crate writes to it; the handle is returned as is.
pub fn init_client_log() -> Result<LogHandle> {
    init_client_log_with_config(&LogConfig::default())
}

pub fn init_client_log_with_config(config: &LogConfig) -> Result<LogHandle> {
    let path = config.state_dir()?.join(&config.client_log_file);
    LogHandle::open(&path).map_err(|source| JasmError::OpenClientLog { path, source })
}

/// Close a log file handle
pub fn close_log(handle: LogHandle) {
    let _ = handle.close();
}

/// The installed error logger, or one that discards everything
pub fn error_logger() -> LevelLogger {
    match &*LOGGERS.load() {
        Some(loggers) => loggers.error_logger().clone(),
        None => LevelLogger::discard(),
    }
}

#[track_caller]
pub fn debug(msg: &str) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.debug(msg);
    }
}

#[track_caller]
pub fn debug_fmt(args: fmt::Arguments<'_>) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.debug_fmt(args);
    }
}

#[track_caller]
pub fn info(msg: &str) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.info(msg);
    }
}

#[track_caller]
pub fn info_fmt(args: fmt::Arguments<'_>) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.info_fmt(args);
    }
}

#[track_caller]
pub fn warn(msg: &str) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.warn(msg);
    }
}

#[track_caller]
pub fn warn_fmt(args: fmt::Arguments<'_>) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.warn_fmt(args);
    }
}

#[track_caller]
pub fn error(msg: &str) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.error(msg);
    }
}

#[track_caller]
pub fn error_fmt(args: fmt::Arguments<'_>) {
    if let Some(loggers) = &*LOGGERS.load() {
        loggers.error_fmt(args);
    }
}

/// Log at debug level. A lone message is written verbatim.
#[macro_export]
macro_rules! debugf {
    ($fmt:literal, $($arg:tt)+) => {
        $crate::logging::debug_fmt(::std::format_args!($fmt, $($arg)+))
    };
    ($msg:expr $(,)?) => {
        $crate::logging::debug($msg)
    };
}

/// Log at info level. A lone message is written verbatim.
#[macro_export]
macro_rules! infof {
    ($fmt:literal, $($arg:tt)+) => {
        $crate::logging::info_fmt(::std::format_args!($fmt, $($arg)+))
    };
    ($msg:expr $(,)?) => {
        $crate::logging::info($msg)
    };
}

/// Log at warning level. A lone message is written verbatim.
#[macro_export]
macro_rules! warnf {
    ($fmt:literal, $($arg:tt)+) => {
        $crate::logging::warn_fmt(::std::format_args!($fmt, $($arg)+))
    };
    ($msg:expr $(,)?) => {
        $crate::logging::warn($msg)
    };
}

/// Log at error level. A lone message is written verbatim.
#[macro_export]
macro_rules! errorf {
    ($fmt:literal, $($arg:tt)+) => {
        $crate::logging::error_fmt(::std::format_args!($fmt, $($arg)+))
    };
    ($msg:expr $(,)?) => {
        $crate::logging::error($msg)
    };
}

/// Timestamp layout shared with the leveled loggers, local time
const TRACING_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// `tracing_subscriber` writer that targets whichever registry is installed
///
/// The registry is looked up per event, so a later [`init_log`] redirects
/// bridged events too. Nothing is written while no registry is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstalledWriter;

/// One event's writer, pinned to the registry installed when it began
pub struct InstalledWriterHandle {
    out: Option<SharedWriter>,
}

impl Write for InstalledWriterHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(out) = &self.out {
            out.write_line(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for InstalledWriter {
    type Writer = InstalledWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        InstalledWriterHandle {
            out: LOGGERS.load_full().map(|loggers| loggers.out.clone()),
        }
    }
}

/// Subscriber routing `tracing` events through the installed registry
///
/// Filters at `debug` while the debug toggle is on and `info` otherwise.
pub fn bridge_subscriber() -> Result<impl tracing::Subscriber + Send + Sync + 'static> {
    let directive = if debug_enabled() { "debug" } else { "info" };
    let filter = EnvFilter::try_new(directive)
        .map_err(|e| JasmError::tracing(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = tracing_fmt::layer()
        .with_writer(InstalledWriter)
        .with_timer(ChronoLocal::new(TRACING_TIME_FORMAT.into()))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    Ok(tracing_subscriber::registry().with(filter).with(fmt_layer))
}

/// Install [`bridge_subscriber`] as the global default subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> Result<()> {
    bridge_subscriber()?
        .try_init()
        .map_err(|e| JasmError::tracing(e.to_string()))
}
