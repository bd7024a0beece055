//! Module `log` implements the single process-wide logging hook the core
//! is allowed to use. The core never writes to stdout/stderr outside this
//! hook: every warning, error and diagnostic in this crate goes through
//! `debug!`/`info!`/`warn!`/`error!` below, which forward to whatever
//! callback the embedding application installed with `set_log_callback`.
//!
//! Modeled as process-wide state the way `spinlock`/`gate` model the
//! per-file transaction lock: a single `RwLock`-guarded singleton,
//! lazily initialized, with a threshold check on the hot path so that a
//! disabled log level costs one atomic load and no allocation.

use std::sync::RwLock;

use lazy_static::lazy_static;

/// Severity of a log message, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

type Callback = dyn Fn(LogLevel, &str) + Send + Sync;

struct LogState {
    level: LogLevel,
    callback: Option<Box<Callback>>,
}

lazy_static! {
    static ref STATE: RwLock<LogState> = RwLock::new(LogState {
        level: LogLevel::Warning,
        callback: None,
    });
}

/// Install (or replace) the log callback. Pass `None` to silence logging.
pub fn set_log_callback<F>(callback: Option<F>)
where
    F: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    let mut state = STATE.write().unwrap();
    state.callback = callback.map(|f| Box::new(f) as Box<Callback>);
}

/// Set the minimum level that reaches the callback.
pub fn set_log_level(level: LogLevel) {
    STATE.write().unwrap().level = level;
}

pub(crate) fn emit(level: LogLevel, msg: &str) {
    let state = STATE.read().unwrap();
    if level >= state.level {
        if let Some(cb) = &state.callback {
            cb(level, msg);
        }
    }
}

pub(crate) fn debug(msg: &str) {
    emit(LogLevel::Debug, msg)
}
pub(crate) fn info(msg: &str) {
    emit(LogLevel::Info, msg)
}
pub(crate) fn warn(msg: &str) {
    emit(LogLevel::Warning, msg)
}
pub(crate) fn error(msg: &str) {
    emit(LogLevel::Error, msg)
}

macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log::debug(&format!($($arg)*)) };
}
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log::info(&format!($($arg)*)) };
}
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log::warn(&format!($($arg)*)) };
}
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log::error(&format!($($arg)*)) };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
