use std::sync::{Arc, OnceLock};

/// Receiver for log output from the crate.
///
/// Every `tracing` event and `log` record emitted by `SeedKit` is forwarded to the
/// registered logger. Debug and trace output from other crates is dropped. Messages never
/// contain passwords, clear text or key material.
///
/// With the `ffi` feature the trait is exported via `UniFFI` so hosts can implement it.
///
/// # Examples
///
/// ```rust
/// use seedkit_core::logger::{Logger, LogLevel};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class SeedKitLoggerBridge: SeedKit.Logger {
///     static let shared = SeedKitLoggerBridge()
///
///     func log(level: SeedKit.LogLevel, message: String) {
///         os_log("%{public}@", type: level.osLogType, message)
///     }
/// }
///
/// SeedKit.setLogger(logger: SeedKitLoggerBridge.shared) // once, at launch
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LogLevel {
    /// Very detailed diagnostics.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of key lifecycle and codec operations.
    Info,
    /// Destructive or unexpected situations, e.g. key deletion.
    Warn,
    /// Failed operations.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// `log::Log` implementation forwarding records to the registered [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        should_forward(metadata.target(), metadata.level())
    }

    fn log(&self, record: &log::Record) {
        let origin = record.module_path().unwrap_or_else(|| record.target());
        if !should_forward(origin, record.level()) {
            return;
        }
        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), record.args().to_string());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace output is only forwarded from `SeedKit`'s own modules.
fn should_forward(origin: &str, level: log::Level) -> bool {
    level <= log::Level::Info || origin.starts_with("seedkit")
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Registers the process-wide logger.
///
/// Only the first registration takes effect. Later calls are ignored, as is the call if
/// another `log` implementation was installed by the host process first.
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        log::warn!("logger already set, ignoring");
        return;
    }

    if let Err(e) = init_logger() {
        log::warn!("failed to install log bridge: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
