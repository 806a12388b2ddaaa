//! FFmpeg initialisation and log-level control.
//!
//! FFmpeg keeps its own stderr logger, separate from the Rust
//! [`log`](https://crates.io/crates/log) facade used by this crate. Probing
//! thousands of files at index-build time makes FFmpeg's default warnings
//! very noisy, so [`set_ffmpeg_log_level`] is exposed without requiring a
//! direct `ffmpeg-next` dependency.
//!
//! ```no_run
//! use framefold::FfmpegLogLevel;
//!
//! framefold::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::path::Path;

use ffmpeg_next::util::log::Level;

use crate::error::FramefoldError;

/// FFmpeg internal log verbosity, from quietest to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only conditions after which the process aborts.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Everything.
    Trace,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl From<Level> for FfmpegLogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }
}

impl FfmpegLogLevel {
    /// Parse a level name such as `"warning"` or `"quiet"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "quiet" => Some(FfmpegLogLevel::Quiet),
            "panic" => Some(FfmpegLogLevel::Panic),
            "fatal" => Some(FfmpegLogLevel::Fatal),
            "error" => Some(FfmpegLogLevel::Error),
            "warning" | "warn" => Some(FfmpegLogLevel::Warning),
            "info" => Some(FfmpegLogLevel::Info),
            "verbose" => Some(FfmpegLogLevel::Verbose),
            "debug" => Some(FfmpegLogLevel::Debug),
            "trace" => Some(FfmpegLogLevel::Trace),
            _ => None,
        }
    }
}

/// Set FFmpeg's own stderr verbosity. Does not affect `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// Current FFmpeg stderr verbosity, if it maps to a known level.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from)
}

/// Initialise FFmpeg (idempotent) and open `path` as a demuxer.
pub(crate) fn open_input(path: &Path) -> Result<ffmpeg_next::format::context::Input, FramefoldError> {
    ffmpeg_next::init().map_err(|error| FramefoldError::FileOpen {
        path: path.to_path_buf(),
        reason: format!("FFmpeg initialisation failed: {error}"),
    })?;

    ffmpeg_next::format::input(path).map_err(|error| FramefoldError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}
