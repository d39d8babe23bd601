//! Process-wide FFmpeg setup.
//!
//! FFmpeg keeps global state (registered formats and codecs, its own log
//! level). [`initialize`] performs the one-time setup and must be called by
//! the application before the first [`InputFile`](crate::InputFile) is
//! opened; opening a file never initializes FFmpeg on its own.
//!
//! FFmpeg also has its own internal logging system, separate from the Rust
//! [`log`](https://crates.io/crates/log) crate. By default it prints
//! warnings and errors to stderr, which can be noisy in library usage.
//! [`set_ffmpeg_log_level`] tunes that output without importing
//! `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use avdemux::{FfmpegLogLevel, InputFile};
//!
//! avdemux::initialize()?;
//! avdemux::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//!
//! let file = InputFile::open("input.mp4")?;
//! # Ok::<(), avdemux::DemuxError>(())
//! ```

use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use crate::error::DemuxError;

/// FFmpeg internal log verbosity level.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants. Setting a level causes
/// FFmpeg to suppress all messages below that severity.
///
/// # Ordering (most verbose → most quiet)
///
/// `Trace` > `Debug` > `Verbose` > `Info` > `Warning` > `Error` > `Fatal` > `Panic` > `Quiet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only log when a condition that cannot be recovered from is encountered
    /// and the process will abort.
    Panic,
    /// Only log when an unrecoverable error is encountered (the context
    /// becomes invalid but the process may continue).
    Fatal,
    /// Log recoverable errors.
    Error,
    /// Log warnings (default FFmpeg level).
    Warning,
    /// Log informational messages.
    Info,
    /// Log verbose informational messages.
    Verbose,
    /// Log debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    /// Convert to the `ffmpeg_next::util::log::Level` enum.
    fn to_ffmpeg_level(self) -> Level {
        match self {
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

    /// Convert from the `ffmpeg_next::util::log::Level` enum.
    fn from_ffmpeg_level(level: Level) -> Self {
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

static INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize FFmpeg for this process.
///
/// Safe to call any number of times from any thread; only the first call
/// does work, later calls return its outcome.
///
/// # Errors
///
/// Returns [`DemuxError::FfmpegError`] if FFmpeg could not be initialized.
pub fn initialize() -> Result<(), DemuxError> {
    INITIALIZED
        .get_or_init(|| {
            log::debug!("Initializing FFmpeg");
            ffmpeg_next::init().map_err(|error| error.to_string())
        })
        .clone()
        .map_err(DemuxError::FfmpegError)
}

/// Whether [`initialize`] has completed successfully.
pub fn is_initialized() -> bool {
    matches!(INITIALIZED.get(), Some(Ok(())))
}

/// Set the FFmpeg internal log verbosity level.
///
/// This controls what FFmpeg prints to stderr. It does **not** affect
/// Rust-side `log` crate output.
///
/// # Example
///
/// ```no_run
/// use avdemux::FfmpegLogLevel;
///
/// // Only show errors and above.
/// avdemux::set_ffmpeg_log_level(FfmpegLogLevel::Error);
/// ```
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Get the current FFmpeg internal log verbosity level.
///
/// Returns `None` if the current level does not map to a known variant
/// (should not happen in practice).
///
/// # Example
///
/// ```no_run
/// use avdemux::FfmpegLogLevel;
///
/// let level = avdemux::get_ffmpeg_log_level();
/// println!("Current FFmpeg log level: {:?}", level);
/// ```
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from_ffmpeg_level)
}
