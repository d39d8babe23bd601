//! Error types for the `avdemux` crate.
//!
//! This module defines [`DemuxError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry the context needed to
//! diagnose a failure without extra logging at the call site: the file name,
//! the stream index involved, and the text of the underlying container error.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `avdemux` operations.
///
/// Every public method that can fail returns `Result<T, DemuxError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DemuxError {
    /// The media file could not be opened or parsed as a known container.
    ///
    /// Fatal: no [`InputFile`](crate::InputFile) exists after this error.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::InputFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// Structural analysis failed. The file stays usable without properties.
    #[error("Failed to analyse {path}: {reason}")]
    Analysis {
        /// The analysed file.
        path: PathBuf,
        /// Underlying reason the analysis failed.
        reason: String,
    },

    /// Analysis was aborted by the progress callback or a
    /// [`CancellationToken`](crate::CancellationToken).
    #[error("Analysis aborted")]
    Aborted,

    /// A seek could not be performed. Stream queues have been cleared anyway.
    #[error("Failed to seek {path} to frame {frame} (stream {stream_index}): {reason}")]
    Seek {
        /// The file being seeked.
        path: PathBuf,
        /// The requested frame number.
        frame: u64,
        /// The reference stream used to resolve the frame's timestamp.
        stream_index: usize,
        /// Underlying reason the seek failed.
        reason: String,
    },

    /// Reading from the container failed mid-stream.
    ///
    /// Distinct from end of input, which is reported as `Ok(false)` by
    /// [`InputFile::read_next_packet`](crate::InputFile::read_next_packet).
    #[error("Failed to read packet for stream {stream_index} from {path}: {reason}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The stream whose packet was requested.
        stream_index: usize,
        /// Underlying reason the read failed.
        reason: String,
    },

    /// The requested stream index does not exist.
    #[error("Stream {index} is out of range (file has {count} streams)")]
    StreamOutOfRange {
        /// Requested stream index.
        index: usize,
        /// Number of streams in the file.
        count: usize,
    },

    /// The operation is not valid in the file's current state.
    #[error("Cannot {operation} while the file is {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// Human-readable description of the current state.
        state: String,
    },

    /// A profile referenced an option that is not declared in its schema.
    #[error("Unknown option: {key}")]
    UnknownOption {
        /// The rejected option key.
        key: String,
    },

    /// A profile option value could not be parsed for its declared kind.
    #[error("Invalid value {value:?} for option {key}: {reason}")]
    InvalidOptionValue {
        /// The option key.
        key: String,
        /// The rejected raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// [`initialize`](crate::initialize) has not been called yet.
    #[error("FFmpeg has not been initialized; call avdemux::initialize() first")]
    NotInitialized,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for DemuxError {
    fn from(error: FfmpegError) -> Self {
        DemuxError::FfmpegError(error.to_string())
    }
}
