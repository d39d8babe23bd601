//! # avdemux
//!
//! Demultiplex container media files into per-stream packet queues.
//!
//! `avdemux` opens a container (MP4, Matroska, MPEG-TS, ...) through FFmpeg
//! via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, reads
//! its interleaved packets and routes each one to the queue of the stream it
//! belongs to. Only streams that are explicitly buffered keep their packets,
//! so a consumer interested in one video track never accumulates audio it
//! will not decode. Files can be analysed cheaply (first group of pictures)
//! or exactly (full scan), and seeked by frame number.
//!
//! ## Quick Start
//!
//! ### Read the Packets of One Stream
//!
//! ```no_run
//! use avdemux::InputFile;
//!
//! avdemux::initialize()?;
//! let mut file = InputFile::open("input.mp4")?;
//! file.set_stream_buffered(0, true)?;
//!
//! while file.read_next_packet(0)? {
//!     while let Some(packet) = file.pop_packet(0)? {
//!         println!("{:?} {} bytes", packet.pts(), packet.size());
//!     }
//! }
//! # Ok::<(), avdemux::DemuxError>(())
//! ```
//!
//! ### Analyse a File
//!
//! ```no_run
//! use avdemux::{AnalyseLevel, AnalyseOptions, InputFile};
//!
//! avdemux::initialize()?;
//! let properties =
//!     InputFile::analyse_file("input.mkv", &AnalyseOptions::new(), AnalyseLevel::Full)?;
//! for stream in &properties.streams {
//!     println!("#{} {} {:?}", stream.index, stream.kind, stream.frame_count);
//! }
//! # Ok::<(), avdemux::DemuxError>(())
//! ```
//!
//! ### Seek by Frame
//!
//! ```no_run
//! use avdemux::InputFile;
//!
//! avdemux::initialize()?;
//! let mut file = InputFile::open("input.mp4")?;
//! file.set_stream_buffered(0, true)?;
//! file.seek_at_frame(250)?;
//! if file.read_next_packet(0)? {
//!     let packet = file.pop_packet(0)?;
//!     println!("{:?}", packet.map(|packet| packet.pts()));
//! }
//! # Ok::<(), avdemux::DemuxError>(())
//! ```
//!
//! ## Features
//!
//! - **Selective buffering**: packets of unbuffered streams are read and dropped
//! - **Two analysis depths**: bounded first-GOP scan or exact full scan
//! - **Progress & cancellation**: callbacks and `CancellationToken` during analysis
//! - **Frame seeking**: frame numbers resolved through time base and frame rate
//! - **Typed options**: format and codec profiles validated against a schema
//! - **Pluggable containers**: any [`ContainerHandle`] can back an [`InputFile`]
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system, and
//! [`initialize`] must be called once before any file is opened.

pub mod analysis;
pub mod configuration;
pub mod container;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod ffmpeg_container;
pub mod input_file;
pub mod input_stream;
pub mod packet;
pub mod profile;
pub mod progress;
pub mod properties;
mod router;
mod seek;

pub use analysis::AnalyseLevel;
pub use configuration::{AnalyseOptions, DEFAULT_FIRST_GOP_PACKET_LIMIT};
pub use container::{ContainerError, ContainerHandle, MediaKind, StreamParameters};
pub use error::DemuxError;
pub use ffmpeg::{
    FfmpegLogLevel, get_ffmpeg_log_level, initialize, is_initialized, set_ffmpeg_log_level,
};
pub use ffmpeg_container::FfmpegContainer;
pub use input_file::{FileState, InputFile, ReadPolicy};
pub use input_stream::InputStream;
pub use packet::Packet;
pub use profile::{
    CodecProfile, FlagAction, FlagChange, FormatProfile, OptionKind, OptionSchema, OptionSpec,
    OptionValue,
};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo, ProgressStatus};
pub use properties::{FileProperties, FrameCount, StreamProperties};
