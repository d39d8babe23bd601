//! The [`InputFile`] facade.
//!
//! `InputFile` owns a [`ContainerHandle`] and one [`InputStream`] per
//! container stream. It ties together packet routing, analysis and seeking
//! and enforces the file's state machine:
//!
//! - [`FileState::Open`] after construction,
//! - [`FileState::Analyzed`] once [`InputFile::analyse`] has succeeded,
//! - closed when the value is dropped or [`InputFile::close`] is called.
//!
//! All operations are blocking and take `&mut self`; one file has exactly
//! one read cursor, so callers that share a file between threads must wrap
//! it in their own lock.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use crate::{
    analysis::{AnalyseLevel, analyse_container},
    configuration::AnalyseOptions,
    container::{ContainerHandle, MediaKind},
    error::DemuxError,
    ffmpeg_container::FfmpegContainer,
    input_stream::InputStream,
    packet::Packet,
    profile::FormatProfile,
    properties::{FileProperties, FrameCount},
    router::PacketRouter,
    seek::{SeekHints, seek_at_frame},
};

/// Lifecycle state of an [`InputFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Opened; no successful analysis yet.
    Open,
    /// [`InputFile::analyse`] succeeded and properties are available.
    Analyzed,
}

impl Display for FileState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileState::Open => write!(f, "open"),
            FileState::Analyzed => write!(f, "analyzed"),
        }
    }
}

/// What [`InputFile::read_next_packet`] does when asked for a stream that is
/// not buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Buffering must be enabled explicitly. Reading an unbuffered stream
    /// returns `Ok(false)` without touching the container.
    #[default]
    BufferedOnly,
    /// Reading an unbuffered stream enables buffering for it first. The flag
    /// stays set afterwards, so the stream's queue keeps collecting packets
    /// until [`InputFile::set_stream_buffered`] turns it off again.
    AutoBuffer,
}

/// A demuxed input file.
///
/// # Example
///
/// ```no_run
/// use avdemux::{AnalyseLevel, AnalyseOptions, InputFile, MediaKind};
///
/// avdemux::initialize()?;
/// let mut file = InputFile::open("input.mkv")?;
/// let properties = file.analyse(&AnalyseOptions::new(), AnalyseLevel::FirstGop)?;
/// println!("{} streams", properties.stream_count());
///
/// let video = (0..file.stream_count())
///     .find(|&index| file.stream_type(index).ok() == Some(MediaKind::Video))
///     .unwrap_or(0);
/// file.set_stream_buffered(video, true)?;
/// while file.read_next_packet(video)? {
///     while let Some(packet) = file.pop_packet(video)? {
///         println!("pts={:?} size={}", packet.pts(), packet.size());
///     }
/// }
/// # Ok::<(), avdemux::DemuxError>(())
/// ```
pub struct InputFile<C: ContainerHandle = FfmpegContainer> {
    filename: PathBuf,
    container: C,
    streams: Vec<InputStream>,
    properties: Option<FileProperties>,
    read_policy: ReadPolicy,
    /// Packets pulled from the container by reads since open.
    packets_read: u64,
    /// Set by a failed read, cleared by a successful seek.
    errored: bool,
}

impl InputFile<FfmpegContainer> {
    /// Open a media file through FFmpeg.
    ///
    /// [`initialize`](crate::initialize) must have been called first.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::NotInitialized`] before initialization and
    /// [`DemuxError::FileOpen`] if the file is missing, unreadable or not a
    /// recognised container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DemuxError> {
        let path = path.as_ref();
        let container = FfmpegContainer::open(path)?;
        Self::from_container(path, container)
    }

    /// Open, analyse and close `path` in one call.
    ///
    /// # Errors
    ///
    /// Any error from [`open`](InputFile::open) or
    /// [`analyse`](InputFile::analyse).
    pub fn analyse_file<P: AsRef<Path>>(
        path: P,
        options: &AnalyseOptions,
        level: AnalyseLevel,
    ) -> Result<FileProperties, DemuxError> {
        let mut file = Self::open(path)?;
        let properties = file.analyse(options, level)?.clone();
        file.close();
        Ok(properties)
    }
}

impl<C: ContainerHandle> InputFile<C> {
    /// Wrap an already opened container.
    ///
    /// `filename` is only used for diagnostics and
    /// [`filename`](InputFile::filename).
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::FileOpen`] if the container does not report
    /// parameters for every stream it declares, or reports a stream index
    /// that differs from the stream's position. The container is dropped.
    pub fn from_container<P: AsRef<Path>>(filename: P, container: C) -> Result<Self, DemuxError> {
        let filename = filename.as_ref().to_path_buf();
        let streams = load_streams(&container).map_err(|reason| DemuxError::FileOpen {
            path: filename.clone(),
            reason,
        })?;

        log::info!(
            "Opened {} ({}, {} streams)",
            filename.display(),
            container.format_name(),
            streams.len()
        );

        Ok(Self {
            filename,
            container,
            streams,
            properties: None,
            read_policy: ReadPolicy::default(),
            packets_read: 0,
            errored: false,
        })
    }

    /// The path this file was opened from.
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FileState {
        if self.properties.is_some() {
            FileState::Analyzed
        } else {
            FileState::Open
        }
    }

    /// Read-only access to the underlying container.
    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn stream(&self, index: usize) -> Option<&InputStream> {
        self.streams.get(index)
    }

    pub fn stream_mut(&mut self, index: usize) -> Option<&mut InputStream> {
        self.streams.get_mut(index)
    }

    pub fn streams(&self) -> &[InputStream] {
        &self.streams
    }

    /// Media kind of stream `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::StreamOutOfRange`] for an unknown index.
    pub fn stream_type(&self, index: usize) -> Result<MediaKind, DemuxError> {
        Ok(self.checked_stream(index)?.kind())
    }

    /// Enable or disable buffering of stream `index`.
    ///
    /// Disabling buffering drops every packet already queued for the stream.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::StreamOutOfRange`] for an unknown index.
    pub fn set_stream_buffered(&mut self, index: usize, buffered: bool) -> Result<(), DemuxError> {
        self.checked_stream_mut(index)?.set_buffered(buffered);
        Ok(())
    }

    /// Whether stream `index` is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::StreamOutOfRange`] for an unknown index.
    pub fn is_stream_buffered(&self, index: usize) -> Result<bool, DemuxError> {
        Ok(self.checked_stream(index)?.is_buffered())
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    /// Choose how reads of unbuffered streams are handled.
    pub fn set_read_policy(&mut self, policy: ReadPolicy) {
        self.read_policy = policy;
    }

    /// Read from the container until stream `index` has a new packet queued.
    ///
    /// Returns `Ok(true)` when a packet for `index` was just queued; take it
    /// with [`pop_packet`](InputFile::pop_packet). Returns `Ok(false)` at the
    /// end of input, or immediately when the stream is not buffered under
    /// [`ReadPolicy::BufferedOnly`]. Packets of other buffered streams are
    /// queued on the way; packets of unbuffered streams are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::StreamOutOfRange`] for an unknown index and
    /// [`DemuxError::Read`] if the container fails. After a read failure the
    /// file refuses further reads with [`DemuxError::InvalidState`] until a
    /// seek succeeds.
    pub fn read_next_packet(&mut self, index: usize) -> Result<bool, DemuxError> {
        if self.errored {
            return Err(DemuxError::InvalidState {
                operation: "read a packet",
                state: "in an errored state after a failed read".to_string(),
            });
        }

        let policy = self.read_policy;
        let stream = self.checked_stream_mut(index)?;
        if !stream.is_buffered() {
            match policy {
                ReadPolicy::BufferedOnly => {
                    log::debug!("Stream {index} is not buffered; nothing to read");
                    return Ok(false);
                }
                ReadPolicy::AutoBuffer => {
                    log::debug!("Enabling buffering of stream {index} on read");
                    stream.set_buffered(true);
                }
            }
        }

        let mut router = PacketRouter::new(&mut self.container, &mut self.streams);
        let routed = router.route_until(index);
        self.packets_read += router.packets_read();

        routed.map_err(|error| {
            self.errored = true;
            log::debug!("Read failed on stream {index}: {error}");
            DemuxError::Read {
                path: self.filename.clone(),
                stream_index: index,
                reason: error.to_string(),
            }
        })
    }

    /// Remove and return the oldest queued packet of stream `index`.
    ///
    /// `Ok(None)` means nothing is queued right now, not end of input.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::StreamOutOfRange`] for an unknown index.
    pub fn pop_packet(&mut self, index: usize) -> Result<Option<Packet>, DemuxError> {
        Ok(self.checked_stream_mut(index)?.pop_packet())
    }

    /// Seek to `frame` of the default reference stream.
    ///
    /// The reference is the first video stream, or stream 0 when the file
    /// has no video. See [`seek_at_frame_in`](InputFile::seek_at_frame_in).
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::Seek`] if the frame cannot be resolved or the
    /// container cannot seek.
    pub fn seek_at_frame(&mut self, frame: u64) -> Result<i64, DemuxError> {
        self.seek_at_frame_in(frame, self.reference_stream())
    }

    /// Seek to `frame` of stream `stream_index`.
    ///
    /// The container lands on the nearest keyframe at or before the frame.
    /// Every stream queue is emptied whether or not the seek succeeds.
    /// Returns the resolved target timestamp in the stream's time base.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::Seek`] if the frame cannot be resolved (no time
    /// base, unknown frame duration, out of range) or the container cannot
    /// seek.
    pub fn seek_at_frame_in(&mut self, frame: u64, stream_index: usize) -> Result<i64, DemuxError> {
        let hints = self.seek_hints(stream_index);
        let timestamp = seek_at_frame(
            &mut self.container,
            &mut self.streams,
            &self.filename,
            frame,
            stream_index,
            hints,
        )?;
        self.errored = false;
        Ok(timestamp)
    }

    /// Scan the file and compute its [`FileProperties`].
    ///
    /// On success the file moves to [`FileState::Analyzed`]. Either way the
    /// container is rewound to its start and every queue is emptied, so
    /// subsequent reads begin at the first packet.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::Aborted`] if the progress callback or the
    /// cancellation token stopped the scan, and [`DemuxError::Analysis`] if
    /// the container failed mid-scan. Properties from an earlier successful
    /// analysis are kept; a failed analysis never stores partial results.
    pub fn analyse(
        &mut self,
        options: &AnalyseOptions,
        level: AnalyseLevel,
    ) -> Result<&FileProperties, DemuxError> {
        let result = analyse_container(
            &mut self.container,
            &self.streams,
            &self.filename,
            options,
            level,
        );
        self.rewind();

        let properties = result?;
        Ok(self.properties.insert(properties))
    }

    /// Properties from the last successful [`analyse`](InputFile::analyse).
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::InvalidState`] if the file was never analysed.
    pub fn properties(&self) -> Result<&FileProperties, DemuxError> {
        self.properties.as_ref().ok_or_else(|| DemuxError::InvalidState {
            operation: "get properties",
            state: self.state().to_string(),
        })
    }

    /// Apply format-level options to the container.
    ///
    /// Only valid in [`FileState::Open`] before any packet has been read.
    /// Stream parameters are refreshed afterwards; buffering flags are kept
    /// for streams that still exist.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::InvalidState`] once reading or analysis has
    /// happened and [`DemuxError::FfmpegError`] if the container rejects the
    /// options.
    pub fn set_profile(&mut self, profile: &FormatProfile) -> Result<(), DemuxError> {
        if self.properties.is_some() || self.packets_read > 0 || self.errored {
            let state = if self.properties.is_some() {
                self.state().to_string()
            } else {
                "being read".to_string()
            };
            return Err(DemuxError::InvalidState {
                operation: "set a format profile",
                state,
            });
        }

        log::debug!(
            "Applying format profile to {} ({} options)",
            self.filename.display(),
            profile.iter().count()
        );
        self.container.configure(profile).map_err(|error| {
            DemuxError::FfmpegError(format!("{}: {error}", self.filename.display()))
        })?;

        let mut streams = load_streams(&self.container).map_err(|reason| {
            DemuxError::FfmpegError(format!(
                "{}: {reason} after reconfiguration",
                self.filename.display()
            ))
        })?;
        for (stream, previous) in streams.iter_mut().zip(&self.streams) {
            stream.set_buffered(previous.is_buffered());
        }
        self.streams = streams;
        Ok(())
    }

    /// Close the file, releasing the container.
    pub fn close(self) {
        log::debug!("Closing {}", self.filename.display());
    }

    fn checked_stream(&self, index: usize) -> Result<&InputStream, DemuxError> {
        let count = self.streams.len();
        self.streams
            .get(index)
            .ok_or(DemuxError::StreamOutOfRange { index, count })
    }

    fn checked_stream_mut(&mut self, index: usize) -> Result<&mut InputStream, DemuxError> {
        let count = self.streams.len();
        self.streams
            .get_mut(index)
            .ok_or(DemuxError::StreamOutOfRange { index, count })
    }

    fn reference_stream(&self) -> usize {
        self.streams
            .iter()
            .position(|stream| stream.kind() == MediaKind::Video)
            .unwrap_or(0)
    }

    fn seek_hints(&self, stream_index: usize) -> SeekHints {
        let Some(stream) = self
            .properties
            .as_ref()
            .and_then(|properties| properties.stream(stream_index))
        else {
            return SeekHints::default();
        };
        SeekHints {
            frame_count: match stream.frame_count {
                Some(FrameCount::Exact(count)) => Some(count),
                _ => None,
            },
            frame_duration: stream.average_packet_duration,
        }
    }

    /// Return the container to its first packet and drop queued packets.
    fn rewind(&mut self) {
        let reference = self.reference_stream();
        let start = self
            .streams
            .get(reference)
            .and_then(|stream| stream.parameters().start_time)
            .unwrap_or(0);

        if !self.streams.is_empty() {
            match self.container.seek(start, reference) {
                Ok(()) => self.errored = false,
                Err(error) => log::warn!(
                    "Failed to rewind {} after analysis: {error}",
                    self.filename.display()
                ),
            }
        }
        for stream in &mut self.streams {
            stream.clear();
        }
    }
}

/// One [`InputStream`] per container stream, in index order.
fn load_streams<C: ContainerHandle>(container: &C) -> Result<Vec<InputStream>, String> {
    (0..container.stream_count())
        .map(|position| {
            let parameters = container
                .stream_parameters(position)
                .ok_or_else(|| format!("no parameters for stream {position}"))?;
            if parameters.index != position {
                return Err(format!(
                    "stream at position {position} reports index {}",
                    parameters.index
                ));
            }
            Ok(InputStream::new(parameters))
        })
        .collect()
}

impl<C: ContainerHandle> std::fmt::Debug for InputFile<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InputFile")
            .field("filename", &self.filename)
            .field("state", &self.state())
            .field("streams", &self.streams)
            .field("read_policy", &self.read_policy)
            .finish_non_exhaustive()
    }
}
