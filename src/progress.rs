//! Progress reporting and cancellation support for analysis.
//!
//! [`ProgressCallback`] receives [`ProgressInfo`] snapshots while a file is
//! being scanned and decides whether the scan continues. A
//! [`CancellationToken`] offers the same abort signal from another thread.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use avdemux::{
//!     AnalyseLevel, AnalyseOptions, InputFile, ProgressCallback, ProgressInfo,
//!     ProgressStatus,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) -> ProgressStatus {
//!         println!("{:.1}% scanned", info.fraction * 100.0);
//!         ProgressStatus::Continue
//!     }
//! }
//!
//! avdemux::initialize()?;
//! let mut file = InputFile::open("input.mp4")?;
//! let options = AnalyseOptions::new().with_progress(Arc::new(PrintProgress));
//! file.analyse(&options, AnalyseLevel::Full)?;
//! # Ok::<(), avdemux::DemuxError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::analysis::AnalyseLevel;

/// What a [`ProgressCallback`] wants the scan to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressStatus {
    /// Keep scanning.
    #[default]
    Continue,
    /// Stop the scan; [`analyse`](crate::InputFile::analyse) fails with
    /// [`DemuxError::Aborted`](crate::DemuxError::Aborted).
    Abort,
}

/// A snapshot of analysis progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Depth of the running analysis.
    pub level: AnalyseLevel,
    /// Packets read from the container so far.
    pub packets_scanned: u64,
    /// Completion fraction in `[0.0, 1.0]`, never decreasing during a scan.
    pub fraction: f64,
    /// Wall-clock time elapsed since the scan started.
    pub elapsed: Duration,
    /// Presentation time of the most recent packet, when known.
    pub current_timestamp: Option<Duration>,
}

/// Receives progress updates during analysis.
///
/// Implementations must be [`Send`] and [`Sync`] so a single callback can be
/// shared between files analysed on different threads.
pub trait ProgressCallback: Send + Sync {
    /// Called at a cadence controlled by
    /// [`AnalyseOptions::with_batch_size`](crate::AnalyseOptions::with_batch_size).
    fn on_progress(&self, info: &ProgressInfo) -> ProgressStatus;
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) -> ProgressStatus {
        ProgressStatus::Continue
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to abort the
/// analysis it was attached to. The scan loop checks it before each packet.
///
/// # Example
///
/// ```
/// use avdemux::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones of this token observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks scan progress, keeps the fraction monotonic and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    level: AnalyseLevel,
    batch_size: u64,
    start_time: Instant,
    packets_scanned: u64,
    items_since_last_report: u64,
    fraction: f64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        level: AnalyseLevel,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            level,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            packets_scanned: 0,
            items_since_last_report: 0,
            fraction: 0.0,
        }
    }

    /// Record one scanned packet and report if the batch threshold is reached.
    ///
    /// `fraction` is the scanner's estimate; it is clamped to `[0, 1]` and
    /// never allowed to move backwards.
    pub(crate) fn advance(&mut self, fraction: f64, timestamp: Option<Duration>) -> ProgressStatus {
        self.packets_scanned += 1;
        self.items_since_last_report += 1;
        if fraction.is_finite() {
            self.fraction = self.fraction.max(fraction.clamp(0.0, 1.0));
        }

        if self.items_since_last_report >= self.batch_size {
            self.items_since_last_report = 0;
            return self.report(timestamp);
        }
        ProgressStatus::Continue
    }

    /// Emit the final report at 100%.
    pub(crate) fn finish(&mut self) -> ProgressStatus {
        self.fraction = 1.0;
        self.report(None)
    }

    fn report(&self, timestamp: Option<Duration>) -> ProgressStatus {
        let info = ProgressInfo {
            level: self.level,
            packets_scanned: self.packets_scanned,
            fraction: self.fraction,
            elapsed: self.start_time.elapsed(),
            current_timestamp: timestamp,
        };
        self.callback.on_progress(&info)
    }
}
