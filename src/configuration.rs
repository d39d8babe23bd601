//! Analysis configuration.
//!
//! [`AnalyseOptions`] is a builder that threads progress callbacks,
//! cancellation tokens and scan budgets through
//! [`InputFile::analyse`](crate::InputFile::analyse) without widening its
//! signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use avdemux::{AnalyseOptions, CancellationToken, ProgressCallback, ProgressInfo, ProgressStatus};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) -> ProgressStatus {
//!         println!("{} packets scanned", info.packets_scanned);
//!         ProgressStatus::Continue
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = AnalyseOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_batch_size(100);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default number of packets the first-GOP scan may read before giving up
/// on streams whose group of pictures has not closed yet.
pub const DEFAULT_FIRST_GOP_PACKET_LIMIT: u64 = 4096;

/// Configuration for [`InputFile::analyse`](crate::InputFile::analyse).
///
/// A default-constructed value reports nothing and never cancels.
#[derive(Clone)]
pub struct AnalyseOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
    pub(crate) first_gop_packet_limit: u64,
}

impl Debug for AnalyseOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalyseOptions")
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("first_gop_packet_limit", &self.first_gop_packet_limit)
            .finish()
    }
}

impl Default for AnalyseOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyseOptions {
    /// Defaults: no progress callback, no cancellation, batch size 1,
    /// first-GOP budget of [`DEFAULT_FIRST_GOP_PACKET_LIMIT`] packets.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            first_gop_packet_limit: DEFAULT_FIRST_GOP_PACKET_LIMIT,
        }
    }

    /// Attach a progress callback.
    ///
    /// Returning [`ProgressStatus::Abort`](crate::ProgressStatus::Abort)
    /// from the callback aborts the analysis.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fire the progress callback every `size` packets. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Cap the number of packets read by a
    /// [`FirstGop`](crate::AnalyseLevel::FirstGop) scan. Clamped to at least 1.
    #[must_use]
    pub fn with_first_gop_packet_limit(mut self, limit: u64) -> Self {
        self.first_gop_packet_limit = limit.max(1);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
