//! Progress and state notifications from a running export.
//!
//! Workers call the observer from their own threads. To keep all
//! user-visible state on one thread, hand events to that thread with a
//! [`ChannelObserver`] and drain the receiver there.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use super::report::{ExportOutcome, ExportReport};
use crate::split::Bucket;

/// Lifecycle of one bucket within an export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketState {
    /// Announced for every bucket before any bucket starts.
    Idle,
    InProgress,
    /// All work items attempted; the manifest is being written.
    Writing,
    Done,
    /// The bucket folder could not be prepared or the manifest not written.
    Failed,
}

/// Receives export notifications. Calls may come from any worker thread.
pub trait ExportObserver: Sync {
    /// `completed` of `total` work items of `bucket` have been attempted.
    ///
    /// Per bucket, `completed` increases by one per call. An empty bucket
    /// reports `(0, 0)` once. Calls for one bucket are made while that
    /// bucket's result lock is held, so the other workers of the bucket
    /// wait until this returns; keep it short or hand off to a
    /// [`ChannelObserver`].
    fn on_progress(&self, _bucket: Bucket, _completed: usize, _total: usize) {}

    fn on_bucket_state(&self, _bucket: Bucket, _state: BucketState) {}

    /// Every bucket has finished, including its manifest write. The export
    /// directory is complete from this point on.
    fn on_finished(&self, _report: &ExportReport) {}
}

/// Ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ExportObserver for NoopObserver {}

/// Fraction of work done, `1.0` for an empty bucket.
pub fn progress_fraction(completed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        completed as f64 / total as f64
    }
}

/// An export notification as a value.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportEvent {
    Progress {
        bucket: Bucket,
        completed: usize,
        total: usize,
    },
    BucketState {
        bucket: Bucket,
        state: BucketState,
    },
    Finished {
        outcome: ExportOutcome,
        export_dir: PathBuf,
    },
}

impl ExportEvent {
    /// Progress as a fraction, for progress events.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ExportEvent::Progress {
                completed, total, ..
            } => Some(progress_fraction(*completed, *total)),
            _ => None,
        }
    }
}

/// Forwards notifications over a channel.
///
/// Send failures (receiver dropped) are ignored; the export carries on.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<ExportEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<ExportEvent>) -> Self {
        Self { tx }
    }
}

impl ExportObserver for ChannelObserver {
    fn on_progress(&self, bucket: Bucket, completed: usize, total: usize) {
        let _ = self.tx.send(ExportEvent::Progress {
            bucket,
            completed,
            total,
        });
    }

    fn on_bucket_state(&self, bucket: Bucket, state: BucketState) {
        let _ = self.tx.send(ExportEvent::BucketState { bucket, state });
    }

    fn on_finished(&self, report: &ExportReport) {
        let _ = self.tx.send(ExportEvent::Finished {
            outcome: report.outcome,
            export_dir: report.export_dir.clone(),
        });
    }
}

/// Opens `dir` in the host file browser.
///
/// Call only after [`ExportObserver::on_finished`].
pub fn reveal_in_file_browser(dir: &Path) -> std::io::Result<()> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    std::process::Command::new(program).arg(dir).spawn().map(|_| ())
}
