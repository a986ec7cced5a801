//! Summary of a finished export.

use std::fmt;
use std::path::PathBuf;

use crate::ir::Rotation;
use crate::split::{Bucket, SplitCounts};

/// How an export run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Every work item was attempted.
    Done,
    /// The run was cancelled; remaining items were skipped.
    Cancelled,
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::Done => f.write_str("done"),
            ExportOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What happened to one bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct BucketReport {
    pub bucket: Bucket,
    /// Source images assigned to the bucket.
    pub images: usize,
    /// Source images times rotations.
    pub work_items: usize,
    /// Images encoded and written to the bucket folder.
    pub written: usize,
    /// Items dropped because of a read, decode or encode failure, or
    /// cancellation.
    pub skipped: usize,
    /// Items among `skipped` that never started because the export was
    /// cancelled.
    pub cancelled: usize,
    /// Path of the manifest, when one was written.
    pub manifest: Option<PathBuf>,
    /// Set when the bucket as a whole failed.
    pub error: Option<String>,
}

impl BucketReport {
    pub fn new(bucket: Bucket, images: usize, work_items: usize) -> Self {
        Self {
            bucket,
            images,
            work_items,
            written: 0,
            skipped: 0,
            cancelled: 0,
            manifest: None,
            error: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of [`Exporter::run`](super::Exporter::run).
#[derive(Clone, Debug, PartialEq)]
pub struct ExportReport {
    pub export_dir: PathBuf,
    pub outcome: ExportOutcome,
    /// Source images per bucket.
    pub split: SplitCounts,
    /// Rotations applied to every image.
    pub rotations: Vec<Rotation>,
    /// One entry per bucket, in train/test/valid order.
    pub buckets: Vec<BucketReport>,
}

impl ExportReport {
    /// Report for one bucket.
    pub fn bucket(&self, bucket: Bucket) -> Option<&BucketReport> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }

    pub fn written(&self) -> usize {
        self.buckets.iter().map(|b| b.written).sum()
    }

    pub fn skipped(&self) -> usize {
        self.buckets.iter().map(|b| b.skipped).sum()
    }

    pub fn failed_buckets(&self) -> impl Iterator<Item = &BucketReport> {
        self.buckets.iter().filter(|b| b.is_failed())
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rotations: Vec<String> = self.rotations.iter().map(|r| r.to_string()).collect();
        writeln!(
            f,
            "  {} images split {}/{}/{} (train/test/valid), rotations: {}",
            self.split.total(),
            self.split.train,
            self.split.test,
            self.split.valid,
            rotations.join(", ")
        )?;

        for b in &self.buckets {
            match &b.error {
                Some(message) => writeln!(f, "  {}: failed: {}", b.bucket, message)?,
                None => writeln!(
                    f,
                    "  {}: {} written, {} skipped",
                    b.bucket, b.written, b.skipped
                )?,
            }
        }

        if self.outcome == ExportOutcome::Cancelled {
            writeln!(f)?;
            writeln!(f, "Export was cancelled; remaining images were skipped.")?;
        }
        write!(f, "Output: {}", self.export_dir.display())
    }
}
