//! Dataset export: partition, rotate, re-encode and write manifests.
//!
//! An export takes a snapshot of the annotated images, partitions it into
//! train/test/valid and writes each bucket to `Training data/<bucket>/`
//! inside the project. Every image is written once per rotation in the
//! rotation set, under a fresh UUID file name, and the bucket's
//! `createml.json` lists the exported files with center-form boxes.
//!
//! The three buckets run concurrently on scoped threads. Inside a bucket,
//! work items (one per image and rotation) run on a dedicated rayon pool.
//! A failing work item is logged and skipped; a bucket whose folder cannot
//! be prepared or whose manifest cannot be written fails on its own.
//!
//! # Example
//!
//! ```no_run
//! use boxmark::export::{ExportOptions, Exporter, JpegCodec, NoopObserver};
//! use boxmark::project::Project;
//! use std::path::Path;
//!
//! let project = Project::open(Path::new("my-project"))?;
//! let exporter = Exporter::new(JpegCodec::default(), ExportOptions::from_settings(&project.settings));
//! let report = exporter.run_project(&project, &NoopObserver)?;
//! println!("{}", report);
//! # Ok::<(), boxmark::BoxmarkError>(())
//! ```

mod codec;
mod manifest;
mod observer;
mod report;

pub use codec::{ImageCodec, JpegCodec};
pub use manifest::{read_manifest, write_manifest, CenterBox, ManifestEntry, ManifestRegion, MANIFEST_FILE};
pub use observer::{
    progress_fraction, reveal_in_file_browser, BucketState, ChannelObserver, ExportEvent,
    ExportObserver, NoopObserver,
};
pub use report::{BucketReport, ExportOutcome, ExportReport};

use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::error::BoxmarkError;
use crate::ir::{ImageAnnotations, ImageSize, Rotation};
use crate::project::{Project, ProjectSettings, EXPORT_DIR};
use crate::store::resolve_image_path;
use crate::split::{partition, Bucket, SplitOptions, SplitRatios};

/// Options for one export run.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    pub ratios: SplitRatios,
    /// Adds 90, 180 and 270 degree copies of every image.
    pub allow_rotation: bool,
    /// Fixed shuffle seed; `None` shuffles from OS entropy.
    pub seed: Option<u64>,
    /// Worker threads per bucket; 0 uses the available parallelism.
    pub workers: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ratios: SplitRatios::default(),
            allow_rotation: false,
            seed: None,
            workers: 0,
        }
    }
}

impl ExportOptions {
    /// Options taken from the persisted project settings.
    pub fn from_settings(settings: &ProjectSettings) -> Self {
        Self {
            ratios: settings.export_proportions,
            allow_rotation: settings.allow_image_rotation,
            ..Self::default()
        }
    }

    fn rotations(&self) -> &'static [Rotation] {
        Rotation::export_set(self.allow_rotation)
    }

    fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Cooperative cancellation flag shared between an export and its caller.
///
/// Work items already running finish; items not yet started are skipped.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Clears the running flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct BucketAccumulator {
    entries: Vec<ManifestEntry>,
    completed: usize,
    written: usize,
    skipped: usize,
    cancelled: usize,
}

/// How one work item ended.
enum ItemResult {
    Written(ManifestEntry),
    Failed,
    Cancelled,
}

/// Runs exports with one codec and one set of options.
///
/// An exporter runs at most one export at a time.
pub struct Exporter<C: ImageCodec = JpegCodec> {
    codec: C,
    options: ExportOptions,
    running: AtomicBool,
    cancel: CancelToken,
}

impl<C: ImageCodec> Exporter<C> {
    pub fn new(codec: C, options: ExportOptions) -> Self {
        Self {
            codec,
            options,
            running: AtomicBool::new(false),
            cancel: CancelToken::new(),
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Token that cancels the current run. It is reset when a run starts.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Exports a snapshot of the project's annotation store.
    pub fn run_project(
        &self,
        project: &Project,
        observer: &dyn ExportObserver,
    ) -> Result<ExportReport, BoxmarkError> {
        self.run(project.root(), project.store.snapshot(), observer)
    }

    /// Exports `snapshot` into `<project_root>/Training data/`.
    ///
    /// Records without annotations are left out. Returns once every bucket,
    /// manifest included, has finished; `observer.on_finished` is called
    /// right before returning. Fails with [`BoxmarkError::ExportInProgress`]
    /// if this exporter is already running.
    pub fn run(
        &self,
        project_root: &Path,
        snapshot: Vec<ImageAnnotations>,
        observer: &dyn ExportObserver,
    ) -> Result<ExportReport, BoxmarkError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BoxmarkError::ExportInProgress);
        }
        let _guard = RunGuard(&self.running);
        self.cancel.reset();

        let records: Vec<ImageAnnotations> = snapshot
            .into_iter()
            .filter(|r| !r.annotations.is_empty())
            .collect();
        let split = partition(
            records,
            &SplitOptions {
                ratios: self.options.ratios,
                seed: self.options.seed,
            },
        )?;
        let counts = split.counts();
        let rotations = self.options.rotations();

        let export_dir = project_root.join(EXPORT_DIR);
        fs::create_dir_all(&export_dir)?;
        info!(
            "Exporting {} image(s) ({}/{}/{}) with {} rotation(s) to {}",
            counts.total(),
            counts.train,
            counts.test,
            counts.valid,
            rotations.len(),
            export_dir.display()
        );

        for bucket in Bucket::ALL {
            observer.on_bucket_state(bucket, BucketState::Idle);
        }

        let buckets: Vec<BucketReport> = std::thread::scope(|scope| {
            let handles: Vec<_> = split
                .into_buckets()
                .into_iter()
                .map(|(bucket, records)| {
                    let dest = export_dir.join(bucket.dir_name());
                    let images = records.len();
                    let handle = scope.spawn(move || {
                        self.export_bucket(bucket, &records, rotations, project_root, &dest, observer)
                    });
                    (bucket, images, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(bucket, images, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("Export of bucket '{}' panicked", bucket);
                        observer.on_bucket_state(bucket, BucketState::Failed);
                        let mut report =
                            BucketReport::new(bucket, images, images * rotations.len());
                        report.error = Some("bucket worker panicked".to_string());
                        report
                    })
                })
                .collect()
        });

        // Cancelling after the last item started changes nothing.
        let outcome = if buckets.iter().any(|b| b.cancelled > 0) {
            ExportOutcome::Cancelled
        } else {
            ExportOutcome::Done
        };
        let report = ExportReport {
            export_dir,
            outcome,
            split: counts,
            rotations: rotations.to_vec(),
            buckets,
        };
        info!(
            "Export {}: {} written, {} skipped",
            report.outcome,
            report.written(),
            report.skipped()
        );
        observer.on_finished(&report);
        Ok(report)
    }

    fn export_bucket(
        &self,
        bucket: Bucket,
        records: &[ImageAnnotations],
        rotations: &[Rotation],
        project_root: &Path,
        dest: &Path,
        observer: &dyn ExportObserver,
    ) -> BucketReport {
        let work: Vec<(&ImageAnnotations, Rotation)> = records
            .iter()
            .flat_map(|r| rotations.iter().map(move |rot| (r, *rot)))
            .collect();
        let total = work.len();
        let mut report = BucketReport::new(bucket, records.len(), total);
        observer.on_bucket_state(bucket, BucketState::InProgress);

        let fail = |mut report: BucketReport, err: BoxmarkError| {
            let err = BoxmarkError::BucketFailed {
                bucket,
                message: err.to_string(),
            };
            warn!("{}", err);
            report.error = Some(err.to_string());
            observer.on_bucket_state(bucket, BucketState::Failed);
            report
        };

        if let Err(e) = reset_dir(dest) {
            return fail(report, e);
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.worker_count())
            .thread_name(move |i| format!("export-{}-{}", bucket, i))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                let err = BoxmarkError::Io(std::io::Error::other(e.to_string()));
                return fail(report, err);
            }
        };

        if total == 0 {
            observer.on_progress(bucket, 0, 0);
        }

        let acc = Mutex::new(BucketAccumulator::default());
        pool.install(|| {
            work.par_iter().for_each(|(record, rotation)| {
                let result = if self.cancel.is_cancelled() {
                    ItemResult::Cancelled
                } else {
                    self.guarded_item(project_root, dest, record, *rotation)
                };

                let mut acc = acc.lock().unwrap_or_else(PoisonError::into_inner);
                acc.completed += 1;
                match result {
                    ItemResult::Written(entry) => {
                        acc.written += 1;
                        acc.entries.push(entry);
                    }
                    ItemResult::Failed => acc.skipped += 1,
                    ItemResult::Cancelled => {
                        acc.skipped += 1;
                        acc.cancelled += 1;
                    }
                }
                // Published under the lock so `completed` reaches the
                // observer in order.
                observer.on_progress(bucket, acc.completed, total);
            });
        });

        let acc = acc.into_inner().unwrap_or_else(PoisonError::into_inner);
        report.written = acc.written;
        report.skipped = acc.skipped;
        report.cancelled = acc.cancelled;

        observer.on_bucket_state(bucket, BucketState::Writing);
        match write_manifest(dest, &acc.entries) {
            Ok(path) => {
                info!(
                    "Bucket '{}': {} written, {} skipped",
                    bucket, report.written, report.skipped
                );
                report.manifest = Some(path);
                observer.on_bucket_state(bucket, BucketState::Done);
                report
            }
            Err(e) => fail(report, e),
        }
    }

    /// Runs one work item, turning errors and panics into a logged skip.
    fn guarded_item(
        &self,
        project_root: &Path,
        dest: &Path,
        record: &ImageAnnotations,
        rotation: Rotation,
    ) -> ItemResult {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.process_item(project_root, dest, record, rotation)
        }));
        match result {
            Ok(Ok(entry)) => {
                debug!("Exported {} ({}) as {}", record.image_path, rotation, entry.image);
                ItemResult::Written(entry)
            }
            Ok(Err(e)) => {
                warn!("Skipping {} ({}): {}", record.image_path, rotation, e);
                ItemResult::Failed
            }
            Err(_) => {
                warn!("Skipping {} ({}): worker panicked", record.image_path, rotation);
                ItemResult::Failed
            }
        }
    }

    fn process_item(
        &self,
        project_root: &Path,
        dest: &Path,
        record: &ImageAnnotations,
        rotation: Rotation,
    ) -> Result<ManifestEntry, BoxmarkError> {
        let source = resolve_image_path(project_root, &record.image_path)?;
        let bytes = fs::read(&source).map_err(|e| BoxmarkError::ImageRead {
            path: source.clone(),
            message: e.to_string(),
        })?;
        let image = self
            .codec
            .decode(&bytes)
            .map_err(|e| BoxmarkError::ImageDecode {
                path: source.clone(),
                source: e,
            })?;

        // Boxes are rotated against the size before rotation.
        let size = ImageSize::from((image.width(), image.height()));
        let rotated = self.codec.rotate(&image, rotation);
        let encoded = self
            .codec
            .encode(&rotated)
            .map_err(BoxmarkError::ImageEncode)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), self.codec.extension());
        write_or_discard(&dest.join(&file_name), |file| file.write_all(&encoded))?;

        let annotations = record
            .annotations
            .iter()
            .map(|a| ManifestRegion::new(a.label.clone(), &a.coordinates.rotated(rotation, size)))
            .collect();
        Ok(ManifestEntry {
            image: file_name,
            annotations,
        })
    }
}

/// Creates `path` and fills it with `write`, removing the file again if
/// writing fails part way.
fn write_or_discard(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    let result = write(&mut file).and_then(|()| file.sync_all());
    if let Err(e) = result {
        drop(file);
        if let Err(rm) = fs::remove_file(path) {
            warn!("Could not remove partial file {}: {}", path.display(), rm);
        }
        return Err(e);
    }
    Ok(())
}

/// Empties `dir`, creating it if needed.
fn reset_dir(dir: &Path) -> Result<(), BoxmarkError> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_settings() {
        let mut settings = ProjectSettings::default();
        settings.allow_image_rotation = true;
        settings.export_proportions = SplitRatios::new(70.0, 15.0, 15.0);

        let opts = ExportOptions::from_settings(&settings);
        assert_eq!(opts.ratios, SplitRatios::new(70.0, 15.0, 15.0));
        assert_eq!(opts.rotations().len(), 4);
        assert!(opts.worker_count() >= 1);
    }

    #[test]
    fn rotation_disabled_exports_upright_only() {
        let opts = ExportOptions::default();
        assert_eq!(opts.rotations(), &[Rotation::Deg0]);
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!other.is_cancelled());
    }

    #[test]
    fn failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("out.jpg");

        let result = write_or_discard(&path, |file| {
            file.write_all(b"\xff\xd8 half an image")?;
            Err(std::io::Error::other("disk full"))
        });
        assert!(result.is_err());
        assert!(!path.exists());

        write_or_discard(&path, |file| file.write_all(b"whole")).expect("write");
        assert_eq!(fs::read(&path).expect("read back"), b"whole");
    }

    #[test]
    fn reset_dir_clears_previous_contents() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let bucket = dir.path().join("train");
        fs::create_dir_all(&bucket).expect("mkdir");
        fs::write(bucket.join("stale.jpg"), b"old").expect("write");

        reset_dir(&bucket).expect("reset");
        assert!(bucket.is_dir());
        assert_eq!(fs::read_dir(&bucket).expect("read dir").count(), 0);
    }

    #[test]
    fn invalid_ratios_are_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let exporter = Exporter::new(
            JpegCodec::default(),
            ExportOptions {
                ratios: SplitRatios::new(50.0, 10.0, 10.0),
                ..ExportOptions::default()
            },
        );
        let result = exporter.run(dir.path(), Vec::new(), &NoopObserver);
        assert!(matches!(result, Err(BoxmarkError::InvalidSplitRatios { .. })));
        assert!(!dir.path().join(EXPORT_DIR).exists());
        assert!(!exporter.is_running());
    }
}
