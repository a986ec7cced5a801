//! Boxmark: bounding-box annotation projects and dataset export.
//!
//! A boxmark project is a folder of images plus JSON documents holding the
//! boxes drawn on them and the classes they are labeled with. Exports
//! partition the annotated images into train/test/valid folders, optionally
//! adding rotated copies, each with a `createml.json` manifest.
//!
//! # Modules
//!
//! - [`ir`]: Geometry and data model (boxes, rotations, annotations, classes)
//! - [`store`]: The per-project annotation store
//! - [`classes`]: The class registry
//! - [`project`]: Project layout, settings and image folders
//! - [`split`]: Train/test/valid partitioning
//! - [`export`]: The concurrent rotation/export pipeline
//! - [`validation`]: Project validation and error reporting
//! - [`error`]: Error types for boxmark operations

pub mod classes;
pub mod error;
pub mod export;
pub mod ir;
pub mod project;
pub mod split;
pub mod store;
pub mod validation;

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub use error::BoxmarkError;

use export::{BucketState, ChannelObserver, ExportEvent, ExportOptions, Exporter, JpegCodec};
use ir::{AnnotationId, BoundingBox, Coord, Handle, ImageSize, Rgb, Screen};
use project::Project;
use split::{Bucket, SplitRatios};

/// The boxmark CLI application.
#[derive(Parser)]
#[command(name = "boxmark")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory.
    #[arg(long, global = true, env = "BOXMARK_PROJECT", default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create the project layout and default settings.
    Init,

    /// Copy a folder of images into the project.
    Import(ImportArgs),

    /// List project images with their annotation counts.
    Images(ImagesArgs),

    /// Manage annotation classes.
    #[command(subcommand)]
    Class(ClassCommand),

    /// Draw, resize, delete and list boxes.
    #[command(subcommand)]
    Annotate(AnnotateCommand),

    /// Check the project for errors and warnings.
    Validate(ValidateArgs),

    /// Export a train/test/valid dataset into 'Training data/'.
    Export(ExportArgs),
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Folder of images to copy.
    dir: PathBuf,
}

#[derive(clap::Args)]
struct ImagesArgs {
    /// Only list images of this imported folder.
    #[arg(long)]
    folder: Option<String>,
}

#[derive(Subcommand)]
enum ClassCommand {
    /// Add a class.
    Add {
        name: String,
        /// Color as R,G,B (0-1 floats or 0-255); random when omitted.
        #[arg(long)]
        color: Option<Rgb>,
    },
    /// Rename a class and relabel its annotations.
    Rename { old: String, new: String },
    /// Remove a class. Its annotations keep their label.
    Remove { name: String },
    /// Change the color of a class.
    Color { name: String, color: Rgb },
    /// List classes.
    List,
}

#[derive(Subcommand)]
enum AnnotateCommand {
    /// Draw a box by dragging from one point to another.
    Add {
        /// Image path, relative to the project root.
        image: PathBuf,
        /// Class name; defaults to the active class.
        #[arg(long)]
        label: Option<String>,
        /// Drag start as X,Y in display coordinates.
        #[arg(long, value_parser = parse_point)]
        from: (f64, f64),
        /// Drag end as X,Y in display coordinates.
        #[arg(long, value_parser = parse_point)]
        to: (f64, f64),
        /// Source pixels per display pixel.
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// Drag one corner of a box.
    Resize {
        image: PathBuf,
        id: AnnotationId,
        /// top-left, top-right, bottom-left or bottom-right.
        #[arg(long)]
        handle: Handle,
        /// New corner position as X,Y in display coordinates.
        #[arg(long, value_parser = parse_point)]
        to: (f64, f64),
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// Delete a box.
    Delete { image: PathBuf, id: AnnotationId },
    /// List boxes of one image, or of every image.
    List { image: Option<PathBuf> },
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Train percentage (requires --test and --valid).
    #[arg(long, requires_all = ["test", "valid"])]
    train: Option<f64>,
    #[arg(long, requires_all = ["train", "valid"])]
    test: Option<f64>,
    #[arg(long, requires_all = ["train", "test"])]
    valid: Option<f64>,

    /// Add 90/180/270 degree copies of every image.
    #[arg(long, conflicts_with = "no_rotate")]
    rotate: bool,
    /// Export upright images only.
    #[arg(long)]
    no_rotate: bool,

    /// Shuffle seed, for reproducible splits.
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads per bucket (0 = available parallelism).
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// JPEG quality of exported images.
    #[arg(long, default_value_t = JpegCodec::DEFAULT_QUALITY)]
    quality: u8,

    /// Show the output folder in the file browser when done.
    #[arg(long)]
    reveal: bool,
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid point '{}': expected X,Y", s))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("invalid x in '{}': {}", s, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("invalid y in '{}': {}", s, e))?;
    Ok((x, y))
}

/// Run the boxmark CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BoxmarkError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            let project = Project::init(&cli.project)?;
            println!("Initialised project at {}", project.root().display());
            Ok(())
        }
        Some(Commands::Import(args)) => run_import(&cli.project, args),
        Some(Commands::Images(args)) => run_images(&cli.project, args),
        Some(Commands::Class(cmd)) => run_class(&cli.project, cmd),
        Some(Commands::Annotate(cmd)) => run_annotate(&cli.project, cmd),
        Some(Commands::Validate(args)) => run_validate(&cli.project, args),
        Some(Commands::Export(args)) => run_export(&cli.project, args),
        None => {
            println!("boxmark {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Bounding-box annotation projects and dataset export.");
            println!();
            println!("Run 'boxmark --help' for usage information.");
            Ok(())
        }
    }
}

fn run_import(root: &Path, args: ImportArgs) -> Result<(), BoxmarkError> {
    let mut project = Project::open(root)?;
    let copied = project.import_folder(&args.dir)?;
    println!("Imported {} image(s) from {}", copied, args.dir.display());
    Ok(())
}

fn run_images(root: &Path, args: ImagesArgs) -> Result<(), BoxmarkError> {
    let project = Project::open(root)?;
    for key in project.list_images(args.folder.as_deref()) {
        println!("{:>4}  {}", project.store.count(&key), key);
    }
    Ok(())
}

fn find_class(project: &Project, name: &str) -> Result<ir::ClassId, BoxmarkError> {
    project
        .classes
        .find_by_name(name)
        .map(|c| c.id)
        .ok_or_else(|| BoxmarkError::ClassNotFound(name.to_string()))
}

fn run_class(root: &Path, cmd: ClassCommand) -> Result<(), BoxmarkError> {
    let mut project = Project::open(root)?;

    match cmd {
        ClassCommand::Add { name, color } => {
            project.classes.add(&name, color)?;
            println!("Added class '{}'", name.trim());
        }
        ClassCommand::Rename { old, new } => {
            let id = find_class(&project, &old)?;
            let Project { classes, store, .. } = &mut project;
            classes.rename(id, &new, store)?;
            println!("Renamed class '{}' to '{}'", old, new.trim());
        }
        ClassCommand::Remove { name } => {
            let id = find_class(&project, &name)?;
            project.classes.remove(id)?;
            println!("Removed class '{}'", name);
        }
        ClassCommand::Color { name, color } => {
            let id = find_class(&project, &name)?;
            project.classes.set_color(id, color)?;
        }
        ClassCommand::List => {
            let active = project.classes.active().map(|c| c.id);
            for class in project.classes.classes() {
                let marker = if Some(class.id) == active { '*' } else { ' ' };
                println!(
                    "{} {}  ({:.3}, {:.3}, {:.3})",
                    marker, class.name, class.color.red, class.color.green, class.color.blue
                );
            }
        }
    }
    Ok(())
}

/// Source-pixel size of a project image, read from its header.
fn source_size(project: &Project, key: &str) -> Result<ImageSize, BoxmarkError> {
    let path = project.root().join(key);
    let dim = imagesize::size(&path).map_err(|e| BoxmarkError::ImageRead {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(ImageSize::new(dim.width as f64, dim.height as f64))
}

fn run_annotate(root: &Path, cmd: AnnotateCommand) -> Result<(), BoxmarkError> {
    let mut project = Project::open(root)?;

    match cmd {
        AnnotateCommand::Add {
            image,
            label,
            from,
            to,
            scale,
        } => {
            let key = project.image_key(&image)?;
            let label = match label {
                Some(name) => project
                    .classes
                    .find_by_name(&name)
                    .ok_or(BoxmarkError::ClassNotFound(name))?,
                None => project
                    .classes
                    .active()
                    .ok_or_else(|| BoxmarkError::ClassNotFound("no active class".to_string()))?,
            }
            .name
            .clone();

            let drag: BoundingBox<Screen> =
                BoundingBox::from_points(Coord::new(from.0, from.1), Coord::new(to.0, to.1));
            let size = source_size(&project, &key)?;
            let id = project
                .store
                .add_annotation(&key, &label, drag.to_pixel(scale), size)?;
            println!("{}", id);
        }
        AnnotateCommand::Resize {
            image,
            id,
            handle,
            to,
            scale,
        } => {
            let key = project.image_key(&image)?;
            let size = source_size(&project, &key)?;
            let displayed = ImageSize::new(size.width / scale, size.height / scale);
            let resized = project.store.resize_annotation(
                &key,
                id,
                handle,
                Coord::new(to.0, to.1),
                scale,
                displayed,
            )?;
            if !resized {
                println!("No annotation {} on {}", id, key);
            }
        }
        AnnotateCommand::Delete { image, id } => {
            let key = project.image_key(&image)?;
            match project.store.delete_annotation(&key, id)? {
                Some(removed) => println!("Deleted '{}' annotation {}", removed.label, id),
                None => println!("No annotation {} on {}", id, key),
            }
        }
        AnnotateCommand::List { image } => {
            let only = image.map(|p| project.image_key(&p)).transpose()?;
            for record in project.store.records() {
                if only.as_ref().is_some_and(|k| *k != record.image_path) {
                    continue;
                }
                for ann in &record.annotations {
                    let b = &ann.coordinates;
                    println!(
                        "{}  {}  {}  {},{} {}x{}",
                        record.image_path, ann.id, ann.label, b.x, b.y, b.width, b.height
                    );
                }
            }
        }
    }
    Ok(())
}

/// Execute the validate subcommand.
fn run_validate(root: &Path, args: ValidateArgs) -> Result<(), BoxmarkError> {
    let project = Project::open(root)?;
    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_project(&project, &opts);

    match args.output.as_str() {
        "json" => println!("{:#}", report.to_json()),
        _ => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(BoxmarkError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

/// Execute the export subcommand.
///
/// The export runs on a worker thread; this thread owns the progress bars
/// and drains the observer channel until the export finishes.
fn run_export(root: &Path, args: ExportArgs) -> Result<(), BoxmarkError> {
    let project = Project::open(root)?;

    let mut options = ExportOptions::from_settings(&project.settings);
    if let (Some(train), Some(test), Some(valid)) = (args.train, args.test, args.valid) {
        options.ratios = SplitRatios::new(train, test, valid);
    }
    if args.rotate {
        options.allow_rotation = true;
    } else if args.no_rotate {
        options.allow_rotation = false;
    }
    options.seed = args.seed;
    options.workers = args.workers;

    let exporter = Exporter::new(JpegCodec::new(args.quality), options);
    let snapshot = project.store.snapshot();
    let (tx, rx) = mpsc::channel();

    let progress = MultiProgress::new();
    let style = ProgressStyle::with_template("{prefix:>5} [{bar:40}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bars: Vec<(Bucket, ProgressBar)> = Bucket::ALL
        .into_iter()
        .map(|bucket| {
            let bar = progress.add(ProgressBar::new(0));
            bar.set_style(style.clone());
            bar.set_prefix(bucket.dir_name());
            (bucket, bar)
        })
        .collect();
    let bar_for = |bucket: Bucket| bars.iter().find(|(b, _)| *b == bucket).map(|(_, bar)| bar);

    let result = std::thread::scope(|scope| {
        let worker = scope.spawn(|| {
            let observer = ChannelObserver::new(tx);
            exporter.run(project.root(), snapshot, &observer)
        });

        // Ends when the worker drops its observer.
        for event in rx {
            match event {
                ExportEvent::Progress {
                    bucket,
                    completed,
                    total,
                } => {
                    if let Some(bar) = bar_for(bucket) {
                        bar.set_length(total as u64);
                        bar.set_position(completed as u64);
                    }
                }
                ExportEvent::BucketState { bucket, state } => {
                    if let Some(bar) = bar_for(bucket) {
                        match state {
                            BucketState::Done => bar.finish_with_message("done"),
                            BucketState::Failed => bar.abandon_with_message("failed"),
                            BucketState::Writing => bar.set_message("writing manifest"),
                            BucketState::InProgress | BucketState::Idle => {}
                        }
                    }
                }
                ExportEvent::Finished { .. } => {}
            }
        }

        worker.join().unwrap_or_else(|_| {
            Err(BoxmarkError::Io(std::io::Error::other(
                "export worker panicked",
            )))
        })
    });
    let report = result?;

    println!("Export {}:", report.outcome);
    println!("{}", report);

    if let Some(failed) = report.failed_buckets().next() {
        return Err(BoxmarkError::BucketFailed {
            bucket: failed.bucket,
            message: failed.error.clone().unwrap_or_default(),
        });
    }

    if args.reveal {
        if let Err(e) = export::reveal_in_file_browser(&report.export_dir) {
            log::warn!("Could not open {}: {}", report.export_dir.display(), e);
        }
    }
    Ok(())
}
