//! Beardstore: config-driven object-detection datasets.
//!
//! Beardstore reads detection datasets stored as split folders of images and
//! whitespace-delimited label files, described either by a config file
//! (the generic "beard" layout) or by a built-in convention such as KITTI.
//! Every image becomes a [`ir::Record`] whose boxes are absolute y-x pixel
//! coordinates of the (optionally resized and padded) image, so records from
//! different sources can be augmented, merged and stored uniformly.
//!
//! # Modules
//!
//! - [`ir`]: records, field values and typed boxes
//! - [`schema`]: field schemas, dataset configs and the row codec
//! - [`geometry`]: resize/pad transforms and box normalization
//! - [`loader`] / [`writer`]: lazy dataset reading and writing
//! - [`augment`], [`negative`], [`merge`]: record-stream stages
//! - [`error`]: error types

pub mod adapter;
pub mod augment;
pub mod error;
pub mod geometry;
pub mod imaging;
pub mod ir;
pub mod loader;
pub mod merge;
pub mod negative;
pub mod schema;
pub mod writer;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::BeardError;

use crate::geometry::{PadFill, PadPlacement, ResizeMode, ResizeSpec, TargetSize};
use crate::ir::{Record, Split};
use crate::loader::{LoadOptions, Loader, RowErrorPolicy};
use crate::schema::RecordConfig;

/// The beardstore CLI application.
#[derive(Parser)]
#[command(name = "beardstore")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset and print what was found.
    Inspect(InspectArgs),
    /// Load a dataset, optionally augment it, and store it in the generic layout.
    Convert(ConvertArgs),
}

/// Options shared by every command that reads a dataset.
#[derive(clap::Args)]
struct SourceArgs {
    /// Dataset root folder.
    input: PathBuf,

    /// Read the folder as a KITTI dataset instead of using a config file.
    #[arg(long)]
    kitti: bool,

    /// Config file name or pattern inside the root (default: first *.json, *.yaml).
    #[arg(long)]
    config: Option<String>,

    /// Splits to load (train, dev, test); repeat or comma-separate.
    #[arg(long, value_delimiter = ',')]
    only: Vec<Split>,

    /// Class allowlist; other classes are relabeled to the first one.
    #[arg(long, value_delimiter = ',')]
    classes: Vec<String>,

    /// Target size, either "416" or "HEIGHTxWIDTH".
    #[arg(long)]
    size: Option<TargetSize>,

    /// Resize mode ('fit' or 'stretch').
    #[arg(long, default_value = "fit")]
    mode: ResizeMode,

    /// Pad placement ('edge' or 'center').
    #[arg(long, default_value = "edge")]
    placement: PadPlacement,

    /// Pad fill: a color name, 'r,g,b', 'mean', 'edge' or 'random'.
    #[arg(long, default_value = "black")]
    fill: PadFill,

    /// Drop rows that fail to decode instead of failing the image.
    #[arg(long)]
    skip_bad_rows: bool,
}

#[derive(clap::Args)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct ConvertArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output folder.
    #[arg(short, long)]
    output: PathBuf,

    /// Augmentation parameters as a JSON or YAML file.
    #[arg(long)]
    augment: Option<PathBuf>,

    /// Paint over every object and relabel it DONTCARE.
    #[arg(long)]
    negative: bool,

    /// Delete the output folder before writing.
    #[arg(long)]
    clean: bool,

    /// Number of the first stored file.
    #[arg(long, default_value_t = 0)]
    start_id: u64,

    /// Image extension of stored files.
    #[arg(long, default_value = "jpg")]
    image_ext: String,
}

/// Run the beardstore CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), BeardError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Convert(args)) => run_convert(args),
        None => {
            println!("beardstore {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Config-driven object-detection dataset loading and storage.");
            println!();
            println!("Run 'beardstore --help' for usage information.");
            Ok(())
        }
    }
}

fn open_source(args: &SourceArgs) -> Result<(RecordConfig, Loader), BeardError> {
    let mut options = LoadOptions {
        resize: ResizeSpec {
            target: args.size,
            mode: args.mode,
            placement: args.placement,
            fill: args.fill,
        },
        on_row_error: if args.skip_bad_rows {
            RowErrorPolicy::Skip
        } else {
            RowErrorPolicy::Fail
        },
        ..Default::default()
    };
    if !args.only.is_empty() {
        options = options.only(args.only.iter().copied());
    }

    if args.kitti {
        let classes = (!args.classes.is_empty()).then_some(args.classes.as_slice());
        adapter::kitti::load(&args.input, classes, options)
    } else {
        if !args.classes.is_empty() {
            options = options.with_classes(args.classes.iter().cloned());
        }
        loader::load(&args.input, args.config.as_deref(), options)
    }
}

fn run_inspect(args: InspectArgs) -> Result<(), BeardError> {
    let json = match args.output.as_str() {
        "text" => false,
        "json" => true,
        other => {
            return Err(BeardError::UnsupportedFormat(format!(
                "report output '{other}' (supported: text, json)"
            )));
        }
    };

    let (config, mut loader) = open_source(&args.source)?;

    let mut failed = 0usize;
    for record in loader.by_ref() {
        if record.is_err() {
            failed += 1;
        }
    }

    if json {
        let json = serde_json::to_string_pretty(loader.report()).map_err(BeardError::ReportJson)?;
        println!("{json}");
        return Ok(());
    }

    println!("Dataset: {}", args.source.input.display());
    println!(
        "  schema: {} global fields, {} object fields",
        config.global.len(),
        config.boxes.len()
    );
    print!("{}", loader.report());
    if failed > 0 {
        println!();
        println!("{failed} images failed to load");
    }
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<(), BeardError> {
    let (config, loader) = open_source(&args.source)?;

    let mut records: Box<dyn Iterator<Item = Result<Record, BeardError>>> = Box::new(loader);
    if let Some(path) = &args.augment {
        let params = augment::AugmentParams::from_path(path)?;
        records = Box::new(augment::augment(records, params)?);
    }
    if args.negative {
        records = Box::new(negative::negatives(
            records,
            negative::NegativeOptions::default(),
        ));
    }

    let options = writer::StoreOptions::default()
        .clean(args.clean)
        .start_id(args.start_id)
        .image_extension(args.image_ext);

    let mut stored = 0usize;
    let mut failed = 0usize;
    for result in writer::store(records, &config, &args.output, options)? {
        match result {
            Ok(record) => {
                stored += 1;
                tracing::debug!("stored {} as {}", record.split, record.image_path.display());
            }
            Err(err) => {
                failed += 1;
                tracing::warn!("skipping record: {err}");
            }
        }
    }

    println!("Stored {} records in {}", stored, args.output.display());
    if failed > 0 {
        println!("{failed} records failed");
    }
    Ok(())
}
