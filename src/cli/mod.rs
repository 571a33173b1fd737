//! Command-line interface for the detection pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::classifier;
use crate::core::loaders::load_frame;
use crate::core::writers::write_detections_csv;
use crate::pipeline::Detector;
use crate::processors::clustering::EuclideanClusterer;
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "pedestrian-pipeline")]
#[command(about = "3D LiDAR pedestrian detection pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect pedestrians in a single point cloud frame (PLY or CSV)
    Detect {
        /// Input frame file
        frame_file: PathBuf,
        /// Output CSV file (defaults to the frame name with `_detections.csv`)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Probability threshold for accepting a cluster as human
        #[arg(long)]
        human_probability: Option<f64>,
        /// Reject clusters whose bounding box falls outside human proportions
        #[arg(long)]
        human_size_limit: bool,
        /// Path to the libsvm-style feature range file
        #[arg(long)]
        range_file: Option<PathBuf>,
    },

    /// Process a directory of recorded frames, one after another
    Batch {
        /// Directory containing frame files (PLY or CSV)
        input_dir: PathBuf,
        /// Output directory for per-frame detection CSVs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Limit number of frames to process
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Detect {
            frame_file,
            output,
            human_probability,
            human_size_limit,
            range_file,
        } => {
            cmd_detect(
                &frame_file,
                output,
                human_probability,
                human_size_limit,
                range_file,
                &config,
            );
        }
        Commands::Batch {
            input_dir,
            output_dir,
            limit,
        } => {
            cmd_batch(&input_dir, output_dir, limit, &config);
        }
    }
}

fn build_detector(config: &PipelineConfig, range_override: Option<PathBuf>) -> Detector {
    let range_file = range_override.or_else(|| config.model.range_file.clone());

    // Parsing a trained model file is the job of an external classifier
    // implementation; without one the pipeline runs model-free.
    let model = classifier::load_model(None, range_file.as_deref());

    Detector::new(config.detector.clone(), Box::new(EuclideanClusterer), model)
}

fn default_output_path(frame_file: &Path) -> PathBuf {
    let stem = frame_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    frame_file.with_file_name(format!("{}_detections.csv", stem))
}

fn cmd_detect(
    frame_file: &Path,
    output: Option<PathBuf>,
    human_probability: Option<f64>,
    human_size_limit: bool,
    range_file: Option<PathBuf>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    let mut config = config.clone();
    if let Some(p) = human_probability {
        config.detector.human_probability = p;
    }
    if human_size_limit {
        config.detector.human_size_limit = true;
    }

    let spinner = create_spinner("Loading frame...");

    let frame = match load_frame(frame_file) {
        Ok(frame) => frame,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load frame: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Detecting pedestrians...");

    let detector = build_detector(&config, range_file);
    let detections = detector.process_frame(&frame);

    spinner.finish_and_clear();

    let output_path = output.unwrap_or_else(|| default_output_path(frame_file));
    if let Err(e) = write_detections_csv(&output_path, &detections) {
        error!("Failed to write detections: {}", e);
        std::process::exit(1);
    }

    print_summary(
        "Detection Complete",
        &[
            ("Input file", frame_file.display().to_string()),
            ("Output CSV", output_path.display().to_string()),
            ("Points in frame", frame.len().to_string()),
            ("Detections", detections.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn find_frame_files(input_dir: &Path) -> Vec<PathBuf> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("ply") || ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();

    frames.sort();
    frames
}

fn cmd_batch(
    input_dir: &Path,
    output_dir: Option<PathBuf>,
    limit: Option<usize>,
    config: &PipelineConfig,
) {
    let start = Instant::now();

    let mut frames = find_frame_files(input_dir);
    if let Some(lim) = limit {
        frames.truncate(lim);
    }

    if frames.is_empty() {
        error!("No frame files found in {}", input_dir.display());
        std::process::exit(1);
    }

    let out_dir = output_dir.unwrap_or_else(|| input_dir.to_path_buf());
    let detector = build_detector(config, None);

    let progress = ProgressBar::new(frames.len() as u64);
    let mut total_detections = 0usize;
    let mut failed = 0usize;

    // Frames are strictly sequential: the next frame does not start before
    // the previous one is fully assembled.
    for frame_file in &frames {
        let output_path = out_dir.join(
            default_output_path(frame_file)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("frame_detections.csv")),
        );

        match crate::pipeline::process_frame_file(&detector, frame_file, &output_path) {
            Ok(detections) => total_detections += detections.len(),
            Err(e) => {
                warn!("{}: failed to process frame: {}", frame_file.display(), e);
                failed += 1;
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();

    print_summary(
        "Batch Detection Complete",
        &[
            ("Input directory", input_dir.display().to_string()),
            ("Output directory", out_dir.display().to_string()),
            ("Frames processed", frames.len().to_string()),
            ("Frames failed", failed.to_string()),
            ("Total detections", total_detections.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}
