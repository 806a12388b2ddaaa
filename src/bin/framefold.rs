use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framefold::{
    BatchSampler, FfmpegLogLevel, FolderOptions, PixelFormat, ProgressCallback, ProgressInfo,
    VideoFolder,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framefold index data/train --json\n  framefold locate data/train 1234\n  framefold sample --frames 12 --batch-size 5\n  framefold extract data/train 0 100 200 --out frames\n  framefold walk data/train --batch-size 8 --steps 32 --progress\n  framefold completions zsh > _framefold";

#[derive(Debug, Parser)]
#[command(
    name = "framefold",
    version,
    about = "Index folders of labelled videos and walk them as frame batches",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Decoded frame pixel format (rgb8, rgba8, gray8).
    #[arg(long, global = true)]
    pixel_format: Option<String>,

    /// Scale decoded frames to this width.
    #[arg(long, global = true)]
    width: Option<u32>,

    /// Scale decoded frames to this height.
    #[arg(long, global = true)]
    height: Option<u32>,

    /// Recognised video extension; repeat for several (default: mp4).
    #[arg(long = "ext", global = true)]
    extensions: Vec<String>,

    /// Estimate frame counts from duration and frame rate when the container has none.
    #[arg(long, global = true)]
    estimate_frame_counts: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the classes, videos and frame ranges of a dataset.
    #[command(
        about = "Index a dataset directory",
        after_help = "Examples:\n  framefold index data/train\n  framefold index data/train --json --ext mkv --ext mp4"
    )]
    Index {
        /// Dataset root with one subdirectory per class.
        root: PathBuf,

        /// Output the index as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show which video and offset a flat index resolves to.
    #[command(about = "Locate a flat frame index")]
    Locate {
        root: PathBuf,
        /// Flat index; wraps modulo the total frame count.
        flat: u64,
    },

    /// Print the order in which the batch sampler visits indices.
    #[command(
        about = "Show batch sampler rows",
        after_help = "Examples:\n  framefold sample --frames 12 --batch-size 5\n  framefold sample --frames 100000 --batch-size 8 --rows 4"
    )]
    Sample {
        /// Total number of frames.
        #[arg(long)]
        frames: u64,
        /// Number of parallel streams.
        #[arg(long)]
        batch_size: usize,
        /// Only print the first N rows.
        #[arg(long)]
        rows: Option<u64>,
    },

    /// Decode frames at flat indices and save them as images.
    #[command(
        about = "Extract frames by flat index",
        after_help = "Examples:\n  framefold extract data/train 0 1 2 --out frames\n  framefold extract data/train 500 --out frames --image-ext jpg --width 224"
    )]
    Extract {
        root: PathBuf,
        /// Flat indices to extract.
        #[arg(required = true)]
        flat: Vec<u64>,
        /// Output directory for extracted frame images.
        #[arg(long)]
        out: PathBuf,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long = "image-ext", default_value = "png")]
        image_ext: String,
    },

    /// Walk one epoch of batches and report their shapes.
    #[command(
        about = "Iterate one epoch of batches",
        after_help = "Examples:\n  framefold walk data/train --batch-size 8 --steps 32\n  framefold walk data/train --batch-size 4 --steps 16 --progress --verbose"
    )]
    Walk {
        root: PathBuf,
        /// Number of parallel streams.
        #[arg(long)]
        batch_size: usize,
        /// Rows per batch.
        #[arg(long, default_value_t = 16)]
        steps: usize,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Drives an indicatif bar from progress callbacks.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(noun: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.green}} {{bar:40.cyan/blue}} {{pos}}/{{len}} {noun} {{msg}}"
        ))?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(format!("({} frames)", info.frames));
        if info.total == Some(info.current) {
            self.bar.finish();
        }
    }
}

fn parse_pixel_format(value: &str) -> Option<PixelFormat> {
    match value.to_ascii_lowercase().as_str() {
        "rgb8" | "rgb" => Some(PixelFormat::Rgb8),
        "rgba8" | "rgba" => Some(PixelFormat::Rgba8),
        "gray8" | "gray" | "greyscale" | "grayscale" => Some(PixelFormat::Gray8),
        _ => None,
    }
}

fn parse_image_extension(value: &str) -> Option<&'static str> {
    match value.to_ascii_lowercase().trim_start_matches('.') {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "bmp" => Some("bmp"),
        "tif" | "tiff" => Some("tiff"),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn folder_options(global: &GlobalOptions) -> Result<FolderOptions, Box<dyn std::error::Error>> {
    let mut options = FolderOptions::new()
        .with_resolution(global.width, global.height)
        .with_estimated_frame_counts(global.estimate_frame_counts);

    if !global.extensions.is_empty() {
        options = options.with_extensions(&global.extensions);
    }

    if let Some(pixel_str) = &global.pixel_format {
        let pixel = parse_pixel_format(pixel_str)
            .ok_or(format!("unsupported --pixel-format: {pixel_str}"))?;
        options = options.with_pixel_format(pixel);
    }

    if global.progress {
        options = options.with_progress(Arc::new(BarProgress::new("videos")?));
    }

    Ok(options)
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &global.log_level {
        let parsed = FfmpegLogLevel::from_name(level)
            .ok_or(format!("unsupported --log-level: {level}"))?;
        framefold::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn open_dataset(global: &GlobalOptions, root: &Path) -> Result<VideoFolder, Box<dyn std::error::Error>> {
    let options = folder_options(global)?;
    let dataset = VideoFolder::open_with_options(root, &options)?;
    if dataset.is_empty() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("no videos found under {}", root.display()).yellow()
        );
    }
    Ok(dataset)
}

fn format_row(row: &[u64]) -> String {
    row.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Index { root, json } => {
            let dataset = open_dataset(&cli.global, &root)?;
            let classes = dataset.classes();
            if json {
                let records: Vec<_> = dataset
                    .records()
                    .iter()
                    .map(|record| {
                        json!({
                            "path": record.relative_path.display().to_string(),
                            "label": record.label,
                            "class": classes[record.label],
                            "first_frame": record.first_frame,
                            "last_frame": record.last_frame,
                            "frames": record.frame_count(),
                        })
                    })
                    .collect();
                let payload = json!({
                    "root": root.display().to_string(),
                    "classes": classes,
                    "total_frames": dataset.len(),
                    "videos": records,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Root: {}", root.display());
                println!("Classes: {}", classes.join(", "));
                for record in dataset.records() {
                    println!(
                        "[{:>8}, {:>8}] {} ({} frames, label {})",
                        record.first_frame,
                        record.last_frame,
                        record.relative_path.display(),
                        record.frame_count(),
                        record.label,
                    );
                }
                println!(
                    "{} {} videos, {} frames",
                    "total".green().bold(),
                    dataset.records().len(),
                    dataset.len()
                );
            }
        }
        Commands::Locate { root, flat } => {
            let dataset = open_dataset(&cli.global, &root)?;
            if dataset.is_empty() {
                return Err("dataset contains no frames".into());
            }
            let wrapped = flat % dataset.len();
            let (video_index, offset) = dataset.index().locate(wrapped)?;
            let record = &dataset.records()[video_index];
            if wrapped != flat {
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("{flat} wraps to {wrapped}").yellow()
                );
            }
            println!(
                "{} -> {} frame {} (class {}, label {})",
                wrapped,
                record.relative_path.display(),
                offset,
                dataset.classes()[record.label],
                record.label,
            );
        }
        Commands::Sample {
            frames,
            batch_size,
            rows,
        } => {
            let sampler = BatchSampler::new(frames, batch_size)?;
            let shown = rows.unwrap_or(sampler.rows()).min(sampler.rows());
            println!(
                "rows={} batch_size={} len={}",
                sampler.rows(),
                sampler.batch_size(),
                sampler.len()
            );
            for row in 0..shown {
                if let Some(indices) = sampler.row(row) {
                    println!("{row:>6}: {}", format_row(&indices));
                }
            }
            if shown < sampler.rows() {
                println!("... {} more rows", sampler.rows() - shown);
            }
        }
        Commands::Extract {
            root,
            flat,
            out,
            image_ext,
        } => {
            let image_ext = parse_image_extension(&image_ext)
                .ok_or(format!("unsupported --image-ext: {image_ext}"))?;
            fs::create_dir_all(&out)?;

            let mut dataset = open_dataset(&cli.global, &root)?;
            for index in flat {
                let (frame, label) = dataset.get(index)?;
                let output_path = out.join(format!("frame_{index:08}.{image_ext}"));
                ensure_writable_path(&output_path, cli.global.overwrite)?;
                framefold::array_to_image(&frame)?.save(&output_path)?;
                if cli.global.verbose {
                    eprintln!(
                        "saved frame {} (class {}) -> {}",
                        index,
                        dataset.classes()[label],
                        output_path.display()
                    );
                }
            }
            let released = dataset.release();
            println!(
                "{} frames to {} ({} decode sessions closed)",
                "saved".green().bold(),
                out.display(),
                released
            );
        }
        Commands::Walk {
            root,
            batch_size,
            steps,
        } => {
            let mut dataset = open_dataset(&cli.global, &root)?;
            let mut loader = dataset.loader(batch_size, steps)?;
            if cli.global.progress {
                loader = loader.with_progress(Arc::new(BarProgress::new("batches")?));
            }

            let mut batches = 0_u64;
            let mut peak_sessions = 0_usize;
            while let Some(batch) = loader.next() {
                let parts = batch?
                    .into_tuple()
                    .ok_or("loader produced a non-tuple batch")?;
                let sessions = loader.dataset().open_cursor_count();
                peak_sessions = peak_sessions.max(sessions);
                if cli.global.verbose {
                    eprintln!(
                        "batch {batches}: frames {:?} labels {:?} open sessions {sessions}",
                        parts[0].shape().unwrap_or_default(),
                        parts[1].shape().unwrap_or_default(),
                    );
                }
                batches += 1;
            }
            drop(loader);

            let released = dataset.release();
            println!(
                "{} {} batches, peak {} open decode sessions, {} closed at end",
                "walked".green().bold(),
                batches,
                peak_sessions,
                released
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framefold", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
