//! # framefold
//!
//! Treat a folder of class-labelled videos as one flat, randomly
//! addressable sequence of frames, and feed it to sequence models as
//! time-major batches.
//!
//! `framefold` indexes a directory with one subdirectory per class, maps
//! every frame of every video to a single integer, and serves reads at
//! those integers from a cache of sequential decode sessions powered by
//! FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate. Frames come back as [`ndarray`] arrays of shape
//! `(height, width, channels)`.
//!
//! ## Quick Start
//!
//! ### Read single frames
//!
//! ```no_run
//! use framefold::VideoFolder;
//!
//! let mut dataset = VideoFolder::open("data/train").unwrap();
//! let (frame, label) = dataset.get(0).unwrap();
//! println!("{:?} from class {}", frame.dim(), dataset.classes()[label]);
//! ```
//!
//! ### Iterate batches
//!
//! ```no_run
//! use framefold::VideoFolder;
//!
//! let mut dataset = VideoFolder::open("data/train").unwrap();
//!
//! // 8 parallel streams, 32 steps per batch
//! for batch in dataset.loader(8, 32).unwrap() {
//!     let parts = batch.unwrap().into_tuple().unwrap();
//!     // frames: (32, 8, H, W, 3), labels: (32, 8)
//!     println!("{:?} {:?}", parts[0].shape(), parts[1].shape());
//! }
//! dataset.release();
//! ```
//!
//! ### Configure output and indexing
//!
//! ```no_run
//! use framefold::{FolderOptions, PixelFormat, VideoFolder};
//!
//! let options = FolderOptions::new()
//!     .with_extensions(["mp4", "mkv"])
//!     .with_pixel_format(PixelFormat::Gray8)
//!     .with_resolution(Some(128), None);
//! let dataset = VideoFolder::open_with_options("data/train", &options).unwrap();
//! ```
//!
//! ## Features
//!
//! - **Flat frame index**: binary-search lookup from flat index to
//!   `(video, offset)`
//! - **Decode session cache**: sequential walks cost one decoded frame per
//!   read, however many walks are interleaved
//! - **Stripe sampler**: `B` parallel streams over the index, one frame per
//!   stream per step
//! - **Time-major collation**: `(T, B, ..)` frames and `(T, B)` labels
//! - **Configurable output**: pixel format (RGB8, RGBA8, GRAY8) and target
//!   resolution with aspect ratio preservation
//! - **Progress & cancellation** while indexing and loading
//! - **Pluggable backends**: any [`FrameCountProbe`] and
//!   [`SequentialDecoder`] can stand in for FFmpeg
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `BatchStream` for loading batches on a blocking Tokio thread |
//! | `rayon` | Parallel frame-count probing while indexing |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod collate;
pub mod configuration;
mod conversion;
mod cursor;
pub mod dataset;
pub mod decoder;
pub mod error;
pub mod ffmpeg;
pub mod index;
pub mod listing;
pub mod loader;
#[cfg(feature = "rayon")]
mod parallel;
pub mod probe;
pub mod progress;
pub mod sampler;
#[cfg(feature = "async")]
pub mod stream;

pub use collate::{Batch, IntoSample, Sample, VideoCollate};
pub use configuration::{
    DEFAULT_VIDEO_EXTENSIONS, FolderOptions, FrameOutputOptions, PixelFormat,
};
pub use conversion::array_to_image;
pub use dataset::{FrameTransform, TargetTransform, VideoFolder};
pub use decoder::{FfmpegDecoder, FfmpegFrameSource, FrameSource, SequentialDecoder};
pub use error::FramefoldError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use index::{VideoIndex, VideoRecord};
pub use listing::{find_classes, find_videos};
pub use loader::VideoLoader;
pub use probe::{FfmpegProbe, FrameCountProbe};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use sampler::{BatchSampler, BatchSamplerIter};
#[cfg(feature = "async")]
pub use stream::BatchStream;
