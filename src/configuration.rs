//! Dataset configuration.
//!
//! [`FolderOptions`] is a builder that carries the recognised video
//! extensions, decoded frame layout, progress callback, and cancellation
//! token through index construction without widening every signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framefold::{CancellationToken, FolderOptions, PixelFormat};
//!
//! let token = CancellationToken::new();
//! let options = FolderOptions::new()
//!     .with_extensions(["mp4", "mkv"])
//!     .with_pixel_format(PixelFormat::Gray8)
//!     .with_resolution(Some(224), None)
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use ffmpeg_next::format::Pixel;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Video container extensions recognised when no others are configured.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// Output pixel format for decoded frames.
///
/// Determines the channel count of the `(height, width, channels)` arrays
/// produced by [`FfmpegDecoder`](crate::FfmpegDecoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGB, three channels. This is the default.
    #[default]
    Rgb8,
    /// 8-bit RGBA with alpha pre-set to 255, four channels.
    Rgba8,
    /// 8-bit grayscale, one channel.
    Gray8,
}

impl PixelFormat {
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
            PixelFormat::Gray8 => Pixel::GRAY8,
        }
    }

    /// Number of interleaved channels per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Layout of decoded frames.
///
/// When no dimensions are set the source resolution is used. Setting one
/// dimension together with `maintain_aspect_ratio` computes the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutputOptions {
    /// Output pixel format.
    pub pixel_format: PixelFormat,
    /// Target width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Target height. `None` keeps the source height.
    pub height: Option<u32>,
    /// Derive the missing dimension from the source aspect ratio.
    pub maintain_aspect_ratio: bool,
}

impl Default for FrameOutputOptions {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Rgb8,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
        }
    }
}

impl FrameOutputOptions {
    /// Resolve the final output `(width, height)` given the source size.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if self.maintain_aspect_ratio && source_width > 0 => {
                let ratio = w as f64 / source_width as f64;
                let h = (source_height as f64 * ratio).round() as u32;
                (w, h.max(1))
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) if self.maintain_aspect_ratio && source_height > 0 => {
                let ratio = h as f64 / source_height as f64;
                let w = (source_width as f64 * ratio).round() as u32;
                (w.max(1), h)
            }
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }
}

/// Configuration for building a [`VideoFolder`](crate::VideoFolder).
///
/// A default-constructed value recognises `.mp4` files only, decodes to
/// source-resolution RGB, reports no progress, and is never cancelled.
#[derive(Clone)]
pub struct FolderOptions {
    pub(crate) extensions: Vec<String>,
    pub(crate) frame_output: FrameOutputOptions,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) progress_interval: u64,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) estimate_frame_counts: bool,
    #[cfg(feature = "rayon")]
    pub(crate) parallel_probing: bool,
}

impl Debug for FolderOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FolderOptions")
            .field("extensions", &self.extensions)
            .field("frame_output", &self.frame_output)
            .field("progress_interval", &self.progress_interval)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("estimate_frame_counts", &self.estimate_frame_counts)
            .finish_non_exhaustive()
    }
}

impl Default for FolderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|extension| extension.to_string())
                .collect(),
            frame_output: FrameOutputOptions::default(),
            progress: Arc::new(NoOpProgress),
            progress_interval: 1,
            cancellation: None,
            estimate_frame_counts: false,
            #[cfg(feature = "rayon")]
            parallel_probing: false,
        }
    }

    /// Replace the set of recognised video extensions.
    ///
    /// Leading dots are stripped and matching is case-insensitive, so
    /// `".MP4"` and `"mp4"` are equivalent.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|extension| {
                extension
                    .as_ref()
                    .trim_start_matches('.')
                    .to_ascii_lowercase()
            })
            .filter(|extension| !extension.is_empty())
            .collect();
        self
    }

    /// Set the output pixel format for decoded frames.
    #[must_use]
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.frame_output.pixel_format = format;
        self
    }

    /// Set a custom output resolution for decoded frames.
    ///
    /// Pass `None` for either dimension to keep (or derive) the source value.
    #[must_use]
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.frame_output.width = width;
        self.frame_output.height = height;
        self
    }

    /// Control aspect-ratio preservation when only one dimension is given.
    #[must_use]
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.frame_output.maintain_aspect_ratio = maintain;
        self
    }

    /// Set the complete frame output configuration.
    #[must_use]
    pub fn with_frame_output(mut self, output: FrameOutputOptions) -> Self {
        self.frame_output = output;
        self
    }

    /// Attach a progress callback, invoked while the index is built.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Fire the progress callback every `interval` probed videos.
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Attach a cancellation token checked before every probe.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Let [`FfmpegProbe`](crate::FfmpegProbe) estimate a frame count from
    /// duration and frame rate when the container does not store one.
    ///
    /// Estimates can overshoot the real count, in which case reading the
    /// last frames of that video fails with a decode error.
    #[must_use]
    pub fn with_estimated_frame_counts(mut self, estimate: bool) -> Self {
        self.estimate_frame_counts = estimate;
        self
    }

    /// Probe videos on the rayon thread pool.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn with_parallel_probing(mut self, parallel: bool) -> Self {
        self.parallel_probing = parallel;
        self
    }

    /// The recognised extensions, lowercase and without leading dots.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// The decoded frame layout.
    pub fn frame_output(&self) -> &FrameOutputOptions {
        &self.frame_output
    }

    /// Returns `true` if `path` carries one of the recognised extensions.
    pub fn is_video_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                let extension = extension.to_ascii_lowercase();
                self.extensions.iter().any(|known| *known == extension)
            })
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
