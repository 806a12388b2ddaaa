//! Frame-count probing.
//!
//! The index builder only needs one number per video: how many frames it
//! holds. [`FrameCountProbe`] is that contract, and [`FfmpegProbe`] answers
//! it by opening the container, reading the best video stream's header, and
//! closing the demuxer again.

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::media::Type;

use crate::error::FramefoldError;

/// Reports the number of frames in a video file.
///
/// `Ok(None)` means the file was readable but carries no frame count; the
/// index builder turns that into [`FramefoldError::Metadata`].
/// Implementations must be `Sync` so that probing can fan out across rayon
/// threads.
pub trait FrameCountProbe: Sync {
    /// Probe `path` for its frame count.
    fn frame_count(&self, path: &Path) -> Result<Option<u64>, FramefoldError>;
}

impl<F> FrameCountProbe for F
where
    F: Fn(&Path) -> Result<Option<u64>, FramefoldError> + Sync,
{
    fn frame_count(&self, path: &Path) -> Result<Option<u64>, FramefoldError> {
        self(path)
    }
}

/// Probe backed by FFmpeg's demuxer.
///
/// Reads the stream-level `nb_frames` field of the best video stream. When
/// `estimate` is enabled and the container leaves that field empty, falls
/// back to `duration × average frame rate`.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use framefold::{FfmpegProbe, FrameCountProbe};
///
/// let probe = FfmpegProbe::new();
/// let frames = probe.frame_count(Path::new("clip.mp4"))?;
/// println!("{frames:?}");
/// # Ok::<(), framefold::FramefoldError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegProbe {
    estimate: bool,
}

impl FfmpegProbe {
    /// A probe that trusts only the container's stored frame count.
    pub fn new() -> Self {
        Self { estimate: false }
    }

    /// A probe that estimates missing counts from duration and frame rate.
    pub fn estimating() -> Self {
        Self { estimate: true }
    }
}

impl FrameCountProbe for FfmpegProbe {
    fn frame_count(&self, path: &Path) -> Result<Option<u64>, FramefoldError> {
        let input_context = crate::ffmpeg::open_input(path)?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| FramefoldError::NoVideoStream {
                path: path.to_path_buf(),
            })?;

        let stored = stream.frames();
        if stored > 0 {
            log::trace!("{}: {} frames (container)", path.display(), stored);
            return Ok(Some(stored as u64));
        }

        if !self.estimate {
            return Ok(None);
        }

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let estimated = (duration.as_secs_f64() * frames_per_second) as u64;
        log::debug!(
            "{}: no stored frame count, estimated {} from {:.2}s at {:.2} fps",
            path.display(),
            estimated,
            duration.as_secs_f64(),
            frames_per_second,
        );

        Ok((estimated > 0).then_some(estimated))
    }
}
