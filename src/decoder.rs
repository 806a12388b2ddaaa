//! Sequential frame decoding.
//!
//! A [`SequentialDecoder`] opens a video and hands back a [`FrameSource`]: a
//! forward-only producer that yields each frame exactly once, in
//! presentation order, and owns the underlying file handle until it is
//! closed or dropped. Nothing here ever seeks; reaching frame `k` of a fresh
//! source means decoding and discarding the `k` frames before it.
//!
//! [`FfmpegDecoder`] is the production implementation. It decodes the best
//! video stream of each file into `(height, width, channels)`
//! [`Array3<u8>`] frames laid out as configured by
//! [`FrameOutputOptions`].

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::context::Input,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ndarray::Array3;

use crate::configuration::FrameOutputOptions;
use crate::error::FramefoldError;

/// Opens forward-only frame sources for video files.
pub trait SequentialDecoder {
    /// The decoded frame type.
    type Frame;
    /// The open decode session type.
    type Source: FrameSource<Frame = Self::Frame>;

    /// Start a decode session at the first frame of `path`.
    fn open(&self, path: &Path) -> Result<Self::Source, FramefoldError>;
}

/// A live, forward-only decode session over one video.
pub trait FrameSource {
    /// The decoded frame type.
    type Frame;

    /// Produce the next frame, or `Ok(None)` once the video is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, FramefoldError>;

    /// Discard up to `count` frames and return how many were discarded.
    ///
    /// A return value below `count` means the video ended first. The default
    /// decodes each frame through [`next_frame`](FrameSource::next_frame);
    /// implementations may skip colour conversion but must still decode.
    fn skip_frames(&mut self, count: u64) -> Result<u64, FramefoldError> {
        for skipped in 0..count {
            if self.next_frame()?.is_none() {
                return Ok(skipped);
            }
        }
        Ok(count)
    }

    /// Release the session's resources. Consuming `self` makes a second
    /// close impossible; dropping without calling this releases them too.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// FFmpeg-backed [`SequentialDecoder`].
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use framefold::{FfmpegDecoder, FrameOutputOptions, FrameSource, SequentialDecoder};
///
/// let decoder = FfmpegDecoder::new(FrameOutputOptions::default());
/// let mut source = decoder.open(Path::new("clip.mp4"))?;
/// while let Some(frame) = source.next_frame()? {
///     println!("{:?}", frame.dim());
/// }
/// # Ok::<(), framefold::FramefoldError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoder {
    output: FrameOutputOptions,
}

impl FfmpegDecoder {
    /// Create a decoder producing frames in the given layout.
    pub fn new(output: FrameOutputOptions) -> Self {
        Self { output }
    }

    /// The frame layout this decoder produces.
    pub fn output(&self) -> &FrameOutputOptions {
        &self.output
    }
}

impl SequentialDecoder for FfmpegDecoder {
    type Frame = Array3<u8>;
    type Source = FfmpegFrameSource;

    fn open(&self, path: &Path) -> Result<FfmpegFrameSource, FramefoldError> {
        FfmpegFrameSource::open(path, self.output.clone())
    }
}

/// One open FFmpeg demuxer + decoder + scaler, pulled one frame at a time.
pub struct FfmpegFrameSource {
    path: PathBuf,
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    output: FrameOutputOptions,
    target_width: u32,
    target_height: u32,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
}

impl FfmpegFrameSource {
    fn open(path: &Path, output: FrameOutputOptions) -> Result<Self, FramefoldError> {
        let input_context = crate::ffmpeg::open_input(path)?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| FramefoldError::NoVideoStream {
                path: path.to_path_buf(),
            })?;
        let video_stream_index = stream.index();
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video()?;

        let (target_width, target_height) =
            output.resolve_dimensions(decoder.width(), decoder.height());

        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            output.pixel_format.to_ffmpeg_pixel(),
            target_width,
            target_height,
            ScalingFlags::BILINEAR,
        )?;

        log::debug!(
            "Opened decode session for {} ({}x{} -> {}x{})",
            path.display(),
            decoder.width(),
            decoder.height(),
            target_width,
            target_height,
        );

        Ok(Self {
            path: path.to_path_buf(),
            input_context,
            decoder,
            scaler,
            video_stream_index,
            output,
            target_width,
            target_height,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
        })
    }

    /// Advance the decoder until `decoded_frame` holds the next frame.
    /// Returns `false` once the stream is drained.
    fn decode_next(&mut self) -> Result<bool, FramefoldError> {
        if self.done {
            return Ok(false);
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return Ok(true);
            }

            if self.eof_sent {
                self.done = true;
                return Ok(false);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::trace!("{}: skipping unreadable packet: {error}", self.path.display());
                }
            }
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    type Frame = Array3<u8>;

    fn next_frame(&mut self) -> Result<Option<Array3<u8>>, FramefoldError> {
        if !self.decode_next()? {
            return Ok(None);
        }

        self.scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;
        crate::conversion::frame_to_array(
            &self.scaled_frame,
            self.target_width,
            self.target_height,
            self.output.pixel_format,
        )
        .map(Some)
    }

    fn skip_frames(&mut self, count: u64) -> Result<u64, FramefoldError> {
        for skipped in 0..count {
            if !self.decode_next()? {
                return Ok(skipped);
            }
        }
        Ok(count)
    }

    fn close(self) {
        log::debug!("Closed decode session for {}", self.path.display());
    }
}
