//! Error types for the `framefold` crate.
//!
//! This module defines [`FramefoldError`], the unified error type returned by
//! every fallible operation in the crate. Variants carry the file path, flat
//! index, or offset involved so that failures deep inside a batch can be
//! traced back to the video that caused them.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use ndarray::ShapeError;
use thiserror::Error;

/// The unified error type for all `framefold` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramefoldError {
    /// A probed video reported no usable frame count. Aborts index
    /// construction.
    #[error("Missing or invalid frame count for {path}: {reason}")]
    Metadata {
        /// The video that was probed.
        path: PathBuf,
        /// What the probe reported.
        reason: String,
    },

    /// A sequential decoder ran out of frames before delivering the
    /// requested one (corrupt file or frame-count mismatch).
    #[error("Failed to decode frame {offset} of {path}: {reason}")]
    Decode {
        /// The video being decoded.
        path: PathBuf,
        /// Local offset of the frame that could not be produced.
        offset: u64,
        /// Underlying reason.
        reason: String,
    },

    /// A sample in a batch did not have the same kind as the first one.
    #[error("Cannot collate a {found} sample into a batch of {expected} samples")]
    CollationType {
        /// Kind of the first sample in the group.
        expected: String,
        /// Kind of the offending sample.
        found: String,
    },

    /// A media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path of the file.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path of the file.
        path: PathBuf,
    },

    /// A flat frame index was outside `[0, total_frames)` where the caller
    /// promised it would not be.
    #[error("Frame {frame_number} is out of range (index has {total_frames} frames)")]
    FrameOutOfRange {
        /// The flat index that was requested.
        frame_number: u64,
        /// Total number of frames in the index.
        total_frames: u64,
    },

    /// A read was attempted on a dataset with no frames.
    #[error("Dataset contains no frames")]
    EmptyDataset,

    /// A batch size of zero was provided.
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    /// The number of samples handed to the collator is not a multiple of the
    /// batch size.
    #[error("Batch of {length} samples cannot be split into rows of {batch_size}")]
    InvalidBatchLength {
        /// Number of samples received.
        length: usize,
        /// Configured number of parallel streams.
        batch_size: usize,
    },

    /// The collator received no samples.
    #[error("Cannot collate an empty batch")]
    EmptyBatch,

    /// Tensors in one batch could not be stacked or reshaped.
    #[error("Tensor shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A decoded frame could not be converted to the requested output.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while scanning the dataset directory.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for FramefoldError {
    fn from(error: FfmpegError) -> Self {
        FramefoldError::FfmpegError(error.to_string())
    }
}

impl From<ShapeError> for FramefoldError {
    fn from(error: ShapeError) -> Self {
        FramefoldError::ShapeMismatch(error.to_string())
    }
}
