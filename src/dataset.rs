//! The dataset facade.
//!
//! [`VideoFolder`] combines the read-only [`VideoIndex`] with a pool of
//! decode cursors and exposes the whole collection as one flat sequence of
//! `(frame, label)` pairs. Any integer is a valid index: it wraps modulo the
//! total frame count.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

use crate::configuration::FolderOptions;
use crate::cursor::CursorPool;
use crate::decoder::{FfmpegDecoder, SequentialDecoder};
use crate::error::FramefoldError;
use crate::index::{VideoIndex, VideoRecord};
use crate::probe::{FfmpegProbe, FrameCountProbe};

/// Hook applied to every frame returned by [`VideoFolder::get`].
pub type FrameTransform<F> = Arc<dyn Fn(F) -> F + Send + Sync>;

/// Hook applied to every label returned by [`VideoFolder::get`].
pub type TargetTransform = Arc<dyn Fn(usize) -> usize + Send + Sync>;

/// Random-access frame reads over a folder of class-labelled videos.
///
/// Reads are served by sequential decode sessions. Reading flat indices
/// `i, i + 1, i + 2, ...` of one video costs one decoded frame each; a read
/// at an offset no open session is waiting for opens a new session and
/// decodes everything before it. Interleaving several such sequential walks
/// (as [`BatchSampler`](crate::BatchSampler) does) keeps one session per
/// walk.
///
/// A `VideoFolder` is driven through `&mut self` from one thread. For
/// parallel loading give every worker its own [`fork`](VideoFolder::fork).
///
/// # Example
///
/// ```no_run
/// use framefold::VideoFolder;
///
/// let mut dataset = VideoFolder::open("data/train")?;
/// println!("{} frames in {} classes", dataset.len(), dataset.classes().len());
///
/// let (frame, label) = dataset.get(42)?;
/// println!("frame {:?} of class {}", frame.dim(), dataset.classes()[label]);
///
/// dataset.release();
/// # Ok::<(), framefold::FramefoldError>(())
/// ```
pub struct VideoFolder<D: SequentialDecoder = FfmpegDecoder> {
    index: Arc<VideoIndex>,
    decoder: D,
    cursors: CursorPool<D::Source>,
    transform: Option<FrameTransform<D::Frame>>,
    target_transform: Option<TargetTransform>,
}

impl VideoFolder<FfmpegDecoder> {
    /// Index `root` with default options and decode through FFmpeg.
    ///
    /// # Errors
    ///
    /// See [`VideoIndex::build`].
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, FramefoldError> {
        Self::open_with_options(root, &FolderOptions::default())
    }

    /// Index `root` with the given options and decode through FFmpeg.
    ///
    /// # Errors
    ///
    /// See [`VideoIndex::build`].
    pub fn open_with_options<P: AsRef<Path>>(
        root: P,
        options: &FolderOptions,
    ) -> Result<Self, FramefoldError> {
        let probe = if options.estimate_frame_counts {
            FfmpegProbe::estimating()
        } else {
            FfmpegProbe::new()
        };
        let decoder = FfmpegDecoder::new(options.frame_output.clone());
        Self::build(root, options, &probe, decoder)
    }
}

impl<D: SequentialDecoder> VideoFolder<D> {
    /// Index `root` with any probe and read through any decoder.
    ///
    /// # Errors
    ///
    /// See [`VideoIndex::build`].
    pub fn build<P, Q>(
        root: P,
        options: &FolderOptions,
        probe: &Q,
        decoder: D,
    ) -> Result<Self, FramefoldError>
    where
        P: AsRef<Path>,
        Q: FrameCountProbe + ?Sized,
    {
        let index = VideoIndex::build(root, options, probe)?;
        Ok(Self::from_index(index, decoder))
    }

    /// Wrap an existing index.
    pub fn from_index(index: impl Into<Arc<VideoIndex>>, decoder: D) -> Self {
        let index = index.into();
        let cursors = CursorPool::new(index.video_count());
        Self {
            index,
            decoder,
            cursors,
            transform: None,
            target_transform: None,
        }
    }

    /// Apply `transform` to every frame before it is returned.
    #[must_use]
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(D::Frame) -> D::Frame + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Apply `transform` to every label before it is returned.
    #[must_use]
    pub fn with_target_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(usize) -> usize + Send + Sync + 'static,
    {
        self.target_transform = Some(Arc::new(transform));
        self
    }

    /// Read the frame at `flat_index` together with its class label.
    ///
    /// The index wraps modulo [`len`](VideoFolder::len), so indices past the
    /// end are valid and revisit frames from the start.
    ///
    /// # Errors
    ///
    /// - [`FramefoldError::EmptyDataset`] if the dataset has no frames.
    /// - [`FramefoldError::Decode`] if the video ends before the frame its
    ///   metadata promised.
    /// - Any error from opening a decode session.
    pub fn get(&mut self, flat_index: u64) -> Result<(D::Frame, usize), FramefoldError> {
        let total_frames = self.index.total_frames();
        if total_frames == 0 {
            return Err(FramefoldError::EmptyDataset);
        }

        let wrapped = flat_index % total_frames;
        let (video_index, offset) = self.index.locate(wrapped)?;
        let record = &self.index.records()[video_index];
        let is_last = wrapped == record.last_frame;
        let label = record.label;
        let path = self.index.root().join(&record.relative_path);

        let frame = self
            .cursors
            .read_frame(&self.decoder, &path, video_index, offset, is_last)?;

        let frame = match &self.transform {
            Some(transform) => transform(frame),
            None => frame,
        };
        let label = match &self.target_transform {
            Some(transform) => transform(label),
            None => label,
        };

        Ok((frame, label))
    }

    /// Close every open decode session. Returns how many were closed.
    ///
    /// Later reads open fresh sessions as needed.
    pub fn release(&mut self) -> usize {
        let closed = self.cursors.release();
        log::debug!("Released {closed} decode sessions");
        closed
    }

    /// A new facade over the same index and decoder settings, with no open
    /// sessions and the same transforms.
    pub fn fork(&self) -> Self
    where
        D: Clone,
    {
        Self {
            index: Arc::clone(&self.index),
            decoder: self.decoder.clone(),
            cursors: CursorPool::new(self.index.video_count()),
            transform: self.transform.clone(),
            target_transform: self.target_transform.clone(),
        }
    }

    /// Total number of frames across all videos.
    pub fn len(&self) -> u64 {
        self.index.total_frames()
    }

    /// Returns `true` if no video contributed any frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared index.
    pub fn index(&self) -> &Arc<VideoIndex> {
        &self.index
    }

    /// Sorted class names.
    pub fn classes(&self) -> &[String] {
        self.index.classes()
    }

    /// Class name to label.
    pub fn class_to_index(&self) -> &HashMap<String, usize> {
        self.index.class_to_index()
    }

    /// All video records.
    pub fn records(&self) -> &[VideoRecord] {
        self.index.records()
    }

    /// The decoder used to open sessions.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Number of decode sessions currently open, across all videos.
    pub fn open_cursor_count(&self) -> usize {
        self.cursors.open_count()
    }

    /// Offsets the open sessions of one video will deliver next, ascending.
    pub fn cursor_offsets(&self, video_index: usize) -> Vec<u64> {
        self.cursors.offsets(video_index)
    }
}

/// A facade without its decode sessions, for moving onto another thread.
#[cfg(feature = "async")]
pub(crate) struct DetachedFolder<D: SequentialDecoder> {
    index: Arc<VideoIndex>,
    decoder: D,
    transform: Option<FrameTransform<D::Frame>>,
    target_transform: Option<TargetTransform>,
}

#[cfg(feature = "async")]
impl<D: SequentialDecoder> VideoFolder<D> {
    pub(crate) fn detach(mut self) -> DetachedFolder<D> {
        self.release();
        DetachedFolder {
            index: self.index,
            decoder: self.decoder,
            transform: self.transform,
            target_transform: self.target_transform,
        }
    }
}

#[cfg(feature = "async")]
impl<D: SequentialDecoder> DetachedFolder<D> {
    pub(crate) fn attach(self) -> VideoFolder<D> {
        let mut dataset = VideoFolder::from_index(self.index, self.decoder);
        dataset.transform = self.transform;
        dataset.target_transform = self.target_transform;
        dataset
    }
}

impl<D: SequentialDecoder> Debug for VideoFolder<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFolder")
            .field("root", &self.index.root())
            .field("classes", &self.index.classes().len())
            .field("videos", &self.index.video_count())
            .field("total_frames", &self.index.total_frames())
            .field("open_cursors", &self.cursors.open_count())
            .field("has_transform", &self.transform.is_some())
            .field("has_target_transform", &self.target_transform.is_some())
            .finish()
    }
}
