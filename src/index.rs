//! The flat frame index.
//!
//! Every frame of every video in the dataset gets one integer address. The
//! videos are laid end to end in class order, so a dataset with
//! `cat/a.mp4` (5 frames), `dog/b.mp4` (3) and `dog/c.mp4` (4) owns flat
//! indices `0..=4`, `5..=7` and `8..=11` respectively. [`VideoIndex`] holds
//! those ranges and maps a flat index back to its video with a binary
//! search.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::FolderOptions;
use crate::error::FramefoldError;
use crate::listing;
use crate::probe::FrameCountProbe;
use crate::progress::{OperationType, ProgressTracker};

/// Metadata for one video: its flat-index range and class label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    /// Flat index of the video's first frame.
    pub first_frame: u64,
    /// Flat index of the video's last frame (inclusive).
    pub last_frame: u64,
    /// Path relative to the dataset root, e.g. `dog/b.mp4`.
    pub relative_path: PathBuf,
    /// Index of the video's class in [`VideoIndex::classes`].
    pub label: usize,
}

impl VideoRecord {
    /// Number of frames in the video.
    pub fn frame_count(&self) -> u64 {
        self.last_frame - self.first_frame + 1
    }

    /// Returns `true` if `flat_index` addresses a frame of this video.
    pub fn contains(&self, flat_index: u64) -> bool {
        (self.first_frame..=self.last_frame).contains(&flat_index)
    }
}

/// Sorted, contiguous video records covering `[0, total_frames)`.
///
/// Built once and never mutated; facades share it behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct VideoIndex {
    root: PathBuf,
    classes: Vec<String>,
    class_to_index: HashMap<String, usize>,
    records: Vec<VideoRecord>,
    total_frames: u64,
}

impl VideoIndex {
    /// Scan `root` and probe every recognised video for its frame count.
    ///
    /// Classes are the sorted subdirectory names of `root`; within a class
    /// videos are taken in sorted file-name order.
    ///
    /// # Errors
    ///
    /// - [`FramefoldError::Metadata`] if a probe reports no frame count or
    ///   a count of zero. No record is appended for that file.
    /// - [`FramefoldError::Cancelled`] if the options' cancellation token
    ///   fires between probes.
    /// - [`FramefoldError::IoError`] if a directory cannot be listed.
    /// - Any error the probe itself returns.
    pub fn build<P>(
        root: impl AsRef<Path>,
        options: &FolderOptions,
        probe: &P,
    ) -> Result<Self, FramefoldError>
    where
        P: FrameCountProbe + ?Sized,
    {
        let root = root.as_ref();
        let classes = listing::find_classes(root)?;

        let mut candidates: Vec<(PathBuf, usize)> = Vec::new();
        for (label, class) in classes.iter().enumerate() {
            for relative_path in listing::find_videos(root, class, options)? {
                candidates.push((relative_path, label));
            }
        }

        log::debug!(
            "Indexing {}: {} classes, {} candidate videos",
            root.display(),
            classes.len(),
            candidates.len(),
        );

        let counts = probe_counts(root, &candidates, options, probe)?;

        let index = Self::from_entries(
            root,
            classes,
            candidates
                .into_iter()
                .zip(counts)
                .map(|((relative_path, label), count)| (relative_path, label, count)),
        )?;

        log::info!(
            "Indexed {}: {} classes, {} videos, {} frames",
            root.display(),
            index.classes.len(),
            index.records.len(),
            index.total_frames,
        );

        Ok(index)
    }

    /// Assemble an index from pre-computed `(relative_path, label,
    /// frame_count)` entries, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`FramefoldError::Metadata`] for an entry with zero frames.
    pub fn from_entries<I>(
        root: impl AsRef<Path>,
        classes: Vec<String>,
        entries: I,
    ) -> Result<Self, FramefoldError>
    where
        I: IntoIterator<Item = (PathBuf, usize, u64)>,
    {
        let root = root.as_ref().to_path_buf();
        let class_to_index = classes
            .iter()
            .enumerate()
            .map(|(index, class)| (class.clone(), index))
            .collect();

        let mut records = Vec::new();
        let mut total_frames = 0_u64;
        for (relative_path, label, frame_count) in entries {
            let frame_count = checked_frame_count(&root.join(&relative_path), Some(frame_count))?;
            records.push(VideoRecord {
                first_frame: total_frames,
                last_frame: total_frames + frame_count - 1,
                relative_path,
                label,
            });
            total_frames += frame_count;
        }

        Ok(Self {
            root,
            classes,
            class_to_index,
            records,
            total_frames,
        })
    }

    /// Map a flat index to `(video_index, local_offset)`.
    ///
    /// Runs in O(log V) over the V videos.
    ///
    /// # Errors
    ///
    /// Returns [`FramefoldError::FrameOutOfRange`] unless
    /// `flat_index < total_frames`. Callers that want wraparound reduce the
    /// index first, as [`VideoFolder::get`](crate::VideoFolder::get) does.
    ///
    /// # Example
    ///
    /// ```
    /// use std::path::PathBuf;
    ///
    /// use framefold::VideoIndex;
    ///
    /// let index = VideoIndex::from_entries(
    ///     "data",
    ///     vec!["cat".into(), "dog".into()],
    ///     [
    ///         (PathBuf::from("cat/a.mp4"), 0, 5),
    ///         (PathBuf::from("dog/b.mp4"), 1, 3),
    ///         (PathBuf::from("dog/c.mp4"), 1, 4),
    ///     ],
    /// )?;
    /// assert_eq!(index.locate(7)?, (1, 2));
    /// # Ok::<(), framefold::FramefoldError>(())
    /// ```
    pub fn locate(&self, flat_index: u64) -> Result<(usize, u64), FramefoldError> {
        if flat_index >= self.total_frames {
            return Err(FramefoldError::FrameOutOfRange {
                frame_number: flat_index,
                total_frames: self.total_frames,
            });
        }

        let video_index = self
            .records
            .partition_point(|record| record.last_frame < flat_index);
        let record = &self.records[video_index];
        Ok((video_index, flat_index - record.first_frame))
    }

    /// The dataset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted class names; a label is an index into this list.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Class name to label.
    pub fn class_to_index(&self) -> &HashMap<String, usize> {
        &self.class_to_index
    }

    /// All video records, ascending by flat range.
    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    /// The record of one video.
    pub fn record(&self, video_index: usize) -> Option<&VideoRecord> {
        self.records.get(video_index)
    }

    /// Absolute path of one video.
    pub fn video_path(&self, video_index: usize) -> Option<PathBuf> {
        self.record(video_index)
            .map(|record| self.root.join(&record.relative_path))
    }

    /// Number of indexed videos.
    pub fn video_count(&self) -> usize {
        self.records.len()
    }

    /// Sum of all per-video frame counts.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Wrap into an [`Arc`] for sharing between facades.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Reject a missing or zero frame count.
pub(crate) fn checked_frame_count(path: &Path, count: Option<u64>) -> Result<u64, FramefoldError> {
    match count {
        Some(count) if count > 0 => Ok(count),
        Some(_) => Err(FramefoldError::Metadata {
            path: path.to_path_buf(),
            reason: "probe reported zero frames".to_string(),
        }),
        None => Err(FramefoldError::Metadata {
            path: path.to_path_buf(),
            reason: "probe reported no frame count".to_string(),
        }),
    }
}

fn probe_counts<P>(
    root: &Path,
    candidates: &[(PathBuf, usize)],
    options: &FolderOptions,
    probe: &P,
) -> Result<Vec<u64>, FramefoldError>
where
    P: FrameCountProbe + ?Sized,
{
    #[cfg(feature = "rayon")]
    if options.parallel_probing {
        return crate::parallel::probe_counts_parallel(root, candidates, options, probe);
    }

    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::Indexing,
        Some(candidates.len() as u64),
        options.progress_interval,
    );

    let mut counts = Vec::with_capacity(candidates.len());
    for (relative_path, _) in candidates {
        if options.is_cancelled() {
            return Err(FramefoldError::Cancelled);
        }
        let path = root.join(relative_path);
        let count = checked_frame_count(&path, probe.frame_count(&path)?)?;
        log::trace!("Probed {}: {} frames", path.display(), count);
        counts.push(count);
        tracker.advance(count);
    }

    tracker.finish();
    Ok(counts)
}
