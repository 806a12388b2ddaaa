//! Epoch iteration over a [`VideoFolder`].
//!
//! [`VideoLoader`] ties the three pieces together: it walks a
//! [`BatchSampler`] in chunks of `batch_size * time_steps` indices, reads
//! each `(frame, label)` from the dataset and collates the chunk into a
//! `(frames, labels)` batch of shapes `(T, B, ..)` and `(T, B)`.

use std::sync::Arc;

use ndarray::{Array, Dimension};

use crate::collate::{Batch, IntoSample, VideoCollate};
use crate::dataset::VideoFolder;
use crate::decoder::SequentialDecoder;
use crate::error::FramefoldError;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};
use crate::sampler::{BatchSampler, BatchSamplerIter};

/// Iterator over one epoch of collated batches.
///
/// Every batch except possibly the last holds `time_steps` rows; the last
/// holds whatever rows remain. Iteration stops after the first error.
///
/// # Example
///
/// ```no_run
/// use framefold::VideoFolder;
///
/// let mut dataset = VideoFolder::open("data/train")?;
/// for batch in dataset.loader(4, 16)?.with_release_at_end(true) {
///     let parts = batch?.into_tuple().unwrap();
///     println!("frames {:?} labels {:?}", parts[0].shape(), parts[1].shape());
/// }
/// # Ok::<(), framefold::FramefoldError>(())
/// ```
pub struct VideoLoader<'a, D: SequentialDecoder> {
    dataset: &'a mut VideoFolder<D>,
    sampler: BatchSampler,
    indices: BatchSamplerIter,
    collate: VideoCollate,
    time_steps: usize,
    tracker: Option<ProgressTracker>,
    release_at_end: bool,
    finished: bool,
}

impl<'a, D: SequentialDecoder> VideoLoader<'a, D> {
    /// Loader over `dataset` with `batch_size` parallel streams and
    /// `time_steps` rows per batch.
    ///
    /// # Errors
    ///
    /// Returns [`FramefoldError::InvalidBatchSize`] if either argument is 0.
    pub fn new(
        dataset: &'a mut VideoFolder<D>,
        batch_size: usize,
        time_steps: usize,
    ) -> Result<Self, FramefoldError> {
        if time_steps == 0 {
            return Err(FramefoldError::InvalidBatchSize);
        }
        let sampler = BatchSampler::new(dataset.len(), batch_size)?;
        let collate = VideoCollate::new(batch_size)?;

        log::debug!(
            "Loader over {} frames: {} streams of {} rows, {} steps per batch",
            dataset.len(),
            batch_size,
            sampler.rows(),
            time_steps,
        );

        Ok(Self {
            dataset,
            indices: sampler.iter(),
            sampler,
            collate,
            time_steps,
            tracker: None,
            release_at_end: false,
            finished: false,
        })
    }

    /// Report one [`Loading`](OperationType::Loading) update per batch.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.tracker = Some(ProgressTracker::new(
            callback,
            OperationType::Loading,
            Some(self.batch_count()),
            1,
        ));
        self
    }

    /// Close every decode session once the final batch has been produced.
    #[must_use]
    pub fn with_release_at_end(mut self, release: bool) -> Self {
        self.release_at_end = release;
        self
    }

    /// Number of batches in one epoch.
    pub fn batch_count(&self) -> u64 {
        self.sampler.rows().div_ceil(self.time_steps as u64)
    }

    pub fn sampler(&self) -> &BatchSampler {
        &self.sampler
    }

    /// The dataset being walked, e.g. to inspect its open sessions between
    /// batches.
    pub fn dataset(&self) -> &VideoFolder<D> {
        self.dataset
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(tracker) = &mut self.tracker {
            tracker.finish();
        }
        if self.release_at_end {
            self.dataset.release();
        }
    }
}

impl<D, A, Ix> Iterator for VideoLoader<'_, D>
where
    D: SequentialDecoder<Frame = Array<A, Ix>>,
    A: Clone,
    Ix: Dimension,
{
    type Item = Result<Batch<A>, FramefoldError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let chunk = self.time_steps * self.collate.batch_size();
        let mut samples = Vec::with_capacity(chunk);
        for flat_index in self.indices.by_ref().take(chunk) {
            match self.dataset.get(flat_index) {
                Ok(pair) => samples.push(pair.into_sample()),
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }

        if samples.is_empty() {
            self.finish();
            return None;
        }

        let delivered = samples.len() as u64;
        let batch = self.collate.collate(samples);
        if let Some(tracker) = &mut self.tracker {
            tracker.advance(delivered);
        }
        if batch.is_err() || self.indices.len() == 0 {
            self.finish();
        }
        Some(batch)
    }
}

impl<D: SequentialDecoder> VideoFolder<D> {
    /// Iterate one epoch of batches; see [`VideoLoader::new`].
    ///
    /// # Errors
    ///
    /// Returns [`FramefoldError::InvalidBatchSize`] if either argument is 0.
    pub fn loader(
        &mut self,
        batch_size: usize,
        time_steps: usize,
    ) -> Result<VideoLoader<'_, D>, FramefoldError> {
        VideoLoader::new(self, batch_size, time_steps)
    }
}
