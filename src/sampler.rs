//! Interleaved index order for parallel sequential walks.
//!
//! Training a recurrent model on video wants `B` independent clips that
//! each advance one frame per step. [`BatchSampler`] cuts the flat index
//! space into `B` contiguous stripes of `rows` frames and emits one index
//! from every stripe per row:
//!
//! ```text
//! total = 12, B = 5  =>  rows = 3
//!
//! row 0:  0  3  6  9 12
//! row 1:  1  4  7 10 13
//! row 2:  2  5  8 11 14
//! ```
//!
//! Column `s` walks `s * rows, s * rows + 1, ...`, so against a
//! [`VideoFolder`](crate::VideoFolder) every column keeps exactly one decode
//! session busy. Indices past the end (`12..=14` above) are wrapped by the
//! dataset.

use std::iter::FusedIterator;

use crate::error::FramefoldError;

/// Deterministic stripe-interleaving sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSampler {
    total_frames: u64,
    batch_size: usize,
    rows: u64,
}

impl BatchSampler {
    /// Sampler over `total_frames` flat indices in `batch_size` stripes.
    ///
    /// # Errors
    ///
    /// Returns [`FramefoldError::InvalidBatchSize`] if `batch_size` is 0.
    pub fn new(total_frames: u64, batch_size: usize) -> Result<Self, FramefoldError> {
        if batch_size == 0 {
            return Err(FramefoldError::InvalidBatchSize);
        }
        Ok(Self {
            total_frames,
            batch_size,
            rows: total_frames.div_ceil(batch_size as u64),
        })
    }

    /// Frames in the stripe walked by each column.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Total number of indices yielded, `rows * batch_size`.
    ///
    /// This is at least `total_frames` and may exceed it by up to
    /// `batch_size - 1`.
    pub fn len(&self) -> u64 {
        self.rows * self.batch_size as u64
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// The `batch_size` indices of one row, or `None` past the last row.
    pub fn row(&self, row: u64) -> Option<Vec<u64>> {
        if row >= self.rows {
            return None;
        }
        Some(
            (0..self.batch_size as u64)
                .map(|stripe| row + self.rows * stripe)
                .collect(),
        )
    }

    /// Every index, row by row.
    pub fn iter(&self) -> BatchSamplerIter {
        BatchSamplerIter {
            rows: self.rows,
            batch_size: self.batch_size as u64,
            position: 0,
            end: self.len(),
        }
    }
}

impl<'a> IntoIterator for &'a BatchSampler {
    type Item = u64;
    type IntoIter = BatchSamplerIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`BatchSampler::iter`].
#[derive(Debug, Clone)]
pub struct BatchSamplerIter {
    rows: u64,
    batch_size: u64,
    position: u64,
    end: u64,
}

impl Iterator for BatchSamplerIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.position >= self.end {
            return None;
        }
        let row = self.position / self.batch_size;
        let stripe = self.position % self.batch_size;
        self.position += 1;
        Some(row + self.rows * stripe)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.position).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchSamplerIter {}

impl FusedIterator for BatchSamplerIter {}
