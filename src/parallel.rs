//! Parallel frame-count probing.
//!
//! Probing is the slow part of index construction: every video has to be
//! opened and its header parsed. With the `rayon` feature and
//! [`FolderOptions::with_parallel_probing`](crate::FolderOptions::with_parallel_probing)
//! the probes fan out across the rayon pool. Results are collected in
//! candidate order, so flat indices are identical to a sequential build,
//! and the first failing candidate (in that order) is the error reported.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::configuration::FolderOptions;
use crate::error::FramefoldError;
use crate::index::checked_frame_count;
use crate::probe::FrameCountProbe;
use crate::progress::{OperationType, ProgressTracker};

pub(crate) fn probe_counts_parallel<P>(
    root: &Path,
    candidates: &[(PathBuf, usize)],
    options: &FolderOptions,
    probe: &P,
) -> Result<Vec<u64>, FramefoldError>
where
    P: FrameCountProbe + ?Sized,
{
    let tracker = Mutex::new(ProgressTracker::new(
        options.progress.clone(),
        OperationType::Indexing,
        Some(candidates.len() as u64),
        options.progress_interval,
    ));

    let results: Vec<Result<u64, FramefoldError>> = candidates
        .par_iter()
        .map(|(relative_path, _)| {
            if options.is_cancelled() {
                return Err(FramefoldError::Cancelled);
            }
            let path = root.join(relative_path);
            let count = checked_frame_count(&path, probe.frame_count(&path)?)?;
            if let Ok(mut tracker) = tracker.lock() {
                tracker.advance(count);
            }
            Ok(count)
        })
        .collect();

    let counts = results.into_iter().collect::<Result<Vec<_>, _>>()?;

    if let Ok(mut tracker) = tracker.lock() {
        tracker.finish();
    }
    Ok(counts)
}
