//! Async batch streaming.
//!
//! [`BatchStream`] runs a [`VideoLoader`] on a `tokio::task::spawn_blocking`
//! thread and hands its batches back through a bounded channel, so FFmpeg
//! decoding never stalls the async runtime.
//!
//! # Example
//!
//! ```no_run
//! use tokio_stream::StreamExt;
//!
//! use framefold::{FramefoldError, VideoFolder};
//!
//! # async fn example() -> Result<(), FramefoldError> {
//! let dataset = VideoFolder::open("data/train")?;
//! let mut stream = dataset.into_batch_stream(4, 16, None)?;
//!
//! while let Some(batch) = stream.next().await {
//!     let parts = batch?.into_tuple().unwrap();
//!     println!("frames {:?}", parts[0].shape());
//! }
//! # Ok(())
//! # }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use ndarray::{Array, Dimension};
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tokio_stream::Stream;

use crate::collate::Batch;
use crate::dataset::VideoFolder;
use crate::decoder::SequentialDecoder;
use crate::error::FramefoldError;
use crate::loader::VideoLoader;
use crate::sampler::BatchSampler;

/// Default bounded-channel capacity for [`BatchStream`].
///
/// A batch holds `T * B` decoded frames, so only a few are buffered.
const DEFAULT_CHANNEL_CAPACITY: usize = 2;

/// A stream of collated batches produced by a background loader.
///
/// Dropping the stream closes the channel; the background thread notices at
/// the next batch boundary, closes its decode sessions and exits.
pub struct BatchStream<A> {
    receiver: Receiver<Result<Batch<A>, FramefoldError>>,
    handle: JoinHandle<()>,
}

impl<A> BatchStream<A> {
    /// Returns `true` once the background loader has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<A> Stream for BatchStream<A> {
    type Item = Result<Batch<A>, FramefoldError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<D, A, Ix> VideoFolder<D>
where
    D: SequentialDecoder<Frame = Array<A, Ix>> + Send + 'static,
    A: Clone + Send + 'static,
    Ix: Dimension + Send + 'static,
{
    /// Move the dataset onto a blocking thread and stream one epoch of
    /// batches from it.
    ///
    /// Open decode sessions are closed before the move; the worker opens its
    /// own. `channel_capacity` of `None` uses a small default.
    ///
    /// # Errors
    ///
    /// Returns [`FramefoldError::InvalidBatchSize`] if `batch_size` or
    /// `time_steps` is 0.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn into_batch_stream(
        self,
        batch_size: usize,
        time_steps: usize,
        channel_capacity: Option<usize>,
    ) -> Result<BatchStream<A>, FramefoldError> {
        if time_steps == 0 {
            return Err(FramefoldError::InvalidBatchSize);
        }
        BatchSampler::new(self.len(), batch_size)?;

        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY).max(1);
        let (sender, receiver) = tokio::sync::mpsc::channel(capacity);
        let detached = self.detach();

        let handle = tokio::task::spawn_blocking(move || {
            let mut dataset = detached.attach();
            match VideoLoader::new(&mut dataset, batch_size, time_steps) {
                Ok(loader) => {
                    for batch in loader {
                        if sender.blocking_send(batch).is_err() {
                            log::debug!("Batch stream dropped, stopping loader");
                            break;
                        }
                    }
                }
                Err(error) => {
                    let _ = sender.blocking_send(Err(error));
                }
            }
            dataset.release();
        });

        Ok(BatchStream { receiver, handle })
    }
}
