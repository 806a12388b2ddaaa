//! Time-major batch collation.
//!
//! A loader hands the collator `T * B` samples in sampler order: row 0 of
//! all `B` streams, then row 1, and so on. The collator stacks them and
//! folds the leading axis into `(T, B)`, so that `batch[t][s]` is step `t`
//! of stream `s`. Structured samples (a frame paired with its label) are
//! transposed into one group per position and collated position by
//! position.

use ndarray::{Array, Array2, ArrayD, ArrayViewD, Axis, Dimension};

use crate::error::FramefoldError;

/// One item handed to the collator.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample<A> {
    /// An n-dimensional array, typically a decoded frame.
    Tensor(ArrayD<A>),
    /// An integer, typically a class label.
    Scalar(i64),
    /// A fixed-arity group of samples, collated position by position.
    Tuple(Vec<Sample<A>>),
}

impl<A> Sample<A> {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Sample::Tensor(_) => "tensor".to_string(),
            Sample::Scalar(_) => "scalar".to_string(),
            Sample::Tuple(items) => format!("tuple of {}", items.len()),
        }
    }
}

/// The collated counterpart of [`Sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum Batch<A> {
    /// Stacked tensors of shape `(T, B, ..)`.
    Tensor(ArrayD<A>),
    /// Stacked scalars of shape `(T, B)`.
    Scalars(Array2<i64>),
    /// One batch per tuple position.
    Tuple(Vec<Batch<A>>),
}

impl<A> Batch<A> {
    /// Shape of a tensor or scalar batch; `None` for tuples.
    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Batch::Tensor(array) => Some(array.shape()),
            Batch::Scalars(array) => Some(array.shape()),
            Batch::Tuple(_) => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&ArrayD<A>> {
        match self {
            Batch::Tensor(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_scalars(&self) -> Option<&Array2<i64>> {
        match self {
            Batch::Scalars(array) => Some(array),
            _ => None,
        }
    }

    /// The per-position batches of a tuple batch.
    pub fn into_tuple(self) -> Option<Vec<Batch<A>>> {
        match self {
            Batch::Tuple(parts) => Some(parts),
            _ => None,
        }
    }
}

/// Conversion into a collatable [`Sample`].
pub trait IntoSample<A> {
    fn into_sample(self) -> Sample<A>;
}

impl<A> IntoSample<A> for Sample<A> {
    fn into_sample(self) -> Sample<A> {
        self
    }
}

impl<A, D: Dimension> IntoSample<A> for Array<A, D> {
    fn into_sample(self) -> Sample<A> {
        Sample::Tensor(self.into_dyn())
    }
}

impl<A> IntoSample<A> for i64 {
    fn into_sample(self) -> Sample<A> {
        Sample::Scalar(self)
    }
}

impl<A> IntoSample<A> for usize {
    fn into_sample(self) -> Sample<A> {
        Sample::Scalar(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl<A, X, Y> IntoSample<A> for (X, Y)
where
    X: IntoSample<A>,
    Y: IntoSample<A>,
{
    fn into_sample(self) -> Sample<A> {
        Sample::Tuple(vec![self.0.into_sample(), self.1.into_sample()])
    }
}

/// Collates `T * batch_size` samples into `(T, batch_size, ..)` batches.
///
/// # Example
///
/// ```
/// use ndarray::Array1;
///
/// use framefold::VideoCollate;
///
/// let collate = VideoCollate::new(2)?;
/// let batch = collate.collate_from::<u8, _, _>(vec![
///     (Array1::from(vec![0_u8, 0]), 0_usize),
///     (Array1::from(vec![1_u8, 1]), 1_usize),
///     (Array1::from(vec![2_u8, 2]), 0_usize),
///     (Array1::from(vec![3_u8, 3]), 1_usize),
/// ])?;
///
/// let parts = batch.into_tuple().unwrap();
/// assert_eq!(parts[0].shape(), Some(&[2, 2, 2][..]));
/// assert_eq!(parts[1].shape(), Some(&[2, 2][..]));
/// # Ok::<(), framefold::FramefoldError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCollate {
    batch_size: usize,
}

impl VideoCollate {
    /// # Errors
    ///
    /// Returns [`FramefoldError::InvalidBatchSize`] if `batch_size` is 0.
    pub fn new(batch_size: usize) -> Result<Self, FramefoldError> {
        if batch_size == 0 {
            return Err(FramefoldError::InvalidBatchSize);
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Convert each item with [`IntoSample`] and collate.
    ///
    /// # Errors
    ///
    /// See [`collate`](VideoCollate::collate).
    pub fn collate_from<A, I, T>(&self, items: I) -> Result<Batch<A>, FramefoldError>
    where
        A: Clone,
        I: IntoIterator<Item = T>,
        T: IntoSample<A>,
    {
        self.collate(items.into_iter().map(IntoSample::into_sample).collect())
    }

    /// Collate samples according to the kind of the first one.
    ///
    /// # Errors
    ///
    /// - [`FramefoldError::EmptyBatch`] if `samples` is empty.
    /// - [`FramefoldError::InvalidBatchLength`] if the length is not a
    ///   multiple of the batch size.
    /// - [`FramefoldError::CollationType`] if a sample's kind (or tuple
    ///   arity) differs from the first sample's.
    /// - [`FramefoldError::ShapeMismatch`] if tensors differ in shape.
    pub fn collate<A: Clone>(&self, samples: Vec<Sample<A>>) -> Result<Batch<A>, FramefoldError> {
        let length = samples.len();
        if length == 0 {
            return Err(FramefoldError::EmptyBatch);
        }
        if length % self.batch_size != 0 {
            return Err(FramefoldError::InvalidBatchLength {
                length,
                batch_size: self.batch_size,
            });
        }
        let steps = length / self.batch_size;

        match samples[0] {
            Sample::Tensor(_) => self.collate_tensors(steps, &samples),
            Sample::Scalar(_) => self.collate_scalars(steps, &samples),
            Sample::Tuple(ref first) => {
                let arity = first.len();
                self.collate_tuples(arity, samples)
            }
        }
    }

    fn collate_tensors<A: Clone>(
        &self,
        steps: usize,
        samples: &[Sample<A>],
    ) -> Result<Batch<A>, FramefoldError> {
        let mut views: Vec<ArrayViewD<'_, A>> = Vec::with_capacity(samples.len());
        for sample in samples {
            match sample {
                Sample::Tensor(array) => views.push(array.view()),
                other => return Err(type_error("tensor", other)),
            }
        }

        let frame_shape = views[0].shape().to_vec();
        if let Some(bad) = views.iter().find(|view| view.shape() != frame_shape.as_slice()) {
            return Err(FramefoldError::ShapeMismatch(format!(
                "expected {frame_shape:?}, found {:?}",
                bad.shape()
            )));
        }

        let stacked = ndarray::stack(Axis(0), &views)?;
        let mut shape = Vec::with_capacity(frame_shape.len() + 2);
        shape.push(steps);
        shape.push(self.batch_size);
        shape.extend_from_slice(&frame_shape);

        Ok(Batch::Tensor(stacked.into_shape_with_order(shape)?))
    }

    fn collate_scalars<A>(
        &self,
        steps: usize,
        samples: &[Sample<A>],
    ) -> Result<Batch<A>, FramefoldError> {
        let values = samples
            .iter()
            .map(|sample| match sample {
                Sample::Scalar(value) => Ok(*value),
                other => Err(type_error("scalar", other)),
            })
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(Batch::Scalars(Array2::from_shape_vec(
            (steps, self.batch_size),
            values,
        )?))
    }

    fn collate_tuples<A: Clone>(
        &self,
        arity: usize,
        samples: Vec<Sample<A>>,
    ) -> Result<Batch<A>, FramefoldError> {
        let mut columns: Vec<Vec<Sample<A>>> = (0..arity)
            .map(|_| Vec::with_capacity(samples.len()))
            .collect();

        for sample in samples {
            match sample {
                Sample::Tuple(items) if items.len() == arity => {
                    for (column, item) in columns.iter_mut().zip(items) {
                        column.push(item);
                    }
                }
                other => return Err(type_error(&format!("tuple of {arity}"), &other)),
            }
        }

        columns
            .into_iter()
            .map(|column| self.collate(column))
            .collect::<Result<Vec<_>, _>>()
            .map(Batch::Tuple)
    }
}

fn type_error<A>(expected: &str, found: &Sample<A>) -> FramefoldError {
    FramefoldError::CollationType {
        expected: expected.to_string(),
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::{Batch, IntoSample, Sample, VideoCollate};
    use crate::error::FramefoldError;

    #[test]
    fn scalars_fold_time_major() {
        let collate = VideoCollate::new(3).unwrap();
        let batch = collate
            .collate_from::<u8, _, _>([0_i64, 1, 2, 3, 4, 5])
            .unwrap();
        assert_eq!(batch, Batch::Scalars(array![[0, 1, 2], [3, 4, 5]]));
    }

    #[test]
    fn empty_tuple_collates_to_empty_tuple() {
        let collate = VideoCollate::new(1).unwrap();
        let batch = collate.collate::<u8>(vec![Sample::Tuple(vec![])]).unwrap();
        assert_eq!(batch, Batch::Tuple(vec![]));
    }

    #[test]
    fn pair_converts_to_two_tuple() {
        let sample: Sample<f32> = (Array1::<f32>::zeros(3), 7_usize).into_sample();
        assert_eq!(sample.kind(), "tuple of 2");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(
            VideoCollate::new(0),
            Err(FramefoldError::InvalidBatchSize)
        ));
    }
}
