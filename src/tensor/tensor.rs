use super::*;
use ndarray::ArrayD;
use ndarray::ArrayView1;
use ndarray::ArrayViewD;
use ndarray::Axis;
use ndarray::IxDyn;
use ndarray::Slice;

/// Dense `f32` array, always held in standard (row-major) layout.
///
/// Image batches are laid out `NHWC`, model outputs `[batch, classes]`.
/// The first axis is always the one we batch, slice and join along.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor(ArrayD<f32>);

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ShapeError> {
        let len = data.len();
        match ArrayD::from_shape_vec(IxDyn(&shape), data) {
            Ok(array) => Ok(Self(array)),
            Err(_) => Err(ShapeError::Length { shape, len }),
        }
    }
    pub fn zeros(shape: &[usize]) -> Self {
        Self(ArrayD::zeros(IxDyn(shape)))
    }
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self(ArrayD::from_elem(IxDyn(shape), value))
    }

    pub fn array(&self) -> &ArrayD<f32> {
        &self.0
    }
    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.0.view()
    }
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }
    /// elements in logical order
    pub fn data(&self) -> &[f32] {
        self.0
            .as_slice()
            .expect("tensors are kept in standard layout")
    }
    pub fn rank(&self) -> usize {
        self.0.ndim()
    }
    /// number of scalar elements
    pub fn size(&self) -> usize {
        self.0.len()
    }
    /// extent of the leading axis
    pub fn batch(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self(self.0.mapv(f))
    }
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, ShapeError> {
        let len = self.size();
        match self.0.into_shape_with_order(IxDyn(&shape)) {
            Ok(array) => Ok(Self(array)),
            Err(_) => Err(ShapeError::Length { shape, len }),
        }
    }
    /// lanes of the innermost axis, e.g. one output vector per image
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, f32>> {
        let last = Axis(self.rank().saturating_sub(1));
        self.0.lanes(last).into_iter()
    }

    /// entries `start..end` of the leading axis
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self(self.0.slice_axis(Axis(0), Slice::from(start..end)).to_owned())
    }
    /// stack equally shaped tensors along a new leading axis
    pub fn stack(items: &[Tensor]) -> Result<Self, ShapeError> {
        let first = items.first().ok_or(ShapeError::Empty)?;
        if let Some(other) = items.iter().find(|t| t.shape() != first.shape()) {
            return Err(ShapeError::Join(first.shape().to_vec(), other.shape().to_vec()));
        }
        let views = items.iter().map(Tensor::view).collect::<Vec<_>>();
        Ok(Self::from(ndarray::stack(Axis(0), &views)?))
    }
    /// join tensors along the existing leading axis
    pub fn concat(parts: Vec<Tensor>) -> Result<Self, ShapeError> {
        let first = parts.first().ok_or(ShapeError::Empty)?;
        if let Some(other) = parts
            .iter()
            .find(|t| t.rank() != first.rank() || t.shape()[1..] != first.shape()[1..])
        {
            return Err(ShapeError::Join(first.shape().to_vec(), other.shape().to_vec()));
        }
        let views = parts.iter().map(Tensor::view).collect::<Vec<_>>();
        Ok(Self::from(ndarray::concatenate(Axis(0), &views)?))
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(array: ArrayD<f32>) -> Self {
        match array.is_standard_layout() {
            true => Self(array),
            false => Self(array.as_standard_layout().into_owned()),
        }
    }
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor{:?}", self.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        let err = Tensor::new(vec![2, 3], vec![0.; 5]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Length {
                shape: vec![2, 3],
                len: 5
            }
        );
    }

    #[test]
    fn stack_adds_leading_axis() {
        let a = Tensor::full(&[2, 2, 3], 1.);
        let b = Tensor::full(&[2, 2, 3], 2.);
        let stacked = Tensor::stack(&[a, b]).unwrap();
        assert_eq!(stacked.shape(), &[2, 2, 2, 3]);
        assert_eq!(stacked.data()[12], 2.);
    }

    #[test]
    fn stack_rejects_mixed_shapes() {
        let a = Tensor::zeros(&[2, 2, 3]);
        let b = Tensor::zeros(&[3, 2, 3]);
        assert!(matches!(Tensor::stack(&[a, b]), Err(ShapeError::Join(..))));
    }

    #[test]
    fn slice_then_concat_restores_batch() {
        let x = Tensor::new(vec![5, 2], (0..10).map(|i| i as f32).collect()).unwrap();
        let parts = vec![x.slice(0, 2), x.slice(2, 4), x.slice(4, 5)];
        assert_eq!(parts[2].shape(), &[1, 2]);
        assert_eq!(Tensor::concat(parts).unwrap(), x);
    }

    #[test]
    fn rows_follow_innermost_axis() {
        let x = Tensor::new(vec![3, 2], vec![1., 2., 3., 4., 5., 6.]).unwrap();
        let rows = x.rows().map(|row| row.to_vec()).collect::<Vec<_>>();
        assert_eq!(rows, vec![vec![1., 2.], vec![3., 4.], vec![5., 6.]]);
    }

    #[test]
    fn transposed_arrays_are_relaid() {
        let array = ndarray::Array2::from_shape_vec((2, 3), vec![1., 2., 3., 4., 5., 6.])
            .unwrap()
            .reversed_axes()
            .into_dyn();
        let x = Tensor::from(array);
        assert_eq!(x.shape(), &[3, 2]);
        assert_eq!(x.data(), &[1., 4., 2., 5., 3., 6.]);
    }
}
