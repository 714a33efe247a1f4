//! Inference kernels over `NHWC` tensors.
//!
//! Kernel layouts follow the stored weights: convolution kernels are
//! `[kh, kw, in, out]`, dense kernels `[in, out]`.
use super::*;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::Array4;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::ArrayView3;
use ndarray::ArrayView4;
use ndarray::Axis;
use ndarray::Ix1;
use ndarray::Ix2;
use ndarray::Ix4;
use ndarray::s;
use serde::Deserialize;
use serde::Serialize;

/// Border handling for sliding windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Valid,
    Same,
}

impl Padding {
    /// output extent and leading pad for a window sliding over `extent`
    pub fn window(&self, extent: usize, window: usize, stride: usize) -> (usize, usize) {
        match self {
            Self::Valid if extent < window => (0, 0),
            Self::Valid => ((extent - window) / stride + 1, 0),
            Self::Same => {
                let out = extent.div_ceil(stride);
                let total = ((out.max(1) - 1) * stride + window).saturating_sub(extent);
                (out, total / 2)
            }
        }
    }
    /// output extent for a possibly undeclared input extent
    pub fn extent(&self, extent: Option<usize>, window: usize, stride: usize) -> Option<usize> {
        extent.map(|n| self.window(n, window, stride).0)
    }
}

impl std::fmt::Display for Padding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Same => write!(f, "same"),
        }
    }
}

fn nhwc(x: &Tensor) -> Result<ArrayView4<'_, f32>, ShapeError> {
    x.view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| ShapeError::Rank {
            expected: 4,
            actual: x.shape().to_vec(),
        })
}

fn matrix(x: &Tensor) -> Result<ArrayView2<'_, f32>, ShapeError> {
    x.view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| ShapeError::Rank {
            expected: 2,
            actual: x.shape().to_vec(),
        })
}

fn vector(x: &Tensor) -> Result<ArrayView1<'_, f32>, ShapeError> {
    x.view()
        .into_dimensionality::<Ix1>()
        .map_err(|_| ShapeError::Rank {
            expected: 1,
            actual: x.shape().to_vec(),
        })
}

/// Placement of sliding windows over one image.
struct Grid {
    rows: usize,
    cols: usize,
    top: usize,
    left: usize,
    height: usize,
    width: usize,
}

impl Grid {
    fn new(
        (h, w): (usize, usize),
        window: (usize, usize),
        strides: (usize, usize),
        padding: Padding,
    ) -> Result<Self, ShapeError> {
        let (rows, top) = output(h, window.0, strides.0, padding)?;
        let (cols, left) = output(w, window.1, strides.1, padding)?;
        Ok(Self {
            rows,
            cols,
            top,
            left,
            height: ((rows - 1) * strides.0 + window.0).max(top + h),
            width: ((cols - 1) * strides.1 + window.1).max(left + w),
        })
    }
    /// the image on a canvas of `fill` large enough for every window
    fn canvas(&self, image: ArrayView3<'_, f32>, fill: f32) -> Array3<f32> {
        let (h, w, c) = image.dim();
        let mut canvas = Array3::from_elem((self.height, self.width, c), fill);
        canvas
            .slice_mut(s![self.top..self.top + h, self.left..self.left + w, ..])
            .assign(&image);
        canvas
    }
    fn cells(&self) -> usize {
        self.rows * self.cols
    }
}

fn output(extent: usize, window: usize, stride: usize, padding: Padding) -> Result<(usize, usize), ShapeError> {
    match padding.window(extent, window, stride) {
        (0, _) => Err(ShapeError::Window { extent, window }),
        fit => Ok(fit),
    }
}

/// 2D convolution, bias added before any activation.
///
/// Each image is unrolled into one row per window and multiplied
/// against the kernel flattened to `[kh * kw * in, out]`.
pub fn conv2d(
    x: &Tensor,
    kernel: &Tensor,
    bias: Option<&Tensor>,
    strides: (usize, usize),
    padding: Padding,
) -> Result<Tensor, ShapeError> {
    let x = nhwc(x)?;
    let k = nhwc(kernel)?;
    let (n, h, w, c) = x.dim();
    let (kh, kw, kc, f) = k.dim();
    if kc != c {
        return Err(ShapeError::Channels {
            expected: kc,
            actual: c,
        });
    }
    let bias = bias.map(vector).transpose()?;
    let grid = Grid::new((h, w), (kh, kw), strides, padding)?;
    let taps = k.to_shape((kh * kw * c, f))?;
    let mut out = Array4::<f32>::zeros((n, grid.rows, grid.cols, f));
    for (image, mut target) in x.outer_iter().zip(out.outer_iter_mut()) {
        let canvas = grid.canvas(image, 0.);
        let mut unrolled = Array2::<f32>::zeros((grid.cells(), kh * kw * c));
        for (window, mut row) in canvas
            .windows_with_stride((kh, kw, c), (strides.0, strides.1, 1))
            .into_iter()
            .zip(unrolled.rows_mut())
        {
            row.iter_mut().zip(window.iter()).for_each(|(a, v)| *a = *v);
        }
        let mut y = unrolled.dot(&taps);
        if let Some(ref bias) = bias {
            y += bias;
        }
        target.assign(&y.into_shape_with_order((grid.rows, grid.cols, f))?);
    }
    Ok(Tensor::from(out.into_dyn()))
}

/// 2D max pooling; padded cells never win.
pub fn max_pool2d(
    x: &Tensor,
    pool: (usize, usize),
    strides: (usize, usize),
    padding: Padding,
) -> Result<Tensor, ShapeError> {
    let x = nhwc(x)?;
    let (n, h, w, c) = x.dim();
    let grid = Grid::new((h, w), pool, strides, padding)?;
    let mut out = Array4::<f32>::zeros((n, grid.rows, grid.cols, c));
    for (image, mut target) in x.outer_iter().zip(out.outer_iter_mut()) {
        let canvas = grid.canvas(image, f32::NEG_INFINITY);
        let mut pooled = Array2::<f32>::zeros((grid.cells(), c));
        for (window, mut row) in canvas
            .windows_with_stride((pool.0, pool.1, c), (strides.0, strides.1, 1))
            .into_iter()
            .zip(pooled.rows_mut())
        {
            let peak = window
                .fold_axis(Axis(0), f32::NEG_INFINITY, |a, b| f32::max(*a, *b))
                .fold_axis(Axis(0), f32::NEG_INFINITY, |a, b| f32::max(*a, *b));
            row.assign(&peak);
        }
        target.assign(&pooled.into_shape_with_order((grid.rows, grid.cols, c))?);
    }
    Ok(Tensor::from(out.into_dyn()))
}

/// Fully connected layer over `[batch, features]`.
pub fn dense(x: &Tensor, kernel: &Tensor, bias: Option<&Tensor>) -> Result<Tensor, ShapeError> {
    let x = matrix(x)?;
    let k = matrix(kernel)?;
    if k.nrows() != x.ncols() {
        return Err(ShapeError::Channels {
            expected: k.nrows(),
            actual: x.ncols(),
        });
    }
    let mut y = x.dot(&k);
    if let Some(bias) = bias {
        y += &vector(bias)?;
    }
    Ok(Tensor::from(y.into_dyn()))
}

/// Collapse everything but the leading axis.
pub fn flatten(x: Tensor) -> Result<Tensor, ShapeError> {
    let n = x.batch();
    let features = x.shape().iter().skip(1).product();
    x.reshape(vec![n, features])
}

pub fn relu(x: &Tensor) -> Tensor {
    x.map(|v| v.max(0.))
}

pub fn sigmoid(x: &Tensor) -> Tensor {
    x.map(|v| 1. / (1. + (-v).exp()))
}

pub fn tanh(x: &Tensor) -> Tensor {
    x.map(f32::tanh)
}

/// Numerically stable softmax over the innermost axis.
pub fn softmax(x: &Tensor) -> Tensor {
    let mut y = x.array().clone();
    let last = Axis(y.ndim().saturating_sub(1));
    for mut lane in y.lanes_mut(last) {
        let max = lane.fold(f32::NEG_INFINITY, |m, v| m.max(*v));
        lane.mapv_inplace(|v| (v - max).exp());
        let total = lane.sum();
        lane /= total;
    }
    Tensor::from(y)
}
