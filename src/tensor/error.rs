/// Shape violations raised by tensor construction and the numeric kernels.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("shape {shape:?} cannot hold {len} values")]
    Length { shape: Vec<usize>, len: usize },
    #[error("expected rank {expected}, found shape {actual:?}")]
    Rank { expected: usize, actual: Vec<usize> },
    #[error("expected {expected} input channels, found {actual}")]
    Channels { expected: usize, actual: usize },
    #[error("window of {window} does not fit an extent of {extent}")]
    Window { extent: usize, window: usize },
    #[error("cannot join tensors of shape {0:?} and {1:?}")]
    Join(Vec<usize>, Vec<usize>),
    #[error("no tensors to join")]
    Empty,
    #[error(transparent)]
    Array(#[from] ndarray::ShapeError),
}
