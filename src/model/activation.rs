use crate::tensor::*;
use serde::Deserialize;
use serde::Serialize;

/// Elementwise nonlinearity applied after a layer's affine map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Softmax,
    Tanh,
}

impl Activation {
    pub fn apply(&self, x: Tensor) -> Tensor {
        match self {
            Self::Linear => x,
            Self::Relu => relu(&x),
            Self::Sigmoid => sigmoid(&x),
            Self::Softmax => softmax(&x),
            Self::Tanh => tanh(&x),
        }
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Relu => write!(f, "relu"),
            Self::Sigmoid => write!(f, "sigmoid"),
            Self::Softmax => write!(f, "softmax"),
            Self::Tanh => write!(f, "tanh"),
        }
    }
}
