use crate::tensor::ShapeError;

/// Configuration documents that do not fit the current layer schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported model class `{0}`")]
    Model(String),
    #[error("unknown layer class `{0}`")]
    Layer(String),
    #[error("unrecognized keyword arguments passed to {class}: {}", .keys.join(", "))]
    Unrecognized { class: String, keys: Vec<String> },
    #[error("{class} is missing required argument `{key}`")]
    Missing { class: String, key: String },
    #[error("{class} received invalid `{key}`: {value}")]
    Invalid {
        class: String,
        key: String,
        value: String,
    },
    #[error("model was saved without a training configuration")]
    Untrained,
}

/// Stored weights that cannot be placed into the assembled layers.
/// Any of these aborts the load; layers are never partially filled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("no weights stored for layer `{0}`")]
    Missing(String),
    #[error("model has {expected} layers with weights, artifact stores {found}")]
    Layers { expected: usize, found: usize },
    #[error("layer `{layer}` expects {expected} weight tensors, artifact stores {found}")]
    Count {
        layer: String,
        expected: usize,
        found: usize,
    },
    #[error("layer `{layer}` {weight} expects shape {expected}, artifact stores {actual:?}")]
    Shape {
        layer: String,
        weight: String,
        expected: String,
        actual: Vec<usize>,
    },
}

/// Forward pass failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("layer `{0}` has no weights loaded")]
    Unweighted(String),
    #[error("model expects input {expected}, received {actual:?}")]
    Input { expected: String, actual: Vec<usize> },
}
