use super::*;
use crate::Dim;
use crate::tensor::*;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Layer type and its hyperparameters. Weights live on [`Layer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Input {
        shape: Vec<Dim>,
    },
    Conv2D {
        filters: usize,
        kernel: (usize, usize),
        strides: (usize, usize),
        padding: Padding,
        activation: Activation,
        bias: bool,
    },
    MaxPooling2D {
        pool: (usize, usize),
        strides: (usize, usize),
        padding: Padding,
    },
    Flatten,
    Dense {
        units: usize,
        activation: Activation,
        bias: bool,
    },
    Dropout {
        rate: f32,
    },
}

impl Kind {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Input { .. } => "InputLayer",
            Self::Conv2D { .. } => "Conv2D",
            Self::MaxPooling2D { .. } => "MaxPooling2D",
            Self::Flatten => "Flatten",
            Self::Dense { .. } => "Dense",
            Self::Dropout { .. } => "Dropout",
        }
    }
    pub fn trainable(&self) -> bool {
        matches!(self, Self::Conv2D { .. } | Self::Dense { .. })
    }
    /// per-sample output extent given the per-sample input extent
    pub fn infer(&self, input: &[Dim]) -> Vec<Dim> {
        let at = |i: usize| input.get(i).copied().flatten();
        match self {
            Self::Input { shape } => shape.clone(),
            Self::Conv2D {
                filters,
                kernel,
                strides,
                padding,
                ..
            } => vec![
                padding.extent(at(0), kernel.0, strides.0),
                padding.extent(at(1), kernel.1, strides.1),
                Some(*filters),
            ],
            Self::MaxPooling2D {
                pool,
                strides,
                padding,
            } => vec![
                padding.extent(at(0), pool.0, strides.0),
                padding.extent(at(1), pool.1, strides.1),
                at(2),
            ],
            Self::Flatten => match input.is_empty() {
                true => vec![None],
                false => vec![input.iter().copied().product()],
            },
            Self::Dense { units, .. } => input
                .split_last()
                .map(|(_, lead)| lead.to_vec())
                .unwrap_or_default()
                .into_iter()
                .chain(std::iter::once(Some(*units)))
                .collect(),
            Self::Dropout { .. } => input.to_vec(),
        }
    }
    /// named weight shapes this layer needs, in storage order
    pub fn expects(&self, input: &[Dim]) -> Vec<(&'static str, Vec<Dim>)> {
        match self {
            Self::Conv2D {
                filters,
                kernel,
                bias,
                ..
            } => std::iter::once((
                "kernel",
                vec![
                    Some(kernel.0),
                    Some(kernel.1),
                    input.get(2).copied().flatten(),
                    Some(*filters),
                ],
            ))
            .chain(bias.then(|| ("bias", vec![Some(*filters)])))
            .collect(),
            Self::Dense { units, bias, .. } => std::iter::once((
                "kernel",
                vec![input.last().copied().flatten(), Some(*units)],
            ))
            .chain(bias.then(|| ("bias", vec![Some(*units)])))
            .collect(),
            _ => Vec::new(),
        }
    }
}

/// One named layer of a sequential model.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    kind: Kind,
    weights: Vec<Tensor>,
}

impl Layer {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            weights: Vec::new(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> &Kind {
        &self.kind
    }
    pub fn weights(&self) -> &[Tensor] {
        &self.weights
    }
    pub fn trainable(&self) -> bool {
        self.kind.trainable()
    }

    /// parameter count, from loaded weights when present
    pub fn params(&self, input: &[Dim]) -> Option<usize> {
        if self.weights.is_empty() {
            self.kind
                .expects(input)
                .iter()
                .map(|(_, dims)| dims.iter().copied().product::<Option<usize>>())
                .sum()
        } else {
            Some(self.weights.iter().map(Tensor::size).sum())
        }
    }

    /// validate every stored tensor before taking any of them
    pub fn assign(&mut self, stored: &[(String, Tensor)], input: &[Dim]) -> Result<(), WeightError> {
        let expects = self.kind.expects(input);
        if stored.len() != expects.len() {
            return Err(WeightError::Count {
                layer: self.name.clone(),
                expected: expects.len(),
                found: stored.len(),
            });
        }
        for ((weight, dims), (_, tensor)) in expects.iter().zip(stored) {
            if !fits(dims, tensor.shape()) {
                return Err(WeightError::Shape {
                    layer: self.name.clone(),
                    weight: weight.to_string(),
                    expected: render(dims),
                    actual: tensor.shape().to_vec(),
                });
            }
        }
        self.weights = stored.iter().map(|(_, tensor)| tensor.clone()).collect();
        Ok(())
    }

    pub fn forward(&self, x: Tensor) -> Result<Tensor, InferenceError> {
        match &self.kind {
            Kind::Input { .. } | Kind::Dropout { .. } => Ok(x),
            Kind::Flatten => Ok(flatten(x)?),
            Kind::MaxPooling2D {
                pool,
                strides,
                padding,
            } => Ok(max_pool2d(&x, *pool, *strides, *padding)?),
            Kind::Conv2D {
                strides,
                padding,
                activation,
                ..
            } => {
                let (kernel, bias) = self.loaded()?;
                Ok(activation.apply(conv2d(&x, kernel, bias, *strides, *padding)?))
            }
            Kind::Dense { activation, .. } => {
                let (kernel, bias) = self.loaded()?;
                Ok(activation.apply(dense(&x, kernel, bias)?))
            }
        }
    }
    fn loaded(&self) -> Result<(&Tensor, Option<&Tensor>), InferenceError> {
        match self.weights.as_slice() {
            [kernel] => Ok((kernel, None)),
            [kernel, bias] => Ok((kernel, Some(bias))),
            _ => Err(InferenceError::Unweighted(self.name.clone())),
        }
    }

    /// arguments in the current configuration schema
    pub fn config(&self) -> LayerConfig {
        let name = self.name.as_str();
        let args = match &self.kind {
            Kind::Input { shape } => json!({
                "name": name,
                "batch_shape": std::iter::once(None).chain(shape.iter().copied()).collect::<Vec<Dim>>(),
                "dtype": "float32",
                "sparse": false,
            }),
            Kind::Conv2D {
                filters,
                kernel,
                strides,
                padding,
                activation,
                bias,
            } => json!({
                "name": name,
                "trainable": true,
                "dtype": "float32",
                "filters": filters,
                "kernel_size": [kernel.0, kernel.1],
                "strides": [strides.0, strides.1],
                "padding": padding,
                "data_format": "channels_last",
                "dilation_rate": [1, 1],
                "groups": 1,
                "activation": activation,
                "use_bias": bias,
            }),
            Kind::MaxPooling2D {
                pool,
                strides,
                padding,
            } => json!({
                "name": name,
                "trainable": true,
                "dtype": "float32",
                "pool_size": [pool.0, pool.1],
                "strides": [strides.0, strides.1],
                "padding": padding,
                "data_format": "channels_last",
            }),
            Kind::Flatten => json!({
                "name": name,
                "trainable": true,
                "dtype": "float32",
                "data_format": "channels_last",
            }),
            Kind::Dense {
                units,
                activation,
                bias,
            } => json!({
                "name": name,
                "trainable": true,
                "dtype": "float32",
                "units": units,
                "activation": activation,
                "use_bias": bias,
            }),
            Kind::Dropout { rate } => json!({
                "name": name,
                "trainable": true,
                "dtype": "float32",
                "rate": rate,
            }),
        };
        LayerConfig {
            class_name: self.kind.class().to_string(),
            config: match args {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }
}

/// Automatic layer names: `conv2d`, `conv2d_1`, `conv2d_2`, ...
#[derive(Debug, Default)]
pub struct Names(std::collections::BTreeMap<&'static str, usize>);

impl Names {
    pub fn next(&mut self, kind: &Kind) -> String {
        let prefix = match kind {
            Kind::Input { .. } => "input_layer",
            Kind::Conv2D { .. } => "conv2d",
            Kind::MaxPooling2D { .. } => "max_pooling2d",
            Kind::Flatten => "flatten",
            Kind::Dense { .. } => "dense",
            Kind::Dropout { .. } => "dropout",
        };
        let seen = self.0.entry(prefix).or_default();
        let name = match *seen {
            0 => prefix.to_string(),
            n => format!("{}_{}", prefix, n),
        };
        *seen += 1;
        name
    }
}

/// whether a concrete shape satisfies a partially declared one
pub fn fits(expected: &[Dim], actual: &[usize]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| e.map_or(true, |e| e == *a))
}

/// tuple notation with `None` for undeclared extents
pub fn render(dims: &[Dim]) -> String {
    let inner = dims
        .iter()
        .map(|d| d.map_or(String::from("None"), |d| d.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    match dims.len() {
        1 => format!("({},)", inner),
        _ => format!("({})", inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(filters: usize) -> Kind {
        Kind::Conv2D {
            filters,
            kernel: (3, 3),
            strides: (1, 1),
            padding: Padding::Valid,
            activation: Activation::Relu,
            bias: true,
        }
    }

    #[test]
    fn conv_infers_valid_extent() {
        let out = conv(32).infer(&[Some(128), Some(128), Some(3)]);
        assert_eq!(out, vec![Some(126), Some(126), Some(32)]);
    }

    #[test]
    fn flatten_of_undeclared_extent_is_undeclared() {
        assert_eq!(Kind::Flatten.infer(&[None, None, Some(3)]), vec![None]);
        assert_eq!(Kind::Flatten.infer(&[]), vec![None]);
        assert_eq!(Kind::Flatten.infer(&[Some(2), Some(3)]), vec![Some(6)]);
        assert_eq!(Kind::Flatten.infer(&[Some(2), Some(2), Some(3)]), vec![Some(12)]);
    }

    #[test]
    fn assign_rejects_wrong_kernel() {
        let mut layer = Layer::new("conv2d", conv(32));
        let stored = vec![
            (String::from("kernel"), Tensor::zeros(&[3, 3, 3, 16])),
            (String::from("bias"), Tensor::zeros(&[16])),
        ];
        let err = layer
            .assign(&stored, &[Some(128), Some(128), Some(3)])
            .unwrap_err();
        assert!(matches!(err, WeightError::Shape { ref weight, .. } if weight == "kernel"));
        assert!(layer.weights().is_empty());
    }

    #[test]
    fn assign_accepts_undeclared_channels() {
        let mut layer = Layer::new("conv2d", conv(4));
        let stored = vec![
            (String::from("kernel"), Tensor::zeros(&[3, 3, 5, 4])),
            (String::from("bias"), Tensor::zeros(&[4])),
        ];
        layer.assign(&stored, &[None, None, None]).unwrap();
        assert_eq!(layer.params(&[None, None, None]), Some(3 * 3 * 5 * 4 + 4));
    }

    #[test]
    fn forward_without_weights_fails() {
        let layer = Layer::new("dense", Kind::Dense {
            units: 2,
            activation: Activation::Softmax,
            bias: true,
        });
        let err = layer.forward(Tensor::zeros(&[1, 4])).unwrap_err();
        assert_eq!(err, InferenceError::Unweighted(String::from("dense")));
    }

    #[test]
    fn names_count_per_kind() {
        let ref mut names = Names::default();
        assert_eq!(names.next(&conv(8)), "conv2d");
        assert_eq!(names.next(&Kind::Flatten), "flatten");
        assert_eq!(names.next(&conv(8)), "conv2d_1");
    }

    #[test]
    fn render_uses_python_tuples() {
        assert_eq!(render(&[None, Some(8)]), "(None, 8)");
        assert_eq!(render(&[Some(32)]), "(32,)");
    }
}
