use super::*;
use crate::tensor::Padding;

/// One stage of a reconstructed classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Block {
    Conv {
        filters: usize,
        kernel: usize,
        activation: Activation,
    },
    Pool {
        size: usize,
    },
    Flatten,
    Dense {
        units: usize,
        activation: Activation,
    },
    Dropout {
        rate: f32,
    },
}

impl From<Block> for Kind {
    fn from(block: Block) -> Self {
        match block {
            Block::Conv {
                filters,
                kernel,
                activation,
            } => Kind::Conv2D {
                filters,
                kernel: (kernel, kernel),
                strides: (1, 1),
                padding: Padding::Valid,
                activation,
                bias: true,
            },
            Block::Pool { size } => Kind::MaxPooling2D {
                pool: (size, size),
                strides: (size, size),
                padding: Padding::Valid,
            },
            Block::Flatten => Kind::Flatten,
            Block::Dense { units, activation } => Kind::Dense {
                units,
                activation,
                bias: true,
            },
            Block::Dropout { rate } => Kind::Dropout { rate },
        }
    }
}

/// Explicit description of a classifier whose stored configuration
/// can no longer be read. The softmax head over `classes` is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
    pub version: u32,
    pub input: [usize; 3],
    pub blocks: Vec<Block>,
    pub classes: usize,
}

impl Architecture {
    /// the disease classifier the backend shipped with
    pub fn legacy() -> Self {
        use Activation::Relu;
        Self {
            version: 1,
            input: crate::LEGACY_INPUT,
            blocks: vec![
                Block::Conv {
                    filters: 32,
                    kernel: 3,
                    activation: Relu,
                },
                Block::Pool { size: 2 },
                Block::Conv {
                    filters: 64,
                    kernel: 3,
                    activation: Relu,
                },
                Block::Pool { size: 2 },
                Block::Conv {
                    filters: 64,
                    kernel: 3,
                    activation: Relu,
                },
                Block::Flatten,
                Block::Dense {
                    units: 64,
                    activation: Relu,
                },
                Block::Dropout { rate: 0.5 },
            ],
            classes: crate::LEGACY_CLASSES,
        }
    }

    /// small 8x8 classifier over 4 classes
    #[cfg(test)]
    pub fn tiny() -> Self {
        Self {
            version: 0,
            input: [8, 8, 3],
            blocks: vec![
                Block::Conv {
                    filters: 4,
                    kernel: 3,
                    activation: Activation::Relu,
                },
                Block::Pool { size: 2 },
                Block::Flatten,
            ],
            classes: 4,
        }
    }

    /// network without weights, layers named the way the framework names them
    pub fn build(&self) -> Model {
        let ref mut names = Names::default();
        let input = Kind::Input {
            shape: self.input.iter().copied().map(Some).collect(),
        };
        let head = Kind::Dense {
            units: self.classes,
            activation: Activation::Softmax,
            bias: true,
        };
        let layers = std::iter::once(input)
            .chain(self.blocks.iter().copied().map(Kind::from))
            .chain(std::iter::once(head))
            .map(|kind| Layer::new(names.next(&kind), kind))
            .collect();
        Model::new(&format!("sequential_v{}", self.version), layers)
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "v{} {}x{}x{} -> {} blocks -> {} classes",
            self.version,
            self.input[0],
            self.input[1],
            self.input[2],
            self.blocks.len(),
            self.classes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_shapes() {
        let model = Architecture::legacy().build();
        assert_eq!(
            model.input_shape(),
            Some(vec![None, Some(128), Some(128), Some(3)])
        );
        assert_eq!(model.output_shape(), vec![None, Some(8)]);
        assert_eq!(model.classes(), Some(8));
    }

    #[test]
    fn legacy_parameter_count() {
        // 896 + 18496 + 36928 + (28*28*64*64 + 64) + (64*8 + 8)
        assert_eq!(Architecture::legacy().build().params(), Some(3_268_168));
    }

    #[test]
    fn legacy_layer_names() {
        let model = Architecture::legacy().build();
        let names = model.layers().iter().map(Layer::name).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "input_layer",
                "conv2d",
                "max_pooling2d",
                "conv2d_1",
                "max_pooling2d_1",
                "conv2d_2",
                "flatten",
                "dense",
                "dropout",
                "dense_1",
            ]
        );
    }
}
