use super::*;
use crate::Dim;
use crate::artifact::Group;
use crate::tensor::*;

/// A sequential network: ordered layers, their weights, and the training
/// configuration when it was restored.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    layers: Vec<Layer>,
    training: Option<TrainingConfig>,
}

impl Model {
    pub fn new(name: &str, layers: Vec<Layer>) -> Self {
        Self {
            name: name.to_string(),
            layers,
            training: None,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    pub fn training(&self) -> Option<&TrainingConfig> {
        self.training.as_ref()
    }

    /// per-sample shapes flowing through the network; entry `i` feeds layer `i`,
    /// the last entry is the network output
    fn trace(&self) -> Vec<Vec<Dim>> {
        let mut shapes = vec![Vec::new()];
        for layer in self.layers.iter() {
            let next = layer.kind().infer(shapes.last().map(Vec::as_slice).unwrap_or_default());
            shapes.push(next);
        }
        shapes
    }
    fn declared(&self) -> Option<&[Dim]> {
        self.layers.iter().find_map(|layer| match layer.kind() {
            Kind::Input { shape } => Some(shape.as_slice()),
            _ => None,
        })
    }

    /// declared input with the batch axis, e.g. `(None, 128, 128, 3)`
    pub fn input_shape(&self) -> Option<Vec<Dim>> {
        self.declared()
            .map(|shape| std::iter::once(None).chain(shape.iter().copied()).collect())
    }
    pub fn output_shape(&self) -> Vec<Dim> {
        std::iter::once(None)
            .chain(self.trace().pop().unwrap_or_default())
            .collect()
    }
    pub fn classes(&self) -> Option<usize> {
        self.trace().last().and_then(|shape| shape.last()).copied().flatten()
    }
    /// declared spatial extent `(height, width)`
    pub fn target(&self) -> Option<(usize, usize)> {
        match self.declared() {
            Some(&[Some(h), Some(w), _]) => Some((h, w)),
            _ => None,
        }
    }
    /// declared channel count of the input
    pub fn channels(&self) -> Option<usize> {
        match self.declared() {
            Some(&[_, _, c]) => c,
            _ => None,
        }
    }
    pub fn params(&self) -> Option<usize> {
        self.layers
            .iter()
            .zip(self.trace())
            .map(|(layer, input)| layer.params(&input))
            .sum()
    }

    /// Inference in batches of `options.batch_size`.
    pub fn predict(&self, x: &Tensor, options: &Options) -> Result<Tensor, InferenceError> {
        if let Some(declared) = self.declared() {
            if x.rank() != declared.len() + 1 || !fits(declared, &x.shape()[1..]) {
                return Err(InferenceError::Input {
                    expected: render(&self.input_shape().unwrap_or_default()),
                    actual: x.shape().to_vec(),
                });
            }
        }
        let n = x.batch();
        let size = options.batch_size.max(1);
        let parts = (0..n)
            .step_by(size)
            .map(|start| self.forward(x.slice(start, (start + size).min(n))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tensor::concat(parts)?)
    }
    pub fn forward(&self, x: Tensor) -> Result<Tensor, InferenceError> {
        self.layers.iter().try_fold(x, |x, layer| layer.forward(x))
    }

    /// Weights matched to layers by layer name. Groups naming no layer are ignored.
    pub fn load_weights_by_name(&mut self, groups: &[Group]) -> Result<(), WeightError> {
        let trace = self.trace();
        let mut layers = self.layers.clone();
        for (layer, input) in layers.iter_mut().zip(trace.iter()) {
            if !layer.trainable() {
                continue;
            }
            let group = groups
                .iter()
                .find(|g| g.name == layer.name())
                .ok_or_else(|| WeightError::Missing(layer.name().to_string()))?;
            layer.assign(&group.tensors, input)?;
        }
        self.layers = layers;
        Ok(())
    }
    /// Weights matched to layers by position, skipping layers and groups without weights.
    pub fn load_weights_by_order(&mut self, groups: &[Group]) -> Result<(), WeightError> {
        let trace = self.trace();
        let stored = groups.iter().filter(|g| !g.tensors.is_empty()).collect::<Vec<_>>();
        let expected = self.layers.iter().filter(|l| l.trainable()).count();
        if stored.len() != expected {
            return Err(WeightError::Layers {
                expected,
                found: stored.len(),
            });
        }
        let mut layers = self.layers.clone();
        let mut stored = stored.into_iter();
        for (layer, input) in layers.iter_mut().zip(trace.iter()) {
            if let Some(group) = layer.trainable().then(|| stored.next()).flatten() {
                layer.assign(&group.tensors, input)?;
            }
        }
        self.layers = layers;
        Ok(())
    }
    /// one group per layer in layer order, empty for layers without weights
    pub fn groups(&self) -> Vec<Group> {
        self.layers
            .iter()
            .zip(self.trace())
            .map(|(layer, input)| Group {
                name: layer.name().to_string(),
                tensors: layer
                    .kind()
                    .expects(&input)
                    .into_iter()
                    .map(|(weight, _)| weight.to_string())
                    .zip(layer.weights().iter().cloned())
                    .collect(),
            })
            .collect()
    }

    pub fn config(&self) -> ModelConfig {
        ModelConfig::sequential(
            &self.name,
            self.layers.iter().map(Layer::config).collect(),
        )
    }
    /// restore the stored training configuration
    pub fn compile(&mut self, training: Option<&str>) -> Result<(), ConfigError> {
        let json = training.ok_or(ConfigError::Untrained)?;
        self.training = Some(TrainingConfig::parse(json)?);
        Ok(())
    }

    /// fills every weight with small random values
    #[cfg(test)]
    pub fn randomize(&mut self, seed: u64) {
        use rand::Rng;
        use rand::SeedableRng;
        let ref mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
        let groups = self
            .layers
            .iter()
            .zip(self.trace())
            .map(|(layer, input)| Group {
                name: layer.name().to_string(),
                tensors: layer
                    .kind()
                    .expects(&input)
                    .into_iter()
                    .map(|(weight, dims)| {
                        let shape = dims.into_iter().map(|d| d.unwrap_or(1)).collect::<Vec<_>>();
                        let n = shape.iter().product::<usize>();
                        let data = (0..n).map(|_| rng.random_range(-0.1..0.1)).collect();
                        (weight.to_string(), Tensor::new(shape, data).expect("shape matches data"))
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();
        self.load_weights_by_name(&groups).expect("random weights fit");
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const L: usize = 32;
        const M: usize = 26;
        const R: usize = 13;
        fn commas(n: usize) -> String {
            n.to_string()
                .as_bytes()
                .rchunks(3)
                .rev()
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect::<Vec<_>>()
                .join(",")
        }
        let trace = self.trace();
        writeln!(f, "Model: \"{}\"", self.name)?;
        writeln!(f, "┌{}┬{}┬{}┐", "─".repeat(L), "─".repeat(M), "─".repeat(R))?;
        writeln!(
            f,
            "│ {:<l$} │ {:<m$} │ {:>r$} │",
            "Layer (type)",
            "Output Shape",
            "Param #",
            l = L - 2,
            m = M - 2,
            r = R - 2
        )?;
        writeln!(f, "├{}┼{}┼{}┤", "─".repeat(L), "─".repeat(M), "─".repeat(R))?;
        for (i, layer) in self.layers.iter().enumerate() {
            let output = std::iter::once(None)
                .chain(trace[i + 1].iter().copied())
                .collect::<Vec<_>>();
            let params = layer
                .params(&trace[i])
                .map(commas)
                .unwrap_or_else(|| String::from("?"));
            writeln!(
                f,
                "│ {:<l$} │ {:<m$} │ {:>r$} │",
                format!("{} ({})", layer.name(), layer.kind().class()),
                render(&output),
                params,
                l = L - 2,
                m = M - 2,
                r = R - 2
            )?;
        }
        writeln!(f, "└{}┴{}┴{}┘", "─".repeat(L), "─".repeat(M), "─".repeat(R))?;
        write!(
            f,
            " Total params: {}",
            self.params()
                .map(commas)
                .unwrap_or_else(|| String::from("?"))
        )
    }
}
