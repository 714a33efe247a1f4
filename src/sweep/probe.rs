use super::Extent;
use crate::Pixel;
use crate::tensor::Tensor;
use rand::Rng;

/// Synthetic batches that expose a model predicting one class regardless of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    Noise,
    Zeros,
    Ones,
}

impl Probe {
    pub const fn all() -> [Self; 3] {
        [Self::Noise, Self::Zeros, Self::Ones]
    }
    pub fn label(&self) -> &'static str {
        match self {
            Self::Noise => "random",
            Self::Zeros => "zeros",
            Self::Ones => "ones",
        }
    }
    pub fn count(&self) -> usize {
        match self {
            Self::Noise => crate::NOISE_COUNT,
            Self::Zeros | Self::Ones => crate::CONSTANT_COUNT,
        }
    }
    /// `[count, h, w, c]` batch already scaled to [0, 1]
    pub fn batch(&self, [h, w, c]: Extent, rng: &mut impl Rng) -> Tensor {
        let shape = [self.count(), h, w, c];
        match self {
            Self::Zeros => Tensor::zeros(&shape),
            Self::Ones => Tensor::full(&shape, 1.),
            Self::Noise => {
                let data = (0..shape.iter().product::<usize>())
                    .map(|_| rng.random_range(0..256u16) as Pixel / 255.)
                    .collect();
                Tensor::new(shape.to_vec(), data).expect("noise buffer matches extent")
            }
        }
    }
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn batches_have_probe_sizes() {
        let ref mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(Probe::Noise.batch([4, 4, 3], rng).shape(), &[10, 4, 4, 3]);
        assert_eq!(Probe::Zeros.batch([4, 4, 1], rng).shape(), &[3, 4, 4, 1]);
        assert!(Probe::Ones.batch([2, 2, 3], rng).data().iter().all(|v| *v == 1.));
    }

    #[test]
    fn noise_is_scaled() {
        let ref mut rng = SmallRng::seed_from_u64(5);
        let x = Probe::Noise.batch([8, 8, 3], rng);
        assert!(x.data().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(x.data().iter().any(|v| *v > 0.));
    }
}
