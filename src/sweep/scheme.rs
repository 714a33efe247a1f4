use crate::Pixel;
use crate::tensor::Tensor;

/// Raw pixel intensities the framework schemes accept.
const RAW: std::ops::RangeInclusive<Pixel> = 0.0..=255.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemeError {
    #[error("pixel {value} outside raw range [0, 255]")]
    Range { value: Pixel },
    #[error("pixel is not finite")]
    NonFinite,
}

/// Fixed transformation of raw pixels before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// scale to [-1, 1]
    MobileNetV2,
    /// raw pixels, normalization lives inside the network
    EfficientNet,
    /// scale to [0, 1]
    Simple,
}

impl Scheme {
    pub const fn all() -> [Self; 3] {
        [Self::MobileNetV2, Self::EfficientNet, Self::Simple]
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::MobileNetV2 => "mobilenetv2",
            Self::EfficientNet => "efficientnet",
            Self::Simple => "simple",
        }
    }

    pub fn apply(&self, x: &Tensor) -> Result<Tensor, SchemeError> {
        match self {
            Self::Simple => Ok(x.map(|v| v / 255.)),
            Self::MobileNetV2 => Self::raw(x).map(|x| x.map(|v| v / 127.5 - 1.)),
            Self::EfficientNet => Self::raw(x).map(Tensor::clone),
        }
    }
    fn raw(x: &Tensor) -> Result<&Tensor, SchemeError> {
        match x.data().iter().find(|v| !RAW.contains(*v)) {
            None => Ok(x),
            Some(v) if !v.is_finite() => Err(SchemeError::NonFinite),
            Some(v) => Err(SchemeError::Range { value: *v }),
        }
    }

    /// Apply this scheme, or `simple` when it cannot handle the batch.
    /// Returns the scheme actually used.
    pub fn preprocess(&self, x: &Tensor) -> (Scheme, Tensor) {
        match self.apply(x) {
            Ok(y) => {
                log::info!("used preprocess: {}", self);
                (*self, y)
            }
            Err(e) => {
                log::warn!("preprocess {} failed, falling back to {}: {}", self, Self::Simple, e);
                (Self::Simple, x.map(|v| v / 255.))
            }
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(values: &[Pixel]) -> Tensor {
        Tensor::new(vec![1, values.len()], values.to_vec()).unwrap()
    }

    #[test]
    fn mobilenet_maps_to_unit_interval() {
        let y = Scheme::MobileNetV2.apply(&pixels(&[0., 127.5, 255.])).unwrap();
        assert_eq!(y.data(), &[-1., 0., 1.]);
    }

    #[test]
    fn efficientnet_is_identity() {
        let x = pixels(&[0., 12., 255.]);
        assert_eq!(Scheme::EfficientNet.apply(&x).unwrap(), x);
    }

    #[test]
    fn simple_scales_by_255() {
        let y = Scheme::Simple.apply(&pixels(&[0., 51., 255.])).unwrap();
        assert_eq!(y.data(), &[0., 0.2, 1.]);
    }

    #[test]
    fn framework_schemes_reject_out_of_range() {
        let x = pixels(&[0., 300.]);
        assert_eq!(
            Scheme::MobileNetV2.apply(&x),
            Err(SchemeError::Range { value: 300. })
        );
        assert_eq!(
            Scheme::EfficientNet.apply(&pixels(&[f32::NAN])),
            Err(SchemeError::NonFinite)
        );
    }

    #[test]
    fn failure_falls_back_to_simple() {
        let x = pixels(&[-51., 255.]);
        let (used, y) = Scheme::MobileNetV2.preprocess(&x);
        assert_eq!(used, Scheme::Simple);
        assert_eq!(y.data(), &[-0.2, 1.]);
        let (used, _) = Scheme::EfficientNet.preprocess(&pixels(&[10.]));
        assert_eq!(used, Scheme::EfficientNet);
    }
}
