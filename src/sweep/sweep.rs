use super::*;
use crate::model::*;
use crate::recovery::direct;
use crate::tensor::Tensor;
use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::PathBuf;

/// Predictions under one preprocessing scheme.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub requested: Scheme,
    pub used: Scheme,
    pub predictions: Predictions,
}

/// Everything the sweep printed, for callers that want to inspect it.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub target: Extent,
    pub names: Vec<String>,
    pub schemes: Vec<Scored>,
    pub raw: Option<Predictions>,
    pub probes: Vec<(Probe, Predictions)>,
}

impl Report {
    pub fn probe(&self, probe: Probe) -> Option<&Predictions> {
        self.probes
            .iter()
            .find(|(p, _)| *p == probe)
            .map(|(_, predictions)| predictions)
    }
}

/// Diagnostic sweep over a model: preprocessing schemes on sample images,
/// then synthetic degeneracy probes. Purely descriptive.
#[derive(Debug, Clone)]
pub struct Sweep {
    model: PathBuf,
    samples: PathBuf,
    options: Options,
    seed: Option<u64>,
}

impl Sweep {
    pub fn new(model: impl Into<PathBuf>, samples: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            samples: samples.into(),
            options: Options::default(),
            seed: None,
        }
    }
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// declared input extent, or the default square with RGB channels
    pub fn target(model: &Model) -> Extent {
        let channels = model.channels().unwrap_or(crate::DEFAULT_CHANNELS);
        match model.target() {
            Some((h, w)) => {
                log::info!("using model input size for loading images: {:?}", (h, w));
                [h, w, channels]
            }
            None => {
                let size = (crate::DEFAULT_SIZE, crate::DEFAULT_SIZE);
                log::info!("falling back to default target size: {:?}", size);
                [size.0, size.1, channels]
            }
        }
    }

    fn predict(&self, model: &Model, label: &str, names: Vec<String>, x: &Tensor) -> anyhow::Result<Predictions> {
        let outputs = model
            .predict(x, &self.options)
            .with_context(|| format!("{} predictions", label))?;
        Ok(Predictions {
            label: label.to_string(),
            names,
            outputs,
        })
    }

    pub fn run(&self) -> anyhow::Result<Report> {
        log::info!("{:<32}{}", "model path", self.model.display());
        if !self.model.exists() {
            anyhow::bail!("model file not found: {}", self.model.display());
        }
        let ref model = direct(&self.model, &self.options).context("failed to load model")?;
        log::info!("loaded model");
        for line in model.to_string().lines() {
            log::info!("{}", line);
        }
        if let Some(shape) = model.input_shape() {
            log::info!("model.input_shape = {}", render(&shape));
        }
        let target = Self::target(model);
        let ref mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        let samples = gather(&self.samples, target, rng);
        let names = samples.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        let ref x = batch(&samples)?;

        let mut schemes = Vec::new();
        for requested in Scheme::all() {
            let (used, xp) = requested.preprocess(x);
            let predictions = self.predict(model, requested.name(), names.clone(), &xp)?;
            for line in predictions.to_string().lines() {
                log::info!("{}", line);
            }
            schemes.push(Scored {
                requested,
                used,
                predictions,
            });
        }

        let raw = match self.predict(model, "raw", names.clone(), &x.map(|v| v / 255.)) {
            Ok(predictions) => {
                for line in predictions.to_string().lines() {
                    log::info!("{}", line);
                }
                Some(predictions)
            }
            Err(e) => {
                log::warn!("could not run raw predict: {:#}", e);
                None
            }
        };

        log::info!("--- additional checks: random and constant inputs ---");
        let classes = model.classes().unwrap_or(0);
        let mut probes = Vec::new();
        for probe in Probe::all() {
            let names = (0..probe.count())
                .map(|i| format!("{}_{}", probe, i))
                .collect();
            let predictions = self.predict(model, probe.label(), names, &probe.batch(target, rng))?;
            match probe {
                Probe::Noise => log::info!(
                    "{} inputs argmax counts: {:?}",
                    probe,
                    predictions.bincount(classes)
                ),
                Probe::Zeros | Probe::Ones => log::info!(
                    "{} inputs argmax: {:?} vals (first): {}",
                    probe,
                    predictions.argmax(),
                    rounded(&predictions.preview(0))
                ),
            }
            probes.push((probe, predictions));
        }

        Ok(Report {
            target,
            names,
            schemes,
            raw,
            probes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use std::path::Path;

    fn save(model: &Model, dir: &Path) -> PathBuf {
        let path = dir.join("model.h5");
        Artifact::from(model).write(&path).unwrap();
        path
    }

    fn trained() -> Model {
        let mut model = Architecture::tiny().build();
        model.randomize(21);
        model
    }

    /// head ignores its input and always favours class 2
    fn collapsed() -> Model {
        let mut groups = trained().groups();
        let head = groups.iter_mut().rev().find(|g| !g.tensors.is_empty()).unwrap();
        head.tensors[0].1 = head.tensors[0].1.map(|_| 0.);
        head.tensors[1].1 = Tensor::new(vec![4], vec![0., 0., 5., 0.]).unwrap();
        let mut model = Architecture::tiny().build();
        model.load_weights_by_name(&groups).unwrap();
        model
    }

    #[test]
    fn empty_samples_use_synthetic_images_at_model_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&trained(), dir.path());
        let samples = dir.path().join("test_images");
        std::fs::create_dir(&samples).unwrap();
        let report = Sweep::new(path, samples).seed(Some(1)).run().unwrap();
        assert_eq!(report.target, [8, 8, 3]);
        assert_eq!(
            report.names,
            vec!["random_0.png", "random_1.png", "random_2.png"]
        );
        for scored in report.schemes.iter() {
            assert_eq!(scored.predictions.len(), report.names.len());
            assert_eq!(scored.predictions.classes(), 4);
            assert_eq!(scored.used, scored.requested);
        }
        assert!(report.raw.is_some());
        assert_eq!(report.probe(Probe::Noise).map(Predictions::len), Some(10));
    }

    #[test]
    fn collapsed_model_has_identical_argmax() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&collapsed(), dir.path());
        let report = Sweep::new(path, dir.path().join("absent"))
            .seed(Some(2))
            .run()
            .unwrap();
        let zeros = report.probe(Probe::Zeros).unwrap();
        assert!(zeros.collapsed());
        assert_eq!(zeros.argmax(), vec![2, 2, 2]);
        let noise = report.probe(Probe::Noise).unwrap();
        assert_eq!(noise.bincount(4), vec![0, 0, 10, 0]);
    }

    #[test]
    fn zero_batch_is_uniform_on_any_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&trained(), dir.path());
        let report = Sweep::new(path, dir.path()).seed(Some(3)).run().unwrap();
        assert!(report.probe(Probe::Zeros).unwrap().collapsed());
    }

    #[test]
    fn real_images_are_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&trained(), dir.path());
        let samples = dir.path().join("test_images");
        std::fs::create_dir(&samples).unwrap();
        for name in ["x.png", "y.png"] {
            image::RgbImage::from_pixel(20, 20, image::Rgb([200, 100, 0]))
                .save(samples.join(name))
                .unwrap();
        }
        let report = Sweep::new(path, samples).seed(Some(4)).run().unwrap();
        assert_eq!(report.names, vec!["x.png", "y.png"]);
        assert_eq!(report.schemes[0].predictions.len(), 2);
    }

    #[test]
    fn missing_model_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let err = Sweep::new(dir.path().join("absent.h5"), dir.path())
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn legacy_model_is_not_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        Artifact::from(&trained())
            .remove(crate::artifact::MODEL_CONFIG)
            .write(&path)
            .unwrap();
        assert!(Sweep::new(path, dir.path()).run().is_err());
    }

    #[test]
    fn undeclared_input_defaults_to_128() {
        let model = Model::new("bare", vec![Layer::new("flatten", Kind::Flatten)]);
        assert_eq!(Sweep::target(&model), [128, 128, 3]);
    }

    #[test]
    fn greyscale_model_gets_single_channel_batches() {
        let dir = tempfile::tempdir().unwrap();
        let mut architecture = Architecture::tiny();
        architecture.input = [8, 8, 1];
        let mut model = architecture.build();
        model.randomize(5);
        let path = save(&model, dir.path());
        let samples = dir.path().join("test_images");
        std::fs::create_dir(&samples).unwrap();
        image::RgbImage::from_pixel(12, 12, image::Rgb([9, 9, 9]))
            .save(samples.join("x.png"))
            .unwrap();
        let report = Sweep::new(path, samples).seed(Some(6)).run().unwrap();
        assert_eq!(report.target, [8, 8, 1]);
        assert_eq!(report.names, vec!["x.png"]);
        assert_eq!(report.probe(Probe::Ones).map(Predictions::len), Some(3));
    }
}
