use super::*;
use crate::artifact::Artifact;
use crate::model::*;
use std::path::Path;
use std::path::PathBuf;

/// A model produced by the first strategy that worked, plus the ledger of
/// every strategy tried on the way.
#[derive(Debug)]
pub struct Recovered {
    pub model: Model,
    pub strategy: Strategy,
    pub attempts: Vec<Attempt>,
}

/// Coerces a legacy artifact into a model and re-saves it in the current format.
#[derive(Debug, Clone)]
pub struct Recovery {
    input: PathBuf,
    output: PathBuf,
    options: Options,
    custom: CustomObjects,
    architecture: Architecture,
    strategies: Vec<Strategy>,
}

impl Recovery {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            options: Options::default(),
            custom: CustomObjects::legacy(),
            architecture: Architecture::legacy(),
            strategies: Strategy::all().to_vec(),
        }
    }
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
    pub fn custom(mut self, custom: CustomObjects) -> Self {
        self.custom = custom;
        self
    }
    pub fn architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }
    pub fn strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }
    pub fn input(&self) -> &Path {
        &self.input
    }
    pub fn output(&self) -> &Path {
        &self.output
    }

    fn attempt(&self, strategy: Strategy) -> Result<Model, Failure> {
        match strategy {
            Strategy::Direct => direct(&self.input, &self.options),
            Strategy::Custom => custom(&self.input, &self.custom, &self.options),
            Strategy::Rebuild => rebuild(&self.input, &self.architecture, &self.options),
        }
    }
    /// steps are the strategies plus the final save
    fn steps(&self) -> usize {
        self.strategies.len() + 1
    }

    /// Try each strategy in order and stop at the first model.
    pub fn load(&self) -> Result<Recovered, RecoveryError> {
        if !self.input.exists() {
            log::error!("model file not found: {}", self.input.display());
            return Err(RecoveryError::NotFound(self.input.clone()));
        }
        log::info!("loading model from {}", self.input.display());
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for (i, strategy) in self.strategies.iter().copied().enumerate() {
            let index = i + 1;
            log::info!("[{}/{}] trying {}", index, self.steps(), strategy);
            match self.attempt(strategy) {
                Ok(model) => {
                    log::info!("[{}/{}] {} succeeded", index, self.steps(), strategy);
                    attempts.push(Attempt {
                        index,
                        strategy,
                        outcome: Outcome::Success,
                    });
                    return Ok(Recovered {
                        model,
                        strategy,
                        attempts,
                    });
                }
                Err(e) => {
                    let reason = e.to_string();
                    log::warn!(
                        "[{}/{}] {} failed: {}",
                        index,
                        self.steps(),
                        strategy,
                        crate::truncate(&reason, crate::ERROR_PREVIEW)
                    );
                    attempts.push(Attempt {
                        index,
                        strategy,
                        outcome: Outcome::Failure(reason),
                    });
                }
            }
        }
        log::error!("all load strategies failed");
        if let Some(Attempt {
            outcome: Outcome::Failure(reason),
            ..
        }) = attempts.last()
        {
            log::error!("error details: {}", reason);
        }
        log::error!("{}", "=".repeat(60));
        log::error!("the model needs to be retrained with the current framework");
        log::error!("{}", "=".repeat(60));
        Err(RecoveryError::Exhausted { attempts })
    }

    /// Load, describe, and save to the output path. Nothing is written unless a strategy succeeds.
    pub fn run(&self) -> Result<Recovered, RecoveryError> {
        let recovered = self.load()?;
        let ref model = recovered.model;
        log::info!("[{}/{}] saving model in the current format", self.steps(), self.steps());
        for line in model.to_string().lines() {
            log::info!("{}", line);
        }
        log::info!(
            "{:<32}{}",
            "input shape",
            model
                .input_shape()
                .map(|shape| render(&shape))
                .unwrap_or_else(|| String::from("undeclared"))
        );
        log::info!("{:<32}{}", "output shape", render(&model.output_shape()));
        log::info!("{:<32}{}", "layers", model.layers().len());
        log::info!("saving to {}", self.output.display());
        Artifact::from(model)
            .write(&self.output)
            .map_err(|source| RecoveryError::Save {
                path: self.output.clone(),
                source,
            })?;
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::*;
    use serde_json::Value;

    fn trained() -> Model {
        let mut model = Architecture::tiny().build();
        model.randomize(11);
        model
    }

    fn recovery(dir: &Path, artifact: &Artifact) -> Recovery {
        let input = dir.join("model.h5");
        artifact.write(&input).unwrap();
        Recovery::new(input, dir.join("fixed.h5")).architecture(Architecture::tiny())
    }

    /// rewrite the input layer the way older framework versions stored it
    fn legacy(artifact: Artifact) -> Artifact {
        let mut config = ModelConfig::parse(artifact.model_config().unwrap()).unwrap();
        for layer in config.config.layers.iter_mut() {
            if layer.class_name == "InputLayer" {
                let shape = layer.config.remove("batch_shape").unwrap();
                layer.config.insert(String::from("batch_input_shape"), shape);
                layer.config.insert(String::from("ragged"), Value::Bool(false));
            }
        }
        artifact
            .set(MODEL_CONFIG, &config.to_json())
            .set(KERAS_VERSION, "2.4.0")
    }

    fn strategies(recovered: &Recovered) -> Vec<Strategy> {
        recovered.attempts.iter().map(|a| a.strategy).collect()
    }

    #[test]
    fn direct_success_stops_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        let recovery = recovery(dir.path(), &Artifact::from(&model));
        let recovered = recovery.run().unwrap();
        assert_eq!(recovered.strategy, Strategy::Direct);
        assert_eq!(strategies(&recovered), vec![Strategy::Direct]);
        assert_eq!(recovered.model, model);
        assert!(recovery.output().exists());
    }

    #[test]
    fn legacy_config_falls_back_to_custom_objects() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        let recovered = recovery(dir.path(), &legacy(Artifact::from(&model)))
            .run()
            .unwrap();
        assert_eq!(recovered.strategy, Strategy::Custom);
        assert_eq!(
            strategies(&recovered),
            vec![Strategy::Direct, Strategy::Custom]
        );
        assert!(!recovered.attempts[0].succeeded());
        assert_eq!(recovered.model, model);
    }

    #[test]
    fn fixed_length_legacy_file_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        let input = dir.path().join("model.h5");
        legacy(Artifact::from(&model)).write_fixed(&input).unwrap();
        let recovery = Recovery::new(&input, dir.path().join("fixed.h5"))
            .architecture(Architecture::tiny());
        let recovered = recovery.run().unwrap();
        assert_eq!(recovered.strategy, Strategy::Custom);
        assert_eq!(recovered.model, model);
        let saved = Artifact::read(recovery.output()).unwrap();
        assert_eq!(saved.attr(KERAS_VERSION), Some(SCHEMA_VERSION));
        assert_eq!(saved.groups(), model.groups().as_slice());
    }

    #[test]
    fn unreadable_container_fails_every_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.h5");
        std::fs::write(&input, b"not a container").unwrap();
        let recovery = Recovery::new(&input, dir.path().join("fixed.h5"))
            .architecture(Architecture::tiny());
        match recovery.run() {
            Err(RecoveryError::Exhausted { attempts }) => {
                assert_eq!(attempts.len(), 3);
                for attempt in attempts.iter() {
                    let Outcome::Failure(reason) = &attempt.outcome else {
                        panic!("no strategy can read junk");
                    };
                    assert!(reason.starts_with("cannot read artifact"));
                }
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert!(!recovery.output().exists());
    }

    #[test]
    fn weights_only_artifact_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        let artifact = Artifact::from(&model).remove(MODEL_CONFIG);
        let recovered = recovery(dir.path(), &artifact).run().unwrap();
        assert_eq!(recovered.strategy, Strategy::Rebuild);
        assert_eq!(recovered.attempts.len(), 3);
        assert_eq!(recovered.model.groups(), model.groups());
    }

    #[test]
    fn mismatched_architecture_exhausts_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::from(&trained()).remove(MODEL_CONFIG);
        let recovery = recovery(dir.path(), &artifact).architecture(Architecture::legacy());
        match recovery.run() {
            Err(RecoveryError::Exhausted { attempts }) => {
                assert_eq!(attempts.len(), 3);
                assert!(attempts.iter().all(|a| !a.succeeded()));
                let Outcome::Failure(reason) = &attempts[2].outcome else {
                    panic!("rebuild should fail");
                };
                assert!(reason.contains("layers with weights"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert!(!recovery.output().exists());
    }

    #[test]
    fn non_finite_reconstruction_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        let mut groups = model.groups();
        let head = groups.iter_mut().rev().find(|g| !g.tensors.is_empty()).unwrap();
        let bias = head.tensors[1].1.map(|_| f32::NAN);
        head.tensors[1].1 = bias;
        let artifact = Artifact::new(Default::default(), groups);
        let recovery = recovery(dir.path(), &artifact).strategies(vec![Strategy::Rebuild]);
        match recovery.load() {
            Err(RecoveryError::Exhausted { attempts }) => {
                assert_eq!(
                    attempts[0].outcome,
                    Outcome::Failure(Failure::Unstable.to_string())
                );
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn missing_artifact_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recovery = Recovery::new(dir.path().join("absent.h5"), dir.path().join("fixed.h5"));
        assert!(matches!(recovery.run(), Err(RecoveryError::NotFound(_))));
        assert!(!recovery.output().exists());
        assert!(recovery.run().unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn recovered_artifact_loads_directly() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        let first = recovery(dir.path(), &legacy(Artifact::from(&model)));
        first.run().unwrap();
        let second = Recovery::new(first.output(), dir.path().join("again.h5"))
            .architecture(Architecture::tiny());
        let recovered = second.load().unwrap();
        assert_eq!(strategies(&recovered), vec![Strategy::Direct]);
        assert_eq!(recovered.model, model);
    }

    #[test]
    fn compile_requires_stored_training_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        Artifact::from(&trained()).write(&path).unwrap();
        let options = Options {
            compile: true,
            ..Options::default()
        };
        assert!(matches!(
            direct(&path, &options),
            Err(Failure::Config(ConfigError::Untrained))
        ));
        assert!(direct(&path, &Options::default()).is_ok());
    }

    #[test]
    fn compile_restores_training_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        let training = r#"{"loss": "categorical_crossentropy", "metrics": ["accuracy"], "optimizer_config": {"class_name": "Adam", "config": {"learning_rate": 0.001}}}"#;
        Artifact::from(&trained())
            .set(TRAINING_CONFIG, training)
            .write(&path)
            .unwrap();
        let options = Options {
            compile: true,
            ..Options::default()
        };
        let model = direct(&path, &options).unwrap();
        assert_eq!(
            model.training().map(|t| t.optimizer_config.class_name.as_str()),
            Some("Adam")
        );
    }

    #[test]
    fn attempts_render_truncated_reasons() {
        let attempt = Attempt {
            index: 1,
            strategy: Strategy::Direct,
            outcome: Outcome::Failure("x".repeat(300)),
        };
        let line = attempt.to_string();
        assert!(line.len() < 200);
        assert!(line.ends_with("..."));
    }
}
