use super::*;
use crate::artifact::Artifact;
use crate::model::*;
use crate::tensor::Tensor;
use std::path::Path;

/// Ways of turning an artifact into a model, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
    /// stored configuration against the current layer schema
    Direct,
    /// stored configuration with caller supplied layer builders
    Custom,
    /// stored weights poured into an explicit architecture
    Rebuild,
}

impl Strategy {
    pub const fn all() -> [Self; 3] {
        [Self::Direct, Self::Custom, Self::Rebuild]
    }
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Direct => "direct load without compilation",
            Self::Custom => "load with custom layer objects",
            Self::Rebuild => "rebuild architecture and load weights",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Configuration plus weights by layer name.
pub fn direct(path: &Path, options: &Options) -> Result<Model, Failure> {
    configured(path, &Registry::builtin(), options)
}

/// As [`direct`], consulting `custom` before the built-in builders.
pub fn custom(path: &Path, custom: &CustomObjects, options: &Options) -> Result<Model, Failure> {
    match custom.is_empty() {
        true => log::debug!("no custom layer builders registered"),
        false => log::debug!("registering {} custom layer builders", custom.len()),
    }
    configured(path, &Registry::builtin().with(custom), options)
}

/// Ignore any stored configuration and load weights by position into
/// `architecture`. The result must produce finite output on an all-zero input.
pub fn rebuild(path: &Path, architecture: &Architecture, options: &Options) -> Result<Model, Failure> {
    let artifact = Artifact::read(path)?;
    let mut model = architecture.build();
    model.load_weights_by_order(artifact.groups())?;
    if options.compile {
        model.compile(artifact.training_config())?;
    }
    let shape = std::iter::once(1)
        .chain(architecture.input.iter().copied())
        .collect::<Vec<_>>();
    let output = model.predict(&Tensor::zeros(&shape), options)?;
    log::debug!("zero probe output {:?}", output.data());
    match output.is_finite() {
        true => Ok(model),
        false => Err(Failure::Unstable),
    }
}

fn configured(path: &Path, registry: &Registry, options: &Options) -> Result<Model, Failure> {
    let artifact = Artifact::read(path)?;
    log::debug!("{}", artifact);
    let config = artifact.model_config().ok_or(Failure::MissingConfig)?;
    let config = ModelConfig::parse(config)?;
    let mut model = registry.assemble(&config)?;
    model.load_weights_by_name(artifact.groups())?;
    if options.compile {
        model.compile(artifact.training_config())?;
    }
    Ok(model)
}
