//! Model artifact container.
//!
//! HDF5 in the layout the training framework writes:
//!
//! ```text
//! /                                  attrs model_config, training_config, keras_version, backend
//! /model_weights                     attrs layer_names, keras_version, backend
//! /model_weights/<layer>             attrs weight_names
//! /model_weights/<layer>/<layer>/    datasets kernel:0, bias:0
//! ```
//!
//! Weights-only files keep `layer_names` and the layer groups at the root.
//! Text attributes may be fixed or variable length; we always write variable length.
use super::*;
use crate::model::*;
use crate::tensor::Tensor;
use hdf5::Attribute;
use hdf5::Location;
use hdf5::types::FixedAscii;
use hdf5::types::FixedUnicode;
use hdf5::types::H5Type;
use hdf5::types::TypeDescriptor;
use hdf5::types::VarLenAscii;
use hdf5::types::VarLenUnicode;
use std::collections::BTreeMap;
use std::path::Path;

/// attribute holding the model configuration document
pub const MODEL_CONFIG: &str = "model_config";
/// attribute holding the training configuration document
pub const TRAINING_CONFIG: &str = "training_config";
/// attribute naming the framework version that wrote the artifact
pub const KERAS_VERSION: &str = "keras_version";
/// attribute naming the numeric backend the weights were laid out for
pub const BACKEND: &str = "backend";
/// layer schema version written by this crate
pub const SCHEMA_VERSION: &str = "3.0.0";

const MODEL_WEIGHTS: &str = "model_weights";
const LAYER_NAMES: &str = "layer_names";
const WEIGHT_NAMES: &str = "weight_names";
/// widest fixed-length layer or weight name read without reallocation
const NAME: usize = 256;
/// widest fixed-length configuration document accepted
const DOCUMENT: usize = 1 << 22;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifact {
    attrs: BTreeMap<String, String>,
    groups: Vec<Group>,
}

impl Artifact {
    pub fn new(attrs: BTreeMap<String, String>, groups: Vec<Group>) -> Self {
        Self { attrs, groups }
    }
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }
    pub fn model_config(&self) -> Option<&str> {
        self.attr(MODEL_CONFIG)
    }
    pub fn training_config(&self) -> Option<&str> {
        self.attr(TRAINING_CONFIG)
    }
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_string(), value.to_string());
        self
    }
    pub fn remove(mut self, key: &str) -> Self {
        self.attrs.remove(key);
        self
    }

    /// Root text attributes plus every layer's weights, in stored layer order.
    pub fn read(path: &Path) -> Result<Self, ArtifactError> {
        let file = hdf5::File::open(path)?;
        let mut attrs = BTreeMap::new();
        for key in file.attr_names()? {
            match text(&file.attr(&key)?) {
                Ok(values) => {
                    if let Some(value) = values.into_iter().next() {
                        attrs.insert(key, value);
                    }
                }
                Err(e) => log::debug!("skipping attribute {}: {}", key, e),
            }
        }
        let weights = match file.link_exists(MODEL_WEIGHTS) {
            true => file.group(MODEL_WEIGHTS)?,
            false => file.group("/")?,
        };
        let groups = names(&weights, LAYER_NAMES)?
            .iter()
            .map(|layer| group(&weights, layer))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { attrs, groups })
    }

    /// Overwrites `path`. Weights go under `model_weights` when a model
    /// configuration is present, at the root otherwise.
    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        let file = hdf5::File::create(path)?;
        for (key, value) in self.attrs.iter() {
            scalar(&file, key, value)?;
        }
        let weights = match self.model_config() {
            Some(_) => {
                let weights = file.create_group(MODEL_WEIGHTS)?;
                for key in [KERAS_VERSION, BACKEND] {
                    if let Some(value) = self.attr(key) {
                        scalar(&weights, key, value)?;
                    }
                }
                weights
            }
            None => file.group("/")?,
        };
        let layers = self.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>();
        array(&weights, LAYER_NAMES, &layers)?;
        for group in self.groups.iter() {
            let location = weights.create_group(&group.name)?;
            let names = group
                .tensors
                .iter()
                .map(|(name, _)| format!("{}/{}:0", group.name, name))
                .collect::<Vec<_>>();
            array(&location, WEIGHT_NAMES, &names.iter().map(String::as_str).collect::<Vec<_>>())?;
            if group.tensors.is_empty() {
                continue;
            }
            let inner = location.create_group(&group.name)?;
            for (name, tensor) in group.tensors.iter() {
                inner
                    .new_dataset_builder()
                    .with_data(tensor.array())
                    .create(format!("{}:0", name).as_str())?;
            }
        }
        Ok(())
    }
}

impl From<&Model> for Artifact {
    fn from(model: &Model) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert(KERAS_VERSION.to_string(), SCHEMA_VERSION.to_string());
        attrs.insert(BACKEND.to_string(), String::from("tensorflow"));
        attrs.insert(MODEL_CONFIG.to_string(), model.config().to_json());
        if let Some(training) = model.training() {
            attrs.insert(
                TRAINING_CONFIG.to_string(),
                serde_json::to_string(training).expect("training config serializes"),
            );
        }
        Self {
            attrs,
            groups: model.groups(),
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "keras {} · {} groups · {} params · {}",
            self.attr(KERAS_VERSION).unwrap_or("?"),
            self.groups.len(),
            self.groups.iter().map(Group::params).sum::<usize>(),
            match self.model_config() {
                Some(_) => "with config",
                None => "weights only",
            }
        )
    }
}

/// one layer's weights, named `kernel`, `bias`, ...
fn group(weights: &hdf5::Group, layer: &str) -> Result<Group, ArtifactError> {
    let location = weights.group(layer)?;
    let tensors = names(&location, WEIGHT_NAMES)?
        .iter()
        .map(|weight| -> Result<(String, Tensor), ArtifactError> {
            let array = location.dataset(weight)?.read_dyn::<f32>()?;
            Ok((leaf(weight), Tensor::from(array)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Group {
        name: layer.to_string(),
        tensors,
    })
}

/// `conv2d/kernel:0` is stored as `kernel`
fn leaf(weight: &str) -> String {
    let leaf = weight.rsplit('/').next().unwrap_or(weight);
    leaf.split(':').next().unwrap_or(leaf).to_string()
}

/// a string array attribute, empty when absent
fn names(location: &Location, key: &str) -> Result<Vec<String>, ArtifactError> {
    match location.attr_names()?.iter().any(|n| n == key) {
        true => text(&location.attr(key)?),
        false => Ok(Vec::new()),
    }
}

fn text(attr: &Attribute) -> Result<Vec<String>, ArtifactError> {
    if attr.size() == 0 {
        return Ok(Vec::new());
    }
    match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenUnicode => strings(attr, VarLenUnicode::as_str),
        TypeDescriptor::VarLenAscii => strings(attr, VarLenAscii::as_str),
        TypeDescriptor::FixedAscii(n) if n <= NAME => strings(attr, FixedAscii::<NAME>::as_str),
        TypeDescriptor::FixedAscii(n) if n <= DOCUMENT => strings(attr, FixedAscii::<DOCUMENT>::as_str),
        TypeDescriptor::FixedUnicode(n) if n <= NAME => strings(attr, FixedUnicode::<NAME>::as_str),
        TypeDescriptor::FixedUnicode(n) if n <= DOCUMENT => {
            strings(attr, FixedUnicode::<DOCUMENT>::as_str)
        }
        _ => Err(ArtifactError::Text(attr.name())),
    }
}

fn strings<T: H5Type>(attr: &Attribute, as_str: fn(&T) -> &str) -> Result<Vec<String>, ArtifactError> {
    Ok(attr
        .read_raw::<T>()?
        .iter()
        .map(|s| as_str(s).to_string())
        .collect())
}

fn unicode(key: &str, value: &str) -> Result<VarLenUnicode, ArtifactError> {
    value
        .parse::<VarLenUnicode>()
        .map_err(|_| ArtifactError::Text(key.to_string()))
}

fn scalar(location: &Location, key: &str, value: &str) -> Result<(), ArtifactError> {
    let value = unicode(key, value)?;
    location
        .new_attr::<VarLenUnicode>()
        .create(key)?
        .write_scalar(&value)?;
    Ok(())
}

fn array(location: &Location, key: &str, values: &[&str]) -> Result<(), ArtifactError> {
    let values = values
        .iter()
        .map(|v| unicode(key, v))
        .collect::<Result<Vec<_>, _>>()?;
    let attr = location
        .new_attr::<VarLenUnicode>()
        .shape(values.len())
        .create(key)?;
    if !values.is_empty() {
        attr.write_raw(values.as_slice())?;
    }
    Ok(())
}

#[cfg(test)]
impl Artifact {
    /// Fixed-length byte strings and numeric empty attributes, the way
    /// older framework versions wrote their files.
    pub fn write_fixed(&self, path: &Path) -> Result<(), ArtifactError> {
        const WIDE: usize = 1 << 14;
        fn fixed<const N: usize>(location: &Location, key: &str, values: &[&str]) -> Result<(), ArtifactError> {
            let values = values
                .iter()
                .map(|v| FixedAscii::<N>::from_ascii(v.as_bytes()).map_err(|_| ArtifactError::Text(key.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            match values.is_empty() {
                true => {
                    location.new_attr::<f64>().shape(0).create(key)?;
                }
                false => {
                    location
                        .new_attr::<FixedAscii<N>>()
                        .shape(values.len())
                        .create(key)?
                        .write_raw(values.as_slice())?;
                }
            }
            Ok(())
        }
        let file = hdf5::File::create(path)?;
        for (key, value) in self.attrs.iter() {
            fixed::<WIDE>(&file, key, &[value.as_str()])?;
        }
        let weights = file.create_group(MODEL_WEIGHTS)?;
        let layers = self.groups.iter().map(|g| g.name.as_str()).collect::<Vec<_>>();
        fixed::<NAME>(&weights, LAYER_NAMES, &layers)?;
        for group in self.groups.iter() {
            let location = weights.create_group(&group.name)?;
            let names = group
                .tensors
                .iter()
                .map(|(name, _)| format!("{}/{}:0", group.name, name))
                .collect::<Vec<_>>();
            fixed::<NAME>(&location, WEIGHT_NAMES, &names.iter().map(String::as_str).collect::<Vec<_>>())?;
            if let Some(inner) = (!group.tensors.is_empty())
                .then(|| location.create_group(&group.name))
                .transpose()?
            {
                for (name, tensor) in group.tensors.iter() {
                    inner
                        .new_dataset_builder()
                        .with_data(tensor.array())
                        .create(format!("{}:0", name).as_str())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Artifact {
        let mut model = Architecture::tiny().build();
        model.randomize(3);
        Artifact::from(&model)
    }

    #[test]
    fn writes_and_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        let artifact = sample();
        artifact.write(&path).unwrap();
        let read = Artifact::read(&path).unwrap();
        assert_eq!(read, artifact);
        assert_eq!(read.attr(KERAS_VERSION), Some(SCHEMA_VERSION));
    }

    #[test]
    fn uses_framework_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        sample().write(&path).unwrap();
        let file = hdf5::File::open(&path).unwrap();
        let kernel = file.dataset("model_weights/conv2d/conv2d/kernel:0").unwrap();
        assert_eq!(kernel.shape(), vec![3, 3, 3, 4]);
        let layers = names(&file.group(MODEL_WEIGHTS).unwrap(), LAYER_NAMES).unwrap();
        assert_eq!(
            layers,
            vec!["input_layer", "conv2d", "max_pooling2d", "flatten", "dense"]
        );
        let weights = names(&file.group("model_weights/dense").unwrap(), WEIGHT_NAMES).unwrap();
        assert_eq!(weights, vec!["dense/kernel:0", "dense/bias:0"]);
        assert!(names(&file.group("model_weights/flatten").unwrap(), WEIGHT_NAMES)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reads_fixed_length_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        let artifact = sample().set(KERAS_VERSION, "2.4.0");
        artifact.write_fixed(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89HDF\r\n\x1a\n"));
        let read = Artifact::read(&path).unwrap();
        assert_eq!(read.attr(KERAS_VERSION), Some("2.4.0"));
        assert_eq!(read.model_config(), artifact.model_config());
        assert_eq!(read.groups(), artifact.groups());
    }

    #[test]
    fn weights_only_files_keep_layers_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.h5");
        let artifact = sample().remove(MODEL_CONFIG);
        artifact.write(&path).unwrap();
        let file = hdf5::File::open(&path).unwrap();
        assert!(!file.link_exists(MODEL_WEIGHTS));
        assert!(file.link_exists("conv2d"));
        let read = Artifact::read(&path).unwrap();
        assert!(read.model_config().is_none());
        assert_eq!(read.groups(), artifact.groups());
    }

    #[test]
    fn rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.h5");
        std::fs::write(&path, b"PGCOPY\n\xff\r\n\0\0\0\0\0").unwrap();
        assert!(matches!(Artifact::read(&path), Err(ArtifactError::Hdf5(_))));
    }

    #[test]
    fn groups_follow_layer_order() {
        let artifact = sample();
        let names = artifact
            .groups()
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["input_layer", "conv2d", "max_pooling2d", "flatten", "dense"]
        );
        assert_eq!(artifact.groups()[1].tensors.len(), 2);
        assert!(artifact.groups()[2].tensors.is_empty());
    }

    #[test]
    fn weight_names_drop_layer_and_index() {
        assert_eq!(leaf("conv2d/kernel:0"), "kernel");
        assert_eq!(leaf("bias:0"), "bias");
        assert_eq!(leaf("gamma"), "gamma");
    }
}
