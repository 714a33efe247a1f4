//! Layer class names mapped to builders.
//!
//! Builders validate arguments strictly against one schema: an argument a
//! builder does not know is an error, never silently dropped. Legacy
//! vocabularies are accepted only through [`CustomObjects`].
use super::*;
use crate::Dim;
use crate::tensor::Padding;
use serde_json::Map;
use serde_json::Value;
use std::collections::BTreeMap;

pub type Args = Map<String, Value>;
pub type Builder = fn(&str, &Args) -> Result<Kind, ConfigError>;

const COMMON: [&str; 3] = ["name", "trainable", "dtype"];
const AFFINE: [&str; 7] = [
    "kernel_initializer",
    "bias_initializer",
    "kernel_regularizer",
    "bias_regularizer",
    "activity_regularizer",
    "kernel_constraint",
    "bias_constraint",
];

/// Caller supplied builders, consulted before the built-in ones.
#[derive(Debug, Clone, Default)]
pub struct CustomObjects(BTreeMap<String, Builder>);

impl CustomObjects {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(mut self, class: &str, builder: Builder) -> Self {
        self.0.insert(class.to_string(), builder);
        self
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// translations for artifacts written by older framework versions
    pub fn legacy() -> Self {
        Self::new()
            .insert("InputLayer", legacy::input)
            .insert("Convolution2D", legacy::conv2d)
            .insert("MaxPool2D", max_pooling2d)
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    builders: BTreeMap<String, Builder>,
}

impl Registry {
    pub fn builtin() -> Self {
        let builders: [(&str, Builder); 6] = [
            ("InputLayer", input),
            ("Conv2D", conv2d),
            ("MaxPooling2D", max_pooling2d),
            ("Flatten", flatten),
            ("Dense", dense),
            ("Dropout", dropout),
        ];
        Self {
            builders: builders
                .into_iter()
                .map(|(class, builder)| (class.to_string(), builder))
                .collect(),
        }
    }
    pub fn with(mut self, custom: &CustomObjects) -> Self {
        self.builders.extend(custom.0.iter().map(|(k, v)| (k.clone(), *v)));
        self
    }

    pub fn build(&self, layer: &LayerConfig, names: &mut Names) -> Result<Layer, ConfigError> {
        let class = layer.class_name.as_str();
        let builder = self
            .builders
            .get(class)
            .ok_or_else(|| ConfigError::Layer(class.to_string()))?;
        let kind = builder(class, &layer.config)?;
        let name = match layer.config.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => names.next(&kind),
        };
        Ok(Layer::new(name, kind))
    }

    /// network without weights
    pub fn assemble(&self, config: &ModelConfig) -> Result<Model, ConfigError> {
        if config.class_name != "Sequential" {
            return Err(ConfigError::Model(config.class_name.clone()));
        }
        let ref mut names = Names::default();
        let layers = config
            .config
            .layers
            .iter()
            .map(|layer| self.build(layer, names))
            .collect::<Result<Vec<_>, _>>()?;
        let name = config.config.name.as_deref().unwrap_or("sequential");
        Ok(Model::new(name, layers))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// ARGUMENT READERS
// ============================================================================

fn check(class: &str, args: &Args, allowed: &[&str]) -> Result<(), ConfigError> {
    let unknown = args
        .keys()
        .filter(|k| !COMMON.contains(&k.as_str()) && !allowed.contains(&k.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    match unknown.is_empty() {
        true => Ok(()),
        false => Err(ConfigError::Unrecognized {
            class: class.to_string(),
            keys: unknown,
        }),
    }
}

fn invalid(class: &str, key: &str, value: &Value) -> ConfigError {
    ConfigError::Invalid {
        class: class.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn present<'a>(args: &'a Args, key: &str) -> Option<&'a Value> {
    args.get(key).filter(|v| !v.is_null())
}

fn count(class: &str, args: &Args, key: &str) -> Result<usize, ConfigError> {
    let value = present(args, key).ok_or_else(|| ConfigError::Missing {
        class: class.to_string(),
        key: key.to_string(),
    })?;
    value
        .as_u64()
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .ok_or_else(|| invalid(class, key, value))
}

/// an integer or a two element list
fn pair(class: &str, args: &Args, key: &str) -> Result<Option<(usize, usize)>, ConfigError> {
    let Some(value) = present(args, key) else {
        return Ok(None);
    };
    let side = |v: &Value| v.as_u64().filter(|n| *n > 0).map(|n| n as usize);
    match value {
        Value::Array(items) => match items.as_slice() {
            [a, b] => side(a).zip(side(b)).map(Some),
            _ => None,
        },
        v => side(v).map(|n| Some((n, n))),
    }
    .ok_or_else(|| invalid(class, key, value))
}

fn flag(class: &str, args: &Args, key: &str, default: bool) -> Result<bool, ConfigError> {
    match present(args, key) {
        None => Ok(default),
        Some(value) => value.as_bool().ok_or_else(|| invalid(class, key, value)),
    }
}

fn padding(class: &str, args: &Args, key: &str) -> Result<Padding, ConfigError> {
    match present(args, key) {
        None => Ok(Padding::default()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| invalid(class, key, value)),
    }
}

fn activation(class: &str, args: &Args) -> Result<Activation, ConfigError> {
    match present(args, "activation") {
        None => Ok(Activation::default()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|_| invalid(class, "activation", value))
        }
    }
}

fn channels_last(class: &str, args: &Args, key: &str, accepted: &[&str]) -> Result<(), ConfigError> {
    match present(args, key) {
        None => Ok(()),
        Some(value) if value.as_str().is_some_and(|s| accepted.contains(&s)) => Ok(()),
        Some(value) => Err(invalid(class, key, value)),
    }
}

/// list of extents, `null` for undeclared
fn dims(class: &str, key: &str, value: &Value) -> Result<Vec<Dim>, ConfigError> {
    value
        .as_array()
        .ok_or_else(|| invalid(class, key, value))?
        .iter()
        .map(|d| match d {
            Value::Null => Ok(None),
            d => d
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| invalid(class, key, value)),
        })
        .collect()
}

fn unit(class: &str, args: &Args, key: &str) -> Result<(), ConfigError> {
    match pair(class, args, key)? {
        None | Some((1, 1)) => Ok(()),
        Some(_) => Err(invalid(class, key, &args[key])),
    }
}

// ============================================================================
// BUILT-IN BUILDERS
// ============================================================================

fn input(class: &str, args: &Args) -> Result<Kind, ConfigError> {
    check(class, args, &["batch_shape", "shape", "batch_size", "sparse", "optional"])?;
    if flag(class, args, "sparse", false)? {
        return Err(invalid(class, "sparse", &Value::Bool(true)));
    }
    let shape = match (present(args, "batch_shape"), present(args, "shape")) {
        (Some(batch), _) => dims(class, "batch_shape", batch)?
            .split_first()
            .map(|(_, shape)| shape.to_vec())
            .ok_or_else(|| invalid(class, "batch_shape", batch))?,
        (None, Some(shape)) => dims(class, "shape", shape)?,
        (None, None) => {
            return Err(ConfigError::Missing {
                class: class.to_string(),
                key: String::from("batch_shape"),
            });
        }
    };
    Ok(Kind::Input { shape })
}

fn conv2d(class: &str, args: &Args) -> Result<Kind, ConfigError> {
    let allowed = [
        "filters",
        "kernel_size",
        "strides",
        "padding",
        "data_format",
        "dilation_rate",
        "groups",
        "activation",
        "use_bias",
    ];
    check(class, args, &[&allowed[..], &AFFINE[..]].concat())?;
    channels_last(class, args, "data_format", &["channels_last"])?;
    unit(class, args, "dilation_rate")?;
    if let Some(groups) = present(args, "groups").filter(|g| g.as_u64() != Some(1)) {
        return Err(invalid(class, "groups", groups));
    }
    Ok(Kind::Conv2D {
        filters: count(class, args, "filters")?,
        kernel: pair(class, args, "kernel_size")?.ok_or_else(|| ConfigError::Missing {
            class: class.to_string(),
            key: String::from("kernel_size"),
        })?,
        strides: pair(class, args, "strides")?.unwrap_or((1, 1)),
        padding: padding(class, args, "padding")?,
        activation: activation(class, args)?,
        bias: flag(class, args, "use_bias", true)?,
    })
}

fn max_pooling2d(class: &str, args: &Args) -> Result<Kind, ConfigError> {
    check(class, args, &["pool_size", "strides", "padding", "data_format"])?;
    channels_last(class, args, "data_format", &["channels_last"])?;
    let pool = pair(class, args, "pool_size")?.unwrap_or((2, 2));
    Ok(Kind::MaxPooling2D {
        pool,
        strides: pair(class, args, "strides")?.unwrap_or(pool),
        padding: padding(class, args, "padding")?,
    })
}

fn flatten(class: &str, args: &Args) -> Result<Kind, ConfigError> {
    check(class, args, &["data_format"])?;
    channels_last(class, args, "data_format", &["channels_last"])?;
    Ok(Kind::Flatten)
}

fn dense(class: &str, args: &Args) -> Result<Kind, ConfigError> {
    let allowed = ["units", "activation", "use_bias", "lora_rank"];
    check(class, args, &[&allowed[..], &AFFINE[..]].concat())?;
    Ok(Kind::Dense {
        units: count(class, args, "units")?,
        activation: activation(class, args)?,
        bias: flag(class, args, "use_bias", true)?,
    })
}

fn dropout(class: &str, args: &Args) -> Result<Kind, ConfigError> {
    check(class, args, &["rate", "noise_shape", "seed"])?;
    let rate = present(args, "rate").ok_or_else(|| ConfigError::Missing {
        class: class.to_string(),
        key: String::from("rate"),
    })?;
    match rate.as_f64().filter(|r| (0.0..1.0).contains(r)) {
        Some(r) => Ok(Kind::Dropout { rate: r as f32 }),
        None => Err(invalid(class, "rate", rate)),
    }
}

// ============================================================================
// LEGACY BUILDERS
// ============================================================================

mod legacy {
    use super::*;

    /// `batch_input_shape` and `ragged` from the older input schema
    pub fn input(class: &str, args: &Args) -> Result<Kind, ConfigError> {
        check(
            class,
            args,
            &["batch_input_shape", "batch_shape", "input_shape", "sparse", "ragged"],
        )?;
        for key in ["sparse", "ragged"] {
            if flag(class, args, key, false)? {
                return Err(invalid(class, key, &Value::Bool(true)));
            }
        }
        let batch = present(args, "batch_input_shape").or_else(|| present(args, "batch_shape"));
        let shape = match (batch, present(args, "input_shape")) {
            (Some(batch), _) => dims(class, "batch_input_shape", batch)?
                .split_first()
                .map(|(_, shape)| shape.to_vec())
                .ok_or_else(|| invalid(class, "batch_input_shape", batch))?,
            (None, Some(shape)) => dims(class, "input_shape", shape)?,
            (None, None) => {
                return Err(ConfigError::Missing {
                    class: class.to_string(),
                    key: String::from("batch_input_shape"),
                });
            }
        };
        Ok(Kind::Input { shape })
    }

    /// first generation convolution arguments, or the current ones under the old class name
    pub fn conv2d(class: &str, args: &Args) -> Result<Kind, ConfigError> {
        if !args.contains_key("nb_filter") {
            return super::conv2d(class, args);
        }
        check(
            class,
            args,
            &[
                "nb_filter",
                "nb_row",
                "nb_col",
                "border_mode",
                "subsample",
                "dim_ordering",
                "activation",
                "bias",
                "init",
                "W_regularizer",
                "b_regularizer",
                "activity_regularizer",
                "W_constraint",
                "b_constraint",
            ],
        )?;
        channels_last(class, args, "dim_ordering", &["tf", "default"])?;
        Ok(Kind::Conv2D {
            filters: count(class, args, "nb_filter")?,
            kernel: (count(class, args, "nb_row")?, count(class, args, "nb_col")?),
            strides: pair(class, args, "subsample")?.unwrap_or((1, 1)),
            padding: padding(class, args, "border_mode")?,
            activation: activation(class, args)?,
            bias: flag(class, args, "bias", true)?,
        })
    }
}
