use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Top level of a serialized model configuration.
///
/// Layer arguments stay untyped here; the [`Registry`](super::Registry)
/// decides which arguments a layer class accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub class_name: String,
    pub config: SequentialConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub class_name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl ModelConfig {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
    pub fn sequential(name: &str, layers: Vec<LayerConfig>) -> Self {
        Self {
            class_name: String::from("Sequential"),
            config: SequentialConfig {
                name: Some(name.to_string()),
                layers,
            },
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("model config serializes")
    }
}
