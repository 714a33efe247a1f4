use super::*;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Optimizer arguments from a retired vocabulary; a stored optimizer
/// using any of them is rejected.
const RETIRED: [&str; 2] = ["lr", "decay"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub class_name: String,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// What `compile = true` restores alongside the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub loss: Value,
    #[serde(default)]
    pub metrics: Vec<Value>,
    pub optimizer_config: OptimizerConfig,
}

impl TrainingConfig {
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(json).map_err(|e| ConfigError::Invalid {
            class: String::from("TrainingConfig"),
            key: String::from("training_config"),
            value: e.to_string(),
        })?;
        let retired = config
            .optimizer_config
            .config
            .keys()
            .filter(|k| RETIRED.contains(&k.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if retired.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Unrecognized {
                class: config.optimizer_config.class_name,
                keys: retired,
            })
        }
    }
}
