//! JSON pipeline description.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Instance name, unique within the pipeline.
    pub name: String,
    /// Registered component type, e.g. `ImageWriter`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// A stream connection, endpoints written as `component.stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Split `component.stream` at the first dot.
pub fn split_endpoint(endpoint: &str) -> Option<(&str, &str)> {
    let (component, stream) = endpoint.split_once('.')?;
    if component.is_empty() || stream.is_empty() {
        return None;
    }
    Some((component, stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_split_at_first_dot() {
        assert_eq!(split_endpoint("writer.in_img0"), Some(("writer", "in_img0")));
        assert_eq!(split_endpoint("a.b.c"), Some(("a", "b.c")));
        assert_eq!(split_endpoint("writer"), None);
        assert_eq!(split_endpoint(".in"), None);
    }

    #[test]
    fn properties_default_to_empty() {
        let cfg: PipelineConfig = serde_json::from_value(json!({
            "components": [{ "name": "t", "type": "TimeTrigger" }]
        }))
        .unwrap();
        assert_eq!(cfg.components[0].kind, "TimeTrigger");
        assert!(cfg.components[0].properties.is_empty());
        assert!(cfg.connections.is_empty());
    }
}
