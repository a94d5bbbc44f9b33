//! Persisted panel settings.

use crate::constants::{DEFAULT_DEBOUNCE_MS, DEFAULT_PANEL_WIDTH};
use crate::layout::Layout;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings of the properties panel, stored by the host between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Layout blob restored on start (group and list open states)
    pub layout: Value,
    /// Delay before debounced text edits are committed, in milliseconds
    pub debounce_ms: u64,
    /// Width of the panel in logical points
    pub panel_width: f32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            layout: Value::Object(Map::new()),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            panel_width: DEFAULT_PANEL_WIDTH,
        }
    }
}

impl PanelConfig {
    /// Layout store initialised from the stored blob.
    pub fn layout(&self) -> Layout {
        Layout::new(self.layout.clone())
    }

    /// Serialize the configuration to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{group_open_path, use_layout_state};
    use serde_json::json;

    #[test]
    fn missing_fields_take_defaults() {
        let config = PanelConfig::from_json(r#"{ "debounce_ms": 50 }"#).unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.panel_width, DEFAULT_PANEL_WIDTH);
        assert_eq!(config.layout, json!({}));
    }

    #[test]
    fn stored_layout_seeds_the_store() {
        let config = PanelConfig {
            layout: json!({ "groups": { "general": { "open": true } } }),
            ..PanelConfig::default()
        };
        let restored = PanelConfig::from_json(&config.to_json().unwrap()).unwrap();
        let (open, _) = use_layout_state(&restored.layout(), group_open_path("general"), false);
        assert!(open);
    }
}
