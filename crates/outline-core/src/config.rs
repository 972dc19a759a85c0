//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::model::{MAX_LEVEL, MIN_LEVEL};

/// Tunables for the hierarchy engine and the editor wrapper.
///
/// Every field has a default, so a partial JSON object is a valid configuration:
///
/// ```rust
/// use outline_core::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "max_undo": 50 }"#).unwrap();
/// assert_eq!(config.max_undo, 50);
/// assert_eq!(config.max_level, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest heading level accepted by level changes and paste adjustment.
    pub max_level: u8,
    /// Pass cap for the hierarchy validator.
    pub max_repair_iterations: usize,
    /// Maximum number of undo steps kept by the editor.
    pub max_undo: usize,
    /// Run the validator after every edit.
    pub validate_after_edit: bool,
    /// Expand a collapsed heading when a moved heading lands inside it.
    pub expand_folded_targets: bool,
    /// Prefix for generated heading identifiers.
    pub id_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_level: MAX_LEVEL,
            max_repair_iterations: 10,
            max_undo: 1000,
            validate_after_edit: true,
            expand_folded_targets: true,
            id_prefix: "h".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON, filling absent fields with defaults.
    ///
    /// `max_level` is clamped into `1..=10`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Builder-style override of [`EngineConfig::max_level`].
    pub fn with_max_level(mut self, max_level: u8) -> Self {
        self.max_level = max_level;
        self.normalized()
    }

    /// Builder-style toggle of the post-edit validator.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_after_edit = enabled;
        self
    }

    /// Deepest level edits may produce. Fields set directly are not normalized, so this is
    /// always within `1..=10` even when `max_level` is not.
    pub fn level_cap(&self) -> u8 {
        self.max_level.clamp(MIN_LEVEL, MAX_LEVEL)
    }

    fn normalized(mut self) -> Self {
        self.max_level = self.level_cap();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_level, 10);
        assert_eq!(config.max_repair_iterations, 10);
        assert!(config.validate_after_edit);
    }

    #[test]
    fn test_partial_json_and_clamp() {
        let config = EngineConfig::from_json_str(r#"{"max_level": 42, "id_prefix": "sec"}"#).unwrap();
        assert_eq!(config.max_level, 10);
        assert_eq!(config.id_prefix, "sec");
        assert_eq!(config.max_undo, 1000);

        let config = EngineConfig::default().with_max_level(0);
        assert_eq!(config.max_level, 1);
    }

    #[test]
    fn test_level_cap_of_unnormalized_fields() {
        let config = EngineConfig {
            max_level: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.level_cap(), 1);

        let config = EngineConfig {
            max_level: 200,
            ..EngineConfig::default()
        };
        assert_eq!(config.level_cap(), 10);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(EngineConfig::from_json_str("{ max_level: }").is_err());
    }
}
