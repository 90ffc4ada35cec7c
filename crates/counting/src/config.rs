//! Operator-facing session settings.

use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ClassId;
use crate::error::{CountingError, Result};

/// Tunable parameters for a counting session.
///
/// Every field round-trips through JSON; unknown or missing fields fall
/// back to defaults so old config files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Longest-side pixel cap for the working raster. Photos are scaled to
    /// this size once per session; everything downstream derives from it.
    pub size_limit: u32,
    /// Region grower tolerance: a pixel joins a picked region when each of
    /// its Lab channels sits within this distance of the seed's.
    pub pick_fuzz: u32,
    /// Counting cutoff. A pixel counts as its nearest palette color only
    /// when the per-channel Lab difference stays under this, on average.
    pub color_diff_threshold: f32,
    /// Square root of the smallest card area (in working-raster pixels)
    /// the counter will report.
    pub size_filter: f32,
    /// Cluster centers trained per class.
    pub gradations: usize,
    /// Color classes being trained and counted, in declaration order.
    pub classes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            size_limit: 640,
            pick_fuzz: 10,
            color_diff_threshold: 20.0,
            size_filter: 4.0,
            gradations: 5,
            classes: vec!["green".into(), "yellow".into(), "pink".into()],
        }
    }
}

impl SessionConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.size_limit < 16 {
            return Err(CountingError::InvalidConfig(format!(
                "size_limit {} is too small to work with",
                self.size_limit
            )));
        }
        if self.gradations == 0 {
            return Err(CountingError::InvalidConfig(
                "gradations must be at least 1".into(),
            ));
        }
        if self.classes.is_empty() {
            return Err(CountingError::InvalidConfig(
                "at least one color class is required".into(),
            ));
        }
        for (i, name) in self.classes.iter().enumerate() {
            if name.is_empty() {
                return Err(CountingError::InvalidConfig(
                    "class names must not be empty".into(),
                ));
            }
            if self.classes[..i].contains(name) {
                return Err(CountingError::InvalidConfig(format!(
                    "duplicate class name '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Resolve a class name to its index.
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.classes.iter().position(|c| c == name).map(ClassId)
    }

    /// Name of a class, or "?" for an index out of range.
    pub fn class_name(&self, class: ClassId) -> &str {
        self.classes
            .get(class.0)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(ClassId)
    }

    /// The squared-distance form of `color_diff_threshold`.
    ///
    /// Classification distances are squared Euclidean over three Lab
    /// channels, so a per-channel threshold of t becomes 3 * t^2.
    pub fn squared_cutoff(&self) -> f32 {
        3.0 * self.color_diff_threshold * self.color_diff_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.size_limit, 640);
        assert_eq!(config.classes.len(), 3);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = SessionConfig::from_json(r#"{"pick_fuzz": 25}"#)
            .expect("Should accept partial config");
        assert_eq!(config.pick_fuzz, 25);
        assert_eq!(config.size_limit, SessionConfig::default().size_limit);
    }

    #[test]
    fn test_rejects_duplicate_classes() {
        let mut config = SessionConfig::default();
        config.classes = vec!["green".into(), "green".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_gradations() {
        let mut config = SessionConfig::default();
        config.gradations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_class_lookup() {
        let config = SessionConfig::default();
        let yellow = config.class_id("yellow").expect("Should know yellow");
        assert_eq!(yellow, ClassId(1));
        assert_eq!(config.class_name(yellow), "yellow");
        assert!(config.class_id("mauve").is_none());
        assert_eq!(config.class_name(ClassId(99)), "?");
    }

    #[test]
    fn test_squared_cutoff() {
        let mut config = SessionConfig::default();
        config.color_diff_threshold = 10.0;
        assert_eq!(config.squared_cutoff(), 300.0);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("config.json");

        let mut config = SessionConfig::default();
        config.classes.push("blue".into());
        config.to_json_file(&path).expect("Should write config");

        let loaded = SessionConfig::from_json_file(&path).expect("Should reload config");
        assert_eq!(loaded, config);
    }
}
