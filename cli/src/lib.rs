use counting::SessionConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Expected a point as 'x,y', got '{0}'")]
    BadPoint(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Training picks for one color class
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ClassPicks {
    pub class: String,
    pub points: Vec<(i32, i32)>,
}

/// A whole counting run in one file: the photo, an optional inline
/// configuration, and the picks to replay per class
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TallyPlan {
    pub photo: String,
    pub config: Option<SessionConfig>,
    pub picks: Vec<ClassPicks>,
}

impl TallyPlan {
    /// Load a TallyPlan from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, TallyError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a TallyPlan from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, TallyError> {
        let plan: TallyPlan = toml::from_str(content)?;
        Ok(plan)
    }

    /// Load a TallyPlan from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TallyError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load a TallyPlan from a JSON string
    pub fn from_json(content: &str) -> Result<Self, TallyError> {
        let plan: TallyPlan = serde_json::from_str(content)?;
        Ok(plan)
    }

    /// Auto-detect file format and load the plan
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TallyError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(TallyError::UnsupportedFileFormat),
        }
    }

    /// Save the plan to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TallyError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert the plan to a TOML string
    pub fn to_toml(&self) -> Result<String, TallyError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    /// Save the plan to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TallyError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert the plan to a JSON string
    pub fn to_json(&self) -> Result<String, TallyError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

/// Parse a seed point given as `x,y`.
pub fn parse_point(s: &str) -> Result<(i32, i32), TallyError> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| TallyError::BadPoint(s.to_string()))?;
    let x = x.trim().parse().map_err(|_| TallyError::BadPoint(s.to_string()))?;
    let y = y.trim().parse().map_err(|_| TallyError::BadPoint(s.to_string()))?;
    Ok((x, y))
}

/// Load a session configuration file, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> counting::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_json_file(path),
        None => Ok(SessionConfig::default()),
    }
}
