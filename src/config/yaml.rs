use serde::Deserialize;
use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Environment
/// variables override any values specified here.
///
/// # Example YAML structure
/// ```yaml
/// endpointing:
///   short_timeout_s: 1.5
///   medium_timeout_s: 3.0
///   long_timeout_s: 6.0
///   incomplete_timeout_s: 4.0
///   search_timeout_s: 3.5
///   confidence_good: 0.75
///   confidence_high: 0.9
///   semantic_enabled: true
///   semantic_confidence_threshold: 0.85
///   extra_dangling_endings:
///     - "whereas"
///     - "in order to"
///
/// synthesis:
///   enabled: true
///   max_chunk_chars: 200
///
/// session:
///   cancel_grace_ms: 500
///   emit_speech_events: true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub endpointing: Option<EndpointingYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub session: Option<SessionYaml>,
}

/// Endpointing configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EndpointingYaml {
    pub short_timeout_s: Option<f64>,
    pub medium_timeout_s: Option<f64>,
    pub long_timeout_s: Option<f64>,
    pub incomplete_timeout_s: Option<f64>,
    pub search_timeout_s: Option<f64>,
    pub confidence_good: Option<f32>,
    pub confidence_high: Option<f32>,
    pub semantic_enabled: Option<bool>,
    pub semantic_confidence_threshold: Option<f32>,
    pub extra_dangling_endings: Option<Vec<String>>,
}

/// Synthesis configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub enabled: Option<bool>,
    pub max_chunk_chars: Option<usize>,
}

/// Session configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub cancel_grace_ms: Option<u64>,
    pub emit_speech_events: Option<bool>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn parse(contents: &str) -> ConfigResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}
