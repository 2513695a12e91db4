//! Configuration for the utterance gateway
//!
//! Configuration is assembled once from defaults, an optional YAML file and
//! environment variables, validated, and then passed around as an immutable
//! value. Nothing reads the environment after construction.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable overrides
//! - `merge`: Layering YAML and environment values over defaults
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use utterance_gateway::config::GatewayConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Defaults plus environment variables
//! let config = GatewayConfig::from_env()?;
//!
//! // YAML file with environment variable overrides
//! let config = GatewayConfig::from_file(&PathBuf::from("gateway.yaml"))?;
//! println!("medium timeout: {}s", config.endpointing.medium_timeout_s);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use utils::{parse_bool, parse_list};
pub use yaml::YamlConfig;

/// Error raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Endpointing policy settings: how long to wait before finalizing an
/// utterance, depending on what the decider sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointingConfig {
    /// Wait after a high-confidence, syntactically complete utterance
    pub short_timeout_s: f64,
    /// Wait after a good-confidence utterance
    pub medium_timeout_s: f64,
    /// Wait after a low-confidence utterance
    pub long_timeout_s: f64,
    /// Wait after an utterance that ends in a dangling construct
    pub incomplete_timeout_s: f64,
    /// Wait after a good-confidence search-style request
    pub search_timeout_s: f64,
    /// Confidence at or above which the medium timeout applies
    pub confidence_good: f32,
    /// Confidence at or above which the short timeout may apply
    pub confidence_high: f32,
    /// Whether the completeness checker is consulted at all
    pub semantic_enabled: bool,
    /// Minimum confidence before the completeness checker is consulted
    pub semantic_confidence_threshold: f32,
    /// Extra dangling endings appended to the built-in lexicon
    pub extra_dangling_endings: Vec<String>,
}

impl Default for EndpointingConfig {
    fn default() -> Self {
        Self {
            short_timeout_s: 1.5,
            medium_timeout_s: 3.0,
            long_timeout_s: 6.0,
            incomplete_timeout_s: 4.0,
            search_timeout_s: 3.5,
            confidence_good: 0.75,
            confidence_high: 0.90,
            semantic_enabled: true,
            semantic_confidence_threshold: 0.85,
            extra_dangling_endings: Vec::new(),
        }
    }
}

impl EndpointingConfig {
    pub fn short_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.short_timeout_s)
    }

    pub fn medium_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.medium_timeout_s)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.long_timeout_s)
    }

    pub fn incomplete_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.incomplete_timeout_s)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.search_timeout_s)
    }
}

/// Speech synthesis delivery settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisConfig {
    /// Whether responses are synthesized and streamed at all
    pub enabled: bool,
    /// Segments longer than this are split further on commas
    pub max_chunk_chars: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chunk_chars: 200,
        }
    }
}

/// Per-session runtime settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    /// How long a cancelled in-flight action may take to wind down before it
    /// is aborted
    pub cancel_grace_ms: u64,
    /// Ask the recognition engine for speech-activity markers
    pub emit_speech_events: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cancel_grace_ms: 500,
            emit_speech_events: true,
        }
    }
}

impl SessionConfig {
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GatewayConfig {
    pub endpointing: EndpointingConfig,
    pub synthesis: SynthesisConfig,
    pub session: SessionConfig,
}

impl GatewayConfig {
    /// Load configuration from defaults and environment variables.
    ///
    /// Also loads a `.env` file if present.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        merge::merge_config(None)
    }

    /// Load configuration from a YAML file with environment variable overrides
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. YAML file values
    /// 3. Default values
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, if an
    /// environment variable is malformed, or if validation fails.
    pub fn from_file(path: &PathBuf) -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        let yaml_config = YamlConfig::from_file(path)?;
        merge::merge_config(Some(yaml_config))
    }

    /// Validate an already-built configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validation::validate_endpointing(&self.endpointing)?;
        validation::validate_synthesis(&self.synthesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpointing.medium_timeout(), Duration::from_secs(3));
        assert_eq!(config.session.cancel_grace(), Duration::from_millis(500));
    }

    #[test]
    fn test_default_timeouts_are_ordered() {
        let config = EndpointingConfig::default();
        assert!(config.short_timeout() <= config.medium_timeout());
        assert!(config.medium_timeout() <= config.long_timeout());
        assert!(config.confidence_good <= config.confidence_high);
    }
}
