use super::env::{self as keys, env_bool, env_list, env_parse};
use super::yaml::YamlConfig;
use super::{ConfigResult, EndpointingConfig, GatewayConfig, SessionConfig, SynthesisConfig};

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. Environment variables
/// 2. YAML configuration values
/// 3. Default values
///
/// The merged configuration is validated before it is returned.
pub fn merge_config(yaml_config: Option<YamlConfig>) -> ConfigResult<GatewayConfig> {
    let yaml = yaml_config.unwrap_or_default();
    let endpointing_yaml = yaml.endpointing.unwrap_or_default();
    let synthesis_yaml = yaml.synthesis.unwrap_or_default();
    let session_yaml = yaml.session.unwrap_or_default();

    // Priority: ENV > YAML > Default
    macro_rules! layered {
        ($env:expr, $yaml_value:expr, $default:expr) => {
            match $env? {
                Some(value) => value,
                None => $yaml_value.unwrap_or($default),
            }
        };
    }

    let defaults = EndpointingConfig::default();
    let mut extra_dangling_endings = endpointing_yaml
        .extra_dangling_endings
        .unwrap_or_default()
        .into_iter()
        .map(|ending| ending.trim().to_lowercase())
        .filter(|ending| !ending.is_empty())
        .collect::<Vec<_>>();
    if let Some(from_env) = env_list(keys::EXTRA_DANGLING_ENDINGS) {
        extra_dangling_endings = from_env;
    }

    let semantic_disabled = env_bool(keys::DISABLE_SEMANTIC)?;
    let semantic_enabled = match semantic_disabled {
        Some(disabled) => !disabled,
        None => endpointing_yaml
            .semantic_enabled
            .unwrap_or(defaults.semantic_enabled),
    };

    let endpointing = EndpointingConfig {
        short_timeout_s: layered!(
            env_parse::<f64>(keys::SHORT_TIMEOUT),
            endpointing_yaml.short_timeout_s,
            defaults.short_timeout_s
        ),
        medium_timeout_s: layered!(
            env_parse::<f64>(keys::MEDIUM_TIMEOUT),
            endpointing_yaml.medium_timeout_s,
            defaults.medium_timeout_s
        ),
        long_timeout_s: layered!(
            env_parse::<f64>(keys::LONG_TIMEOUT),
            endpointing_yaml.long_timeout_s,
            defaults.long_timeout_s
        ),
        incomplete_timeout_s: layered!(
            env_parse::<f64>(keys::INCOMPLETE_TIMEOUT),
            endpointing_yaml.incomplete_timeout_s,
            defaults.incomplete_timeout_s
        ),
        search_timeout_s: layered!(
            env_parse::<f64>(keys::SEARCH_TIMEOUT),
            endpointing_yaml.search_timeout_s,
            defaults.search_timeout_s
        ),
        confidence_good: layered!(
            env_parse::<f32>(keys::CONFIDENCE_GOOD),
            endpointing_yaml.confidence_good,
            defaults.confidence_good
        ),
        confidence_high: layered!(
            env_parse::<f32>(keys::CONFIDENCE_HIGH),
            endpointing_yaml.confidence_high,
            defaults.confidence_high
        ),
        semantic_enabled,
        semantic_confidence_threshold: layered!(
            env_parse::<f32>(keys::SEMANTIC_THRESHOLD),
            endpointing_yaml.semantic_confidence_threshold,
            defaults.semantic_confidence_threshold
        ),
        extra_dangling_endings,
    };

    let synthesis_defaults = SynthesisConfig::default();
    let synthesis = SynthesisConfig {
        enabled: layered!(
            env_bool(keys::TTS_ENABLED),
            synthesis_yaml.enabled,
            synthesis_defaults.enabled
        ),
        max_chunk_chars: layered!(
            env_parse::<usize>(keys::TTS_MAX_CHUNK_CHARS),
            synthesis_yaml.max_chunk_chars,
            synthesis_defaults.max_chunk_chars
        ),
    };

    let session_defaults = SessionConfig::default();
    let session = SessionConfig {
        cancel_grace_ms: layered!(
            env_parse::<u64>(keys::CANCEL_GRACE_MS),
            session_yaml.cancel_grace_ms,
            session_defaults.cancel_grace_ms
        ),
        emit_speech_events: layered!(
            env_bool(keys::EMIT_SPEECH_EVENTS),
            session_yaml.emit_speech_events,
            session_defaults.emit_speech_events
        ),
    };

    let config = GatewayConfig {
        endpointing,
        synthesis,
        session,
    };
    config.validate()?;
    Ok(config)
}
