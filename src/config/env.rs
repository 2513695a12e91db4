use std::env;
use std::str::FromStr;

use super::utils::{parse_bool, parse_list};
use super::{ConfigError, ConfigResult};

pub const SHORT_TIMEOUT: &str = "UTT_SHORT_TIMEOUT_S";
pub const MEDIUM_TIMEOUT: &str = "UTT_MEDIUM_TIMEOUT_S";
pub const LONG_TIMEOUT: &str = "UTT_LONG_TIMEOUT_S";
pub const INCOMPLETE_TIMEOUT: &str = "UTT_INCOMPLETE_TIMEOUT_S";
pub const SEARCH_TIMEOUT: &str = "UTT_SEARCH_TIMEOUT_S";
pub const CONFIDENCE_GOOD: &str = "UTT_CONFIDENCE_GOOD";
pub const CONFIDENCE_HIGH: &str = "UTT_CONFIDENCE_HIGH";
pub const DISABLE_SEMANTIC: &str = "UTT_DISABLE_SEMANTIC";
pub const SEMANTIC_THRESHOLD: &str = "UTT_SEMANTIC_CONFIDENCE_THRESHOLD";
pub const EXTRA_DANGLING_ENDINGS: &str = "UTT_EXTRA_DANGLING_ENDINGS";
pub const TTS_ENABLED: &str = "TTS_ENABLED";
pub const TTS_MAX_CHUNK_CHARS: &str = "TTS_MAX_CHUNK_CHARS";
pub const CANCEL_GRACE_MS: &str = "SESSION_CANCEL_GRACE_MS";
pub const EMIT_SPEECH_EVENTS: &str = "SESSION_EMIT_SPEECH_EVENTS";

/// Read and parse an environment variable.
///
/// Unset or blank variables yield `Ok(None)`; malformed values are an error
/// rather than being silently ignored.
pub fn env_parse<T: FromStr>(key: &str) -> ConfigResult<Option<T>> {
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Read a boolean environment variable (see [`parse_bool`]).
pub fn env_bool(key: &str) -> ConfigResult<Option<bool>> {
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Read a comma-separated list environment variable.
pub fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|raw| parse_list(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cleanup_env_vars() {
        unsafe {
            env::remove_var(SHORT_TIMEOUT);
            env::remove_var(DISABLE_SEMANTIC);
            env::remove_var(EXTRA_DANGLING_ENDINGS);
        }
    }

    #[test]
    #[serial]
    fn test_env_parse_present_and_absent() {
        cleanup_env_vars();
        assert_eq!(env_parse::<f64>(SHORT_TIMEOUT).unwrap(), None);

        unsafe {
            env::set_var(SHORT_TIMEOUT, "0.25");
        }
        assert_eq!(env_parse::<f64>(SHORT_TIMEOUT).unwrap(), Some(0.25));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_env_parse_rejects_garbage() {
        cleanup_env_vars();
        unsafe {
            env::set_var(SHORT_TIMEOUT, "soon");
        }
        let result = env_parse::<f64>(SHORT_TIMEOUT);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_env_bool_and_list() {
        cleanup_env_vars();
        unsafe {
            env::set_var(DISABLE_SEMANTIC, "1");
            env::set_var(EXTRA_DANGLING_ENDINGS, "whereas, in order to");
        }
        assert_eq!(env_bool(DISABLE_SEMANTIC).unwrap(), Some(true));
        assert_eq!(
            env_list(EXTRA_DANGLING_ENDINGS),
            Some(vec!["whereas".to_string(), "in order to".to_string()])
        );
        cleanup_env_vars();
    }
}
