use super::{ConfigError, ConfigResult, EndpointingConfig, SynthesisConfig};

/// Validate endpointing timeouts and thresholds
///
/// Timeouts must be positive and finite and ordered short ≤ medium ≤ long.
/// Thresholds must lie in `[0, 1]` with good ≤ high.
pub fn validate_endpointing(config: &EndpointingConfig) -> ConfigResult<()> {
    let timeouts = [
        ("short_timeout_s", config.short_timeout_s),
        ("medium_timeout_s", config.medium_timeout_s),
        ("long_timeout_s", config.long_timeout_s),
        ("incomplete_timeout_s", config.incomplete_timeout_s),
        ("search_timeout_s", config.search_timeout_s),
    ];
    for (name, value) in timeouts {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "{name} must be a positive number of seconds, got {value}"
            )));
        }
    }

    if config.short_timeout_s > config.medium_timeout_s
        || config.medium_timeout_s > config.long_timeout_s
    {
        return Err(ConfigError::Validation(format!(
            "timeouts must satisfy short ({}) <= medium ({}) <= long ({})",
            config.short_timeout_s, config.medium_timeout_s, config.long_timeout_s
        )));
    }

    let thresholds = [
        ("confidence_good", config.confidence_good),
        ("confidence_high", config.confidence_high),
        (
            "semantic_confidence_threshold",
            config.semantic_confidence_threshold,
        ),
    ];
    for (name, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{name} must be within [0, 1], got {value}"
            )));
        }
    }

    if config.confidence_good > config.confidence_high {
        return Err(ConfigError::Validation(format!(
            "confidence_good ({}) must not exceed confidence_high ({})",
            config.confidence_good, config.confidence_high
        )));
    }

    Ok(())
}

/// Validate synthesis settings
pub fn validate_synthesis(config: &SynthesisConfig) -> ConfigResult<()> {
    if config.max_chunk_chars == 0 {
        return Err(ConfigError::Validation(
            "max_chunk_chars must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_timeout() {
        let config = EndpointingConfig {
            incomplete_timeout_s: 0.0,
            ..Default::default()
        };
        assert!(validate_endpointing(&config).is_err());

        let config = EndpointingConfig {
            search_timeout_s: f64::INFINITY,
            ..Default::default()
        };
        assert!(validate_endpointing(&config).is_err());
    }

    #[test]
    fn test_rejects_unordered_timeouts() {
        let config = EndpointingConfig {
            short_timeout_s: 4.0,
            medium_timeout_s: 3.0,
            ..Default::default()
        };
        let err = validate_endpointing(&config).unwrap_err();
        assert!(err.to_string().contains("short"));
    }

    #[test]
    fn test_rejects_out_of_range_thresholds() {
        let config = EndpointingConfig {
            confidence_high: 1.2,
            ..Default::default()
        };
        assert!(validate_endpointing(&config).is_err());

        let config = EndpointingConfig {
            confidence_good: 0.95,
            confidence_high: 0.9,
            ..Default::default()
        };
        assert!(validate_endpointing(&config).is_err());
    }

    #[test]
    fn test_tiny_test_timeouts_are_valid() {
        let config = EndpointingConfig {
            short_timeout_s: 0.01,
            medium_timeout_s: 0.02,
            long_timeout_s: 0.2,
            incomplete_timeout_s: 0.06,
            search_timeout_s: 0.03,
            ..Default::default()
        };
        assert!(validate_endpointing(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let config = SynthesisConfig {
            max_chunk_chars: 0,
            ..Default::default()
        };
        assert!(validate_synthesis(&config).is_err());
    }
}
