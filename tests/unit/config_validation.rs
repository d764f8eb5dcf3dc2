//! Unit tests for configuration validation.

use laser_motion::config::{parse_config, validate_config, Axis, MachineConfig};
use laser_motion::error::{ConfigError, Error};

const VALID: &str = r#"
acceleration_mm_per_sec2 = 500.0

[axes.x]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0

[axes.y]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0
"#;

fn valid() -> MachineConfig {
    toml::from_str(VALID).expect("Failed to parse TOML")
}

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    assert!(validate_config(&valid()).is_ok());
    assert!(parse_config(VALID).is_ok());
}

/// Test validation fails for a non-positive axis scale.
#[test]
fn test_zero_steps_per_unit() {
    let mut config = valid();
    config.axes.get_mut(Axis::Y).steps_per_unit = 0.0;

    let result = validate_config(&config);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidStepsPerUnit { axis: 'Y', .. }))
    ));
}

/// Test validation fails for a negative axis feed limit.
#[test]
fn test_negative_max_feed_rate() {
    let mut config = valid();
    config.axes.get_mut(Axis::X).max_feed_rate.0 = -10.0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxFeedRate { axis: 'X', .. }))
    ));
}

/// Test validation fails for a NaN junction deviation.
#[test]
fn test_nan_junction_deviation() {
    let mut config = valid();
    config.junction_deviation.0 = f32::NAN;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidJunctionDeviation(_)))
    ));
}

/// Test parse_config runs validation.
#[test]
fn test_parse_config_rejects_zero_acceleration() {
    let toml_str = VALID.replace("500.0", "0.0");

    assert!(matches!(
        parse_config(&toml_str),
        Err(Error::Config(ConfigError::InvalidAcceleration(_)))
    ));
}

/// Test validation fails for a zero default feed.
#[test]
fn test_zero_laser_feed() {
    let mut config = valid();
    config.feeds.laser.0 = 0.0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidFeedRate(_)))
    ));
}

/// Test validation fails for a stopped step timer.
#[test]
fn test_zero_timer_frequency() {
    let mut config = valid();
    config.step_timer_hz = 0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidTimerFrequency(0)))
    ));
}

/// Test parse errors carry a message.
#[test]
fn test_parse_error_message() {
    match parse_config("acceleration_mm_per_sec2 = ") {
        Err(Error::Config(ConfigError::ParseError(msg))) => assert!(!msg.is_empty()),
        other => panic!("expected parse error, got {:?}", other),
    }
}
