//! Unit tests for TOML configuration parsing.

use laser_motion::config::{Axis, HomeDirection, MachineConfig};

const BASE: &str = r#"
acceleration_mm_per_sec2 = 500.0

[axes.x]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0

[axes.y]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0
"#;

/// Test parsing the smallest accepted machine description.
#[test]
fn test_parse_minimal_machine() {
    let config: MachineConfig = toml::from_str(BASE).expect("Failed to parse TOML");

    assert_eq!(config.axis(Axis::X).steps_per_unit, 80.0);
    assert_eq!(config.axis(Axis::Y).max_feed_rate.0, 6000.0);
    assert_eq!(config.acceleration.0, 500.0);
    assert!((config.junction_deviation.0 - 0.05).abs() < 1e-6);
    assert_eq!(config.step_timer_hz, 1_000_000);
}

/// Test that Z and E fall back to defaults when omitted.
#[test]
fn test_optional_axes_default() {
    let config: MachineConfig = toml::from_str(BASE).expect("Failed to parse TOML");

    for axis in [Axis::Z, Axis::E] {
        let axis = config.axis(axis);
        assert_eq!(axis.steps_per_unit, 100.0);
        assert_eq!(axis.home_direction, HomeDirection::Negative);
        assert!(!axis.invert_step);
    }
}

/// Test parsing axis polarity and homing settings.
#[test]
fn test_parse_axis_polarity() {
    let toml_str = r#"
acceleration_mm_per_sec2 = 500.0

[axes.x]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0
home_direction = "positive"
endstop_active_high = true
invert_step = true

[axes.y]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0
invert_direction = true
"#;

    let config: MachineConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    let x = config.axis(Axis::X);
    assert_eq!(x.home_direction, HomeDirection::Positive);
    assert!(x.endstop_active_high);
    assert!(x.invert_step);
    assert!(!x.invert_direction);
    assert!(config.axis(Axis::Y).invert_direction);
}

/// Test parsing laser and feed sections.
#[test]
fn test_parse_laser_and_feeds() {
    let toml_str = format!(
        "{}{}",
        BASE,
        r#"
[laser]
pwm_min = 200
pwm_max = 8000
pwm_frequency_hz = 1000

[feeds]
travel_mm_per_min = 8000.0
laser_mm_per_min = 1200.0
z_mm_per_min = 150.0
"#
    );

    let config: MachineConfig = toml::from_str(&toml_str).expect("Failed to parse TOML");
    assert_eq!(config.laser.pwm_min, 200);
    assert_eq!(config.laser.pwm_max, 8000);
    assert_eq!(config.laser.pwm_frequency_hz, 1000);
    assert_eq!(config.feeds.travel.0, 8000.0);
    assert_eq!(config.feeds.laser.0, 1200.0);
    assert_eq!(config.feeds.z.0, 150.0);
}

/// Test that a missing Y axis is rejected by the parser.
#[test]
fn test_missing_y_axis_fails() {
    let toml_str = r#"
acceleration_mm_per_sec2 = 500.0

[axes.x]
steps_per_unit = 80.0
max_feed_rate_mm_per_min = 6000.0
"#;

    let result: Result<MachineConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err());
}

/// Test that an unknown home direction is rejected.
#[test]
fn test_invalid_home_direction_fails() {
    let toml_str = BASE.replace(
        "[axes.y]",
        "home_direction = \"sideways\"\n\n[axes.y]",
    );

    let result: Result<MachineConfig, _> = toml::from_str(&toml_str);
    assert!(result.is_err());
}
