/// Integration tests for configuration file loading
use anyhow::Result;
use cadenza::{Config, HalConfig};
use cadenza_core::config::{EmissionMode, RapidFeed, VelocityPolicy};
use std::fs;

#[test]
fn test_load_toml_by_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("machine.toml");
    fs::write(
        &path,
        r#"
[machine]
velocity_policy = "reject"
rapid_feed = "dominant-axis"

[machine.inverted]
x = true
"#,
    )?;

    let config = Config::from_file(&path)?;
    config.validate()?;
    assert_eq!(config.machine.velocity_policy, VelocityPolicy::Reject);
    assert_eq!(config.machine.rapid_feed, RapidFeed::DominantAxis);
    assert!(config.machine.inverted.x);
    assert_eq!(config.hal, HalConfig::Virtual);
    Ok(())
}

#[test]
fn test_load_json_without_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("machine");
    fs::write(
        &path,
        r#"{ "machine": { "emission": "samples", "sample_period_s": 0.01 } }"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.machine.emission, EmissionMode::Samples);
    assert_eq!(config.machine.sample_period_s, 0.01);
    Ok(())
}

#[test]
fn test_missing_file_names_path() {
    let err = Config::from_file("/nonexistent/cadenza.toml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/cadenza.toml"));
}

#[test]
fn test_invalid_limits_fail_validation() -> Result<()> {
    let config = Config::from_toml("[machine]\nmin_velocity_mm_per_min = 0.0\n")?;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("min_velocity_mm_per_min"));
    Ok(())
}
