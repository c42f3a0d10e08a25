/// End-to-end tests: whole programs against the file exporter
use anyhow::Result;
use cadenza::{Config, HalConfig, hal, run_program};
use cadenza_core::{ErrorKind, MachineController, MachineError};
use std::fs;

fn exporter_config(path: &std::path::Path, emission: &str) -> Result<Config> {
    let toml = format!(
        "[machine]\nemission = \"{emission}\"\n\n[hal]\nkind = \"export\"\npath = {:?}\n",
        path.display().to_string()
    );
    let config = Config::from_toml(&toml)?;
    config.validate()?;
    Ok(config)
}

#[test]
fn test_program_exports_pulses() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("pulses.txt");
    let config = exporter_config(&out, "pulses")?;

    let mut controller = MachineController::new(config.machine, hal::build(&config.hal)?)?;
    let report = run_program(
        &mut controller,
        "G1 X1 F600 ; right\nG1 X0 Y0.5\nM114\n",
    )?;
    controller.release()?;

    assert_eq!(report.responses, ["X:0.000 Y:0.500 Z:0.000 E:0.000"]);

    let text = fs::read_to_string(&out)?;
    let dirs: Vec<_> = text.lines().filter(|l| l.starts_with("dir ")).collect();
    assert_eq!(dirs, ["dir X+ Y+ Z+ E+", "dir X- Y+ Z+ E+"]);

    let x_steps = text
        .lines()
        .filter(|l| l.starts_with("step ") && l.contains('X'))
        .count();
    // 1 mm out and 1 mm back at 100 steps/mm
    assert_eq!(x_steps, 200);
    Ok(())
}

#[test]
fn test_program_exports_samples() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("samples.txt");
    let config = exporter_config(&out, "samples")?;

    let mut controller = MachineController::new(config.machine, hal::build(&config.hal)?)?;
    run_program(&mut controller, "G1 X20 Y10 F1200\nG28\n")?;
    controller.release()?;

    let text = fs::read_to_string(&out)?;
    assert!(text.lines().any(|l| l.ends_with(" 20.000 10.000 0.000 0.000")));
    assert!(text.lines().all(|l| l.starts_with("pos ")));
    assert!(text.lines().last().is_some_and(|l| l.ends_with(" 0.000 0.000 0.000 0.000")));
    Ok(())
}

#[test]
fn test_program_stops_on_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("stop.txt");
    let config = exporter_config(&out, "pulses")?;

    let mut controller = MachineController::new(config.machine, hal::build(&config.hal)?)?;
    let err = run_program(&mut controller, "G1 X1\nG91\nG1 X2\n").unwrap_err();
    assert_eq!(err.to_string(), "line 2: G91");
    assert_eq!(
        err.downcast_ref::<MachineError>(),
        Some(&MachineError::RelativeMode)
    );
    assert_eq!(controller.position()?.x, 1.0);
    controller.release()?;
    Ok(())
}

#[test]
fn test_delta_program_reports_unreachable_line() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("servo.txt");
    let json = format!(
        r#"{{
            "machine": {{ "emission": "samples" }},
            "hal": {{ "kind": "delta", "origin": [0.0, 0.0, 10.0], "output": {:?} }}
        }}"#,
        out.display().to_string()
    );
    let config = Config::from_json(&json)?;
    config.validate()?;
    assert!(matches!(config.hal, HalConfig::Delta { .. }));

    let mut controller = MachineController::new(config.machine, hal::build(&config.hal)?)?;
    let err = run_program(&mut controller, "G1 Z5 F300\n").unwrap_err();
    assert_eq!(err.to_string(), "line 1: G1 Z5 F300");
    let cause = err.downcast_ref::<MachineError>().unwrap();
    assert_eq!(cause.kind(), ErrorKind::Geometry);
    assert!(!controller.state().position_reliable);
    controller.release()?;
    Ok(())
}
