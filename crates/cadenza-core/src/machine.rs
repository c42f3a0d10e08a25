//! The command state machine.
//!
//! [`MachineController`] owns the persistent [`MachineState`] and the
//! hardware boundary. Each command either commits completely or fails
//! before touching state; the one exception is a geometry fault found
//! while the boundary consumes a move, after which the position is
//! flagged unreliable until the next successful homing.

use crate::{
    command::{Code, Command},
    config::{MachineConfig, RapidFeed, VelocityPolicy},
    coordinates::{Axis, AxisFlags, Coordinates},
    error::{ErrorKind, MachineError, Result},
    hal::HardwareBoundary,
    trajectory::{Trajectory, check_velocity},
};
use cadenza_gcode::Statement;
use std::time::Duration;
use tracing::{debug, info, warn};

const MM_PER_INCH: f64 = 25.4;
const DEFAULT_SPINDLE_RPM: f64 = 1000.0;

/// Working plane selected by G17/G18/G19.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plane {
    #[default]
    XY,
    ZX,
    YZ,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineState {
    /// Absolute machine position, mm
    pub position: Coordinates,
    /// Sticky feed rate, mm/min
    pub velocity: f64,
    pub spindle_rpm: f64,
    /// Offset of the local frame from the machine origin
    pub local: Coordinates,
    /// Multiplier from program units to mm
    pub unit_scale: f64,
    pub plane: Plane,
    pub diagnostics: bool,
    /// Cleared by geometry and calibration faults, set by homing
    pub position_reliable: bool,
}

impl MachineState {
    fn new(config: &MachineConfig) -> Self {
        let mut state = Self {
            position: Coordinates::ZERO,
            velocity: 0.0,
            spindle_rpm: 0.0,
            local: Coordinates::ZERO,
            unit_scale: 1.0,
            plane: Plane::XY,
            diagnostics: false,
            position_reliable: true,
        };
        state.reset(config);
        state
    }

    /// Restore everything a program may configure. Position, reliability
    /// and diagnostics survive.
    fn reset(&mut self, config: &MachineConfig) {
        self.velocity = config.default_feed();
        self.spindle_rpm = DEFAULT_SPINDLE_RPM.min(config.spindle_max_rpm);
        self.local = Coordinates::ZERO;
        self.unit_scale = 1.0;
        self.plane = Plane::XY;
    }

    /// Position in the active local frame.
    pub fn local_position(&self) -> Coordinates {
        self.position - self.local
    }
}

type DiagnosticsHook = Box<dyn FnMut(bool)>;

pub struct MachineController<H: HardwareBoundary> {
    config: MachineConfig,
    state: MachineState,
    boundary: H,
    diagnostics_hook: Option<DiagnosticsHook>,
}

impl<H: HardwareBoundary> MachineController<H> {
    /// Validate `config` and initialise the boundary.
    pub fn new(config: MachineConfig, mut boundary: H) -> Result<Self> {
        config.validate()?;
        boundary.init()?;
        Ok(Self {
            state: MachineState::new(&config),
            config,
            boundary,
            diagnostics_hook: None,
        })
    }

    /// Stop the spindle and fan, release the hardware and hand the
    /// boundary back.
    pub fn release(mut self) -> Result<H> {
        self.boundary.join()?;
        self.boundary.spindle_control(0.0)?;
        self.boundary.fan_control(false)?;
        self.boundary.deinit()?;
        Ok(self.boundary)
    }

    pub fn reset(&mut self) {
        self.state.reset(&self.config);
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn boundary(&self) -> &H {
        &self.boundary
    }

    pub fn boundary_mut(&mut self) -> &mut H {
        &mut self.boundary
    }

    /// Called with `true` when a program enables diagnostics (M111).
    pub fn set_diagnostics_hook(&mut self, hook: impl FnMut(bool) + 'static) {
        self.diagnostics_hook = Some(Box::new(hook));
    }

    /// Absolute position once all issued motion has finished.
    pub fn position(&mut self) -> Result<Coordinates> {
        self.boundary.join()?;
        Ok(self.state.position)
    }

    /// Execute one parsed G-code line.
    pub fn execute(&mut self, statement: &Statement) -> Result<Option<String>> {
        match Command::from_statement(statement)? {
            Some(command) => self.do_command(&command),
            None => Ok(None),
        }
    }

    /// Execute one command. Only M114 produces a response.
    pub fn do_command(&mut self, command: &Command) -> Result<Option<String>> {
        debug!(line = command.line(), "executing {command}");

        let target = command.coordinates(self.state.local_position(), self.state.unit_scale)
            + self.state.local;
        let feed = command.get('F').unwrap_or(self.state.velocity);
        if feed < self.config.min_velocity_mm_per_min {
            return Err(MachineError::FeedTooLow {
                feed,
                min: self.config.min_velocity_mm_per_min,
            });
        }

        let mut answer = None;
        match command.code() {
            None => {}
            Some(Code::G(0)) => {
                let rapid = self.rapid_feed(target - self.state.position);
                self.move_linear(target, rapid)?;
            }
            Some(Code::G(1)) => self.move_linear(target, feed)?,
            Some(Code::G(4)) => self.dwell(command)?,
            Some(Code::G(17)) => self.state.plane = Plane::XY,
            Some(Code::G(18)) => self.state.plane = Plane::ZX,
            Some(Code::G(19)) => self.state.plane = Plane::YZ,
            Some(Code::G(20)) => self.state.unit_scale = MM_PER_INCH,
            Some(Code::G(21)) => self.state.unit_scale = 1.0,
            Some(Code::G(28)) => {
                let mut axes = AxisFlags::new();
                for axis in [Axis::X, Axis::Y, Axis::Z] {
                    if command.has(axis.letter()) {
                        axes = axes.with(axis);
                    }
                }
                if axes.is_empty() {
                    axes = AxisFlags::xyz();
                }
                self.home(axes)?;
            }
            Some(Code::G(53)) => self.state.local = Coordinates::ZERO,
            Some(Code::G(90)) => {}
            Some(Code::G(91)) => return Err(MachineError::RelativeMode),
            Some(Code::G(92)) => {
                self.state.local = if command.has_coordinates() {
                    self.state.position
                        - command.coordinates(self.state.local_position(), self.state.unit_scale)
                } else {
                    self.state.position
                };
            }
            Some(Code::M(3)) => {
                let rpm = command.get('S').unwrap_or(self.state.spindle_rpm);
                if !(0.0..=self.config.spindle_max_rpm).contains(&rpm) {
                    return Err(MachineError::SpindleSpeed {
                        rpm,
                        max: self.config.spindle_max_rpm,
                    });
                }
                self.spindle(rpm)?;
                self.state.spindle_rpm = rpm;
            }
            Some(Code::M(5)) => self.spindle(0.0)?,
            Some(Code::M(2 | 30)) => {
                info!("program finished, resetting state");
                self.reset();
                return Ok(None);
            }
            Some(Code::M(84)) => self.boundary.disable_steppers()?,
            Some(Code::M(111)) => {
                self.state.diagnostics = true;
                if let Some(hook) = self.diagnostics_hook.as_mut() {
                    hook(true);
                }
                debug!("diagnostics enabled");
            }
            Some(Code::M(114)) => {
                self.boundary.join()?;
                answer = Some(self.state.local_position().to_string());
            }
            Some(code) => {
                return Err(MachineError::UnknownCommand {
                    code: code.to_string(),
                });
            }
        }

        self.state.velocity = feed;
        debug!(position = %self.state.position, "command done");
        Ok(answer)
    }

    fn move_linear(&mut self, target: Coordinates, feed: f64) -> Result<()> {
        let delta = target - self.state.position;
        if delta.is_zero() {
            return Ok(());
        }
        if !target.is_in_aabb(self.config.workspace_min(), self.config.workspace_max()) {
            return Err(MachineError::OutOfBounds { target });
        }

        let trajectory = Trajectory::new(delta, target, feed, &self.config)?;
        if self.config.velocity_policy == VelocityPolicy::Reject {
            check_velocity(trajectory.max_velocity(), &self.config)?;
        }

        info!("moving linearly to {target}");
        if let Err(err) = self.boundary.move_along(trajectory) {
            if err.kind() == ErrorKind::Geometry {
                self.state.position_reliable = false;
                warn!(%err, "move aborted, position is unreliable until homed");
            }
            return Err(err);
        }
        self.state.position = target;
        Ok(())
    }

    /// Feed for a G0 move by `delta`.
    fn rapid_feed(&self, delta: Coordinates) -> f64 {
        let distance = delta.abs();
        let length = distance.length();
        if length == 0.0 {
            return self.state.velocity;
        }
        let max = self.config.max_velocity_mm_per_min;
        let saturating = |axis: Axis| max.get(axis) * length / distance.get(axis);
        let moving = Axis::ALL.into_iter().filter(|&axis| distance.get(axis) > 0.0);
        match self.config.rapid_feed {
            RapidFeed::LimitingAxis => moving.map(saturating).fold(f64::INFINITY, f64::min),
            RapidFeed::DominantAxis => moving
                .max_by(|&a, &b| distance.get(a).total_cmp(&distance.get(b)))
                .map_or(self.state.velocity, saturating),
        }
    }

    fn dwell(&mut self, command: &Command) -> Result<()> {
        let seconds = command.get('P').ok_or(MachineError::MissingDwell)?;
        if seconds < 0.0 {
            return Err(MachineError::NegativeDwell { seconds });
        }
        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|_| MachineError::DwellTooLong { seconds })?;
        self.boundary.join()?;
        debug!(seconds, "dwell");
        std::thread::sleep(duration);
        Ok(())
    }

    fn spindle(&mut self, rpm: f64) -> Result<()> {
        self.boundary.join()?;
        info!(rpm, "spindle");
        self.boundary
            .spindle_control(100.0 * rpm / self.config.spindle_max_rpm)
    }

    /// Retract X and Y before Z, then ask the boundary for endstops.
    fn home(&mut self, axes: AxisFlags) -> Result<()> {
        info!(%axes, "homing");
        let max = self.config.max_velocity_mm_per_min;
        let p = self.state.position;
        match (axes.has_x(), axes.has_y()) {
            (true, true) => self.move_linear(Coordinates::new(0.0, 0.0, p.z, p.e), max.x.min(max.y))?,
            (true, false) => self.move_linear(p.with(Axis::X, 0.0), max.x)?,
            (false, true) => self.move_linear(p.with(Axis::Y, 0.0), max.y)?,
            (false, false) => {}
        }
        if axes.has_z() {
            let p = self.state.position;
            self.move_linear(p.with(Axis::Z, 0.0), max.z)?;
        }

        self.boundary.join()?;
        if !self.boundary.calibrate(axes)? {
            self.state.position_reliable = false;
            warn!(%axes, "calibration failed, position is unreliable until homed");
            return Err(MachineError::Calibration {
                axes: axes.to_string(),
            });
        }
        self.state.position_reliable = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hal::{Call, RecordingBoundary},
        trajectory::{Direction, MotionEvent},
    };
    use std::{cell::Cell, rc::Rc};

    fn controller() -> MachineController<RecordingBoundary> {
        controller_with(MachineConfig::default())
    }

    fn controller_with(config: MachineConfig) -> MachineController<RecordingBoundary> {
        MachineController::new(config, RecordingBoundary::default()).unwrap()
    }

    fn run(
        machine: &mut MachineController<RecordingBoundary>,
        line: &str,
    ) -> Result<Option<String>> {
        let statements = cadenza_gcode::parse(line).unwrap();
        machine.execute(&statements[0])
    }

    fn moves(machine: &MachineController<RecordingBoundary>) -> Vec<Coordinates> {
        machine.boundary().moves()
    }

    #[test]
    fn linear_move_commits_position() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 Y5.5 F1200").unwrap();
        assert_eq!(machine.position().unwrap(), Coordinates::new(10.0, 5.5, 0.0, 0.0));
        assert_eq!(machine.state().velocity, 1200.0);
        let report = run(&mut machine, "M114").unwrap().unwrap();
        insta::assert_snapshot!(report, @"X:10.000 Y:5.500 Z:0.000 E:0.000");
    }

    #[test]
    fn out_of_bounds_target_leaves_state_unchanged() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 F1200").unwrap();
        let before = machine.state().clone();
        let err = run(&mut machine, "G1 X250 F300").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err, MachineError::OutOfBounds { .. }));
        assert_eq!(machine.state(), &before);
        assert_eq!(moves(&machine).len(), 1);
    }

    #[test]
    fn zero_move_skips_hardware() {
        let mut machine = controller();
        run(&mut machine, "G1 X0 Y0").unwrap();
        assert!(moves(&machine).is_empty());
    }

    #[test]
    fn low_feed_is_rejected() {
        let mut machine = controller();
        let err = run(&mut machine, "G1 X1 F0.5").unwrap_err();
        assert_eq!(
            err,
            MachineError::FeedTooLow {
                feed: 0.5,
                min: 1.0
            }
        );
        assert_eq!(machine.state().velocity, 600.0);
    }

    #[test]
    fn feed_only_line_updates_sticky_feed() {
        let mut machine = controller();
        assert_eq!(run(&mut machine, "F250").unwrap(), None);
        assert_eq!(machine.state().velocity, 250.0);
        assert!(moves(&machine).is_empty());
    }

    #[test]
    fn relative_mode_always_fails() {
        let mut machine = controller();
        assert_eq!(run(&mut machine, "G91").unwrap_err(), MachineError::RelativeMode);
        run(&mut machine, "G90").unwrap();
        run(&mut machine, "G1 X1").unwrap();
        assert_eq!(run(&mut machine, "G91").unwrap_err(), MachineError::RelativeMode);
    }

    #[test]
    fn unknown_code_fails() {
        let mut machine = controller();
        let err = run(&mut machine, "G2 X1 Y1").unwrap_err();
        assert_eq!(err.to_string(), "unsupported command G2");
        assert!(moves(&machine).is_empty());
    }

    #[test]
    fn local_frame_from_current_position() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 Y20 Z3").unwrap();
        run(&mut machine, "G92").unwrap();
        let report = run(&mut machine, "M114").unwrap().unwrap();
        assert_eq!(report, "X:0.000 Y:0.000 Z:0.000 E:0.000");

        run(&mut machine, "G1 X5").unwrap();
        assert_eq!(machine.state().position, Coordinates::new(15.0, 20.0, 3.0, 0.0));

        run(&mut machine, "G53").unwrap();
        assert_eq!(machine.state().local, Coordinates::ZERO);
    }

    #[test]
    fn local_frame_with_coordinates() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 Y10").unwrap();
        run(&mut machine, "G92 X5").unwrap();
        assert_eq!(machine.state().local, Coordinates::new(5.0, 0.0, 0.0, 0.0));
        let report = run(&mut machine, "M114").unwrap().unwrap();
        assert_eq!(report, "X:5.000 Y:10.000 Z:0.000 E:0.000");
    }

    #[test]
    fn inches_scale_coordinates() {
        let mut machine = controller();
        run(&mut machine, "G20").unwrap();
        run(&mut machine, "G1 X1 Y2").unwrap();
        let p = machine.state().position;
        assert!((p.x - 25.4).abs() < 1e-9);
        assert!((p.y - 50.8).abs() < 1e-9);
        run(&mut machine, "G21").unwrap();
        assert_eq!(machine.state().unit_scale, 1.0);
    }

    #[test]
    fn plane_selection() {
        let mut machine = controller();
        run(&mut machine, "G18").unwrap();
        assert_eq!(machine.state().plane, Plane::ZX);
        run(&mut machine, "G19").unwrap();
        assert_eq!(machine.state().plane, Plane::YZ);
        run(&mut machine, "G17").unwrap();
        assert_eq!(machine.state().plane, Plane::XY);
    }

    #[test]
    fn dwell_requires_non_negative_p() {
        let mut machine = controller();
        assert_eq!(run(&mut machine, "G4").unwrap_err(), MachineError::MissingDwell);
        assert_eq!(
            run(&mut machine, "G4 P-1").unwrap_err(),
            MachineError::NegativeDwell { seconds: -1.0 }
        );
        run(&mut machine, "G4 P0").unwrap();
        assert_eq!(machine.boundary().calls.last(), Some(&Call::Join));
    }

    #[test]
    fn oversized_dwell_is_rejected_before_join() {
        let mut machine = controller();
        let calls = machine.boundary().calls.len();
        let err = run(&mut machine, "G4 P99999999999999999999999").unwrap_err();
        assert!(matches!(err, MachineError::DwellTooLong { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(machine.boundary().calls.len(), calls);
    }

    #[test]
    fn spindle_speed_is_checked_and_scaled() {
        let mut machine = controller();
        run(&mut machine, "M3 S5000").unwrap();
        let calls = &machine.boundary().calls;
        assert_eq!(calls[calls.len() - 2..], [Call::Join, Call::Spindle(50.0)]);
        assert_eq!(machine.state().spindle_rpm, 5000.0);

        let err = run(&mut machine, "M3 S20000").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(machine.state().spindle_rpm, 5000.0);

        run(&mut machine, "M5").unwrap();
        assert_eq!(machine.boundary().calls.last(), Some(&Call::Spindle(0.0)));
    }

    #[test]
    fn homing_retracts_xy_before_z() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 Y20 Z30 E2").unwrap();
        run(&mut machine, "G28").unwrap();
        assert_eq!(
            moves(&machine)[1..],
            [
                Coordinates::new(0.0, 0.0, 30.0, 2.0),
                Coordinates::new(0.0, 0.0, 0.0, 2.0),
            ]
        );
        let calls = &machine.boundary().calls;
        assert_eq!(
            calls[calls.len() - 2..],
            [Call::Join, Call::Calibrate(AxisFlags::xyz())]
        );
    }

    #[test]
    fn homing_single_axis() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 Y20 Z30").unwrap();
        run(&mut machine, "G28 Y0").unwrap();
        assert_eq!(moves(&machine)[1..], [Coordinates::new(10.0, 0.0, 30.0, 0.0)]);
        let calls = &machine.boundary().calls;
        assert_eq!(
            calls[calls.len() - 2..],
            [Call::Join, Call::Calibrate(AxisFlags::new().with_y())]
        );
    }

    #[test]
    fn homing_z_only_skips_xy_retract() {
        let mut machine = controller();
        run(&mut machine, "G1 X10 Y20 Z30").unwrap();
        run(&mut machine, "G28 Z0").unwrap();
        assert_eq!(moves(&machine)[1..], [Coordinates::new(10.0, 20.0, 0.0, 0.0)]);
        let calls = &machine.boundary().calls;
        assert_eq!(
            calls[calls.len() - 2..],
            [Call::Join, Call::Calibrate(AxisFlags::new().with_z())]
        );
    }

    #[test]
    fn sub_step_moves_keep_motor_and_position_together() {
        let mut machine = controller();
        for i in 1..=100 {
            run(&mut machine, &format!("G1 X{} F600", i as f64 * 0.004)).unwrap();
        }
        let spm = machine.config().steps_per_mm.x;
        let mut sign = 1;
        let mut steps = 0i64;
        for event in &machine.boundary().events {
            match event {
                MotionEvent::Direction(dirs) => {
                    sign = if dirs.x == Direction::Reverse { -1 } else { 1 }
                }
                MotionEvent::Step { axes, .. } if axes.has_x() => steps += sign,
                _ => {}
            }
        }
        let x = machine.state().position.x;
        assert!((x - 0.4).abs() < 1e-9);
        assert_eq!(steps, (x * spm).round() as i64);
    }

    #[test]
    fn failed_calibration_marks_position_unreliable() {
        let mut machine = controller();
        machine.boundary_mut().endstops_hit = false;
        let err = run(&mut machine, "G28 X0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Calibration);
        assert!(!machine.state().position_reliable);

        machine.boundary_mut().endstops_hit = true;
        run(&mut machine, "G28").unwrap();
        assert!(machine.state().position_reliable);
    }

    #[test]
    fn geometry_fault_keeps_old_position() {
        let mut machine = controller();
        machine.boundary_mut().unreachable_after = Some(5);
        let err = run(&mut machine, "G1 X10").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
        assert_eq!(machine.state().position, Coordinates::ZERO);
        assert!(!machine.state().position_reliable);
    }

    #[test]
    fn rapid_feed_saturates_limiting_axis() {
        let config = MachineConfig {
            velocity_policy: VelocityPolicy::Reject,
            ..MachineConfig::default()
        };
        let mut machine = controller_with(config.clone());
        run(&mut machine, "G0 X100 Z10").unwrap();
        assert_eq!(moves(&machine), [Coordinates::new(100.0, 0.0, 10.0, 0.0)]);

        // Sizing the feed on X drives Z past its limit
        let mut machine = controller_with(MachineConfig {
            rapid_feed: RapidFeed::DominantAxis,
            ..config
        });
        let err = run(&mut machine, "G0 X100 Z10").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VelocityLimit);
        assert!(moves(&machine).is_empty());
    }

    #[test]
    fn rejected_overspeed_happens_before_motion() {
        let mut machine = controller_with(MachineConfig {
            velocity_policy: VelocityPolicy::Reject,
            ..MachineConfig::default()
        });
        let err = run(&mut machine, "G1 Z10 F700").unwrap_err();
        assert_eq!(
            err.to_string(),
            "axis Z velocity 700.000 mm/min exceeds maximum 600 mm/min"
        );
        assert!(moves(&machine).is_empty());
    }

    #[test]
    fn program_end_resets_configurable_state() {
        let mut machine = controller();
        run(&mut machine, "G20").unwrap();
        run(&mut machine, "G1 X1 F100").unwrap();
        run(&mut machine, "G92 X0").unwrap();
        run(&mut machine, "M30").unwrap();
        let state = machine.state();
        assert_eq!(state.velocity, 600.0);
        assert_eq!(state.unit_scale, 1.0);
        assert_eq!(state.local, Coordinates::ZERO);
        assert!((state.position.x - 25.4).abs() < 1e-9);
    }

    #[test]
    fn diagnostics_hook_fires() {
        let mut machine = controller();
        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        machine.set_diagnostics_hook(move |on| flag.set(on));
        run(&mut machine, "M111").unwrap();
        assert!(seen.get());
        assert!(machine.state().diagnostics);
    }

    #[test]
    fn release_shuts_down_hardware() {
        let mut machine = controller();
        run(&mut machine, "M84").unwrap();
        let boundary = machine.release().unwrap();
        assert_eq!(
            boundary.calls,
            [
                Call::Init,
                Call::DisableSteppers,
                Call::Join,
                Call::Spindle(0.0),
                Call::Fan(false),
                Call::Deinit,
            ]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = MachineConfig {
            sample_period_s: 0.0,
            ..MachineConfig::default()
        };
        assert!(MachineController::new(config, RecordingBoundary::default()).is_err());
    }
}
