use cadenza_core::{
    AxisFlags, Coordinates, HardwareBoundary, MachineError, MotionEvent, Result, Trajectory,
    kinematics::{PoseResult, delta::DeltaSolver},
};
use std::io::Write;
use tracing::{debug, info};

/// Drives a rotary delta robot through an external real-time servo
/// player, one `rt-cmd:POS <a0> <a1> <a2>` line (radians) per sample.
///
/// Every sample is solved before it is written, and the first
/// unreachable one aborts the move with a geometry error. Lines already
/// written for that move are not retracted.
pub struct DeltaServoBoundary<W: Write> {
    solver: DeltaSolver,
    scale: f64,
    origin: [f64; 3],
    writer: W,
}

impl<W: Write> DeltaServoBoundary<W> {
    /// `scale` converts machine millimeters to model units and `origin`
    /// is the model position of the machine origin.
    pub fn new(solver: DeltaSolver, scale: f64, origin: [f64; 3], writer: W) -> Self {
        Self {
            solver,
            scale,
            origin,
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn tip(&self, position: Coordinates) -> [f64; 3] {
        [
            position.x * self.scale + self.origin[0],
            position.y * self.scale + self.origin[1],
            position.z * self.scale + self.origin[2],
        ]
    }

    /// Highest joint speed at `pose` when the tip moved from `previous`.
    fn joint_speed(&self, pose: &PoseResult, previous: (f64, [f64; 3]), time_s: f64) -> f64 {
        let dt = time_s - previous.0;
        if dt <= 0.0 {
            return 0.0;
        }
        let tip_velocity: [f64; 3] = std::array::from_fn(|i| (pose.tip[i] - previous.1[i]) / dt);
        self.solver
            .joint_velocity(pose, tip_velocity)
            .map_or(0.0, |w| w.iter().fold(0.0, |acc: f64, v| acc.max(v.abs())))
    }
}

impl<W: Write> HardwareBoundary for DeltaServoBoundary<W> {
    fn init(&mut self) -> Result<()> {
        info!(geometry = ?self.solver.geometry(), "delta servo stream ready");
        Ok(())
    }

    fn move_along(&mut self, trajectory: Trajectory) -> Result<()> {
        let mut previous = (0.0, self.tip(trajectory.start()));
        let mut peak_joint_speed: f64 = 0.0;

        for event in trajectory {
            let MotionEvent::Sample { time_s, position } = event else {
                return Err(MachineError::hardware(
                    "delta servo stream needs position samples, not step pulses",
                ));
            };

            let pose = self.solver.inverse(self.tip(position));
            if !pose.is_valid() {
                return Err(MachineError::Unreachable { position });
            }
            peak_joint_speed = peak_joint_speed.max(self.joint_speed(&pose, previous, time_s));

            let [a0, a1, a2] = pose.angles();
            writeln!(self.writer, "rt-cmd:POS {a0:.6} {a1:.6} {a2:.6}")?;
            previous = (time_s, pose.tip);
        }

        debug!(peak_joint_speed, "delta move streamed");
        Ok(())
    }

    fn join(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn spindle_control(&mut self, percent: f64) -> Result<()> {
        info!("spindle control: {percent}% (no spindle on delta)");
        Ok(())
    }

    fn fan_control(&mut self, _on: bool) -> Result<()> {
        Ok(())
    }

    fn disable_steppers(&mut self) -> Result<()> {
        Ok(())
    }

    fn calibrate(&mut self, axes: AxisFlags) -> Result<bool> {
        info!(%axes, "servo positions are absolute, nothing to calibrate");
        Ok(true)
    }

    fn deinit(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
