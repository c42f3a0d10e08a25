use cadenza_core::{
    AxisFlags, HardwareBoundary, MotionEvent, Result, Trajectory, coordinates::Axis,
};
use std::time::Instant;
use tracing::{debug, info};

/// Debug boundary: logs every call and drains each trajectory without
/// waiting for it, reporting how long preparation took against the
/// planned duration.
#[derive(Debug, Default)]
pub struct VirtualBoundary {
    moves: usize,
    planned_time_s: f64,
}

impl VirtualBoundary {
    /// Moves consumed so far.
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Sum of planned move durations.
    pub fn planned_time_s(&self) -> f64 {
        self.planned_time_s
    }
}

impl HardwareBoundary for VirtualBoundary {
    fn init(&mut self) -> Result<()> {
        info!("initialize hal");
        Ok(())
    }

    fn move_along(&mut self, trajectory: Trajectory) -> Result<()> {
        let started = Instant::now();
        let estimated = trajectory.total_time_s();
        let mut steps = [0u64; 4];
        let mut samples = 0usize;

        for event in trajectory {
            match event {
                MotionEvent::Direction(dirs) => debug!(?dirs, "direction"),
                MotionEvent::Step { axes, .. } => {
                    for (i, axis) in Axis::ALL.into_iter().enumerate() {
                        if axes.has(axis) {
                            steps[i] += 1;
                        }
                    }
                }
                MotionEvent::Sample { .. } => samples += 1,
            }
        }

        self.moves += 1;
        self.planned_time_s += estimated;
        debug!(?steps, samples, "moved");
        info!(
            "prepared in {:.2}s, estimated {:.2}s",
            started.elapsed().as_secs_f64(),
            estimated
        );
        Ok(())
    }

    fn join(&mut self) -> Result<()> {
        debug!("hal join");
        Ok(())
    }

    fn spindle_control(&mut self, percent: f64) -> Result<()> {
        info!("spindle control: {percent}%");
        Ok(())
    }

    fn fan_control(&mut self, on: bool) -> Result<()> {
        info!("fan is {}", if on { "on" } else { "off" });
        Ok(())
    }

    fn disable_steppers(&mut self) -> Result<()> {
        info!("hal disable steppers");
        Ok(())
    }

    fn calibrate(&mut self, axes: AxisFlags) -> Result<bool> {
        info!(%axes, "hal calibrate");
        Ok(true)
    }

    fn deinit(&mut self) -> Result<()> {
        info!("hal deinit");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_core::{Coordinates, MachineConfig};

    #[test]
    fn drains_and_accumulates_planned_time() {
        let mut hal = VirtualBoundary::default();
        let config = MachineConfig::default();
        let delta = Coordinates::new(5.0, 5.0, 0.0, 0.0);
        let trajectory = Trajectory::new(delta, delta, 1200.0, &config).unwrap();
        let expected = trajectory.total_time_s();
        hal.move_along(trajectory).unwrap();
        assert_eq!(hal.moves(), 1);
        assert_eq!(hal.planned_time_s(), expected);
        assert!(hal.calibrate(AxisFlags::xyz()).unwrap());
    }
}
