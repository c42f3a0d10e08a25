//! The hardware boundary consumed by the controller.
//!
//! Implementations drive real motors, write debug files or simply
//! record what they were asked to do. The controller never inspects
//! which one it holds.

use crate::{
    coordinates::{AxisFlags, Coordinates},
    error::{MachineError, Result},
    trajectory::{MotionEvent, Trajectory},
};

pub trait HardwareBoundary {
    fn init(&mut self) -> Result<()>;

    /// Consume `trajectory` to completion. An unreachable sample aborts
    /// the move with [`MachineError::Unreachable`].
    fn move_along(&mut self, trajectory: Trajectory) -> Result<()>;

    /// Block until every move issued since the previous join has finished.
    fn join(&mut self) -> Result<()>;

    /// Spindle power in percent of maximum, `0.0` switches it off.
    fn spindle_control(&mut self, percent: f64) -> Result<()>;

    fn fan_control(&mut self, on: bool) -> Result<()>;

    fn disable_steppers(&mut self) -> Result<()>;

    /// Report whether every endstop in `axes` triggered.
    fn calibrate(&mut self, axes: AxisFlags) -> Result<bool>;

    fn deinit(&mut self) -> Result<()>;
}

impl<B: HardwareBoundary + ?Sized> HardwareBoundary for Box<B> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn move_along(&mut self, trajectory: Trajectory) -> Result<()> {
        (**self).move_along(trajectory)
    }

    fn join(&mut self) -> Result<()> {
        (**self).join()
    }

    fn spindle_control(&mut self, percent: f64) -> Result<()> {
        (**self).spindle_control(percent)
    }

    fn fan_control(&mut self, on: bool) -> Result<()> {
        (**self).fan_control(on)
    }

    fn disable_steppers(&mut self) -> Result<()> {
        (**self).disable_steppers()
    }

    fn calibrate(&mut self, axes: AxisFlags) -> Result<bool> {
        (**self).calibrate(axes)
    }

    fn deinit(&mut self) -> Result<()> {
        (**self).deinit()
    }
}

/// One boundary invocation as seen by [`RecordingBoundary`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init,
    Move {
        start: Coordinates,
        destination: Coordinates,
    },
    Join,
    Spindle(f64),
    Fan(bool),
    DisableSteppers,
    Calibrate(AxisFlags),
    Deinit,
}

/// Boundary that records every call and every consumed event.
#[derive(Debug)]
pub struct RecordingBoundary {
    pub calls: Vec<Call>,
    pub events: Vec<MotionEvent>,
    /// Result returned from [`HardwareBoundary::calibrate`]
    pub endstops_hit: bool,
    /// Fail the next move as unreachable after this many events
    pub unreachable_after: Option<usize>,
}

impl Default for RecordingBoundary {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            events: Vec::new(),
            endstops_hit: true,
            unreachable_after: None,
        }
    }
}

impl RecordingBoundary {
    /// Destinations of all recorded moves, in order.
    pub fn moves(&self) -> Vec<Coordinates> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Move { destination, .. } => Some(*destination),
                _ => None,
            })
            .collect()
    }
}

impl HardwareBoundary for RecordingBoundary {
    fn init(&mut self) -> Result<()> {
        self.calls.push(Call::Init);
        Ok(())
    }

    fn move_along(&mut self, trajectory: Trajectory) -> Result<()> {
        self.calls.push(Call::Move {
            start: trajectory.start(),
            destination: trajectory.destination(),
        });
        for (consumed, event) in trajectory.enumerate() {
            if let Some(limit) = self.unreachable_after
                && consumed >= limit
            {
                self.unreachable_after = None;
                let position = match event {
                    MotionEvent::Sample { position, .. } => position,
                    _ => Coordinates::ZERO,
                };
                return Err(MachineError::Unreachable { position });
            }
            self.events.push(event);
        }
        Ok(())
    }

    fn join(&mut self) -> Result<()> {
        self.calls.push(Call::Join);
        Ok(())
    }

    fn spindle_control(&mut self, percent: f64) -> Result<()> {
        self.calls.push(Call::Spindle(percent));
        Ok(())
    }

    fn fan_control(&mut self, on: bool) -> Result<()> {
        self.calls.push(Call::Fan(on));
        Ok(())
    }

    fn disable_steppers(&mut self) -> Result<()> {
        self.calls.push(Call::DisableSteppers);
        Ok(())
    }

    fn calibrate(&mut self, axes: AxisFlags) -> Result<bool> {
        self.calls.push(Call::Calibrate(axes));
        Ok(self.endstops_hit)
    }

    fn deinit(&mut self) -> Result<()> {
        self.calls.push(Call::Deinit);
        Ok(())
    }
}
