//! Trajectory generation for linear moves.
//!
//! A [`Trajectory`] is planned once and then pulled event by event by a
//! hardware boundary. It is finite and cannot be restarted; once it
//! returns `None` it stays exhausted.

use crate::{
    config::{EmissionMode, MachineConfig},
    coordinates::{AxisFlags, Coordinates},
    error::Result,
};
use std::iter::FusedIterator;

pub mod profile;
mod pulses;
mod samples;

pub use profile::{Profile, SECONDS_IN_MINUTE, check_velocity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// Zero travel counts as forward.
    pub fn of(delta: f64) -> Self {
        if delta.is_sign_negative() && delta != 0.0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Direction of every axis, as presented to the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directions {
    pub x: Direction,
    pub y: Direction,
    pub z: Direction,
    pub e: Direction,
}

/// One element of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionEvent {
    /// Set driver direction pins before the following pulses.
    Direction(Directions),
    /// Step every axis in `axes` at `time_s` after the move started.
    Step { time_s: f64, axes: AxisFlags },
    /// Absolute target position at `time_s` after the move started.
    Sample { time_s: f64, position: Coordinates },
}

impl MotionEvent {
    pub fn time_s(&self) -> Option<f64> {
        match self {
            MotionEvent::Direction(_) => None,
            MotionEvent::Step { time_s, .. } | MotionEvent::Sample { time_s, .. } => Some(*time_s),
        }
    }
}

#[derive(Debug, Clone)]
enum Emitter {
    Empty,
    Pulses(pulses::PulseEmitter),
    Samples(samples::SampleEmitter),
}

/// A planned linear move.
#[derive(Debug, Clone)]
pub struct Trajectory {
    start: Coordinates,
    delta: Coordinates,
    destination: Coordinates,
    profile: Profile,
    emitter: Emitter,
    last_time: f64,
    exhausted: bool,
}

impl Trajectory {
    /// Plan a move by `delta` that ends at `destination`.
    pub fn new(
        delta: Coordinates,
        destination: Coordinates,
        feed_mm_per_min: f64,
        config: &MachineConfig,
    ) -> Result<Self> {
        let profile = Profile::plan(delta, feed_mm_per_min, config)?;
        let start = destination - delta;
        let emitter = if profile.is_empty() {
            Emitter::Empty
        } else {
            match config.emission {
                EmissionMode::Pulses => Emitter::Pulses(pulses::PulseEmitter::new(
                    start,
                    destination,
                    &profile,
                    config,
                )),
                EmissionMode::Samples => {
                    Emitter::Samples(samples::SampleEmitter::new(config.sample_period_s))
                }
            }
        };

        tracing::debug!(
            accel_s = profile.acceleration_time_s,
            cruise_s = profile.cruise_time_s,
            peak = %profile.max_velocity_mm_per_min(),
            "planned move to {destination}"
        );

        Ok(Self {
            start,
            delta,
            destination,
            profile,
            emitter,
            last_time: 0.0,
            exhausted: false,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn start(&self) -> Coordinates {
        self.start
    }

    pub fn delta(&self) -> Coordinates {
        self.delta
    }

    pub fn destination(&self) -> Coordinates {
        self.destination
    }

    pub fn total_time_s(&self) -> f64 {
        self.profile.total_time_s()
    }

    /// Peak per-axis velocity in mm/min.
    pub fn max_velocity(&self) -> Coordinates {
        self.profile.max_velocity_mm_per_min()
    }

    /// Emission mode, or `None` for an empty move.
    pub fn mode(&self) -> Option<EmissionMode> {
        match self.emitter {
            Emitter::Empty => None,
            Emitter::Pulses(_) => Some(EmissionMode::Pulses),
            Emitter::Samples(_) => Some(EmissionMode::Samples),
        }
    }

    /// Total pulses per axis (X, Y, Z, E) in pulse mode.
    pub fn total_steps(&self) -> Option<[u64; 4]> {
        match &self.emitter {
            Emitter::Pulses(p) => Some(p.total_steps()),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Iterator for Trajectory {
    type Item = MotionEvent;

    fn next(&mut self) -> Option<MotionEvent> {
        if self.exhausted {
            return None;
        }

        let event = match &mut self.emitter {
            Emitter::Empty => None,
            Emitter::Pulses(p) => p.next(&self.profile),
            Emitter::Samples(s) => s.next(self.start, self.delta, self.destination, &self.profile),
        };

        let Some(mut event) = event else {
            self.exhausted = true;
            return None;
        };

        // Emission time never goes backwards
        match &mut event {
            MotionEvent::Step { time_s, .. } | MotionEvent::Sample { time_s, .. } => {
                *time_s = time_s.max(self.last_time);
                self.last_time = *time_s;
            }
            MotionEvent::Direction(_) => {}
        }
        Some(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        match &self.emitter {
            Emitter::Empty => (0, Some(0)),
            Emitter::Pulses(_) => (0, None),
            Emitter::Samples(s) => {
                let remaining = s.remaining(&self.profile);
                (remaining.saturating_sub(1), Some(remaining + 1))
            }
        }
    }
}

impl FusedIterator for Trajectory {}
