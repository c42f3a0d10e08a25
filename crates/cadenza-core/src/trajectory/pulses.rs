// Stepper pulse emission

use super::{Direction, Directions, MotionEvent, profile::Profile};
use crate::{
    config::MachineConfig,
    coordinates::{Axis, AxisFlags, Coordinates},
};

/// Emits timed step pulses for each axis.
///
/// Steps are counted between the absolute step positions of the start
/// and the destination (`round(p * steps_per_mm)`), so fractions of a
/// step carry over into later moves instead of being lost.
///
/// Each axis is first scheduled as uniform motion at its peak velocity:
/// pulse `k` fires at the pseudo-time the axis reaches step position
/// `first + k`, clamped to the end of the move. The soonest pending
/// pulse is then mapped onto the trapezoid with
/// [`Profile::to_accelerated_time`]. Axes sharing the same pseudo-time
/// step together.
#[derive(Debug, Clone)]
pub(super) struct PulseEmitter {
    total: [u64; 4],
    done: [u64; 4],
    /// Offset in mm from the start to the first step position, along the travel
    first_mm: [f64; 4],
    distance_mm: [f64; 4],
    steps_per_mm: [f64; 4],
    velocity: [f64; 4],
    directions: Directions,
    announced: Option<Directions>,
}

impl PulseEmitter {
    pub(super) fn new(
        start: Coordinates,
        destination: Coordinates,
        profile: &Profile,
        config: &MachineConfig,
    ) -> Self {
        let delta = destination - start;
        let mut total = [0; 4];
        let mut first_mm = [0.0; 4];
        let mut distance_mm = [0.0; 4];
        let mut steps_per_mm = [0.0; 4];
        let mut velocity = [0.0; 4];
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            let spm = config.steps_per_mm.get(axis);
            let from = (start.get(axis) * spm).round();
            let to = (destination.get(axis) * spm).round();
            let offset = start.get(axis) - from / spm;
            steps_per_mm[i] = spm;
            total[i] = (to - from).abs() as u64;
            // steps already ahead of the start in the direction of travel
            first_mm[i] = if to >= from { -offset } else { offset };
            distance_mm[i] = delta.get(axis).abs();
            velocity[i] = profile.peak_velocity.get(axis);
        }

        Self {
            total,
            done: [0; 4],
            first_mm,
            distance_mm,
            steps_per_mm,
            velocity,
            directions: Directions::of(delta, &config.inverted),
            announced: None,
        }
    }

    /// Pulses per axis this move will emit.
    pub(super) fn total_steps(&self) -> [u64; 4] {
        self.total
    }

    fn pending(&self, i: usize) -> Option<f64> {
        if self.done[i] >= self.total[i] {
            return None;
        }
        let travel = self.first_mm[i] + (self.done[i] + 1) as f64 / self.steps_per_mm[i];
        let travel = travel.clamp(0.0, self.distance_mm[i]);
        if self.velocity[i] > 0.0 {
            Some(travel / self.velocity[i])
        } else {
            Some(0.0)
        }
    }

    pub(super) fn next(&mut self, profile: &Profile) -> Option<MotionEvent> {
        if self.announced != Some(self.directions) {
            self.announced = Some(self.directions);
            return Some(MotionEvent::Direction(self.directions));
        }

        let pending: [Option<f64>; 4] = std::array::from_fn(|i| self.pending(i));
        let soonest = pending.iter().flatten().copied().reduce(f64::min)?;

        let mut axes = AxisFlags::new();
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            if matches!(pending[i], Some(t) if t <= soonest) {
                self.done[i] += 1;
                axes = axes.with(axis);
            }
        }

        Some(MotionEvent::Step {
            time_s: profile.to_accelerated_time(soonest),
            axes,
        })
    }
}

impl Directions {
    /// Travel direction of each axis for `delta`, after inversion.
    pub fn of(delta: Coordinates, inverted: &crate::config::InvertedAxes) -> Self {
        let dir = |axis: Axis| {
            let d = Direction::of(delta.get(axis));
            if inverted.get(axis) { d.reversed() } else { d }
        };
        Self {
            x: dir(Axis::X),
            y: dir(Axis::Y),
            z: dir(Axis::Z),
            e: dir(Axis::E),
        }
    }
}
