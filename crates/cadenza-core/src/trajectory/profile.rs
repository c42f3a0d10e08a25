//! Symmetric trapezoidal velocity planning.
//!
//! The dominant axis (the one with the highest peak velocity) ramps at
//! the shared acceleration; every other axis follows proportionally so
//! the tool tip stays on the straight line. A move that cannot reach
//! its peak velocity before it has to brake degrades to a triangle.

use crate::{
    config::{MachineConfig, VelocityPolicy},
    coordinates::{Axis, Coordinates},
    error::{MachineError, Result},
};

pub const SECONDS_IN_MINUTE: f64 = 60.0;

/// Relative slack when comparing a velocity against its limit, so
/// rounding in the direction vector never trips the check.
const VELOCITY_SLACK: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Profile {
    /// Duration of the ramp up, equal to the ramp down
    pub acceleration_time_s: f64,
    /// Duration at constant velocity
    pub cruise_time_s: f64,
    /// Per-axis speed magnitude at the top of the ramp, mm/s
    pub peak_velocity: Coordinates,
    /// Path length, mm
    pub distance_mm: f64,
}

impl Profile {
    /// Plan a move of `delta` at `feed_mm_per_min`.
    pub fn plan(delta: Coordinates, feed_mm_per_min: f64, config: &MachineConfig) -> Result<Self> {
        if delta.is_zero() {
            return Ok(Self::default());
        }

        let distance = delta.abs();
        let total = distance.length();
        let requested = distance * (feed_mm_per_min / SECONDS_IN_MINUTE / total);
        let mut peak = limit_velocity(requested, config)?;

        let mut acceleration_time = peak.find_max() / config.max_acceleration_mm_per_s2;
        let speed = peak.length();
        let path_acceleration = speed / acceleration_time;

        // Ramping up and down covers speed * t_a in total
        let cruise_time = if speed * acceleration_time > total {
            acceleration_time = (total / path_acceleration).sqrt();
            peak = distance / acceleration_time;
            0.0
        } else {
            (total - speed * acceleration_time) / speed
        };

        Ok(Self {
            acceleration_time_s: acceleration_time,
            cruise_time_s: cruise_time,
            peak_velocity: peak,
            distance_mm: total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.distance_mm == 0.0
    }

    pub fn total_time_s(&self) -> f64 {
        2.0 * self.acceleration_time_s + self.cruise_time_s
    }

    /// Path speed at the top of the ramp, mm/s.
    pub fn peak_speed(&self) -> f64 {
        self.peak_velocity.length()
    }

    /// Path acceleration, mm/s^2.
    pub fn acceleration(&self) -> f64 {
        if self.acceleration_time_s == 0.0 {
            return 0.0;
        }
        self.peak_speed() / self.acceleration_time_s
    }

    /// Peak per-axis velocity in mm/min.
    pub fn max_velocity_mm_per_min(&self) -> Coordinates {
        self.peak_velocity * SECONDS_IN_MINUTE
    }

    /// Distance travelled along the path at `t` seconds into the move.
    pub fn distance_at(&self, t: f64) -> f64 {
        let ta = self.acceleration_time_s;
        let tc = self.cruise_time_s;
        let total_time = self.total_time_s();
        let accel = self.acceleration();

        if t <= 0.0 {
            0.0
        } else if t < ta {
            0.5 * accel * t * t
        } else if t < ta + tc {
            0.5 * accel * ta * ta + self.peak_speed() * (t - ta)
        } else if t < total_time {
            let remaining = total_time - t;
            self.distance_mm - 0.5 * accel * remaining * remaining
        } else {
            self.distance_mm
        }
    }

    /// Map pseudo-time (time the same distance would take at constant
    /// peak velocity) to real time on the trapezoid.
    ///
    /// Accelerating: `v_peak * tp = a * t^2 / 2`, so `t = sqrt(2 * t_a * tp)`.
    /// Cruising: shifted by the pseudo-time spent ramping (`t_a / 2`).
    /// Braking: the mirrored quadratic, solved for the earlier root.
    pub fn to_accelerated_time(&self, pseudo_t: f64) -> f64 {
        let ta = self.acceleration_time_s;
        let tc = self.cruise_time_s;
        let two_ta = 2.0 * ta;

        let t = (pseudo_t * two_ta).sqrt();
        if t <= ta {
            return t;
        }

        let t = ta + pseudo_t - ta * ta / two_ta;
        let braking = t - ta - tc;
        if braking <= 0.0 {
            return t;
        }

        let d = ta * ta - two_ta * braking;
        let d = if d > 0.0 { d.sqrt() } else { 0.0 };
        two_ta + tc - d
    }
}

/// Apply the velocity policy to a requested per-axis velocity (mm/s).
fn limit_velocity(velocity: Coordinates, config: &MachineConfig) -> Result<Coordinates> {
    let mut k: f64 = 1.0;
    let mut violation = None;
    for axis in Axis::ALL {
        let requested = velocity.get(axis) * SECONDS_IN_MINUTE;
        let max = config.max_velocity_mm_per_min.get(axis);
        if requested > max * (1.0 + VELOCITY_SLACK) {
            k = k.min(max / requested);
            violation.get_or_insert(MachineError::VelocityLimit {
                axis,
                requested,
                max,
            });
        }
    }

    match violation {
        None => Ok(velocity),
        Some(err) => match config.velocity_policy {
            VelocityPolicy::Reject => Err(err),
            VelocityPolicy::Scale => {
                tracing::warn!("out of speed, multiplying velocity by {k}");
                Ok(velocity * k)
            }
        },
    }
}

/// Check a realized peak velocity (mm/min) against the axis maxima.
pub fn check_velocity(max_velocity: Coordinates, config: &MachineConfig) -> Result<()> {
    for axis in Axis::ALL {
        let requested = max_velocity.get(axis);
        let max = config.max_velocity_mm_per_min.get(axis);
        if requested > max * (1.0 + VELOCITY_SLACK) {
            return Err(MachineError::VelocityLimit {
                axis,
                requested,
                max,
            });
        }
    }
    Ok(())
}
