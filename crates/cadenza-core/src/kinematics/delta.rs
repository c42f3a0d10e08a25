// Rotary delta kinematics: three shoulder motors 120 degrees apart,
// each driving a parallelogram forearm down to a shared platform.

use super::{LegPose, PoseResult};
use crate::error::{MachineError, Result};
use serde::{Deserialize, Serialize};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Fixed mechanical dimensions, all in the same length unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltaGeometry {
    /// Shoulder (upper arm) length, L
    pub shoulder: f64,
    /// Forearm length, l
    pub forearm: f64,
    /// Base center to shoulder joint, wb
    pub base_radius: f64,
    /// Platform center to forearm joint, up
    pub platform_radius: f64,
    #[serde(default = "default_joint_min")]
    pub joint_min_deg: f64,
    #[serde(default = "default_joint_max")]
    pub joint_max_deg: f64,
}

fn default_joint_min() -> f64 {
    -160.0
}

fn default_joint_max() -> f64 {
    120.0
}

impl DeltaGeometry {
    pub fn new(shoulder: f64, forearm: f64, base_radius: f64, platform_radius: f64) -> Self {
        Self {
            shoulder,
            forearm,
            base_radius,
            platform_radius,
            joint_min_deg: default_joint_min(),
            joint_max_deg: default_joint_max(),
        }
    }
}

/// Reference robot, in meters.
impl Default for DeltaGeometry {
    fn default() -> Self {
        Self::new(0.524, 1.244, 0.164, 0.044)
    }
}

/// Closed-form inverse position and velocity kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaSolver {
    geometry: DeltaGeometry,
    joint_min: f64,
    joint_max: f64,
    a: f64,
    b: f64,
    c: f64,
}

impl DeltaSolver {
    pub fn new(geometry: DeltaGeometry) -> Self {
        let wb = geometry.base_radius;
        let up = geometry.platform_radius;
        let sp = 3.0 * up / SQRT_3;
        Self {
            geometry,
            joint_min: geometry.joint_min_deg.to_radians(),
            joint_max: geometry.joint_max_deg.to_radians(),
            a: wb - up,
            b: sp / 2.0 - SQRT_3 * wb / 2.0,
            c: up / 2.0 - wb / 2.0,
        }
    }

    pub fn geometry(&self) -> &DeltaGeometry {
        &self.geometry
    }

    /// Solve joint angles for a tip position `[x, y, z]`.
    pub fn inverse(&self, tip: [f64; 3]) -> PoseResult {
        let [x, y, z] = tip;
        let (a, b, c) = (self.a, self.b, self.c);
        let l_s = self.geometry.shoulder;
        let l_f = self.geometry.forearm;

        let alpha = x * x + y * y + z * z + l_s * l_s - l_f * l_f;
        let f = 2.0 * z * l_s;

        let coefficients = [
            (2.0 * l_s * (y + a), alpha + a * a + 2.0 * y * a),
            (
                -l_s * (SQRT_3 * (x + b) + y + c),
                alpha + b * b + c * c + 2.0 * (x * b + y * c),
            ),
            (
                l_s * (SQRT_3 * (x - b) - y - c),
                alpha + b * b + c * c + 2.0 * (-x * b + y * c),
            ),
        ];

        let legs = coefficients.map(|(e, g)| match self.solve_leg(e, f, g) {
            Some(angle) => LegPose::checked(angle, self.joint_min, self.joint_max),
            None => LegPose::UNREACHABLE,
        });

        PoseResult { tip, legs }
    }

    /// Solve from a slice, rejecting anything that is not three components.
    pub fn inverse_from_slice(&self, tip: &[f64]) -> Result<PoseResult> {
        let tip: [f64; 3] = tip.try_into().map_err(|_| MachineError::InvalidShape {
            expected: 3,
            actual: tip.len(),
        })?;
        Ok(self.inverse(tip))
    }

    /// `e cos(t) + f sin(t) + g = 0` via the half-angle substitution.
    fn solve_leg(&self, e: f64, f: f64, g: f64) -> Option<f64> {
        let discriminant = e * e + f * f - g * g;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let first = 2.0 * ((-f + root) / (g - e)).atan();
        let second = 2.0 * ((-f - root) / (g - e)).atan();
        Some(self.working_posture(first, second))
    }

    /// Pick the elbow-out solution: the candidate whose elbow sits
    /// farther from the base center in the leg's vertical plane.
    fn working_posture(&self, first: f64, second: f64) -> f64 {
        let reach = |angle: f64| {
            let r = -self.geometry.base_radius - self.geometry.shoulder * angle.cos();
            let h = -self.geometry.shoulder * angle.cos();
            r * r + h * h
        };
        if reach(first) > reach(second) {
            first
        } else {
            second
        }
    }

    /// Joint angular velocities for a tip velocity at `pose`.
    ///
    /// Returns `None` for an invalid pose. Near-singular poses are not
    /// special-cased; callers bound the result before driving motors.
    pub fn joint_velocity(&self, pose: &PoseResult, tip_velocity: [f64; 3]) -> Option<[f64; 3]> {
        if !pose.is_valid() {
            return None;
        }
        let [x, y, z] = pose.tip;
        let [t0, t1, t2] = pose.angles();
        let (a, b, c) = (self.a, self.b, self.c);
        let l_s = self.geometry.shoulder;

        let m_a = [
            [x, y + a + l_s * t0.cos(), z + l_s * t0.sin()],
            [
                2.0 * (x + b) - SQRT_3 * l_s * t1.cos(),
                2.0 * (y + c) - l_s * t1.cos(),
                2.0 * (z + l_s * t1.sin()),
            ],
            [
                2.0 * (x - b) + SQRT_3 * l_s * t2.cos(),
                2.0 * (y + c) - l_s * t2.cos(),
                2.0 * (z + l_s * t2.sin()),
            ],
        ];

        // Diagonal of B^-1, inverted term by term
        let inv_b = [
            1.0 / (l_s * ((y + a) * t0.sin() - z * t0.cos())),
            -1.0 / (l_s * ((SQRT_3 * (x + b) + y + c) * t1.sin() + 2.0 * z * t1.cos())),
            1.0 / (l_s * ((SQRT_3 * (x - b) - y - c) * t2.sin() - 2.0 * z * t2.cos())),
        ];

        Some(std::array::from_fn(|i| {
            inv_b[i] * (0..3).map(|j| m_a[i][j] * tip_velocity[j]).sum::<f64>()
        }))
    }

    /// Slice form of [`DeltaSolver::joint_velocity`].
    pub fn joint_velocity_from_slice(
        &self,
        pose: &PoseResult,
        tip_velocity: &[f64],
    ) -> Result<Option<[f64; 3]>> {
        let v: [f64; 3] = tip_velocity
            .try_into()
            .map_err(|_| MachineError::InvalidShape {
                expected: 3,
                actual: tip_velocity.len(),
            })?;
        Ok(self.joint_velocity(pose, v))
    }
}
