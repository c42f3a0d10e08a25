// Kinematics solvers mapping tool-tip space to actuator space

pub mod delta;

/// Solved angle of one actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegPose {
    /// Joint angle in radians, NaN when the leg cannot reach the tip
    pub angle: f64,
    pub valid: bool,
}

impl LegPose {
    pub const UNREACHABLE: LegPose = LegPose {
        angle: f64::NAN,
        valid: false,
    };

    /// Accept `angle` only when it is finite and within `[min, max]`.
    pub fn checked(angle: f64, min: f64, max: f64) -> Self {
        let valid = angle.is_finite() && (min..=max).contains(&angle);
        Self { angle, valid }
    }
}

/// Inverse kinematics result for one tip position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseResult {
    pub tip: [f64; 3],
    pub legs: [LegPose; 3],
}

impl PoseResult {
    /// A pose is valid only when every leg is.
    pub fn is_valid(&self) -> bool {
        self.legs.iter().all(|leg| leg.valid)
    }

    pub fn angles(&self) -> [f64; 3] {
        self.legs.map(|leg| leg.angle)
    }
}
