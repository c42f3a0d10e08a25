// 4-axis coordinates (X, Y, Z and extruder E)

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Machine axes in the order they appear in coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
    E,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::E];

    /// Parse axis from its G-code letter (case-insensitive)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'E' => Some(Axis::E),
            _ => None,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::E => 'E',
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A point or vector in machine space. Millimeters for positions,
/// mm/s or mm/min for velocities depending on context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub e: f64,
}

impl Coordinates {
    pub const ZERO: Coordinates = Coordinates::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64, e: f64) -> Self {
        Self { x, y, z, e }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::E => self.e,
        }
    }

    /// Copy with one component replaced.
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
            Axis::E => self.e = value,
        }
        self
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z), f(self.e))
    }

    /// Component-wise combination with another vector.
    pub fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(
            f(self.x, other.x),
            f(self.y, other.y),
            f(self.z, other.z),
            f(self.e, other.e),
        )
    }

    pub fn abs(self) -> Self {
        self.map(f64::abs)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0 && self.e == 0.0
    }

    /// Euclidean norm over all four axes.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.e * self.e).sqrt()
    }

    /// Largest component.
    pub fn find_max(&self) -> f64 {
        self.x.max(self.y).max(self.z).max(self.e)
    }

    /// Check X, Y and Z against an axis-aligned box, bounds inclusive.
    /// The extruder axis is unbounded.
    pub fn is_in_aabb(&self, min: Coordinates, max: Coordinates) -> bool {
        let (lo_x, hi_x) = (min.x.min(max.x), min.x.max(max.x));
        let (lo_y, hi_y) = (min.y.min(max.y), min.y.max(max.y));
        let (lo_z, hi_z) = (min.z.min(max.z), min.z.max(max.z));
        (lo_x..=hi_x).contains(&self.x)
            && (lo_y..=hi_y).contains(&self.y)
            && (lo_z..=hi_z).contains(&self.z)
    }
}

impl Add for Coordinates {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Coordinates {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Mul<f64> for Coordinates {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.map(|v| v * rhs)
    }
}

impl Div<f64> for Coordinates {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        self.map(|v| v / rhs)
    }
}

impl Neg for Coordinates {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "X:{:.3} Y:{:.3} Z:{:.3} E:{:.3}",
            self.x, self.y, self.z, self.e
        )
    }
}

/// Set of axes, used for homing requests and step events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AxisFlags(u8);

impl AxisFlags {
    const X: u8 = 1 << 0;
    const Y: u8 = 1 << 1;
    const Z: u8 = 1 << 2;
    const E: u8 = 1 << 3;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn xyz() -> Self {
        Self(Self::X | Self::Y | Self::Z)
    }

    const fn bit(axis: Axis) -> u8 {
        match axis {
            Axis::X => Self::X,
            Axis::Y => Self::Y,
            Axis::Z => Self::Z,
            Axis::E => Self::E,
        }
    }

    pub const fn with(mut self, axis: Axis) -> Self {
        self.0 |= Self::bit(axis);
        self
    }

    pub const fn with_x(self) -> Self {
        self.with(Axis::X)
    }

    pub const fn with_y(self) -> Self {
        self.with(Axis::Y)
    }

    pub const fn with_z(self) -> Self {
        self.with(Axis::Z)
    }

    pub const fn with_e(self) -> Self {
        self.with(Axis::E)
    }

    pub const fn has(&self, axis: Axis) -> bool {
        self.0 & Self::bit(axis) != 0
    }

    pub const fn has_x(&self) -> bool {
        self.has(Axis::X)
    }

    pub const fn has_y(&self) -> bool {
        self.has(Axis::Y)
    }

    pub const fn has_z(&self) -> bool {
        self.has(Axis::Z)
    }

    pub const fn has_e(&self) -> bool {
        self.has(Axis::E)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.has(*a))
    }
}

impl std::fmt::Display for AxisFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for axis in self.iter() {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_letters() {
        assert_eq!(Axis::from_letter('x'), Some(Axis::X));
        assert_eq!(Axis::from_letter('E'), Some(Axis::E));
        assert_eq!(Axis::from_letter('F'), None);
    }

    #[test]
    fn arithmetic_produces_new_values() {
        let a = Coordinates::new(1.0, 2.0, 3.0, 4.0);
        let b = Coordinates::new(0.5, -2.0, 1.0, 0.0);
        assert_eq!(a + b, Coordinates::new(1.5, 0.0, 4.0, 4.0));
        assert_eq!(a - b, Coordinates::new(0.5, 4.0, 2.0, 4.0));
        assert_eq!(a * 2.0, Coordinates::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(-b, Coordinates::new(-0.5, 2.0, -1.0, -0.0));
        assert_eq!(a, Coordinates::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn length_and_max() {
        let v = Coordinates::new(3.0, -4.0, 0.0, 0.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(v.abs().find_max(), 4.0);
        assert!(Coordinates::ZERO.is_zero());
        assert!(!v.is_zero());
    }

    #[test]
    fn aabb_ignores_extruder() {
        let max = Coordinates::new(200.0, 200.0, 220.0, 0.0);
        assert!(Coordinates::new(0.0, 200.0, 10.0, 55.0).is_in_aabb(Coordinates::ZERO, max));
        assert!(!Coordinates::new(-0.1, 0.0, 0.0, 0.0).is_in_aabb(Coordinates::ZERO, max));
        assert!(!Coordinates::new(0.0, 0.0, 220.5, 0.0).is_in_aabb(Coordinates::ZERO, max));
    }

    #[test]
    fn axis_flags() {
        let flags = AxisFlags::new().with_x().with_z();
        assert!(flags.has_x() && flags.has_z());
        assert!(!flags.has_y() && !flags.has_e());
        assert_eq!(flags.to_string(), "XZ");
        assert!(AxisFlags::new().is_empty());
        assert_eq!(AxisFlags::xyz().iter().count(), 3);
    }
}
