//! Physical quantities with their dimension carried in the type.
//!
//! Every quantity is normalized to SI base units on construction (metres,
//! seconds, metres per second). Mixing dimensions is a compile error: there
//! is simply no `Length + Time` operator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A distance, stored in metres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Length(f64);

impl Length {
    pub const ZERO: Length = Length(0.0);

    pub fn meters(value: f64) -> Self {
        Self(value)
    }

    pub fn millimeters(value: f64) -> Self {
        Self(value * 1e-3)
    }

    pub fn micrometers(value: f64) -> Self {
        Self(value * 1e-6)
    }

    /// Raw magnitude in metres
    pub fn inner_meters(self) -> f64 {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn max(self, other: Length) -> Length {
        Self(self.0.max(other.0))
    }

    pub fn min(self, other: Length) -> Length {
        Self(self.0.min(other.0))
    }
}

/// A point or span on the time axis, stored in seconds.
///
/// `Time::INFINITY` is the "never" value returned by stationary objects.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Time(f64);

impl Time {
    pub const ZERO: Time = Time(0.0);
    pub const INFINITY: Time = Time(f64::INFINITY);

    pub fn seconds(value: f64) -> Self {
        Self(value)
    }

    pub fn milliseconds(value: f64) -> Self {
        Self(value * 1e-3)
    }

    /// Raw magnitude in seconds
    pub fn inner_seconds(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn max(self, other: Time) -> Time {
        Self(self.0.max(other.0))
    }

    pub fn min(self, other: Time) -> Time {
        Self(self.0.min(other.0))
    }
}

/// A scalar speed along a path, stored in metres per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Velocity(f64);

impl Velocity {
    pub const ZERO: Velocity = Velocity(0.0);

    pub fn meters_per_second(value: f64) -> Self {
        Self(value)
    }

    pub fn millimeters_per_second(value: f64) -> Self {
        Self(value * 1e-3)
    }

    /// Raw magnitude in metres per second
    pub fn inner_meters_per_second(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

/// Shape of the downstream output image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }
}

impl From<(usize, usize)> for ImageShape {
    fn from((height, width): (usize, usize)) -> Self {
        Self::new(height, width)
    }
}

// ========== Same-dimension arithmetic ==========

macro_rules! impl_linear {
    ($ty:ident) => {
        impl Add for $ty {
            type Output = $ty;
            fn add(self, other: $ty) -> $ty {
                $ty(self.0 + other.0)
            }
        }

        impl AddAssign for $ty {
            fn add_assign(&mut self, other: $ty) {
                self.0 += other.0;
            }
        }

        impl Sub for $ty {
            type Output = $ty;
            fn sub(self, other: $ty) -> $ty {
                $ty(self.0 - other.0)
            }
        }

        impl SubAssign for $ty {
            fn sub_assign(&mut self, other: $ty) {
                self.0 -= other.0;
            }
        }

        impl Neg for $ty {
            type Output = $ty;
            fn neg(self) -> $ty {
                $ty(-self.0)
            }
        }

        impl Mul<f64> for $ty {
            type Output = $ty;
            fn mul(self, scalar: f64) -> $ty {
                $ty(self.0 * scalar)
            }
        }

        impl Mul<$ty> for f64 {
            type Output = $ty;
            fn mul(self, other: $ty) -> $ty {
                $ty(self * other.0)
            }
        }

        impl Div<f64> for $ty {
            type Output = $ty;
            fn div(self, scalar: f64) -> $ty {
                $ty(self.0 / scalar)
            }
        }

        /// Ratio of two quantities of the same dimension
        impl Div<$ty> for $ty {
            type Output = f64;
            fn div(self, other: $ty) -> f64 {
                self.0 / other.0
            }
        }
    };
}

impl_linear!(Length);
impl_linear!(Time);
impl_linear!(Velocity);

// ========== Cross-dimension arithmetic ==========

impl Div<Velocity> for Length {
    type Output = Time;

    /// Zero velocity yields `Time::INFINITY` for a positive length.
    fn div(self, velocity: Velocity) -> Time {
        Time(self.0 / velocity.0)
    }
}

impl Div<Time> for Length {
    type Output = Velocity;
    fn div(self, time: Time) -> Velocity {
        Velocity(self.0 / time.0)
    }
}

impl Mul<Time> for Velocity {
    type Output = Length;
    fn mul(self, time: Time) -> Length {
        Length(self.0 * time.0)
    }
}

impl Mul<Velocity> for Time {
    type Output = Length;
    fn mul(self, velocity: Velocity) -> Length {
        Length(self.0 * velocity.0)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} s", self.0)
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m/s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_normalization() {
        assert_relative_eq!(Length::millimeters(1.0).inner_meters(), 1e-3);
        assert_relative_eq!(Length::micrometers(1.0).inner_meters(), 1e-6);
        assert_relative_eq!(Time::milliseconds(250.0).inner_seconds(), 0.25);
        assert_relative_eq!(Velocity::millimeters_per_second(3.0).inner_meters_per_second(), 3e-3);
    }

    #[test]
    fn test_cross_dimension_arithmetic() {
        let pixel = Length::millimeters(1e-3);
        let v = Velocity::millimeters_per_second(3.0);

        let dt: Time = pixel / v;
        assert_relative_eq!(dt.inner_seconds(), 1e-3 / 3.0, epsilon = 1e-15);

        let back: Length = v * dt;
        assert_relative_eq!(back.inner_meters(), pixel.inner_meters(), epsilon = 1e-18);

        let speed: Velocity = Length::meters(10.0) / Time::seconds(4.0);
        assert_relative_eq!(speed.inner_meters_per_second(), 2.5);
    }

    #[test]
    fn test_zero_velocity_gives_infinite_time() {
        let dt = Length::meters(1.0) / Velocity::ZERO;
        assert!(!dt.is_finite());
        assert_eq!(dt, Time::INFINITY);
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(Time::seconds(1.0) < Time::INFINITY);
        assert!(Length::millimeters(1.0) > Length::micrometers(999.0));
        assert_eq!(Length::meters(1.5).to_string(), "1.5 m");
        assert_eq!(Time::seconds(0.2).to_string(), "0.2 s");
        assert_eq!(Velocity::meters_per_second(3.0).to_string(), "3 m/s");
    }

    #[test]
    fn test_image_shape_from_tuple() {
        let shape: ImageShape = (2, 3).into();
        assert_eq!(shape.height, 2);
        assert_eq!(shape.width, 3);
    }
}
