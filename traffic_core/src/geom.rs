//! Strongly-typed units and 2D geometry primitives shared by every other module, in the spirit
//! of the host's own `geom` crate: plain `f64`s get lost in translation ("was that seconds or
//! ticks?"), newtypes don't.

use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

macro_rules! scalar_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: $name = $name(0.0);

            pub fn inner(self) -> f64 {
                self.0
            }

            pub fn abs(self) -> $name {
                $name(self.0.abs())
            }

            pub fn max(self, other: $name) -> $name {
                $name(self.0.max(other.0))
            }

            pub fn min(self, other: $name) -> $name {
                $name(self.0.min(other.0))
            }

            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, other: $name) -> $name {
                $name(self.0 + other.0)
            }
        }
        impl AddAssign for $name {
            fn add_assign(&mut self, other: $name) {
                self.0 += other.0;
            }
        }
        impl Sub for $name {
            type Output = $name;
            fn sub(self, other: $name) -> $name {
                $name(self.0 - other.0)
            }
        }
        impl SubAssign for $name {
            fn sub_assign(&mut self, other: $name) {
                self.0 -= other.0;
            }
        }
        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }
        impl Mul<f64> for $name {
            type Output = $name;
            fn mul(self, scalar: f64) -> $name {
                $name(self.0 * scalar)
            }
        }
        impl Div<f64> for $name {
            type Output = $name;
            fn div(self, scalar: f64) -> $name {
                $name(self.0 / scalar)
            }
        }
        impl From<f64> for $name {
            fn from(x: f64) -> $name {
                $name(x)
            }
        }
    };
}

scalar_newtype!(Distance);
scalar_newtype!(Speed);
scalar_newtype!(Duration);
scalar_newtype!(Acceleration);

impl Div for Distance {
    type Output = f64;
    fn div(self, other: Distance) -> f64 {
        self.0 / other.0
    }
}
impl Div<Speed> for Distance {
    type Output = Duration;
    fn div(self, speed: Speed) -> Duration {
        Duration(self.0 / speed.0)
    }
}
impl Mul<Duration> for Speed {
    type Output = Distance;
    fn mul(self, dt: Duration) -> Distance {
        Distance(self.0 * dt.0)
    }
}
impl Div<Duration> for Speed {
    type Output = Acceleration;
    fn div(self, dt: Duration) -> Acceleration {
        Acceleration(self.0 / dt.0)
    }
}
impl Mul<Duration> for Acceleration {
    type Output = Speed;
    fn mul(self, dt: Duration) -> Speed {
        Speed(self.0 * dt.0)
    }
}

/// An angle in radians. Stored normalized to `[0, 2*PI)`; arithmetic on the raw value is done via
/// [`Angle::raw`]/[`Angle::new`] so callers can add signed deltas before renormalizing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub fn new(radians: f64) -> Angle {
        let two_pi = 2.0 * PI;
        let mut r = radians % two_pi;
        if r < 0.0 {
            r += two_pi;
        }
        Angle(r)
    }

    pub fn raw(self) -> f64 {
        self.0
    }

    /// Unit direction vector `(cos, sin)`.
    pub fn to_vec(self) -> (f64, f64) {
        (self.0.cos(), self.0.sin())
    }
}

/// A 2D point in map-local meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    pub x: f64,
    pub y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        Pt2D { x, y }
    }

    pub fn dist_to(self, other: Pt2D) -> Distance {
        Distance(((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt())
    }
}

impl Add<(f64, f64)> for Pt2D {
    type Output = Pt2D;
    fn add(self, (dx, dy): (f64, f64)) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }
}

/// Position and heading of a vehicle's center.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub point: Pt2D,
    pub heading: Angle,
}

/// Longitudinal/lateral coordinates within a lane's own reference line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneCoord {
    pub s: Distance,
    pub t: Distance,
}

/// Direction vector expressed as a heading, per `vec_to_radians`/`radians_to_vec` in the host's
/// `geom::utils` module.
pub fn vec_to_radians((x, y): (f64, f64)) -> Angle {
    Angle::new(y.atan2(x))
}

pub fn radians_to_vec(theta: Angle) -> (f64, f64) {
    theta.to_vec()
}

/// Signed difference `target - source`, normalized to `(-PI, PI]`, such that
/// `source + min_angle_difference_signed(target, source) ≡ target (mod 2*PI)`.
pub fn min_angle_difference_signed(target: Angle, source: Angle) -> f64 {
    let mut diff = target.raw() - source.raw();
    let two_pi = 2.0 * PI;
    diff %= two_pi;
    if diff > PI {
        diff -= two_pi;
    } else if diff <= -PI {
        diff += two_pi;
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_wraps() {
        let a = Angle::new(2.0 * PI + 0.5);
        assert!((a.raw() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn signed_diff_picks_shortest_way() {
        let target = Angle::new(0.1);
        let source = Angle::new(2.0 * PI - 0.1);
        let diff = min_angle_difference_signed(target, source);
        assert!((diff - 0.2).abs() < 1e-9);
    }
}
