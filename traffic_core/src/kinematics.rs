//! Closed-form kinematics helpers. No vehicle-specific state here, just arithmetic, so everything
//! below is pure and trivially testable.

use crate::geom::{Acceleration, Distance, Duration, Speed};

/// Threshold below which an acceleration is treated as zero for the purpose of picking the
/// linear vs. quadratic branch of `time_to_cover`.
const NEGLIGIBLE_ACC: f64 = 1e-9;

/// Returns the time for a moving object traveling at `speed` and accelerating at `acc` to cover
/// `dist`. Always non-negative; `Duration(f64::INFINITY)` if it never happens.
pub fn time_to_cover(dist: Distance, speed: Speed, acc: Acceleration) -> Duration {
    if dist.inner() == 0.0 {
        return Duration::ZERO;
    }
    if acc.inner().abs() < NEGLIGIBLE_ACC {
        if speed.inner() == 0.0 {
            return Duration(f64::INFINITY);
        }
        let t = dist.inner() / speed.inner();
        return if t >= 0.0 {
            Duration(t)
        } else {
            Duration(f64::INFINITY)
        };
    }
    let discriminant = speed.inner().powi(2) + 2.0 * acc.inner() * dist.inner();
    if discriminant < 0.0 {
        return Duration(f64::INFINITY);
    }
    let rad = discriminant.sqrt();
    let t1 = (rad - speed.inner()) / acc.inner();
    let t2 = -(rad + speed.inner()) / acc.inner();
    let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
    if lo >= 0.0 {
        Duration(lo)
    } else if hi >= 0.0 {
        Duration(hi)
    } else {
        Duration(f64::INFINITY)
    }
}

/// Returns the distance covered by an object moving at `speed` and accelerating at `acc` for
/// `time`.
pub fn distance_covered(time: Duration, speed: Speed, acc: Acceleration) -> Distance {
    Distance(time.inner() * (speed.inner() + 0.5 * acc.inner() * time.inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_is_instant() {
        assert_eq!(time_to_cover(Distance::ZERO, Speed(5.0), Acceleration::ZERO).inner(), 0.0);
    }

    #[test]
    fn constant_speed_is_linear() {
        let t = time_to_cover(Distance(10.0), Speed(5.0), Acceleration::ZERO);
        assert!((t.inner() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn stationary_with_no_acceleration_never_arrives() {
        let t = time_to_cover(Distance(10.0), Speed::ZERO, Acceleration::ZERO);
        assert!(t.inner().is_infinite());
    }

    #[test]
    fn pure_acceleration_from_rest() {
        let t = time_to_cover(Distance(10.0), Speed::ZERO, Acceleration(2.0));
        assert!((t.inner() - 10f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn monotone_non_increasing_in_speed() {
        let slow = time_to_cover(Distance(10.0), Speed(1.0), Acceleration::ZERO);
        let fast = time_to_cover(Distance(10.0), Speed(4.0), Acceleration::ZERO);
        assert!(fast.inner() <= slow.inner());
    }

    #[test]
    fn distance_covered_matches_closed_form() {
        let d = distance_covered(Duration(2.0), Speed(5.0), Acceleration(1.0));
        assert!((d.inner() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn negative_discriminant_never_arrives() {
        // Decelerating hard enough that we stop short of dist.
        let t = time_to_cover(Distance(100.0), Speed(1.0), Acceleration(-1.0));
        assert!(t.inner().is_infinite());
    }
}
