//! Kinematic identities from the public API, mirroring the in-module unit tests but exercised as
//! a black box the way `sim/tests/physics.rs` exercises the host's physics layer.

use traffic_core::geom::{Acceleration, Distance, Speed};
use traffic_core::kinematics::{distance_covered, time_to_cover};

#[test]
fn straight_line_identities() {
    assert!((time_to_cover(Distance(10.0), Speed(5.0), Acceleration::ZERO).inner() - 2.0).abs() < 1e-9);
    assert!(
        (time_to_cover(Distance(10.0), Speed::ZERO, Acceleration(2.0)).inner() - 10f64.sqrt()).abs() < 1e-9
    );
    assert!(time_to_cover(Distance(10.0), Speed::ZERO, Acceleration::ZERO).inner().is_infinite());
    assert!((distance_covered(traffic_core::geom::Duration(2.0), Speed(5.0), Acceleration(1.0)).inner() - 12.0).abs() < 1e-9);
}
