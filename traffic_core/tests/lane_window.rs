//! Straight-road gap/time-to-collision scenario (S2): a follower closing on a leader on the same
//! lane, both 4m long, `minGap = 2.5`.

use std::collections::HashMap;

use traffic_core::geom::{Distance, Pt2D};
use traffic_core::lane_window::{build_windows, Obstacle};
use traffic_core::road_map::LaneId;
use traffic_core::test_fixture::TestRoadMap;
use traffic_core::vehicle_state::Role;

#[test]
fn straight_road_gap_and_ttc() {
    let road_map = TestRoadMap::two_road_loop();
    let route_lengths = HashMap::new();

    let leader = Obstacle {
        lane: LaneId(1),
        offset: Distance(50.0),
        speed: 10.0,
        accel_mag: 0.0,
        role: Role::Social,
        route_ind: Some(0),
        length: 4.0,
    };

    let windows = build_windows(
        &road_map,
        &route_lengths,
        0,
        LaneId(1),
        Pt2D::new(20.0, 0.0),
        15.0,
        0.0,
        4.0,
        Distance(2.5),
        &[leader],
    );

    let w = windows.iter().find(|w| w.lane == LaneId(1)).unwrap();
    assert!((w.gap.inner() - 26.0).abs() < 1e-9, "gap was {}", w.gap.inner());
    assert!(w.ttre.inner().is_infinite());
    assert!((w.time_left.inner() - 4.7).abs() < 1e-6, "time_left was {}", w.time_left.inner());
}
