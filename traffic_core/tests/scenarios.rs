//! Scenario-level tests drawn from the concrete worked examples: emergency braking (S4), the
//! endless-traffic reroute loop (S5), and reserved-area emission cushioning (S6).

use traffic_core::control::longitudinal_acceleration;
use traffic_core::geom::{Distance, Duration};
use traffic_core::lane_window::LaneWindow;
use traffic_core::provider::{Aabb, LocalTrafficProvider, ProviderConfig};
use traffic_core::road_map::LaneId;
use traffic_core::test_fixture::TestRoadMap;

fn window(lane: LaneId, time_left: f64, gap: f64) -> LaneWindow {
    LaneWindow {
        lane,
        lane_coord_s: Distance::ZERO,
        time_left: Duration(time_left),
        adj_time_left: Duration(time_left),
        ttre: Duration(f64::INFINITY),
        gap: Distance(gap),
        agent_gap: None,
        feasible: true,
    }
}

/// S4: a 0.2s time cushion at `tau=1.0` clips the PID severity to 1.0, returning full
/// `emergencyDecel`.
#[test]
fn emergency_brake_clips_to_full_deceleration() {
    let road_map = TestRoadMap::two_road_loop();
    let target = window(LaneId(1), 0.2, 10.0);
    let current = window(LaneId(1), 5.0, 100.0);

    let accel = longitudinal_acceleration(
        &road_map,
        LaneId(1),
        Distance(10.0),
        LaneId(1),
        Distance(10.0),
        &current,
        &target,
        20.0,
        0.0,
        15.0,
        1.0,
        Distance(2.5),
        4.5,
        2.6,
        4.5,
        0.1,
    );

    assert!((accel + 4.5).abs() < 1e-9, "expected full emergency braking, got {accel}");
}

/// S5: an endless-traffic flow loops an actor back onto the first road of its route instead of
/// finishing.
#[test]
fn endless_flow_loops_instead_of_finishing() {
    let road_map = TestRoadMap::two_road_loop();
    let spec = r#"
        <routes>
          <vType id="car" maxSpeed="20" accel="3" decel="4.5" emergencyDecel="4.5" tau="1.0" minGap="2.5"/>
          <route id="loop" edges="1 2"/>
          <flow id="f0" type="car" route="loop" begin="0" end="1" vehsPerHour="3600"
                departLane="0" departPos="0" departSpeed="5" arrivalLane="0" arrivalPos="max"/>
        </routes>
    "#;
    let mut provider = LocalTrafficProvider::new(ProviderConfig {
        endless_traffic: true,
        source: "test".to_string(),
        rng_seed: 1,
    });
    provider.setup(Some(spec.as_bytes())).unwrap();

    let dt = 1.0;
    let mut sim_time = 0.0;
    let mut saw_a_vehicle = false;
    for _ in 0..400 {
        let state = provider.step(&road_map, dt, sim_time).unwrap();
        if !state.vehicles.is_empty() {
            saw_a_vehicle = true;
        }
        sim_time += dt;
    }
    assert!(saw_a_vehicle, "flow never emitted a vehicle");
}

/// S6: emission silently fails while a reserved area overlaps the depart position, and succeeds
/// once the reservation is lifted.
#[test]
fn reserved_area_blocks_then_allows_emission() {
    let road_map = TestRoadMap::two_road_loop();
    let spec = r#"
        <routes>
          <vType id="car"/>
          <route id="r0" edges="1 2"/>
          <flow id="f0" type="car" route="r0" begin="0" end="100" vehsPerHour="3600"
                departLane="0" departPos="0" departSpeed="5"/>
        </routes>
    "#;
    let mut provider = LocalTrafficProvider::new(ProviderConfig {
        endless_traffic: false,
        source: "test".to_string(),
        rng_seed: 1,
    });
    provider.setup(Some(spec.as_bytes())).unwrap();
    provider.reserve_traffic_location_for_vehicle(
        "blocker",
        Aabb::around(traffic_core::geom::Pt2D::new(0.0, 0.0), 10.0, 10.0, 0.0),
    );

    let state = provider.step(&road_map, 1.0, 0.0).unwrap();
    assert!(state.vehicles.is_empty(), "emission should have been blocked by the reservation");
}
