//! Two providers seeded identically, fed the same host inputs, must produce identical
//! `ProviderState` sequences tick for tick.

use traffic_core::provider::{LocalTrafficProvider, ProviderConfig};
use traffic_core::test_fixture::TestRoadMap;

const SPEC: &str = r#"
    <routes>
      <vType id="car" maxSpeed="15" accel="2.6" decel="4.5" emergencyDecel="4.5" tau="1.0"
             minGap="2.5" speedFactor="1.0" speedDev="0.2" lcCutinProb="0.3"/>
      <route id="r0" edges="1 2"/>
      <flow id="f0" type="car" route="r0" begin="0" end="60" vehsPerHour="1800"
            departLane="0" departPos="random" departSpeed="max"/>
    </routes>
"#;

fn run(seed: u64, ticks: u32) -> Vec<String> {
    let road_map = TestRoadMap::two_road_loop();
    let mut provider = LocalTrafficProvider::new(ProviderConfig {
        endless_traffic: true,
        source: "determinism-test".to_string(),
        rng_seed: seed,
    });
    provider.setup(Some(SPEC.as_bytes())).unwrap();

    let mut log = Vec::new();
    let mut sim_time = 0.0;
    for _ in 0..ticks {
        let state = provider.step(&road_map, 0.5, sim_time).unwrap();
        for v in &state.vehicles {
            log.push(format!(
                "{}:{:.6},{:.6},{:.6}",
                v.vehicle_id, v.pose.point.x, v.pose.point.y, v.speed
            ));
        }
        sim_time += 0.5;
    }
    log
}

#[test]
fn same_seed_same_trace() {
    let a = run(7, 50);
    let b = run(7, 50);
    assert_eq!(a, b);
    assert!(!a.is_empty(), "scenario should have emitted at least one vehicle");
}

#[test]
fn different_seed_can_diverge() {
    let a = run(7, 50);
    let b = run(99, 50);
    // Not a hard guarantee for every possible seed pair, but for this scenario's RNG draws
    // (speed factor, depart position, cut-in coin flips) the traces differ.
    assert_ne!(a, b);
}
