//! Thin demonstration of the library's public API: builds a synthetic grid, optionally loads a
//! traffic spec, and runs the provider headlessly for a fixed number of ticks. Carries no
//! simulation logic of its own.

use std::fs::File;
use std::io::BufReader;

use structopt::StructOpt;

use traffic_core::provider::{LocalTrafficProvider, ProviderConfig};
use traffic_core::test_fixture::TestRoadMap;

#[derive(StructOpt)]
#[structopt(name = "traffic-demo", about = "Runs the local traffic micro-simulator headlessly against a synthetic grid")]
struct Args {
    /// Path to a `.smarts.xml`-style traffic spec to load at startup
    #[structopt(long)]
    spec: Option<String>,
    /// Number of ticks to run
    #[structopt(long, default_value = "100")]
    ticks: u32,
    /// Fixed timestep, in seconds
    #[structopt(long, default_value = "0.1")]
    dt: f64,
    /// Seed for the deterministic RNG
    #[structopt(long, default_value = "42")]
    rng_seed: u64,
    /// Loop finishing actors back onto their route instead of removing them
    #[structopt(long)]
    endless: bool,
}

fn main() -> anyhow::Result<()> {
    abstutil::setup_logging();
    let args = Args::from_args();

    let road_map = TestRoadMap::two_road_loop();
    let mut provider = LocalTrafficProvider::new(ProviderConfig {
        endless_traffic: args.endless,
        source: "traffic-demo".to_string(),
        rng_seed: args.rng_seed,
    });

    match &args.spec {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            provider.setup(Some(reader))?;
        }
        None => provider.setup(None::<BufReader<File>>)?,
    }

    let mut sim_time = 0.0;
    for tick in 0..args.ticks {
        let state = provider.step(&road_map, args.dt, sim_time)?;
        log::info!("tick {tick}: {} managed vehicles", state.vehicles.len());
        sim_time += args.dt;
    }

    Ok(())
}
