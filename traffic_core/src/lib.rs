//! A deterministic, fixed-timestep local-traffic micro-simulator: drives a population of
//! autonomous, route-following vehicle actors over a lane-graph road map supplied by a host
//! driving simulator, producing per-tick vehicle states the host consumes.
//!
//! The host owns rendering, ego-agent control, and inter-provider reconciliation; this crate
//! owns the behavior of the background traffic it manages. See [`provider::LocalTrafficProvider`]
//! for the entry point.

pub mod actor;
pub mod control;
pub mod error;
pub mod flow;
pub mod geom;
pub mod kinematics;
pub mod lane_selector;
pub mod lane_window;
pub mod provider;
pub mod rng;
pub mod road_map;
pub mod route_cache;
pub mod test_fixture;
pub mod vehicle_state;

pub use crate::error::TrafficError;
pub use crate::provider::{LocalTrafficProvider, ProviderConfig, ProviderState};
pub use crate::road_map::{LaneId, RoadId, RoadMap};
pub use crate::vehicle_state::VehicleState;
