//! The outer loop: owns every managed actor, emits new ones from flows, rebuilds the per-tick
//! obstacle snapshot, runs the decide-all/commit-all phases, and reconciles with the host's view
//! of the world via `sync`.

use std::collections::HashMap;
use std::io::BufRead;

use crate::actor::TrafficActor;
use crate::error::{Result, TrafficError};
use crate::flow::{Flow, PosToken};
use crate::geom::{Angle, Distance, Pose, Pt2D};
use crate::lane_selector::CutinState;
use crate::lane_window::Obstacle;
use crate::road_map::{LaneId, RoadId, RoadMap};
use crate::rng::SimRng;
use crate::route_cache::RouteCache;
use crate::vehicle_state::{Role, VehicleState};

/// Dimensions assumed for a flow-emitted vehicle when the traffic spec carries no size fields of
/// its own; a mid-size passenger car.
const DEFAULT_DIMENSIONS: crate::vehicle_state::Dimensions = crate::vehicle_state::Dimensions {
    length: 4.5,
    width: 1.8,
    height: 1.5,
};

/// Constructor-time knobs, mirroring the original provider's `endless_traffic` flag plus the
/// RNG seed and source-string identity it reads from elsewhere in its host.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub endless_traffic: bool,
    pub source: String,
    pub rng_seed: u64,
}

/// An axis-aligned exclusion zone consulted at emission. A simplification of the host's
/// arbitrary polygon: this core only ever needs overlap tests, which an AABB answers cheaply.
/// `around` takes the footprint's heading and bounds the *rotated* rectangle, so the result is a
/// true superset of the oriented footprint (it can only reject more aggressively than a tight
/// polygon, never less) rather than just the unrotated one.
#[derive(Clone, Copy, Debug)]
pub struct Aabb {
    pub min: Pt2D,
    pub max: Pt2D,
}

impl Aabb {
    /// `half_length`/`half_width` are the footprint's local extents (along/across travel);
    /// `heading` rotates them into world space before the bounding box is taken.
    pub fn around(center: Pt2D, half_length: f64, half_width: f64, heading: f64) -> Aabb {
        let (sin, cos) = heading.sin_cos();
        let ext_x = half_length * cos.abs() + half_width * sin.abs();
        let ext_y = half_length * sin.abs() + half_width * cos.abs();
        Aabb {
            min: Pt2D::new(center.x - ext_x, center.y - ext_y),
            max: Pt2D::new(center.x + ext_x, center.y + ext_y),
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Boundary object returned by `step`: managed-vehicle states only.
#[derive(Clone, Debug, Default)]
pub struct ProviderState {
    pub vehicles: Vec<VehicleState>,
}

pub struct LocalTrafficProvider {
    config: ProviderConfig,
    rng: SimRng,
    route_cache: RouteCache,
    flows: Vec<Flow>,
    actor_order: Vec<String>,
    actors: HashMap<String, TrafficActor>,
    foreign: HashMap<String, VehicleState>,
    reserved: HashMap<String, Aabb>,
    nearest_lane_cache: HashMap<String, (LaneId, Distance)>,
    next_actor_seq: u64,
}

impl LocalTrafficProvider {
    pub fn new(config: ProviderConfig) -> LocalTrafficProvider {
        let rng = SimRng::new(config.rng_seed);
        LocalTrafficProvider {
            config,
            rng,
            route_cache: RouteCache::new(),
            flows: Vec::new(),
            actor_order: Vec::new(),
            actors: HashMap::new(),
            foreign: HashMap::new(),
            reserved: HashMap::new(),
            nearest_lane_cache: HashMap::new(),
            next_actor_seq: 0,
        }
    }

    /// Loads an optional traffic-spec document and seeds emission bookkeeping. Does not itself
    /// emit anything; the first `step` call handles `t=0` flows.
    pub fn setup<R: BufRead>(&mut self, spec: Option<R>) -> Result<()> {
        if let Some(reader) = spec {
            self.flows = crate::flow::load(reader)?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.actors.clear();
        self.actor_order.clear();
        self.foreign.clear();
        self.reserved.clear();
        self.nearest_lane_cache.clear();
        for flow in &mut self.flows {
            flow.last_added = None;
        }
        self.rng = SimRng::new(self.config.rng_seed);
    }

    pub fn teardown(&mut self) {
        self.actors.clear();
        self.actor_order.clear();
        self.foreign.clear();
        self.reserved.clear();
        self.nearest_lane_cache.clear();
    }

    pub fn destroy(&mut self) {
        self.teardown();
        self.flows.clear();
    }

    pub fn manages_vehicle(&self, id: &str) -> bool {
        self.actors.contains_key(id)
    }

    pub fn stop_managing(&mut self, id: &str) -> Result<()> {
        if self.actors.remove(id).is_none() {
            return Err(TrafficError::Lookup(id.to_string()));
        }
        self.actor_order.retain(|a| a != id);
        Ok(())
    }

    pub fn reserve_traffic_location_for_vehicle(&mut self, id: &str, area: Aabb) {
        self.reserved.insert(id.to_string(), area);
    }

    pub fn update_route_for_vehicle(&mut self, id: &str, roads: Vec<RoadId>, road_map: &dyn RoadMap) -> Result<()> {
        let actor = self.actors.get_mut(id).ok_or_else(|| TrafficError::Lookup(id.to_string()))?;
        self.route_cache.get_or_build(road_map, &roads);
        actor.route_id = crate::route_cache::route_id(&roads);
        actor.route = roads;
        actor.route_ind = 0;
        actor.dest_lane = None;
        Ok(())
    }

    pub fn vehicle_dest_road(&self, id: &str) -> Result<Option<RoadId>> {
        let actor = self.actors.get(id).ok_or_else(|| TrafficError::Lookup(id.to_string()))?;
        Ok(actor.route.last().copied())
    }

    pub fn can_accept_vehicle(&self, state: &VehicleState) -> bool {
        matches!(state.role, Role::Social | Role::Unknown)
    }

    /// Transfers a vehicle in under this provider's management. If `route` is absent, a random
    /// route is drawn from the shared RNG.
    pub fn add_vehicle(
        &mut self,
        road_map: &dyn RoadMap,
        mut state: VehicleState,
        route: Option<Vec<RoadId>>,
    ) -> Result<()> {
        let route = route.unwrap_or_else(|| road_map.random_route(self.rng.as_rngcore()));
        let lane = road_map
            .nearest_lane(state.pose.point, Distance(state.dimensions.length.max(1.0)))
            .ok_or_else(|| TrafficError::Localization(format!("no lane near transferred vehicle {}", state.vehicle_id)))?;
        let offset = road_map.offset_along_lane(lane, state.pose.point);
        let route_lengths = self.route_cache.get_or_build(road_map, &route);
        let route_id = crate::route_cache::route_id(&route);
        let _ = route_lengths;

        state.source = self.config.source.clone();
        let id = state.vehicle_id.clone();
        let actor = TrafficActor {
            actor_id: id.clone(),
            route,
            route_id,
            route_ind: 0,
            lane,
            offset,
            dest_lane: None,
            dest_offset: Distance::ZERO,
            depart: (lane, offset, state.speed),
            vtype: crate::flow::VehicleTypeParams::default(),
            speed_factor: 1.0,
            min_space_cush: Distance(2.5),
            aggressiveness: 1.0,
            cutin_prob: 0.0,
            cutin: CutinState::default(),
            state,
            done_with_route: false,
            off_route: false,
        };
        self.actor_order.push(id.clone());
        self.actors.insert(id, actor);
        Ok(())
    }

    /// Runs one full tick: emission, obstacle-cache rebuild, decide-all, commit-all.
    pub fn step(&mut self, road_map: &dyn RoadMap, dt: f64, sim_time: f64) -> Result<ProviderState> {
        self.emit_due_actors(road_map, sim_time)?;
        self.rebuild_nearest_lane_cache(road_map);

        let ids = self.actor_order.clone();
        let mut staged_decisions: Vec<(String, Vec<Obstacle>)> = Vec::with_capacity(ids.len());
        for id in &ids {
            let obstacles = self.obstacles_for(road_map, id);
            staged_decisions.push((id.clone(), obstacles));
        }

        for (id, obstacles) in staged_decisions {
            let route_lengths = {
                let actor = self.actors.get(&id).expect("actor must exist during decide");
                self.route_cache.get_or_build(road_map, &actor.route).clone()
            };
            let actor = self.actors.get_mut(&id).expect("actor must exist during decide");
            actor.decide(road_map, &route_lengths, &obstacles, dt, &mut self.rng);
        }

        let mut finished = Vec::new();
        for id in &ids {
            if let Some(actor) = self.actors.get_mut(id) {
                actor.commit(road_map, self.config.endless_traffic)?;
                if actor.done_with_route {
                    finished.push(id.clone());
                }
            }
        }
        for id in finished {
            self.actors.remove(&id);
            self.actor_order.retain(|a| a != &id);
        }

        Ok(ProviderState {
            vehicles: self.actor_order.iter().filter_map(|id| self.actors.get(id)).map(|a| a.state.clone()).collect(),
        })
    }

    /// Reconciles with the host's authoritative vehicle list: drops managed ids that vanished or
    /// were hijacked by another source, adopts updates to our own vehicles, and records anything
    /// else as a foreign obstacle.
    pub fn sync(&mut self, incoming: &ProviderState) {
        let incoming_by_id: HashMap<&str, &VehicleState> =
            incoming.vehicles.iter().map(|v| (v.vehicle_id.as_str(), v)).collect();

        let managed_ids: Vec<String> = self.actor_order.clone();
        for id in managed_ids {
            match incoming_by_id.get(id.as_str()) {
                None => {
                    log::warn!("managed actor {id} vanished from sync, dropping");
                    self.actors.remove(&id);
                    self.actor_order.retain(|a| a != &id);
                }
                Some(v) if v.source != self.config.source => {
                    log::warn!("managed actor {id} hijacked by source {}", v.source);
                    self.actors.remove(&id);
                    self.actor_order.retain(|a| a != &id);
                }
                Some(v) => {
                    if let Some(actor) = self.actors.get_mut(&id) {
                        actor.state = (*v).clone();
                    }
                }
            }
        }

        self.foreign.clear();
        for v in &incoming.vehicles {
            if v.source != self.config.source {
                self.foreign.insert(v.vehicle_id.clone(), v.clone());
            }
        }
    }

    fn rebuild_nearest_lane_cache(&mut self, road_map: &dyn RoadMap) {
        self.nearest_lane_cache.clear();
        for id in &self.actor_order {
            let Some(actor) = self.actors.get(id) else { continue };
            self.nearest_lane_cache.insert(id.clone(), (actor.lane, actor.offset));
        }
        for (id, v) in &self.foreign {
            let radius = Distance(v.dimensions.length.max(1.0));
            if let Some(lane) = road_map.nearest_lane(v.pose.point, radius) {
                let offset = road_map.offset_along_lane(lane, v.pose.point);
                self.nearest_lane_cache.insert(id.clone(), (lane, offset));
            }
        }
    }

    fn obstacles_for(&self, road_map: &dyn RoadMap, self_id: &str) -> Vec<Obstacle> {
        let mut out = Vec::new();
        for id in &self.actor_order {
            if id == self_id {
                continue;
            }
            let Some(actor) = self.actors.get(id) else { continue };
            let Some(&(lane, offset)) = self.nearest_lane_cache.get(id) else { continue };
            out.push(Obstacle {
                lane,
                offset,
                speed: actor.state.speed,
                accel_mag: actor.state.linear_acceleration.map(|a| a.norm()).unwrap_or(0.0),
                role: actor.state.role,
                route_ind: Some(actor.route_ind_usize()),
                length: actor.state.dimensions.length,
            });
        }
        for (id, v) in &self.foreign {
            let Some(&(lane, offset)) = self.nearest_lane_cache.get(id) else { continue };
            out.push(Obstacle {
                lane,
                offset,
                speed: v.speed,
                accel_mag: v.linear_acceleration.map(|a| a.norm()).unwrap_or(0.0),
                role: v.role,
                route_ind: None,
                length: v.dimensions.length,
            });
        }
        out
    }

    fn emit_due_actors(&mut self, road_map: &dyn RoadMap, sim_time: f64) -> Result<()> {
        for i in 0..self.flows.len() {
            let (due, begin_ok) = {
                let f = &self.flows[i];
                let in_window = sim_time >= f.begin && sim_time < f.end;
                let due = in_window && f.last_added.map(|t| sim_time - t >= f.emit_period).unwrap_or(true);
                (due, in_window)
            };
            if !due || !begin_ok {
                continue;
            }
            if self.try_emit(road_map, i, sim_time)? {
                self.flows[i].last_added = Some(sim_time);
            }
        }
        Ok(())
    }

    fn try_emit(&mut self, road_map: &dyn RoadMap, flow_idx: usize, sim_time: f64) -> Result<bool> {
        let flow = self.flows[flow_idx].clone();
        let Some(&first_road) = flow.route.first() else { return Ok(false) };
        let Some(road) = road_map.road(first_road) else {
            return Err(TrafficError::Config(format!("flow {} routes through unknown road", flow.id)));
        };
        let lane_idx = flow.depart_lane.unwrap_or(0);
        let Some(&lane_id) = road.lanes.get(lane_idx) else {
            return Err(TrafficError::Config(format!("flow {} departLane out of range", flow.id)));
        };
        let Some(lane) = road_map.lane(lane_id) else { return Ok(false) };

        let half_len = DEFAULT_DIMENSIONS.length / 2.0;
        let depart_pos = match flow.depart_pos {
            PosToken::Max => (lane.length.inner() - half_len).max(0.0),
            PosToken::Random => self.rng.gen_range(0.0, lane.length.inner()),
            PosToken::SpeedLimit => lane.length.inner(),
            PosToken::Numeric(v) => v,
        };
        let depart_speed = match flow.depart_speed {
            PosToken::Max => flow.vtype.max_speed.min(lane.speed_limit.map(|s| s.inner()).unwrap_or(flow.vtype.max_speed)),
            PosToken::Random => self.rng.gen_range(0.0, flow.vtype.max_speed),
            PosToken::SpeedLimit => lane
                .speed_limit
                .ok_or_else(|| TrafficError::Config(format!("flow {} wants speedLimit depart speed but lane has none", flow.id)))?
                .inner(),
            PosToken::Numeric(v) => v,
        };

        let point = road_map.from_lane_coord(lane_id, Distance(depart_pos));
        let heading = vec_heading(road_map, lane_id, Distance(depart_pos));
        let bbox = Aabb::around(point, half_len, DEFAULT_DIMENSIONS.width / 2.0, heading);

        if self.reserved.values().any(|r| r.intersects(&bbox)) {
            return Ok(false);
        }
        for actor in self.actors.values() {
            let actor_bbox = Aabb::around(
                actor.state.pose.point,
                actor.state.dimensions.length / 2.0,
                actor.state.dimensions.width / 2.0,
                actor.state.pose.heading.raw(),
            );
            if actor_bbox.intersects(&bbox) {
                return Ok(false);
            }
        }

        self.next_actor_seq += 1;
        let id = format!("{}-{}", flow.id, self.next_actor_seq);
        let speed_factor = self.rng.gauss(flow.vtype.speed_factor, flow.vtype.speed_dev).max(0.1);
        let aggressiveness = if flow.vtype.lc_assertive > 0.0 { flow.vtype.lc_assertive } else { 1.0 };
        let cutin_prob = flow.vtype.lc_cutin_prob.clamp(0.0, 1.0);

        let dest_lane_idx = flow.arrival_lane.unwrap_or(0);
        let dest_lane = flow
            .route
            .last()
            .and_then(|r| road_map.road(*r))
            .and_then(|r| r.lanes.get(dest_lane_idx))
            .copied();
        let dest_lane_len = dest_lane.and_then(|l| road_map.lane(l)).map(|l| l.length).unwrap_or(Distance::ZERO);
        let dest_offset = match flow.arrival_pos {
            PosToken::Max => dest_lane_len,
            PosToken::Random => Distance(self.rng.gen_range(0.0, dest_lane_len.inner())),
            PosToken::SpeedLimit => dest_lane_len,
            PosToken::Numeric(v) => Distance(v),
        };

        let route_lengths = self.route_cache.get_or_build(road_map, &flow.route);
        let _ = route_lengths;

        let actor = TrafficActor {
            actor_id: id.clone(),
            route: flow.route.clone(),
            route_id: flow.route_id,
            route_ind: 0,
            lane: lane_id,
            offset: Distance(depart_pos),
            dest_lane,
            dest_offset,
            depart: (lane_id, Distance(depart_pos), depart_speed),
            vtype: flow.vtype.clone(),
            speed_factor,
            min_space_cush: Distance(flow.vtype.min_gap),
            aggressiveness,
            cutin_prob,
            cutin: CutinState::default(),
            state: VehicleState {
                vehicle_id: id.clone(),
                pose: Pose { point, heading: Angle::new(vec_heading(road_map, lane_id, Distance(depart_pos))) },
                speed: depart_speed,
                linear_acceleration: None,
                dimensions: DEFAULT_DIMENSIONS,
                role: Role::Social,
                vehicle_type: flow.vtype.id.clone(),
                source: self.config.source.clone(),
            },
            done_with_route: false,
            off_route: false,
        };

        self.actor_order.push(id.clone());
        self.actors.insert(id, actor);
        Ok(true)
    }
}

fn vec_heading(road_map: &dyn RoadMap, lane: LaneId, s: Distance) -> f64 {
    let (x, y) = road_map.vector_at_offset(lane, s);
    y.atan2(x)
}
