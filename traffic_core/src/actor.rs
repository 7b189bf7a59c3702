//! Per-actor state and the two-phase step: `decide` computes a next pose/speed/acceleration
//! against a frozen snapshot; `commit` applies it and re-localizes onto the lane graph.

use crate::control;
use crate::error::{Result, TrafficError};
use crate::flow::VehicleTypeParams;
use crate::geom::{Angle, Distance, Pose};
use crate::lane_selector::{self, CutinState};
use crate::lane_window::{self, LaneWindow, Obstacle};
use crate::road_map::{LaneId, RoadId, RoadMap};
use crate::route_cache::{RouteId, RouteLengths};
use crate::vehicle_state::VehicleState;

pub struct TrafficActor {
    pub actor_id: String,
    pub route: Vec<RoadId>,
    pub route_id: RouteId,
    /// Index of the current road within `route`. Briefly set to `-1` by an endless-mode reroute
    /// so that the next commit's increment lands back on `0`.
    pub route_ind: i64,
    pub lane: LaneId,
    pub offset: Distance,
    pub dest_lane: Option<LaneId>,
    pub dest_offset: Distance,
    /// Depart lane/offset/speed, replayed on an endless-mode teleport.
    pub depart: (LaneId, Distance, f64),

    pub vtype: VehicleTypeParams,
    pub speed_factor: f64,
    pub min_space_cush: Distance,
    pub aggressiveness: f64,
    pub cutin_prob: f64,
    pub cutin: CutinState,

    pub state: VehicleState,

    next_pose: Option<Pose>,
    next_speed: f64,
    next_linear_accel: (f64, f64),

    pub done_with_route: bool,
    pub off_route: bool,
}

impl TrafficActor {
    pub fn route_ind_usize(&self) -> usize {
        self.route_ind.max(0) as usize
    }

    pub fn current_road(&self) -> Option<RoadId> {
        self.route.get(self.route_ind_usize()).copied()
    }

    /// Phase 1: compute this actor's next pose/speed/acceleration against the frozen snapshot of
    /// every other known vehicle, threading the provider's single shared RNG through lane
    /// selection as determinism requires. Does not mutate anything visible to other actors this
    /// tick.
    pub fn decide(
        &mut self,
        road_map: &dyn RoadMap,
        route_lengths: &RouteLengths,
        others: &[Obstacle],
        dt: f64,
        rng: &mut crate::rng::SimRng,
    ) {
        let windows = lane_window::build_windows(
            road_map,
            route_lengths,
            self.route_ind_usize(),
            self.lane,
            self.state.pose.point,
            self.state.speed,
            self.current_accel_scalar(),
            self.state.dimensions.length,
            self.min_space_cush,
            others,
        );

        let current_window = windows
            .iter()
            .find(|w| w.lane == self.lane)
            .cloned()
            .unwrap_or_else(|| empty_window(self.lane));

        let selection = lane_selector::pick_lane(
            &windows,
            self.lane,
            self.dest_lane,
            self.dest_offset,
            self.min_space_cush,
            self.aggressiveness,
            self.cutin_prob,
            &mut self.cutin,
            dt,
            rng,
        );

        self.finish_decide(road_map, &current_window, &selection.target, dt);
    }

    fn current_accel_scalar(&self) -> f64 {
        let (ax, ay) = self.next_linear_accel;
        (ax * ax + ay * ay).sqrt()
    }

    fn finish_decide(
        &mut self,
        road_map: &dyn RoadMap,
        current: &LaneWindow,
        target: &LaneWindow,
        dt: f64,
    ) {
        let target_speed_val = control::target_speed(
            road_map,
            target.lane,
            target.lane_coord_s,
            self.state.speed,
            self.speed_factor,
            self.vtype.max_speed,
        );

        let omega = control::angular_velocity(
            road_map,
            target.lane,
            self.state.pose.point,
            self.state.pose.heading,
            self.state.speed,
            dt,
        );

        let accel = control::longitudinal_acceleration(
            road_map,
            self.lane,
            self.offset,
            target.lane,
            target.lane_coord_s,
            current,
            target,
            self.state.speed,
            self.current_accel_scalar(),
            target_speed_val,
            self.vtype.tau,
            self.min_space_cush,
            self.vtype.emergency_decel,
            self.vtype.accel,
            self.vtype.decel,
            dt,
        );

        let next_heading = Angle::new(self.state.pose.heading.raw() + omega * dt);
        let (hx, hy) = next_heading.to_vec();
        let next_speed = (self.state.speed + accel * dt).max(0.0);
        let next_position = self.state.pose.point + (hx * self.state.speed * dt, hy * self.state.speed * dt);

        self.next_pose = Some(Pose { point: next_position, heading: next_heading });
        self.next_speed = next_speed;
        self.next_linear_accel = (dt * accel * hx, dt * accel * hy);
    }

    /// Phase 2: adopt the staged next state, re-localize onto the lane graph, and advance or
    /// finish the route.
    pub fn commit(&mut self, road_map: &dyn RoadMap, endless_traffic: bool) -> Result<()> {
        let Some(next_pose) = self.next_pose.take() else { return Ok(()) };
        self.state.pose = next_pose;
        self.state.speed = self.next_speed;
        self.state.linear_acceleration = Some(crate::vehicle_state::Vec3::new(
            self.next_linear_accel.0,
            self.next_linear_accel.1,
            0.0,
        ));

        let candidates = road_map.nearest_lanes(
            next_pose.point,
            Distance(self.state.dimensions.length / 2.0),
            true,
        );
        let current_road = self.current_road();
        let chosen = candidates
            .iter()
            .find(|(lane, _)| road_map.lane(*lane).map(|l| Some(l.road) == current_road).unwrap_or(false))
            .or_else(|| candidates.first());

        let Some((lane, _)) = chosen else {
            return Err(TrafficError::Localization(format!(
                "actor {} found no lane within its own length after committing",
                self.actor_id
            )));
        };
        let lane = *lane;
        let lane_info = road_map.lane(lane);
        let new_road = lane_info.map(|l| l.road);

        if new_road.is_some() && new_road != current_road {
            self.route_ind += 1;
            self.off_route = self
                .route
                .get(self.route_ind_usize())
                .map(|r| Some(*r) != new_road)
                .unwrap_or(true);
        }

        self.lane = lane;
        self.offset = road_map.offset_along_lane(lane, next_pose.point);

        if let Some(dest_lane) = self.dest_lane {
            if self.lane == dest_lane && self.offset.inner() >= self.dest_offset.inner() {
                if endless_traffic {
                    let loops_back = lane_info
                        .map(|l| {
                            road_map
                                .road(l.road)
                                .map(|r| r.outgoing_roads.iter().any(|out| Some(*out) == self.route.first().copied()))
                                .unwrap_or(false)
                        })
                        .unwrap_or(false);
                    if loops_back {
                        self.route_ind = -1;
                    } else {
                        let (dlane, doffset, dspeed) = self.depart;
                        self.lane = dlane;
                        self.offset = doffset;
                        self.state.speed = dspeed;
                        self.state.linear_acceleration = None;
                        self.route_ind = 0;
                    }
                } else {
                    self.done_with_route = true;
                }
            }
        }

        Ok(())
    }
}

fn empty_window(lane: LaneId) -> LaneWindow {
    LaneWindow {
        lane,
        lane_coord_s: Distance::ZERO,
        time_left: crate::geom::Duration::ZERO,
        adj_time_left: crate::geom::Duration::ZERO,
        ttre: crate::geom::Duration(f64::INFINITY),
        gap: Distance(f64::INFINITY),
        agent_gap: None,
        feasible: true,
    }
}
