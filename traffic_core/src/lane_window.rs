//! Per-tick, per-lane kinematic summaries used by the lane selector (§4.F). Every lane of the
//! actor's current road gets a [`LaneWindow`] built against a frozen snapshot of every other known
//! vehicle (managed or foreign) -- never against other actors' in-progress decisions this tick.

use crate::geom::{Distance, Pt2D};
use crate::kinematics::time_to_cover;
use crate::road_map::{LaneId, RoadMap};
use crate::route_cache::RouteLengths;
use crate::vehicle_state::Role;

const THIRTY_DEG: f64 = std::f64::consts::PI / 6.0;

/// A snapshot of one other vehicle, already projected onto its nearest lane, as seen by the
/// window analyzer. Built once per tick by the provider and shared read-only across actors.
#[derive(Clone, Debug)]
pub struct Obstacle {
    pub lane: LaneId,
    pub offset: Distance,
    pub speed: f64,
    /// Magnitude of linear acceleration; sign information is not retained per the source rule
    /// (`acc_delta` only ever uses `||linear_acceleration||`).
    pub accel_mag: f64,
    pub role: Role,
    /// `Some(route_ind)` for another managed actor on a route; `None` for foreign vehicles, which
    /// can only ever be matched by direct lane equality.
    pub route_ind: Option<usize>,
    pub length: f64,
}

#[derive(Clone, Debug)]
pub struct LaneWindow {
    pub lane: LaneId,
    pub lane_coord_s: Distance,
    pub time_left: crate::geom::Duration,
    pub adj_time_left: crate::geom::Duration,
    pub ttre: crate::geom::Duration,
    pub gap: Distance,
    pub agent_gap: Option<Distance>,
    pub feasible: bool,
}

struct RawWindow {
    lane: LaneId,
    index: usize,
    s: Distance,
    time_left: crate::geom::Duration,
    ttre: crate::geom::Duration,
    gap: Distance,
    agent_gap: Option<Distance>,
}

/// Builds a [`LaneWindow`] for every lane of `current_road`, given the actor's state on
/// `current_lane` and a snapshot of every other vehicle.
#[allow(clippy::too_many_arguments)]
pub fn build_windows(
    road_map: &dyn RoadMap,
    route_lengths: &RouteLengths,
    route_ind: usize,
    current_lane: LaneId,
    pose_point: Pt2D,
    my_speed: f64,
    my_accel: f64,
    my_length: f64,
    min_space_cush: Distance,
    others: &[Obstacle],
) -> Vec<LaneWindow> {
    let Some(current_info) = road_map.lane(current_lane) else { return Vec::new() };
    let Some(road) = road_map.road(current_info.road) else { return Vec::new() };

    let lookahead = (1.0 + my_speed.max(1.0).ln()).ceil().max(1.0) as usize;
    let current_s = road_map.to_lane_coord(current_lane, pose_point).s;
    let current_radius = road_map.curvature_radius_at_offset(current_lane, current_s, lookahead);

    let mut raw = Vec::with_capacity(road.lanes.len());
    for &lane_id in &road.lanes {
        let Some(lane) = road_map.lane(lane_id) else { continue };
        // Each candidate lane gets its own projection of the actor's position -- lanes need not
        // share a reference frame (merges, offset lane starts, curves).
        let s = road_map.to_lane_coord(lane_id, pose_point).s;

        let lane_radius = road_map.curvature_radius_at_offset(lane_id, s, lookahead);
        let ratio = if lane_radius.is_finite()
            && current_radius.is_finite()
            && lane_radius.signum() == current_radius.signum()
            && current_radius != 0.0
        {
            lane_radius / current_radius
        } else {
            1.0
        };
        let lane_speed = my_speed * ratio;
        let lane_accel = my_accel * ratio;

        let path_len = route_lengths
            .get(&(lane_id, route_ind))
            .copied()
            .map(|rem| rem - s)
            .unwrap_or(lane.length - s);
        let lane_time_left = if my_speed > 0.0 {
            crate::geom::Duration(path_len.inner() / my_speed)
        } else {
            crate::geom::Duration(f64::INFINITY)
        };

        let mut lane_ttc = crate::geom::Duration(f64::INFINITY);
        let mut lane_ttre = crate::geom::Duration(f64::INFINITY);
        let mut lane_gap = Distance(f64::INFINITY);
        let mut agent_gap: Option<Distance> = None;

        for ov in others {
            let ov_offset = if ov.lane == lane_id {
                Some(ov.offset)
            } else if let Some(ov_ind) = ov.route_ind {
                if ov_ind == route_ind && lanes_connected(road_map, lane_id, ov.lane) {
                    let ov_len = route_lengths.get(&(ov.lane, route_ind)).copied();
                    ov_len.map(|ov_len| s + (path_len - ov_len))
                } else {
                    None
                }
            } else {
                None
            };
            let Some(ov_offset) = ov_offset else { continue };

            let speed_delta = lane_speed - ov.speed;
            let acc_delta = lane_accel - ov.accel_mag;

            if s.inner() <= ov_offset.inner() {
                let my_front = s + Distance(my_length / 2.0);
                let ov_back = ov_offset - Distance(ov.length / 2.0);
                let front_gap = (ov_back - my_front).max(Distance::ZERO);
                lane_gap = lane_gap.min(front_gap);
                let cushioned = (front_gap - min_space_cush).max(Distance::ZERO);
                lane_ttc = lane_ttc.min(time_to_cover(
                    cushioned,
                    crate::geom::Speed(speed_delta),
                    crate::geom::Acceleration(acc_delta),
                ));
            } else {
                let my_back = s - Distance(my_length / 2.0);
                let ov_front = ov_offset + Distance(ov.length / 2.0);
                let back_gap = (my_back - ov_front).max(Distance::ZERO);
                lane_ttre = lane_ttre.min(time_to_cover(
                    back_gap,
                    crate::geom::Speed(-speed_delta),
                    crate::geom::Acceleration(-acc_delta),
                ));
                if ov.role == Role::EgoAgent {
                    if agent_gap.map(|g| back_gap < g).unwrap_or(true) {
                        agent_gap = Some(back_gap);
                    }
                }
            }

            if lane_ttc.inner() == 0.0 && lane_ttre.inner() == 0.0 {
                break;
            }
        }

        raw.push(RawWindow {
            lane: lane_id,
            index: lane.index,
            s,
            time_left: lane_time_left.min(lane_ttc),
            ttre: lane_ttre,
            gap: lane_gap,
            agent_gap,
        });
    }

    let current_index = current_info.index;
    raw.iter()
        .map(|w| {
            let (cross, feasible) = crossing_time_into(
                road_map,
                &raw,
                current_index,
                w.index,
                my_speed,
                my_accel,
            );
            LaneWindow {
                lane: w.lane,
                lane_coord_s: w.s,
                time_left: w.time_left,
                adj_time_left: crate::geom::Duration(w.time_left.inner() - cross.inner()),
                ttre: w.ttre,
                gap: w.gap,
                agent_gap: w.agent_gap,
                feasible,
            }
        })
        .collect()
}

/// True if `a` and `b` are reachable from one another via a chain of incoming/outgoing lane
/// links that never leaves `a`'s road -- i.e. they are lane-change neighbors on the same road.
fn lanes_connected(road_map: &dyn RoadMap, a: LaneId, b: LaneId) -> bool {
    if a == b {
        return true;
    }
    let Some(a_info) = road_map.lane(a) else { return false };
    let mut frontier = vec![a];
    let mut seen = vec![a];
    while let Some(cur) = frontier.pop() {
        let Some(info) = road_map.lane(cur) else { continue };
        for next in info.incoming_lanes.iter().chain(info.outgoing_lanes.iter()) {
            if *next == b {
                return true;
            }
            if road_map.lane(*next).map(|l| l.road) == Some(a_info.road) && !seen.contains(next) {
                seen.push(*next);
                frontier.push(*next);
            }
        }
    }
    false
}

/// `angle_scale` per the curvature-correction rule: straight lanes use a fixed `1/sin(30deg)`;
/// curved lanes scale by how far inside or outside the curve the target lane sits.
fn angle_scale(radius: f64, width: Distance, self_index: usize, to_index: usize) -> f64 {
    if radius == 0.0 || radius.abs() > 1e5 {
        return 1.0 / THIRTY_DEG.sin();
    }
    let t = radius / width.inner();
    let sign = if to_index > self_index { 1.0 } else { -1.0 };
    let se = t * (t - sign);
    let denom = THIRTY_DEG.tan() * (t + sign);
    (2.0 * (se + 0.5 - se * (1.0 / denom).cos())).max(0.0).sqrt()
}

fn crossing_time_at_speed(
    road_map: &dyn RoadMap,
    lane: LaneId,
    s: Distance,
    self_index: usize,
    to_index: usize,
    speed: f64,
    acc: f64,
) -> crate::geom::Duration {
    let width = road_map.width_at_offset(lane, s);
    let lookahead = (1.0 + speed.max(1.0).ln()).ceil().max(1.0) as usize;
    let radius = road_map.curvature_radius_at_offset(lane, s, lookahead);
    let scale = angle_scale(radius, width, self_index, to_index);
    time_to_cover(width * scale, crate::geom::Speed(speed), crate::geom::Acceleration(acc))
}

/// Total time to cross from the current lane into `to_index`, summing `exit_time` for the
/// current lane and `crossing_time_at_speed` for every lane strictly in between, halved for the
/// final target lane. Every segment is scaled against the fixed overall target `to_index`, not
/// the intermediate step, since the angle correction depends on which side of the final lane
/// we're crossing towards. Also reports feasibility: infeasible if any intermediate lane's
/// `min(time_left, ttre)` is at or below the *cumulative* crossing time reached so far.
fn crossing_time_into(
    road_map: &dyn RoadMap,
    windows: &[RawWindow],
    self_index: usize,
    to_index: usize,
    speed: f64,
    acc: f64,
) -> (crate::geom::Duration, bool) {
    if self_index == to_index {
        return (crate::geom::Duration::ZERO, true);
    }
    let step: i64 = if to_index > self_index { 1 } else { -1 };
    let mut total = crate::geom::Duration::ZERO;
    let mut feasible = true;
    let mut idx = self_index as i64;
    loop {
        let next = idx + step;
        if next < 0 {
            break;
        }
        let next = next as usize;
        let Some(w) = windows.iter().find(|w| w.index == next) else { break };
        let is_final = next == to_index;
        let half = if is_final { 0.5 } else { 1.0 };
        let seg = crossing_time_at_speed(road_map, w.lane, w.s, idx as usize, to_index, speed, acc);
        total += seg * half;
        if !is_final {
            let cush = w.time_left.min(w.ttre);
            if cush.inner() <= total.inner() {
                feasible = false;
            }
        }
        idx = next as i64;
        if is_final {
            break;
        }
    }
    (total, feasible)
}

/// `exit_time`: crossing time out of the current lane, adjusted for lateral offset already held
/// within it. Exposed for the controller and for tests; the selector only needs
/// [`build_windows`]'s aggregate output.
pub fn exit_time(
    road_map: &dyn RoadMap,
    lane: LaneId,
    s: Distance,
    t: Distance,
    self_index: usize,
    to_index: usize,
    speed: f64,
    acc: f64,
) -> crate::geom::Duration {
    let crossing = crossing_time_at_speed(road_map, lane, s, self_index, to_index, speed, acc);
    let width = road_map.width_at_offset(lane, s);
    let radius = road_map.curvature_radius_at_offset(lane, s, 2);
    let scale = angle_scale(radius, width, self_index, to_index);
    let lateral_sign = if to_index >= self_index { -1.0 } else { 1.0 } * t.inner().signum();
    let lateral_time = time_to_cover(
        Distance(scale * t.inner().abs()),
        crate::geom::Speed(speed),
        crate::geom::Acceleration(acc),
    );
    crate::geom::Duration(0.5 * crossing.inner() + lateral_sign * lateral_time.inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_scale_is_fixed_for_straight_lanes() {
        let scale = angle_scale(f64::INFINITY, Distance(3.5), 0, 1);
        assert!((scale - 2.0).abs() < 1e-6);
    }
}
