//! Target-speed, heading, and longitudinal-acceleration controllers. Pure functions over a lane
//! window pair and the actor's kinematic state; no actor-shaped state lives here.

use crate::geom::{min_angle_difference_signed, vec_to_radians, Angle, Distance, Pt2D};
use crate::lane_window::LaneWindow;
use crate::road_map::{LaneId, RoadMap};

/// Curvature-capped target speed: `0.5714 * |radius|` caps how fast a lane's curve can be taken,
/// on top of the lane's own speed limit, the per-actor `speed_factor`, and `maxSpeed`.
pub fn target_speed(
    road_map: &dyn RoadMap,
    target_lane: LaneId,
    target_s: Distance,
    current_speed: f64,
    speed_factor: f64,
    max_speed: f64,
) -> f64 {
    let Some(lane) = road_map.lane(target_lane) else { return current_speed };
    let base = lane.speed_limit.map(|s| s.inner()).unwrap_or(current_speed);
    let mut target = base * speed_factor;
    let lookahead = (1.0 + target.max(1.0).ln()).ceil().max(1.0) as usize;
    let radius = road_map.curvature_radius_at_offset(target_lane, target_s, lookahead);
    if radius.is_finite() {
        target = target.min(0.5714 * radius.abs());
    }
    target.min(max_speed)
}

/// Angular velocity command: projects a look-ahead point onto the target lane and steers toward
/// its heading there, with a lateral-error correction term.
pub fn angular_velocity(
    road_map: &dyn RoadMap,
    target_lane: LaneId,
    my_pos: Pt2D,
    my_heading: Angle,
    speed: f64,
    dt: f64,
) -> f64 {
    let look_ahead = (dt * speed).max(2.0);
    let (hx, hy) = my_heading.to_vec();
    let look_point = my_pos + (hx * look_ahead, hy * look_ahead);
    let coord = road_map.to_lane_coord(target_lane, look_point);
    let target_heading = vec_to_radians(road_map.vector_at_offset(target_lane, coord.s));
    let heading_err = min_angle_difference_signed(target_heading, my_heading);
    3.75 * heading_err - 1.25 * coord.t.inner()
}

fn clip(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Two emergency-braking gates, then a PID on target speed scaled by `accel`/`decel`.
#[allow(clippy::too_many_arguments)]
pub fn longitudinal_acceleration(
    road_map: &dyn RoadMap,
    current_lane: LaneId,
    current_s: Distance,
    target_lane: LaneId,
    target_s: Distance,
    current: &LaneWindow,
    target: &LaneWindow,
    speed: f64,
    current_accel: f64,
    target_speed_val: f64,
    tau: f64,
    min_space_cush: Distance,
    emergency_decel: f64,
    accel: f64,
    decel: f64,
    dt: f64,
) -> f64 {
    let gap_time = |w: &LaneWindow| -> f64 {
        if speed > 0.0 {
            w.gap.inner() / speed
        } else {
            f64::INFINITY
        }
    };

    let time_cush = [
        target.time_left.inner(),
        gap_time(target),
        current.time_left.inner(),
        gap_time(current),
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
    .max(0.0);

    if speed == 0.0 {
        // Both gates return 0 when stationary.
    } else if time_cush < tau {
        let severity = clip(3.0 * (tau - time_cush) / tau, 0.0, 1.0);
        return -emergency_decel * severity;
    }

    let space_cush = target.gap.min(current.gap).max(Distance::ZERO).inner();
    if speed != 0.0 && space_cush < min_space_cush.inner() {
        let severity = clip(2.0 * (min_space_cush.inner() - space_cush) / min_space_cush.inner(), 0.0, 1.0);
        return -emergency_decel * severity;
    }
    if speed == 0.0 {
        return 0.0;
    }

    let target_radius = road_map.curvature_radius_at_offset(target_lane, target_s, 2);
    let current_radius = road_map.curvature_radius_at_offset(current_lane, current_s, 2);
    let ratio = if target_radius.is_finite()
        && current_radius.is_finite()
        && target_radius.signum() == current_radius.signum()
        && current_radius != 0.0
    {
        target_radius / current_radius
    } else {
        1.0
    };
    let my_speed_on_tgt = speed * ratio;
    let my_acc_on_tgt = current_accel * ratio;

    let p = 0.0060 * (target_speed_val - my_speed_on_tgt);
    let d = -0.0010 * my_acc_on_tgt;
    let pid = clip((p + d) / dt, -1.0, 1.0);
    if pid >= 0.0 {
        pid * accel
    } else {
        pid * decel
    }
}
