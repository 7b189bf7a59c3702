//! Chooses a target lane from the windows [`crate::lane_window::build_windows`] produced for the
//! current road, honoring the destination lane, feasibility, and social cut-in behavior.

use crate::geom::{Distance, Duration};
use crate::lane_window::LaneWindow;
use crate::road_map::LaneId;
use crate::rng::SimRng;

/// Persistent, per-actor cut-in state carried between ticks.
#[derive(Clone, Debug, Default)]
pub struct CutinState {
    pub cutting_into: Option<LaneId>,
    pub in_front_after_cutin_secs: f64,
}

pub const CUTIN_HOLD_SECS: f64 = 3.0;

pub struct LaneSelection {
    pub target: LaneWindow,
}

/// `target_cutin_gap = 2.5 * min_space_cush`; a candidate qualifies for a cut-in if its
/// `agent_gap` falls in `(target_cutin_gap / aggressiveness, target_cutin_gap + 2]`.
fn cutin_band(min_space_cush: Distance, aggressiveness: f64) -> (f64, f64) {
    let target = 2.5 * min_space_cush.inner();
    (target / aggressiveness, target + 2.0)
}

#[allow(clippy::too_many_arguments)]
pub fn pick_lane(
    windows: &[LaneWindow],
    current_lane: LaneId,
    dest_lane: Option<LaneId>,
    dest_offset: Distance,
    min_space_cush: Distance,
    aggressiveness: f64,
    cutin_prob: f64,
    cutin: &mut CutinState,
    dt: f64,
    rng: &mut SimRng,
) -> LaneSelection {
    let Some(current_idx) = windows.iter().position(|w| w.lane == current_lane) else {
        // Current lane vanished from the window set (shouldn't happen); fall back to whatever
        // looks best overall.
        let best = windows.iter().max_by(|a, b| {
            a.adj_time_left.inner().partial_cmp(&b.adj_time_left.inner()).unwrap()
        });
        return LaneSelection { target: best.cloned().unwrap_or_else(|| empty_window(current_lane)) };
    };

    let mut best = windows[current_idx].clone();
    let best_index_hint = current_idx;

    // Cut-in persistence: keep honoring a prior commitment while it remains feasible.
    if let Some(committed) = cutin.cutting_into {
        if let Some(w) = windows.iter().find(|w| w.lane == committed) {
            if w.feasible {
                if committed == current_lane {
                    cutin.in_front_after_cutin_secs += dt;
                    if cutin.in_front_after_cutin_secs >= CUTIN_HOLD_SECS {
                        cutin.cutting_into = None;
                        cutin.in_front_after_cutin_secs = 0.0;
                    }
                }
                return LaneSelection { target: w.clone() };
            }
        }
        cutin.cutting_into = None;
        cutin.in_front_after_cutin_secs = 0.0;
    }

    let n = windows.len();
    for step in 0..n {
        let idx = (best_index_hint + step) % n;
        let candidate = &windows[idx];

        if !candidate.feasible {
            break;
        }

        if Some(candidate.lane) == dest_lane
            && candidate.lane_coord_s.inner() + candidate.gap.inner() >= dest_offset.inner()
        {
            return LaneSelection { target: candidate.clone() };
        }

        if let Some(agent_gap) = candidate.agent_gap {
            let (lo, hi) = cutin_band(min_space_cush, aggressiveness);
            if agent_gap.inner() > lo && agent_gap.inner() <= hi && rng.gen_f64() < cutin_prob {
                cutin.cutting_into = Some(candidate.lane);
                cutin.in_front_after_cutin_secs = 0.0;
                best = candidate.clone();
                continue;
            }
        }

        let prefer = candidate.adj_time_left.inner() > best.adj_time_left.inner()
            || (candidate.adj_time_left.inner() == best.adj_time_left.inner()
                && ((Some(candidate.lane) == dest_lane
                    && candidate.lane_coord_s.inner() + candidate.gap.inner() >= dest_offset.inner())
                    || (candidate.ttre.inner() > best.ttre.inner()
                        && lane_index_of(windows, candidate.lane) < lane_index_of(windows, best.lane))));
        if prefer {
            best = candidate.clone();
        }
    }

    LaneSelection { target: best }
}

fn lane_index_of(windows: &[LaneWindow], lane: LaneId) -> usize {
    windows.iter().position(|w| w.lane == lane).unwrap_or(usize::MAX)
}

fn empty_window(lane: LaneId) -> LaneWindow {
    LaneWindow {
        lane,
        lane_coord_s: Distance::ZERO,
        time_left: Duration::ZERO,
        adj_time_left: Duration::ZERO,
        ttre: Duration(f64::INFINITY),
        gap: Distance(f64::INFINITY),
        agent_gap: None,
        feasible: true,
    }
}
