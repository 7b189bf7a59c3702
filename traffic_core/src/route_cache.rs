//! Precomputed `(lane, road_index) -> remaining length to the end of the route` tables, keyed by
//! a stable hash of the route's road-id sequence. Shared across every actor following the same
//! route; built once, never invalidated.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::geom::Distance;
use crate::road_map::{LaneId, RoadId, RoadMap};

pub type RouteId = u64;

/// `(lane, road_index within the route) -> remaining distance to the route's end`.
pub type RouteLengths = HashMap<(LaneId, usize), Distance>;

/// A hash of the road-id sequence, used as the route cache key. Collisions between genuinely
/// distinct routes are tolerated (both would share a cache entry) since the table only ever
/// feeds a "how much farther" estimate, never identity.
pub fn route_id(roads: &[RoadId]) -> RouteId {
    let mut hasher = DefaultHasher::new();
    roads.len().hash(&mut hasher);
    for r in roads {
        r.0.hash(&mut hasher);
    }
    hasher.finish()
}

/// Bonus added to a lane's remaining length, on the route's *last* road only, when one of its
/// outgoing lanes belongs to the first road of the route -- so that closed loops are preferred
/// over otherwise-equal alternatives without inflating every interior road that happens to
/// reconnect to the start.
const CLOSED_LOOP_BONUS: f64 = 1.0;

pub struct RouteCache {
    tables: HashMap<RouteId, RouteLengths>,
}

impl RouteCache {
    pub fn new() -> RouteCache {
        RouteCache { tables: HashMap::new() }
    }

    /// Builds (if not already cached) and returns the length table for `roads`.
    pub fn get_or_build(&mut self, road_map: &dyn RoadMap, roads: &[RoadId]) -> &RouteLengths {
        let id = route_id(roads);
        self.tables.entry(id).or_insert_with(|| build_route_lengths(road_map, roads))
    }

    pub fn get(&self, id: RouteId) -> Option<&RouteLengths> {
        self.tables.get(&id)
    }
}

/// Walks the route from its last road back to its first, so that a lane's remaining length
/// always reflects everything already accumulated in the roads that follow it.
fn build_route_lengths(road_map: &dyn RoadMap, roads: &[RoadId]) -> RouteLengths {
    let mut table: RouteLengths = HashMap::new();
    if roads.is_empty() {
        return table;
    }
    let first_road = roads[0];
    let last_index = roads.len() - 1;

    for (i, road_id) in roads.iter().enumerate().rev() {
        let Some(road) = road_map.road(*road_id) else { continue };
        for &lane_id in &road.lanes {
            let Some(lane) = road_map.lane(lane_id) else { continue };
            let mut remaining = *table.get(&(lane_id, i)).unwrap_or(&Distance::ZERO);
            remaining += lane.length;
            if i == last_index
                && lane.outgoing_lanes.iter().any(|out| {
                    road_map.lane(*out).map(|l| l.road) == Some(first_road)
                })
            {
                remaining += Distance(CLOSED_LOOP_BONUS);
            }
            table.insert((lane_id, i), remaining);

            if i > 0 {
                for &incoming in &lane.incoming_lanes {
                    if let Some(incoming_info) = road_map.lane(incoming) {
                        if incoming_info.road == roads[i - 1] {
                            *table.entry((incoming, i - 1)).or_insert(Distance::ZERO) += remaining;
                        }
                    }
                }
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_id_is_deterministic() {
        let roads = vec![RoadId(1), RoadId(2), RoadId(3)];
        assert_eq!(route_id(&roads), route_id(&roads));
    }

    #[test]
    fn route_id_distinguishes_order() {
        let a = vec![RoadId(1), RoadId(2)];
        let b = vec![RoadId(2), RoadId(1)];
        assert_ne!(route_id(&a), route_id(&b));
    }
}
