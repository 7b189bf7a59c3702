//! The lane-graph accessor this core consumes but never owns. A host (the larger driving
//! simulator) implements [`RoadMap`] over its own map representation; this crate ships only the
//! trait and the small id types, plus (in `tests/`) a synthetic fixture used by our own test
//! suite.
//!
//! Lanes and roads are referred to by stable integer ids rather than borrowed references, so the
//! graph's cycles (a lane's incoming/outgoing lanes, a road's outgoing roads) never need to be
//! materialized as Rust reference cycles -- the core only ever holds ids and asks the `RoadMap`
//! to resolve them.

use rand::RngCore;

use crate::geom::{Distance, LaneCoord, Pt2D, Speed};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoadId(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneId(pub u64);

#[derive(Clone, Debug)]
pub struct RoadInfo {
    pub id: RoadId,
    /// Ordered by lane index.
    pub lanes: Vec<LaneId>,
    pub outgoing_roads: Vec<RoadId>,
    /// The canonical representation of this road, for maps with multiple equivalent roads
    /// (one-ways split from a bidirectional parent, for example).
    pub composite_road: RoadId,
}

#[derive(Clone, Debug)]
pub struct LaneInfo {
    pub id: LaneId,
    pub index: usize,
    pub length: Distance,
    pub speed_limit: Option<Speed>,
    pub road: RoadId,
    pub composite_lane: LaneId,
    pub incoming_lanes: Vec<LaneId>,
    pub outgoing_lanes: Vec<LaneId>,
}

/// Everything this core needs to know about the lane graph. Implemented by the host.
pub trait RoadMap {
    fn road(&self, id: RoadId) -> Option<&RoadInfo>;
    fn lane(&self, id: LaneId) -> Option<&LaneInfo>;

    /// The single nearest lane to `pt` within `radius`, if any.
    fn nearest_lane(&self, pt: Pt2D, radius: Distance) -> Option<LaneId>;

    /// All lanes within `radius` of `pt`, nearest first, optionally including junction-internal
    /// lanes.
    fn nearest_lanes(&self, pt: Pt2D, radius: Distance, include_junctions: bool) -> Vec<(LaneId, Distance)>;

    /// A route (sequence of road ids) chosen uniformly at random, for vehicles transferred in
    /// without an explicit route.
    fn random_route(&self, rng: &mut dyn RngCore) -> Vec<RoadId>;

    /// The point at longitudinal offset `s` along `lane`'s reference line.
    fn from_lane_coord(&self, lane: LaneId, s: Distance) -> Pt2D;

    /// Projects `pt` onto `lane`'s reference line, giving its longitudinal/lateral coordinates.
    fn to_lane_coord(&self, lane: LaneId, pt: Pt2D) -> LaneCoord;

    /// Shorthand for `to_lane_coord(lane, pt).s`.
    fn offset_along_lane(&self, lane: LaneId, pt: Pt2D) -> Distance {
        self.to_lane_coord(lane, pt).s
    }

    /// The unit direction vector of `lane` at longitudinal offset `s`.
    fn vector_at_offset(&self, lane: LaneId, s: Distance) -> (f64, f64);

    /// The lane's width at longitudinal offset `s`.
    fn width_at_offset(&self, lane: LaneId, s: Distance) -> Distance;

    /// Signed radius of curvature at longitudinal offset `s`, sampling `lookahead` meters ahead.
    /// `f64::INFINITY` (of either sign) for a dead-straight lane.
    fn curvature_radius_at_offset(&self, lane: LaneId, s: Distance, lookahead: usize) -> f64;
}
