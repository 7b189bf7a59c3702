//! A tiny synthetic two-road grid implementing [`RoadMap`], used by the demo binary and by the
//! integration test suite. Not part of the simulation core itself.

use rand::RngCore;

use crate::geom::{Distance, LaneCoord, Pt2D, Speed};
use crate::road_map::{LaneId, LaneInfo, RoadId, RoadInfo, RoadMap};

struct StraightLane {
    info: LaneInfo,
    start: Pt2D,
    end: Pt2D,
}

pub struct TestRoadMap {
    roads: Vec<RoadInfo>,
    lanes: Vec<StraightLane>,
}

impl TestRoadMap {
    /// Two single-lane roads end to end, each 100m long, each looping back into the other --
    /// `E1 -> E2 -> E1 -> ...` -- exactly the grid the demo binary and scenario tests drive.
    pub fn two_road_loop() -> TestRoadMap {
        let lane1 = StraightLane {
            info: LaneInfo {
                id: LaneId(1),
                index: 0,
                length: Distance(100.0),
                speed_limit: Some(Speed(15.0)),
                road: RoadId(1),
                composite_lane: LaneId(1),
                incoming_lanes: vec![LaneId(2)],
                outgoing_lanes: vec![LaneId(2)],
            },
            start: Pt2D::new(0.0, 0.0),
            end: Pt2D::new(100.0, 0.0),
        };
        let lane2 = StraightLane {
            info: LaneInfo {
                id: LaneId(2),
                index: 0,
                length: Distance(100.0),
                speed_limit: Some(Speed(15.0)),
                road: RoadId(2),
                composite_lane: LaneId(2),
                incoming_lanes: vec![LaneId(1)],
                outgoing_lanes: vec![LaneId(1)],
            },
            start: Pt2D::new(100.0, 0.0),
            end: Pt2D::new(200.0, 0.0),
        };
        TestRoadMap {
            roads: vec![
                RoadInfo { id: RoadId(1), lanes: vec![LaneId(1)], outgoing_roads: vec![RoadId(2)], composite_road: RoadId(1) },
                RoadInfo { id: RoadId(2), lanes: vec![LaneId(2)], outgoing_roads: vec![RoadId(1)], composite_road: RoadId(2) },
            ],
            lanes: vec![lane1, lane2],
        }
    }

    fn find_lane(&self, id: LaneId) -> Option<&StraightLane> {
        self.lanes.iter().find(|l| l.info.id == id)
    }
}

impl RoadMap for TestRoadMap {
    fn road(&self, id: RoadId) -> Option<&RoadInfo> {
        self.roads.iter().find(|r| r.id == id)
    }

    fn lane(&self, id: LaneId) -> Option<&LaneInfo> {
        self.find_lane(id).map(|l| &l.info)
    }

    fn nearest_lane(&self, pt: Pt2D, radius: Distance) -> Option<LaneId> {
        self.nearest_lanes(pt, radius, true).first().map(|(id, _)| *id)
    }

    fn nearest_lanes(&self, pt: Pt2D, radius: Distance, _include_junctions: bool) -> Vec<(LaneId, Distance)> {
        let mut out: Vec<(LaneId, Distance)> = self
            .lanes
            .iter()
            .filter_map(|l| {
                let d = perpendicular_distance(l, pt);
                if d.inner() <= radius.inner() {
                    Some((l.info.id, d))
                } else {
                    None
                }
            })
            .collect();
        out.sort_by(|a, b| a.1.inner().partial_cmp(&b.1.inner()).unwrap());
        out
    }

    fn random_route(&self, rng: &mut dyn RngCore) -> Vec<RoadId> {
        if rng.next_u32() % 2 == 0 {
            vec![RoadId(1), RoadId(2)]
        } else {
            vec![RoadId(2), RoadId(1)]
        }
    }

    fn from_lane_coord(&self, lane: LaneId, s: Distance) -> Pt2D {
        let Some(l) = self.find_lane(lane) else { return Pt2D::default() };
        lerp_along(l, s.inner())
    }

    fn to_lane_coord(&self, lane: LaneId, pt: Pt2D) -> LaneCoord {
        let Some(l) = self.find_lane(lane) else {
            return LaneCoord { s: Distance::ZERO, t: Distance::ZERO };
        };
        let dx = l.end.x - l.start.x;
        let dy = l.end.y - l.start.y;
        let len2 = dx * dx + dy * dy;
        let s = if len2 > 0.0 { ((pt.x - l.start.x) * dx + (pt.y - l.start.y) * dy) / len2 } else { 0.0 };
        let s_clamped = s.clamp(0.0, 1.0) * l.info.length.inner();
        let proj = lerp_along(l, s_clamped);
        let t = pt.dist_to(proj).inner() * lateral_sign(l, pt);
        LaneCoord { s: Distance(s_clamped), t: Distance(t) }
    }

    fn vector_at_offset(&self, lane: LaneId, _s: Distance) -> (f64, f64) {
        let Some(l) = self.find_lane(lane) else { return (1.0, 0.0) };
        let dx = l.end.x - l.start.x;
        let dy = l.end.y - l.start.y;
        let len = (dx * dx + dy * dy).sqrt().max(1e-9);
        (dx / len, dy / len)
    }

    fn width_at_offset(&self, _lane: LaneId, _s: Distance) -> Distance {
        Distance(3.5)
    }

    fn curvature_radius_at_offset(&self, _lane: LaneId, _s: Distance, _lookahead: usize) -> f64 {
        f64::INFINITY
    }
}

fn lerp_along(l: &StraightLane, s: f64) -> Pt2D {
    let len = l.info.length.inner().max(1e-9);
    let frac = (s / len).clamp(0.0, 1.0);
    Pt2D::new(l.start.x + (l.end.x - l.start.x) * frac, l.start.y + (l.end.y - l.start.y) * frac)
}

fn perpendicular_distance(l: &StraightLane, pt: Pt2D) -> Distance {
    let dx = l.end.x - l.start.x;
    let dy = l.end.y - l.start.y;
    let len2 = dx * dx + dy * dy;
    if len2 <= 0.0 {
        return pt.dist_to(l.start);
    }
    let s = (((pt.x - l.start.x) * dx + (pt.y - l.start.y) * dy) / len2).clamp(0.0, 1.0);
    let proj = Pt2D::new(l.start.x + dx * s, l.start.y + dy * s);
    pt.dist_to(proj)
}

fn lateral_sign(l: &StraightLane, pt: Pt2D) -> f64 {
    let dx = l.end.x - l.start.x;
    let dy = l.end.y - l.start.y;
    let cross = dx * (pt.y - l.start.y) - dy * (pt.x - l.start.x);
    if cross >= 0.0 {
        1.0
    } else {
        -1.0
    }
}
