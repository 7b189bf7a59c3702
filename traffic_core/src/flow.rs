//! Loads the minimal SUMO-routes subset this core understands: `<vType>`, `<route>`, `<flow>`
//! under a root `<routes>` element. Streaming, event-based, in the style of the host's own
//! `kml`/`sumo` readers rather than a DOM-tree XML crate.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{Result, TrafficError};
use crate::road_map::RoadId;
use crate::route_cache::{route_id, RouteId};

/// Vehicle-type parameters, all optional in the source document with SUMO-ish defaults.
#[derive(Clone, Debug)]
pub struct VehicleTypeParams {
    pub id: String,
    pub v_class: String,
    pub min_gap: f64,
    pub speed_factor: f64,
    pub speed_dev: f64,
    pub max_speed: f64,
    pub accel: f64,
    pub decel: f64,
    pub emergency_decel: f64,
    pub tau: f64,
    pub lc_assertive: f64,
    pub lc_cutin_prob: f64,
}

impl Default for VehicleTypeParams {
    fn default() -> VehicleTypeParams {
        VehicleTypeParams {
            id: String::new(),
            v_class: "passenger".to_string(),
            min_gap: 2.5,
            speed_factor: 1.0,
            speed_dev: 0.1,
            max_speed: 55.5,
            accel: 2.6,
            decel: 4.5,
            emergency_decel: 4.5,
            tau: 1.0,
            lc_assertive: 1.0,
            lc_cutin_prob: 0.0,
        }
    }
}

/// A token for a depart/arrival lane, position, or speed field.
#[derive(Clone, Debug, PartialEq)]
pub enum PosToken {
    Max,
    Random,
    SpeedLimit,
    Numeric(f64),
}

impl PosToken {
    fn parse(s: &str) -> PosToken {
        match s {
            "max" => PosToken::Max,
            "random" => PosToken::Random,
            "speedLimit" => PosToken::SpeedLimit,
            other => other
                .parse::<f64>()
                .map(PosToken::Numeric)
                .unwrap_or(PosToken::Max),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Flow {
    pub id: String,
    pub route: Vec<RoadId>,
    pub route_id: RouteId,
    pub vtype: VehicleTypeParams,
    pub begin: f64,
    pub end: f64,
    pub emit_period: f64,
    pub last_added: Option<f64>,
    pub depart_lane: Option<usize>,
    pub depart_pos: PosToken,
    pub depart_speed: PosToken,
    pub arrival_lane: Option<usize>,
    pub arrival_pos: PosToken,
}

fn attr_value(e: &quick_xml::events::BytesStart, key: &str) -> Option<String> {
    e.attributes().filter_map(|a| a.ok()).find_map(|a| {
        if a.key.as_ref() == key.as_bytes() {
            Some(String::from_utf8_lossy(&a.value).into_owned())
        } else {
            None
        }
    })
}

fn attr_f64(e: &quick_xml::events::BytesStart, key: &str, default: f64) -> f64 {
    attr_value(e, key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parses a full traffic-spec document from any `BufRead`, returning the declared flows in
/// document order. `<vType>`/`<route>` references that a `<flow>` points at but that were never
/// declared are a fatal [`TrafficError::Config`].
pub fn load<R: BufRead>(reader: R) -> Result<Vec<Flow>> {
    // Whitespace-only text nodes between elements are never inspected below, so no trim
    // configuration is needed.
    let mut xml = Reader::from_reader(reader);

    let mut vtypes: HashMap<String, VehicleTypeParams> = HashMap::new();
    let mut routes: HashMap<String, Vec<RoadId>> = HashMap::new();
    let mut flows = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"vType" => {
                        let id = attr_value(&e, "id")
                            .ok_or_else(|| TrafficError::Config("vType missing id".to_string()))?;
                        let mut vt = VehicleTypeParams::default();
                        vt.id = id.clone();
                        if let Some(v) = attr_value(&e, "vClass") {
                            vt.v_class = v;
                        }
                        vt.min_gap = attr_f64(&e, "minGap", vt.min_gap);
                        vt.speed_factor = attr_f64(&e, "speedFactor", vt.speed_factor);
                        vt.speed_dev = attr_f64(&e, "speedDev", vt.speed_dev);
                        vt.max_speed = attr_f64(&e, "maxSpeed", vt.max_speed);
                        vt.accel = attr_f64(&e, "accel", vt.accel);
                        vt.decel = attr_f64(&e, "decel", vt.decel);
                        vt.emergency_decel = attr_f64(&e, "emergencyDecel", vt.emergency_decel);
                        vt.tau = attr_f64(&e, "tau", vt.tau);
                        vt.lc_assertive = attr_f64(&e, "lcAssertive", vt.lc_assertive);
                        vt.lc_cutin_prob = attr_f64(&e, "lcCutinProb", vt.lc_cutin_prob);
                        if vt.lc_assertive <= 0.0 {
                            log::warn!("vType {id}: non-positive lcAssertive, clamping to 1.0");
                            vt.lc_assertive = 1.0;
                        }
                        if !(0.0..=1.0).contains(&vt.lc_cutin_prob) {
                            log::warn!("vType {id}: lcCutinProb out of range, clamping to 0.0");
                            vt.lc_cutin_prob = 0.0;
                        }
                        vtypes.insert(id, vt);
                    }
                    b"route" => {
                        let id = attr_value(&e, "id")
                            .ok_or_else(|| TrafficError::Config("route missing id".to_string()))?;
                        let edges = attr_value(&e, "edges").unwrap_or_default();
                        let road_ids: Vec<RoadId> = edges
                            .split_whitespace()
                            .map(|tok| {
                                tok.parse::<u64>()
                                    .map(RoadId)
                                    .map_err(|_| TrafficError::Config(format!("bad edge id: {tok}")))
                            })
                            .collect::<Result<_>>()?;
                        routes.insert(id, road_ids);
                    }
                    b"flow" => {
                        let id = attr_value(&e, "id")
                            .ok_or_else(|| TrafficError::Config("flow missing id".to_string()))?;
                        let type_ref = attr_value(&e, "type")
                            .ok_or_else(|| TrafficError::Config(format!("flow {id} missing type")))?;
                        let route_ref = attr_value(&e, "route")
                            .ok_or_else(|| TrafficError::Config(format!("flow {id} missing route")))?;
                        let vtype = vtypes.get(&type_ref).cloned().ok_or_else(|| {
                            TrafficError::Config(format!("flow {id} references undefined vType {type_ref}"))
                        })?;
                        let route = routes.get(&route_ref).cloned().ok_or_else(|| {
                            TrafficError::Config(format!("flow {id} references undefined route {route_ref}"))
                        })?;
                        let begin = attr_f64(&e, "begin", 0.0);
                        let end = attr_f64(&e, "end", f64::INFINITY);
                        let vehs_per_hour = attr_f64(&e, "vehsPerHour", 1.0).max(1e-9);
                        let depart_lane = attr_value(&e, "departLane").and_then(|v| v.parse().ok());
                        let arrival_lane = attr_value(&e, "arrivalLane").and_then(|v| v.parse().ok());
                        let depart_pos = attr_value(&e, "departPos")
                            .map(|s| PosToken::parse(&s))
                            .unwrap_or(PosToken::Random);
                        let depart_speed = attr_value(&e, "departSpeed")
                            .map(|s| PosToken::parse(&s))
                            .unwrap_or(PosToken::Max);
                        let arrival_pos = attr_value(&e, "arrivalPos")
                            .map(|s| PosToken::parse(&s))
                            .unwrap_or(PosToken::Max);
                        let rid = route_id(&route);
                        flows.push(Flow {
                            id,
                            route,
                            route_id: rid,
                            vtype,
                            begin,
                            end,
                            emit_period: 3600.0 / vehs_per_hour,
                            last_added: None,
                            depart_lane,
                            depart_pos,
                            depart_speed,
                            arrival_lane,
                            arrival_pos,
                        });
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(TrafficError::Config(format!("xml parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(flows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <routes>
          <vType id="car" vClass="passenger" accel="2.6" decel="4.5"
                 emergencyDecel="4.5" maxSpeed="55.5" tau="1.0" minGap="2.5"
                 speedFactor="1.0" speedDev="0.1"
                 lcAssertive="1.0" lcCutinProb="0.0"/>
          <route id="r0" edges="1 2"/>
          <flow  id="f0" type="car" route="r0" begin="0" end="900"
                 vehsPerHour="1200" departLane="1" departPos="random"
                 departSpeed="max" arrivalLane="0" arrivalPos="max"/>
        </routes>
    "#;

    #[test]
    fn parses_minimal_document() {
        let flows = load(DOC.as_bytes()).unwrap();
        assert_eq!(flows.len(), 1);
        let f = &flows[0];
        assert_eq!(f.route, vec![RoadId(1), RoadId(2)]);
        assert!((f.emit_period - 3.0).abs() < 1e-9);
        assert_eq!(f.depart_lane, Some(1));
        assert_eq!(f.depart_pos, PosToken::Random);
        assert_eq!(f.depart_speed, PosToken::Max);
    }

    #[test]
    fn undefined_vtype_reference_is_fatal() {
        let doc = r#"
            <routes>
              <route id="r0" edges="1 2"/>
              <flow id="f0" type="missing" route="r0" begin="0" end="10" vehsPerHour="100"/>
            </routes>
        "#;
        assert!(load(doc.as_bytes()).is_err());
    }

    #[test]
    fn undefined_route_reference_is_fatal() {
        let doc = r#"
            <routes>
              <vType id="car"/>
              <flow id="f0" type="car" route="missing" begin="0" end="10" vehsPerHour="100"/>
            </routes>
        "#;
        assert!(load(doc.as_bytes()).is_err());
    }
}
