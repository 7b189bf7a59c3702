//! The boundary-level vehicle representation: what the host hands us at `sync` time and what we
//! hand back from `step`.

use serde::{Deserialize, Serialize};

use crate::geom::Pose;

/// Who is driving a vehicle. Only `Social` and `Unknown` vehicles can be transferred in via
/// `add_vehicle`; `EgoAgent` vehicles are never managed by this core but do count as obstacles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Social,
    EgoAgent,
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Dimensions {
        Dimensions { length, width, height }
    }
}

/// A 3-vector, used only for `linear_acceleration`; `z` is always `0.0` on a 2D lane graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3 { x, y, z }
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A vehicle as seen at the provider boundary: what `sync` receives and what `step` returns for
/// managed actors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleState {
    pub vehicle_id: String,
    pub pose: Pose,
    pub speed: f64,
    pub linear_acceleration: Option<Vec3>,
    pub dimensions: Dimensions,
    pub role: Role,
    pub vehicle_type: String,
    /// Identifies which provider owns this vehicle. Managed actors always carry this provider's
    /// own source string; everything else is foreign.
    pub source: String,
}
