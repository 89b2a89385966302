//! Mission record types stored in the managed tables.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A completed mission, as stored in `mission_logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionLog {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub duration: String,
    pub status: String,
    pub location: String,
    /// Flown track, typically an array of `{lat, lng, alt}` points
    pub gps_track: Option<Value>,
    /// Sites flagged during the mission
    pub detected_sites: Option<Value>,
    pub created_at: Option<NaiveDateTime>,
}

/// Fields for inserting a mission log; `id` and `created_at` are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMissionLog {
    pub name: String,
    pub date: String,
    pub duration: String,
    pub status: String,
    pub location: String,
    #[serde(default)]
    pub gps_track: Option<Value>,
    #[serde(default)]
    pub detected_sites: Option<Value>,
}

/// A saved mission plan, as stored in `mission_plans`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPlan {
    pub id: i64,
    pub name: String,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    /// Ordered waypoint list
    pub waypoints: Value,
    pub created_at: Option<NaiveDateTime>,
}

/// Fields for inserting a mission plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMissionPlan {
    pub name: String,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    pub waypoints: Value,
}
