//! Reference row helpers for the application layer.
//!
//! Identifiers are left to the `id` column default, so a sequence advanced
//! by a restore is honoured by the next insert.

use crate::error::{DbError, DbResult};
use chrono::NaiveDateTime;
use duckdb::Connection;
use gcs_core::{MissionLog, MissionPlan, NewMissionLog, NewMissionPlan};
use serde_json::Value;

/// Text form DuckDB uses when a `TIMESTAMP` is cast to `VARCHAR`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

fn json_text(value: &Value) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::DecodeError(e.to_string()))
}

fn parse_json(column: &str, text: Option<String>) -> DbResult<Option<Value>> {
    text.map(|t| {
        serde_json::from_str(&t).map_err(|e| DbError::DecodeError(format!("{column}: {e}")))
    })
    .transpose()
}

/// Parse a `TIMESTAMP` that was read back as `VARCHAR`.
pub fn parse_timestamp_text(text: &str) -> DbResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| DbError::DecodeError(format!("timestamp '{text}': {e}")))
}

fn parse_timestamp(text: Option<String>) -> DbResult<Option<NaiveDateTime>> {
    text.as_deref().map(parse_timestamp_text).transpose()
}

/// Insert a mission log and return its allocated id.
pub fn insert_mission_log(conn: &Connection, log: &NewMissionLog) -> DbResult<i64> {
    let gps_track = log.gps_track.as_ref().map(json_text).transpose()?;
    let detected_sites = log.detected_sites.as_ref().map(json_text).transpose()?;
    let id: i64 = conn
        .query_row(
            "INSERT INTO mission_logs \
             (name, date, duration, status, location, gps_track, detected_sites) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING id",
            duckdb::params![
                log.name,
                log.date,
                log.duration,
                log.status,
                log.location,
                gps_track,
                detected_sites
            ],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(format!("insert mission log: {e}")))?;
    Ok(id)
}

/// Insert a mission plan and return its allocated id.
pub fn insert_mission_plan(conn: &Connection, plan: &NewMissionPlan) -> DbResult<i64> {
    let waypoints = json_text(&plan.waypoints)?;
    let id: i64 = conn
        .query_row(
            "INSERT INTO mission_plans (name, altitude, speed, waypoints) \
             VALUES (?, ?, ?, ?) \
             RETURNING id",
            duckdb::params![plan.name, plan.altitude, plan.speed, waypoints],
            |row| row.get(0),
        )
        .map_err(|e| DbError::ExecutionError(format!("insert mission plan: {e}")))?;
    Ok(id)
}

/// All mission logs, ordered by id.
pub fn list_mission_logs(conn: &Connection) -> DbResult<Vec<MissionLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, date, duration, status, location, gps_track, detected_sites, \
         CAST(created_at AS VARCHAR) \
         FROM mission_logs ORDER BY id",
    )?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(
            |(id, name, date, duration, status, location, gps, sites, created_at)| -> DbResult<MissionLog> {
                Ok(MissionLog {
                    id,
                    name,
                    date,
                    duration,
                    status,
                    location,
                    gps_track: parse_json("gps_track", gps)?,
                    detected_sites: parse_json("detected_sites", sites)?,
                    created_at: parse_timestamp(created_at)?,
                })
            },
        )
        .collect()
}

/// All mission plans, ordered by id.
pub fn list_mission_plans(conn: &Connection) -> DbResult<Vec<MissionPlan>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, CAST(altitude AS DOUBLE), CAST(speed AS DOUBLE), waypoints, \
         CAST(created_at AS VARCHAR) \
         FROM mission_plans ORDER BY id",
    )?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(id, name, altitude, speed, waypoints, created_at)| -> DbResult<MissionPlan> {
            let waypoints = parse_json("waypoints", Some(waypoints))?.unwrap_or(Value::Null);
            Ok(MissionPlan {
                id,
                name,
                altitude,
                speed,
                waypoints,
                created_at: parse_timestamp(created_at)?,
            })
        })
        .collect()
}
