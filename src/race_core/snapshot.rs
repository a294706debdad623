//! Snapshot - Rounded, serializable view of the observable race state
//!
//! Numeric fields are rounded so that scripted runs compare cleanly:
//! world positions and the camera to 1 decimal, arc length, lane offset,
//! speed, track length and timers to 2 decimals, headings and times to 3.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::race_core::ai::AiCar;
use crate::race_core::race::{RaceResult, RaceSimulation, RaceStatus};
use crate::race_core::vehicle::VehicleState;

pub const POSITION_DECIMALS: i32 = 1;
pub const MEASURE_DECIMALS: i32 = 2;
pub const ANGLE_DECIMALS: i32 = 3;

/// Round to a fixed number of decimal places
pub fn round_to(value: f32, decimals: i32) -> f32 {
    let scale = 10f32.powi(decimals);
    (value * scale).round() / scale
}

fn round_point(p: Vec2) -> Vec2 {
    Vec2::new(round_to(p.x, POSITION_DECIMALS), round_to(p.y, POSITION_DECIMALS))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    pub width: f32,
    /// Loop circumference
    pub length: f32,
    pub sample_count: usize,
}

/// Player car as seen by the HUD and debug tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub category: u8,
    pub x: f32,
    pub y: f32,
    pub s: f32,
    pub lane_offset: f32,
    pub speed: f32,
    pub heading: f32,
    pub laps_completed: u32,
    pub auto_brake_timer: f32,
    pub collision_cooldown: f32,
    pub off_track: bool,
    pub finished: bool,
    pub finish_time: Option<f32>,
}

impl From<&VehicleState> for PlayerSnapshot {
    fn from(v: &VehicleState) -> Self {
        Self {
            id: v.id.clone(),
            category: v.class.code(),
            x: round_to(v.position.x, POSITION_DECIMALS),
            y: round_to(v.position.y, POSITION_DECIMALS),
            s: round_to(v.s, MEASURE_DECIMALS),
            lane_offset: round_to(v.lane_offset, MEASURE_DECIMALS),
            speed: round_to(v.speed, MEASURE_DECIMALS),
            heading: round_to(v.heading, ANGLE_DECIMALS),
            laps_completed: v.laps_completed,
            auto_brake_timer: round_to(v.brake.remaining(), MEASURE_DECIMALS),
            collision_cooldown: round_to(v.collision_cooldown.remaining(), MEASURE_DECIMALS),
            off_track: v.flags.off_track,
            finished: v.flags.finished,
            finish_time: v.finish_time.map(|t| round_to(t, ANGLE_DECIMALS)),
        }
    }
}

/// Compact AI car state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSnapshot {
    pub id: String,
    pub category: u8,
    pub x: f32,
    pub y: f32,
    pub s: f32,
    pub lane_offset: f32,
    pub speed: f32,
    pub heading: f32,
    pub laps_completed: u32,
    pub blocking: bool,
    pub finished: bool,
}

impl From<&AiCar> for AiSnapshot {
    fn from(car: &AiCar) -> Self {
        let v = &car.vehicle;
        Self {
            id: v.id.clone(),
            category: v.class.code(),
            x: round_to(v.position.x, POSITION_DECIMALS),
            y: round_to(v.position.y, POSITION_DECIMALS),
            s: round_to(v.s, MEASURE_DECIMALS),
            lane_offset: round_to(v.lane_offset, MEASURE_DECIMALS),
            speed: round_to(v.speed, MEASURE_DECIMALS),
            heading: round_to(v.heading, ANGLE_DECIMALS),
            laps_completed: v.laps_completed,
            blocking: car.behavior.block_window.is_active(),
            finished: v.flags.finished,
        }
    }
}

/// Full observable race state for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub elapsed: f32,
    pub laps_to_finish: u32,
    pub track: TrackSnapshot,
    /// Camera position as `[x, y]`
    pub camera: Vec2,
    pub player: PlayerSnapshot,
    /// Player's rank among contenders
    pub contender_rank: u32,
    pub impacts: u32,
    pub course_out_events: u32,
    pub field_contacts: u32,
    /// Off-track verdict of the nearest-point cross-check
    pub projection_off_track: bool,
    pub ai_cars: Vec<AiSnapshot>,
    pub results: Vec<RaceResult>,
}

impl RaceSnapshot {
    /// Read the current race state
    pub fn capture(sim: &RaceSimulation) -> Self {
        let track = sim.track();
        Self {
            status: sim.status(),
            elapsed: round_to(sim.elapsed(), ANGLE_DECIMALS),
            laps_to_finish: sim.config().laps_to_finish,
            track: TrackSnapshot {
                width: track.width(),
                length: round_to(track.total_length(), MEASURE_DECIMALS),
                sample_count: track.sample_count(),
            },
            camera: round_point(sim.camera()),
            player: PlayerSnapshot::from(sim.player()),
            contender_rank: sim.contender_rank(),
            impacts: sim.impact_count(),
            course_out_events: sim.course_out_count(),
            field_contacts: sim.field_contact_count(),
            projection_off_track: sim.projection_off_track(),
            ai_cars: sim.field().iter().map(AiSnapshot::from).collect(),
            results: sim
                .results()
                .iter()
                .map(|r| RaceResult {
                    finish_time: round_to(r.finish_time, ANGLE_DECIMALS),
                    ..r.clone()
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
