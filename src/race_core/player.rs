//! Player - Input-driven controller for the player car
//!
//! Lateral motion is a damped velocity driven by the steer intent.
//! Longitudinal motion is a clamped throttle/coast model with two
//! multiplicative penalties: the post-contact auto-brake and off-track drag.

use serde::{Deserialize, Serialize};

use crate::race_core::track::TrackGeometry;
use crate::race_core::vehicle::VehicleState;

/// Intents supplied by the input collaborator for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInput {
    /// Steer toward negative lane offset
    pub steer_left: bool,
    /// Steer toward positive lane offset
    pub steer_right: bool,
    /// Throttle on; coasting otherwise
    pub accelerate: bool,
}

impl DriverInput {
    /// -1 for left, +1 for right, 0 for neither or both
    pub fn steer_axis(&self) -> f32 {
        let left = if self.steer_left { -1.0 } else { 0.0 };
        let right = if self.steer_right { 1.0 } else { 0.0 };
        left + right
    }
}

/// Race-level values the player controller reads
#[derive(Debug, Clone, Copy)]
pub struct PlayerContext<'a> {
    pub track: &'a TrackGeometry,
    /// Throttle speed limit
    pub max_speed: f32,
    pub laps_to_finish: u32,
    /// Race time recorded on finishing
    pub elapsed: f32,
}

/// What happened to the player during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerTick {
    /// The car went off the track this tick (rising edge only)
    pub left_track: bool,
    /// The car completed its final lap this tick
    pub finished: bool,
}

/// Player car update logic
pub struct PlayerController;

impl PlayerController {
    pub const STEER_ACCEL: f32 = 240.0;
    /// Per-tick lateral velocity retention
    pub const LANE_DAMPING: f32 = 0.9;
    pub const THROTTLE_ACCEL: f32 = 140.0;
    pub const COAST_DECEL: f32 = 105.0;
    pub const MIN_SPEED: f32 = 40.0;
    pub const AUTO_BRAKE_SPEED_CAP: f32 = 90.0;
    pub const AUTO_BRAKE_DECAY: f32 = 0.93;
    pub const OFF_TRACK_DECAY: f32 = 0.95;

    /// Advance the player car by one tick. No-op once finished.
    pub fn update(
        player: &mut VehicleState,
        input: DriverInput,
        ctx: &PlayerContext<'_>,
        dt: f32,
    ) -> PlayerTick {
        if player.is_finished() {
            return PlayerTick::default();
        }

        player.collision_cooldown.tick(dt);
        player.brake.tick(dt);

        // Lateral: steer accelerates, damping models drag
        player.lane_velocity += input.steer_axis() * Self::STEER_ACCEL * dt;
        player.lane_velocity *= Self::LANE_DAMPING;
        player.lane_offset += player.lane_velocity * dt;

        // Longitudinal
        let accel = if input.accelerate {
            Self::THROTTLE_ACCEL
        } else {
            -Self::COAST_DECEL
        };
        player.speed = (player.speed + accel * dt)
            .min(ctx.max_speed)
            .max(Self::MIN_SPEED);

        if player.brake.is_active() {
            player.speed = player.speed.min(Self::AUTO_BRAKE_SPEED_CAP) * Self::AUTO_BRAKE_DECAY;
        }

        player.advance(ctx.track, player.speed * dt);
        player.place_on_track(ctx.track);

        let off_track = player.lane_offset.abs() > ctx.track.half_width();
        let left_track = off_track && !player.flags.off_track;
        if off_track {
            player.speed *= Self::OFF_TRACK_DECAY;
        }
        player.flags.off_track = off_track;

        let finished = player.laps_completed >= ctx.laps_to_finish;
        if finished {
            player.finish(ctx.elapsed);
            player.speed = 0.0;
        }

        PlayerTick {
            left_track,
            finished,
        }
    }
}
