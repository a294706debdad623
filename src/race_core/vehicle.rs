//! Vehicle - Shared state record for player and AI cars
//!
//! A vehicle has no behavior of its own. Its controller moves it each tick,
//! and the collision system may nudge its lane, speed and timers.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::race_core::track::TrackGeometry;

/// Vehicle class, selects which behaviors apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    /// Field filler, never ranked
    Filler,
    /// Ranked against the player, may block
    Contender,
}

impl VehicleClass {
    /// Numeric category used by the export format
    pub fn code(self) -> u8 {
        match self {
            VehicleClass::Filler => 1,
            VehicleClass::Contender => 2,
        }
    }

    /// Check if the class takes part in standings
    pub fn is_ranked(self) -> bool {
        matches!(self, VehicleClass::Contender)
    }
}

/// Countdown in seconds that decays to zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    remaining: f32,
}

impl Timer {
    /// Create a timer that is not running
    pub const fn idle() -> Self {
        Self { remaining: 0.0 }
    }

    /// Create a timer already counting down from `seconds`
    pub fn armed(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
        }
    }

    /// Get seconds left on the countdown
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Check if the countdown is still running
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Decay by `dt` seconds, stopping at zero
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Restart the countdown at `seconds`
    pub fn arm(&mut self, seconds: f32) {
        self.remaining = seconds.max(0.0);
    }

    /// Extend to at least `seconds`, never shorten
    pub fn arm_at_least(&mut self, seconds: f32) {
        self.remaining = self.remaining.max(seconds);
    }

    /// Stop the countdown
    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }
}

/// Vehicle status flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleFlags {
    /// Race distance completed; set once
    pub finished: bool,
    /// Lane offset beyond the track edge
    pub off_track: bool,
}

/// Complete kinematic and progress state for a single car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Unique vehicle ID ("player", "ai-0", ...)
    pub id: String,
    /// Filler or contender
    pub class: VehicleClass,
    /// Arc length along the centerline, wrapped into the loop
    pub s: f32,
    /// Signed lateral distance from the centerline
    pub lane_offset: f32,
    /// Lateral velocity, player steering only
    pub lane_velocity: f32,
    /// Current forward speed
    pub speed: f32,
    /// Cruising speed, also used for ranking projections
    pub base_speed: f32,
    /// Heading in radians
    pub heading: f32,
    /// World position
    pub position: Vec2,
    /// Distance driven since the start; never wraps
    pub distance_traveled: f32,
    pub laps_completed: u32,
    /// Elapsed race time when the last lap was completed
    pub finish_time: Option<f32>,
    pub flags: VehicleFlags,
    /// Suppresses repeat contacts while two cars stay touching
    pub collision_cooldown: Timer,
    /// Post-contact braking penalty
    pub brake: Timer,
}

impl VehicleState {
    /// Create a vehicle at rest on the track
    pub fn new(
        id: impl Into<String>,
        class: VehicleClass,
        track: &TrackGeometry,
        s: f32,
        lane_offset: f32,
        base_speed: f32,
    ) -> Self {
        let mut vehicle = Self {
            id: id.into(),
            class,
            s,
            lane_offset,
            lane_velocity: 0.0,
            speed: 0.0,
            base_speed,
            heading: 0.0,
            position: Vec2::ZERO,
            distance_traveled: 0.0,
            laps_completed: 0,
            finish_time: None,
            flags: VehicleFlags::default(),
            collision_cooldown: Timer::idle(),
            brake: Timer::idle(),
        };
        vehicle.place_on_track(track);
        vehicle
    }

    /// Resolve world position and heading from `s` and the lane offset
    pub fn place_on_track(&mut self, track: &TrackGeometry) {
        let frame = track.point_at(self.s);
        self.position = frame.offset(self.lane_offset);
        self.heading = frame.heading;
    }

    /// Move forward along the track and update lap count
    pub fn advance(&mut self, track: &TrackGeometry, distance: f32) {
        let distance = distance.max(0.0);
        self.s = track.wrap(self.s + distance);
        self.distance_traveled += distance;
        self.laps_completed = (self.distance_traveled / track.total_length()).floor() as u32;
    }

    pub fn is_finished(&self) -> bool {
        self.flags.finished
    }

    /// Mark the vehicle finished. Returns false if it already was.
    pub fn finish(&mut self, elapsed: f32) -> bool {
        if self.flags.finished {
            return false;
        }
        self.flags.finished = true;
        self.finish_time = Some(elapsed);
        true
    }

    /// Race distance still to cover, never negative
    pub fn remaining_distance(&self, race_distance: f32) -> f32 {
        (race_distance - self.distance_traveled).max(0.0)
    }
}
