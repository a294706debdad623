//! Race - Race configuration, tick ordering and standings
//!
//! `RaceSimulation` owns the track, the player car and the AI field, and
//! runs one tick in a fixed order: player, AI field, player contacts, field
//! contacts, then the off-track cross-check and camera follow.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::race_core::ai::{AiCar, AiContext, AiController};
use crate::race_core::collision::CollisionSystem;
use crate::race_core::error::RaceError;
use crate::race_core::player::{DriverInput, PlayerContext, PlayerController};
use crate::race_core::snapshot::RaceSnapshot;
use crate::race_core::track::{TrackGeometry, DEFAULT_CIRCUIT};
use crate::race_core::vehicle::{VehicleClass, VehicleState};

pub const PLAYER_ID: &str = "player";

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Laps the player must complete
    pub laps_to_finish: u32,
    /// Number of AI cars
    pub ai_count: usize,
    /// How many of the AI cars are unranked filler
    pub filler_count: usize,
    /// Full track width in world units
    pub track_width: f32,
    /// Player speed limit on full throttle
    pub player_max_speed: f32,
    /// Spline samples per control-point span
    pub samples_per_span: usize,
    /// Circuit control polygon, implicitly closed
    pub control_points: Vec<Vec2>,
    /// AI cars never start closer than this to the player's start
    pub start_exclusion: f32,
    /// Exponential camera follow rate (1/s)
    pub camera_follow_rate: f32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            laps_to_finish: 5,
            ai_count: 20,
            filler_count: 10,
            track_width: 110.0,
            player_max_speed: 200.0,
            samples_per_span: 28,
            control_points: DEFAULT_CIRCUIT.iter().copied().map(Vec2::from).collect(),
            start_exclusion: 180.0,
            camera_follow_rate: 6.5,
        }
    }
}

impl RaceConfig {
    /// Check race-level settings; track inputs are checked by the track build
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.laps_to_finish == 0 {
            return Err(RaceError::InvalidConfig("laps_to_finish must be at least 1".into()));
        }
        if self.filler_count > self.ai_count {
            return Err(RaceError::InvalidConfig(format!(
                "filler_count {} exceeds ai_count {}",
                self.filler_count, self.ai_count
            )));
        }
        if !(self.player_max_speed.is_finite() && self.player_max_speed >= PlayerController::MIN_SPEED) {
            return Err(RaceError::InvalidConfig(format!(
                "player_max_speed must be at least {}, got {}",
                PlayerController::MIN_SPEED,
                self.player_max_speed
            )));
        }
        if !(self.start_exclusion.is_finite() && self.start_exclusion >= 0.0) {
            return Err(RaceError::InvalidConfig("start_exclusion must be non-negative".into()));
        }
        if !(self.camera_follow_rate.is_finite() && self.camera_follow_rate >= 0.0) {
            return Err(RaceError::InvalidConfig("camera_follow_rate must be non-negative".into()));
        }
        Ok(())
    }

    /// Build the circuit described by this config
    pub fn build_track(&self) -> Result<TrackGeometry, RaceError> {
        TrackGeometry::build(&self.control_points, self.samples_per_span, self.track_width)
    }
}

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    Racing,
    /// The player has completed the race
    Finished,
}

/// One entry in the finishing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub id: String,
    pub class: VehicleClass,
    /// Elapsed race time at the finish
    pub finish_time: f32,
    /// 1-indexed finishing position across all vehicles
    pub position: u32,
}

/// A contender's place in the projected standings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub id: String,
    /// 1-indexed rank among contenders
    pub rank: u32,
    /// Actual finish time, or projected finish time if still racing
    pub projected_time: f32,
    pub finished: bool,
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct RaceSimulation {
    config: RaceConfig,
    track: TrackGeometry,
    player: VehicleState,
    field: Vec<AiCar>,
    input: DriverInput,
    elapsed: f32,
    status: RaceStatus,
    impact_count: u32,
    course_out_count: u32,
    field_contact_count: u32,
    /// Off-track verdict from the nearest-point projection
    projection_off_track: bool,
    camera: Vec2,
    results: Vec<RaceResult>,
    rng: StdRng,
}

impl RaceSimulation {
    const PLAYER_START_LANE: f32 = -8.0;
    const PLAYER_START_SPEED: f32 = 95.0;
    const PLAYER_BASE_SPEED: f32 = 188.0;
    const AI_START_LANE: f32 = 39.0;
    /// Floor for the speed used in finish projections
    pub const MIN_RANKING_SPEED: f32 = 40.0;

    /// Create a race seeded from OS entropy
    pub fn new(config: RaceConfig) -> Result<Self, RaceError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a reproducible race
    pub fn with_seed(config: RaceConfig, seed: u64) -> Result<Self, RaceError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RaceConfig, mut rng: StdRng) -> Result<Self, RaceError> {
        config.validate()?;
        let track = config.build_track()?;
        let (player, field) = spawn_grid(&config, &track, &mut rng);
        let camera = player.position;

        log::info!(
            "Race ready: {} AI cars, {} laps, track length {:.1}",
            field.len(),
            config.laps_to_finish,
            track.total_length()
        );

        Ok(Self {
            config,
            track,
            player,
            field,
            input: DriverInput::default(),
            elapsed: 0.0,
            status: RaceStatus::Racing,
            impact_count: 0,
            course_out_count: 0,
            field_contact_count: 0,
            projection_off_track: false,
            camera,
            results: Vec::new(),
            rng,
        })
    }

    /// Rebuild track and every vehicle, continuing the random stream
    pub fn reset(&mut self) -> Result<(), RaceError> {
        let seed = self.rng.gen::<u64>();
        self.reset_with_seed(seed)
    }

    /// Rebuild track and every vehicle from a fresh seed
    pub fn reset_with_seed(&mut self, seed: u64) -> Result<(), RaceError> {
        *self = Self::with_seed(self.config.clone(), seed)?;
        Ok(())
    }

    /// Set the intents applied on the next ticks
    pub fn set_input(&mut self, input: DriverInput) {
        self.input = input;
    }

    /// Advance the race by one step of `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if self.status == RaceStatus::Racing {
            self.elapsed += dt;
            self.update_player(dt);
            self.update_field(dt);

            self.impact_count +=
                CollisionSystem::resolve_player_contacts(&mut self.player, &self.field, &mut self.rng);
            self.field_contact_count +=
                CollisionSystem::resolve_field_contacts(&mut self.field, &mut self.rng);

            self.cross_check_player();
        }

        self.camera = follow(
            self.camera,
            self.player.position,
            self.config.camera_follow_rate,
            dt,
        );
    }

    fn update_player(&mut self, dt: f32) {
        let ctx = PlayerContext {
            track: &self.track,
            max_speed: self.config.player_max_speed,
            laps_to_finish: self.config.laps_to_finish,
            elapsed: self.elapsed,
        };
        let tick = PlayerController::update(&mut self.player, self.input, &ctx, dt);

        if tick.left_track {
            self.course_out_count += 1;
            log::debug!("course out #{} at s={:.1}", self.course_out_count, self.player.s);
        }
        if tick.finished {
            push_result(&mut self.results, &self.player);
            self.status = RaceStatus::Finished;
            log::info!(
                "Player finished in {:.3}s, contender rank {}",
                self.elapsed,
                self.contender_rank()
            );
        }
    }

    fn update_field(&mut self, dt: f32) {
        let ctx = AiContext {
            track: &self.track,
            elapsed: self.elapsed,
            laps_to_finish: self.config.laps_to_finish,
            player_s: self.player.s,
            player_lane_offset: self.player.lane_offset,
            player_finished: self.player.is_finished(),
        };
        for car in &mut self.field {
            if AiController::update(car, &ctx, dt, &mut self.rng) {
                push_result(&mut self.results, &car.vehicle);
            }
        }
    }

    /// Lane-offset threshold in the player controller is authoritative;
    /// the projection verdict is kept alongside it for observers.
    fn cross_check_player(&mut self) {
        let nearest = self.track.nearest_point(self.player.position, self.player.s);
        self.projection_off_track = nearest.lateral.abs() > self.track.half_width();
        if self.projection_off_track != self.player.flags.off_track {
            log::debug!(
                "off-track disagreement: lane {:.2}, projected lateral {:.2}",
                self.player.lane_offset,
                nearest.lateral
            );
        }
    }

    /// Total distance a vehicle must cover to finish
    pub fn race_distance(&self) -> f32 {
        self.config.laps_to_finish as f32 * self.track.total_length()
    }

    /// Finish time if finished, otherwise a projection at base speed
    pub fn projected_finish_time(&self, vehicle: &VehicleState) -> f32 {
        match vehicle.finish_time {
            Some(time) => time,
            None => {
                let speed = vehicle.base_speed.max(Self::MIN_RANKING_SPEED);
                self.elapsed + vehicle.remaining_distance(self.race_distance()) / speed
            }
        }
    }

    /// Contenders ordered by projected finish time; ties keep grid order
    pub fn standings(&self) -> Vec<Standing> {
        let mut contenders: Vec<(f32, &VehicleState)> = std::iter::once(&self.player)
            .chain(self.field.iter().map(|car| &car.vehicle))
            .filter(|v| v.class.is_ranked())
            .map(|v| (self.projected_finish_time(v), v))
            .collect();
        contenders.sort_by(|a, b| a.0.total_cmp(&b.0));

        contenders
            .into_iter()
            .enumerate()
            .map(|(i, (projected_time, v))| Standing {
                id: v.id.clone(),
                rank: i as u32 + 1,
                projected_time,
                finished: v.is_finished(),
            })
            .collect()
    }

    /// Player's 1-indexed place among contenders
    pub fn contender_rank(&self) -> u32 {
        self.standings()
            .iter()
            .find(|s| s.id == self.player.id)
            .map_or(0, |s| s.rank)
    }

    /// Get a rounded export of the observable state
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot::capture(self)
    }

    /// Get race configuration
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Get the circuit
    pub fn track(&self) -> &TrackGeometry {
        &self.track
    }

    /// Get the player car
    pub fn player(&self) -> &VehicleState {
        &self.player
    }

    /// Direct access for scripted scenarios
    pub fn player_mut(&mut self) -> &mut VehicleState {
        &mut self.player
    }

    /// Get all AI cars, in grid order
    pub fn field(&self) -> &[AiCar] {
        &self.field
    }

    /// Direct access for scripted scenarios
    pub fn field_mut(&mut self) -> &mut [AiCar] {
        &mut self.field
    }

    /// Get the current driver intents
    pub fn input(&self) -> DriverInput {
        self.input
    }

    /// Get elapsed race time in seconds
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Get current race status
    pub fn status(&self) -> RaceStatus {
        self.status
    }

    /// Check if the player has finished
    pub fn is_finished(&self) -> bool {
        self.status == RaceStatus::Finished
    }

    /// Get player contacts with AI cars
    pub fn impact_count(&self) -> u32 {
        self.impact_count
    }

    /// Get times the player has left the track
    pub fn course_out_count(&self) -> u32 {
        self.course_out_count
    }

    /// Get contacts between AI cars
    pub fn field_contact_count(&self) -> u32 {
        self.field_contact_count
    }

    /// Get the nearest-point off-track verdict from the last tick
    pub fn projection_off_track(&self) -> bool {
        self.projection_off_track
    }

    /// Get camera position
    pub fn camera(&self) -> Vec2 {
        self.camera
    }

    /// Get finishers in finishing order
    pub fn results(&self) -> &[RaceResult] {
        &self.results
    }
}

/// Place the player at the line and scatter the AI field around the loop
fn spawn_grid(
    config: &RaceConfig,
    track: &TrackGeometry,
    rng: &mut StdRng,
) -> (VehicleState, Vec<AiCar>) {
    let mut player = VehicleState::new(
        PLAYER_ID,
        VehicleClass::Contender,
        track,
        0.0,
        RaceSimulation::PLAYER_START_LANE,
        RaceSimulation::PLAYER_BASE_SPEED,
    );
    player.speed = RaceSimulation::PLAYER_START_SPEED;

    // One start per equal slice of the loop, kept clear of the player
    let len = track.total_length();
    let bin = len / config.ai_count.max(1) as f32;
    let mut starts: Vec<f32> = (0..config.ai_count)
        .map(|i| {
            let s = i as f32 * bin + rng.gen::<f32>() * bin;
            if track.signed_gap(s, 0.0).abs() < config.start_exclusion {
                track.wrap(s + len * 0.33)
            } else {
                s
            }
        })
        .collect();
    starts.shuffle(rng);

    let field = starts
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let class = if i < config.filler_count {
                VehicleClass::Filler
            } else {
                VehicleClass::Contender
            };
            let lane = rng.gen_range(-RaceSimulation::AI_START_LANE..RaceSimulation::AI_START_LANE);
            AiCar::spawn(format!("ai-{i}"), class, track, s, lane, rng)
        })
        .collect();

    (player, field)
}

fn push_result(results: &mut Vec<RaceResult>, vehicle: &VehicleState) {
    if let Some(finish_time) = vehicle.finish_time {
        results.push(RaceResult {
            id: vehicle.id.clone(),
            class: vehicle.class,
            finish_time,
            position: results.len() as u32 + 1,
        });
    }
}

/// Exponential follow that converges at the same rate for any step size
pub fn follow(current: Vec2, target: Vec2, rate: f32, dt: f32) -> Vec2 {
    let t = 1.0 - (-dt * rate).exp();
    current.lerp(target, t)
}
