//! AI - Timer-driven lane behavior for the autonomous field
//!
//! Each AI car runs two independent decision processes off countdown timers:
//! a lane shift that picks a new line around the car's bias and relaxes back,
//! and (contenders only) a blocking window that moves the car into the
//! player's lane when the player is close. On top of the chosen line sit a
//! per-car sinusoidal weave and a small lean toward the inside of corners.

use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::race_core::track::TrackGeometry;
use crate::race_core::vehicle::{Timer, VehicleClass, VehicleState};

/// Per-car driving personality, fixed at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Preferred lateral line
    pub line_bias: f32,
    /// Sinusoidal lane weave amplitude
    pub weave_amp: f32,
    /// Weave frequency (rad/s)
    pub weave_freq: f32,
    pub weave_phase: f32,
    /// Lane smoothing rate (1/s)
    pub responsiveness: f32,
    /// Sinusoidal speed jitter amplitude
    pub jitter_amp: f32,
    /// Jitter frequency (rad/s)
    pub jitter_freq: f32,
    pub jitter_phase: f32,
}

impl AiProfile {
    /// Draw a personality from the stock parameter ranges
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            line_bias: rng.gen_range(-38.0..38.0),
            weave_amp: rng.gen_range(4.0..18.0),
            weave_freq: rng.gen_range(0.35..1.3),
            weave_phase: rng.gen_range(0.0..TAU),
            responsiveness: rng.gen_range(0.5..1.4),
            jitter_amp: rng.gen_range(2.0..14.0),
            jitter_freq: rng.gen_range(0.28..1.08),
            jitter_phase: rng.gen_range(0.0..TAU),
        }
    }

    /// Profile with no weave or speed jitter, for scripted scenarios
    pub fn steady(line_bias: f32, responsiveness: f32) -> Self {
        Self {
            line_bias,
            weave_amp: 0.0,
            weave_freq: 0.0,
            weave_phase: 0.0,
            responsiveness,
            jitter_amp: 0.0,
            jitter_freq: 0.0,
            jitter_phase: 0.0,
        }
    }
}

/// Decision state owned by the AI controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiBehavior {
    /// Line chosen by the last lane-shift decision
    pub lane_shift_target: f32,
    /// Time until the next lane-shift decision
    pub lane_shift: Timer,
    /// While active, the shifted line is held before relaxing
    pub lane_shift_hold: Timer,
    /// Time until the next blocking decision
    pub block_decision: Timer,
    /// While active, the car tries to occupy the player's lane
    pub block_window: Timer,
    /// Lateral offset from the player's lane while blocking
    pub block_offset: f32,
}

impl AiBehavior {
    /// Starting decision state, timers staggered across the field
    pub fn initial(profile: &AiProfile, rng: &mut impl Rng) -> Self {
        Self {
            lane_shift_target: profile.line_bias,
            lane_shift: Timer::armed(rng.gen_range(1.2..4.0)),
            lane_shift_hold: Timer::idle(),
            block_decision: Timer::armed(rng.gen_range(0.9..3.3)),
            block_window: Timer::idle(),
            block_offset: rng.gen_range(-12.0..12.0),
        }
    }
}

/// An autonomous car: shared vehicle state plus its AI-owned state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiCar {
    pub vehicle: VehicleState,
    pub profile: AiProfile,
    pub behavior: AiBehavior,
}

impl AiCar {
    /// Create an AI car with a random personality for its class
    pub fn spawn(
        id: impl Into<String>,
        class: VehicleClass,
        track: &TrackGeometry,
        s: f32,
        lane_offset: f32,
        rng: &mut impl Rng,
    ) -> Self {
        let base_speed = match class {
            VehicleClass::Filler => rng.gen_range(206.0..224.0),
            VehicleClass::Contender => rng.gen_range(165.0..181.0),
        };
        let mut vehicle = VehicleState::new(id, class, track, s, lane_offset, base_speed);
        vehicle.speed = base_speed + rng.gen_range(-4.0f32..4.0);

        let profile = AiProfile::random(rng);
        let behavior = AiBehavior::initial(&profile, rng);
        Self {
            vehicle,
            profile,
            behavior,
        }
    }
}

/// Race-level values an AI car reads each tick
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    pub track: &'a TrackGeometry,
    pub elapsed: f32,
    pub laps_to_finish: u32,
    /// Player arc length and lane, already updated this tick
    pub player_s: f32,
    pub player_lane_offset: f32,
    pub player_finished: bool,
}

/// AI car update logic
pub struct AiController;

impl AiController {
    const SHIFT_INTERVAL: (f32, f32) = (1.8, 5.2);
    const SHIFT_HOLD: (f32, f32) = (0.45, 1.65);
    const SHIFT_SPREAD: f32 = 38.0;
    const SHIFT_LIMIT: f32 = 48.0;
    const SHIFT_RELAX_RATE: f32 = 2.2;

    const BLOCK_INTERVAL: (f32, f32) = (1.3, 4.0);
    const BLOCK_CHANCE: f32 = 0.34;
    const BLOCK_WINDOW: (f32, f32) = (1.0, 2.8);
    const BLOCK_OFFSET: f32 = 14.0;
    /// Max arc-length gap to the player for a block to engage
    pub const BLOCK_GAP: f32 = 260.0;
    pub const BLOCK_LANE_LIMIT: f32 = 52.0;
    const BLOCK_RESPONSE_BONUS: f32 = 0.7;

    const CORNER_BIAS_GAIN: f32 = 900.0;
    pub const CORNER_BIAS_LIMIT: f32 = 7.0;

    const BRAKE_SPEED_FACTOR: f32 = 0.58;
    const BRAKE_DECAY: f32 = 0.9;

    /// Advance one AI car by one tick.
    ///
    /// Returns true on the tick the car completes its final lap. The car keeps
    /// circulating afterwards; its finish time is never overwritten.
    pub fn update(car: &mut AiCar, ctx: &AiContext<'_>, dt: f32, rng: &mut impl Rng) -> bool {
        let AiCar {
            vehicle,
            profile,
            behavior,
        } = car;

        vehicle.collision_cooldown.tick(dt);
        vehicle.brake.tick(dt);
        behavior.lane_shift.tick(dt);
        behavior.lane_shift_hold.tick(dt);
        behavior.block_decision.tick(dt);
        behavior.block_window.tick(dt);

        match vehicle.class {
            VehicleClass::Contender => {
                if !behavior.block_decision.is_active() {
                    if rng.gen::<f32>() < Self::BLOCK_CHANCE {
                        behavior.block_window.arm(range(rng, Self::BLOCK_WINDOW));
                        behavior.block_offset =
                            rng.gen_range(-Self::BLOCK_OFFSET..Self::BLOCK_OFFSET);
                    }
                    behavior.block_decision.arm(range(rng, Self::BLOCK_INTERVAL));
                }
            }
            VehicleClass::Filler => behavior.block_window.clear(),
        }

        if !behavior.lane_shift.is_active() {
            let spread = rng.gen_range(-1.0f32..1.0) * Self::SHIFT_SPREAD;
            behavior.lane_shift_target =
                (profile.line_bias + spread).clamp(-Self::SHIFT_LIMIT, Self::SHIFT_LIMIT);
            behavior.lane_shift_hold.arm(range(rng, Self::SHIFT_HOLD));
            behavior.lane_shift.arm(range(rng, Self::SHIFT_INTERVAL));
        }
        if !behavior.lane_shift_hold.is_active() {
            let relax = (dt * Self::SHIFT_RELAX_RATE).min(1.0);
            behavior.lane_shift_target += (profile.line_bias - behavior.lane_shift_target) * relax;
        }

        let weave = (ctx.elapsed * profile.weave_freq + profile.weave_phase).sin() * profile.weave_amp;
        let mut lane_target =
            behavior.lane_shift_target + weave + Self::corner_bias(ctx.track, vehicle.s);
        let mut response = profile.responsiveness;

        let blocking = match vehicle.class {
            VehicleClass::Contender => {
                behavior.block_window.is_active()
                    && !ctx.player_finished
                    && ctx.track.signed_gap(vehicle.s, ctx.player_s).abs() < Self::BLOCK_GAP
            }
            VehicleClass::Filler => false,
        };
        if blocking {
            lane_target = (ctx.player_lane_offset + behavior.block_offset)
                .clamp(-Self::BLOCK_LANE_LIMIT, Self::BLOCK_LANE_LIMIT);
            response += Self::BLOCK_RESPONSE_BONUS;
        }

        // Never step past the target in one tick
        vehicle.lane_offset += (lane_target - vehicle.lane_offset) * (response * dt).min(1.0);

        let jitter =
            (ctx.elapsed * profile.jitter_freq + profile.jitter_phase).sin() * profile.jitter_amp;
        vehicle.speed = vehicle.base_speed + jitter;
        if vehicle.brake.is_active() {
            vehicle.speed =
                vehicle.speed.min(vehicle.base_speed * Self::BRAKE_SPEED_FACTOR) * Self::BRAKE_DECAY;
        }

        vehicle.advance(ctx.track, vehicle.speed * dt);
        vehicle.place_on_track(ctx.track);

        vehicle.laps_completed >= ctx.laps_to_finish && vehicle.finish(ctx.elapsed)
    }

    /// Lean toward the inside of the corner at `s`, bounded
    pub fn corner_bias(track: &TrackGeometry, s: f32) -> f32 {
        (track.curvature_at(s) * Self::CORNER_BIAS_GAIN)
            .clamp(-Self::CORNER_BIAS_LIMIT, Self::CORNER_BIAS_LIMIT)
    }
}

fn range(rng: &mut impl Rng, (lo, hi): (f32, f32)) -> f32 {
    rng.gen_range(lo..hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn track() -> TrackGeometry {
        TrackGeometry::default_circuit(28, 110.0).unwrap()
    }

    fn ctx(track: &TrackGeometry, elapsed: f32, player_s: f32, player_lane: f32) -> AiContext<'_> {
        AiContext {
            track,
            elapsed,
            laps_to_finish: 5,
            player_s,
            player_lane_offset: player_lane,
            player_finished: false,
        }
    }

    fn steady_car(track: &TrackGeometry, class: VehicleClass, base_speed: f32) -> AiCar {
        let profile = AiProfile::steady(0.0, 1.0);
        let vehicle = VehicleState::new("ai-t", class, track, 100.0, 0.0, base_speed);
        AiCar {
            vehicle,
            behavior: AiBehavior {
                lane_shift_target: 0.0,
                lane_shift: Timer::armed(1000.0),
                lane_shift_hold: Timer::idle(),
                block_decision: Timer::armed(1000.0),
                block_window: Timer::idle(),
                block_offset: 0.0,
            },
            profile,
        }
    }

    #[test]
    fn spawned_cars_match_their_class() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let filler = AiCar::spawn("f", VehicleClass::Filler, &track, 10.0, 0.0, &mut rng);
            assert!((206.0..224.0).contains(&filler.vehicle.base_speed));
            assert!((filler.vehicle.speed - filler.vehicle.base_speed).abs() <= 4.0);

            let contender = AiCar::spawn("c", VehicleClass::Contender, &track, 10.0, 0.0, &mut rng);
            assert!((165.0..181.0).contains(&contender.vehicle.base_speed));
            assert_eq!(contender.behavior.lane_shift_target, contender.profile.line_bias);
            assert!(contender.behavior.lane_shift.is_active());
            assert!(!contender.behavior.block_window.is_active());
        }
    }

    #[test]
    fn fillers_never_block() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(11);
        let mut car = AiCar::spawn("ai-0", VehicleClass::Filler, &track, 0.0, 0.0, &mut rng);
        car.behavior.block_window.arm(5.0);
        for i in 0..3600 {
            let elapsed = i as f32 * DT;
            let c = ctx(&track, elapsed, car.vehicle.s, 0.0);
            AiController::update(&mut car, &c, DT, &mut rng);
            assert!(!car.behavior.block_window.is_active());
        }
    }

    #[test]
    fn contenders_arm_block_windows() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(12);
        let mut car = AiCar::spawn("ai-15", VehicleClass::Contender, &track, 0.0, 0.0, &mut rng);
        let mut armed = 0;
        let mut was_active = false;
        for i in 0..(60 * 120) {
            let c = ctx(&track, i as f32 * DT, car.vehicle.s + 2000.0, 0.0);
            AiController::update(&mut car, &c, DT, &mut rng);
            let active = car.behavior.block_window.is_active();
            if active && !was_active {
                armed += 1;
                assert!(car.behavior.block_offset.abs() <= 14.0);
            }
            was_active = active;
        }
        assert!(armed > 0);
    }

    #[test]
    fn blocking_moves_into_player_lane() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(3);
        let mut car = steady_car(&track, VehicleClass::Contender, 170.0);
        car.behavior.block_window.arm(1000.0);
        for i in 0..600 {
            let c = ctx(&track, i as f32 * DT, car.vehicle.s - 40.0, 30.0);
            AiController::update(&mut car, &c, DT, &mut rng);
        }
        assert!((car.vehicle.lane_offset - 30.0).abs() < 0.5);
    }

    #[test]
    fn blocking_ignores_distant_or_finished_player() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(4);
        let mut far = steady_car(&track, VehicleClass::Contender, 170.0);
        far.behavior.block_window.arm(1000.0);
        let mut done = far.clone();
        for i in 0..300 {
            let elapsed = i as f32 * DT;
            let c = ctx(&track, elapsed, far.vehicle.s + AiController::BLOCK_GAP + 50.0, 40.0);
            AiController::update(&mut far, &c, DT, &mut rng);

            let mut c = ctx(&track, elapsed, done.vehicle.s, 40.0);
            c.player_finished = true;
            AiController::update(&mut done, &c, DT, &mut rng);
        }
        let lean = AiController::CORNER_BIAS_LIMIT + 0.5;
        assert!(far.vehicle.lane_offset.abs() <= lean);
        assert!(done.vehicle.lane_offset.abs() <= lean);
    }

    #[test]
    fn block_target_is_clamped_and_never_overshoots() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(5);
        let mut car = steady_car(&track, VehicleClass::Contender, 170.0);
        car.profile.responsiveness = 100.0;
        car.behavior.block_window.arm(1000.0);

        let c = ctx(&track, 0.0, car.vehicle.s, 20.0);
        AiController::update(&mut car, &c, 0.1, &mut rng);
        assert!((car.vehicle.lane_offset - 20.0).abs() < 1e-4);

        let c = ctx(&track, 0.1, car.vehicle.s, 90.0);
        AiController::update(&mut car, &c, 0.1, &mut rng);
        assert!((car.vehicle.lane_offset - AiController::BLOCK_LANE_LIMIT).abs() < 1e-4);
    }

    #[test]
    fn lane_shift_stays_in_bounds() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(6);
        let mut car = AiCar::spawn("ai-2", VehicleClass::Filler, &track, 0.0, 0.0, &mut rng);
        car.profile.line_bias = 38.0;
        for i in 0..(60 * 60) {
            let c = ctx(&track, i as f32 * DT, 0.0, 0.0);
            AiController::update(&mut car, &c, DT, &mut rng);
            assert!(car.behavior.lane_shift_target.abs() <= 48.0);
            assert!(car.behavior.lane_shift.is_active());
        }
    }

    #[test]
    fn brake_caps_speed() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(8);
        let mut car = steady_car(&track, VehicleClass::Filler, 200.0);
        car.vehicle.brake.arm(0.8);
        AiController::update(&mut car, &ctx(&track, 0.0, 0.0, 0.0), DT, &mut rng);
        assert!((car.vehicle.speed - 200.0 * 0.58 * 0.9).abs() < 1e-3);

        car.vehicle.brake.clear();
        AiController::update(&mut car, &ctx(&track, 0.0, 0.0, 0.0), DT, &mut rng);
        assert!((car.vehicle.speed - 200.0).abs() < 1e-3);
    }

    #[test]
    fn one_lap_in_one_second() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(9);
        let mut car = steady_car(&track, VehicleClass::Filler, track.total_length());
        car.vehicle.s = 0.0;
        AiController::update(&mut car, &ctx(&track, 1.0, 0.0, 0.0), 1.0, &mut rng);
        assert_eq!(car.vehicle.laps_completed, 1);
    }

    #[test]
    fn finish_time_is_set_once() {
        let track = track();
        let mut rng = StdRng::seed_from_u64(10);
        let mut car = steady_car(&track, VehicleClass::Contender, 170.0);
        car.vehicle.distance_traveled = track.total_length() * 5.0 - 1.0;

        let finished = AiController::update(&mut car, &ctx(&track, 77.0, 0.0, 0.0), DT, &mut rng);
        assert!(finished);
        assert_eq!(car.vehicle.finish_time, Some(77.0));

        let s = car.vehicle.s;
        let finished = AiController::update(&mut car, &ctx(&track, 78.0, 0.0, 0.0), DT, &mut rng);
        assert!(!finished);
        assert_eq!(car.vehicle.finish_time, Some(77.0));
        assert!(car.vehicle.s > s);
    }
}
