//! Collision - Proximity contacts between cars
//!
//! Cars are circles for contact purposes. A contact arms a brake penalty,
//! nudges the lane offset and starts a cooldown; a car in cooldown cannot
//! register another contact until the cooldown has decayed to zero.

use glam::Vec2;
use rand::Rng;

use crate::race_core::ai::AiCar;
use crate::race_core::vehicle::VehicleState;

/// Contact detection and response
pub struct CollisionSystem;

impl CollisionSystem {
    pub const PLAYER_RADIUS: f32 = 19.0;
    pub const AI_RADIUS: f32 = 18.0;
    pub const COOLDOWN: f32 = 0.45;

    pub const PLAYER_BRAKE: f32 = 1.1;
    pub const PLAYER_SPEED_FACTOR: f32 = 0.65;
    pub const PLAYER_NUDGE: f32 = 16.0;

    pub const AI_BRAKE: f32 = 0.8;
    pub const AI_NUDGE: f32 = 7.0;

    /// Player against every AI car. Only the player is affected.
    ///
    /// Returns the number of impacts registered.
    pub fn resolve_player_contacts(
        player: &mut VehicleState,
        field: &[AiCar],
        rng: &mut impl Rng,
    ) -> u32 {
        if player.is_finished() {
            return 0;
        }

        let mut impacts = 0;
        for ai in field {
            if player.collision_cooldown.is_active() {
                break;
            }
            if ai.vehicle.collision_cooldown.is_active() {
                continue;
            }
            if !touching(player.position, ai.vehicle.position, Self::PLAYER_RADIUS) {
                continue;
            }

            let side = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
            player.brake.arm(Self::PLAYER_BRAKE);
            player.speed *= Self::PLAYER_SPEED_FACTOR;
            player.lane_offset += side * Self::PLAYER_NUDGE;
            player.collision_cooldown.arm(Self::COOLDOWN);
            impacts += 1;
            log::debug!("impact: player hit {}", ai.vehicle.id);
        }
        impacts
    }

    /// Every unordered pair of AI cars.
    ///
    /// Returns the number of contacts registered.
    pub fn resolve_field_contacts(field: &mut [AiCar], rng: &mut impl Rng) -> u32 {
        let mut contacts = 0;
        for i in 0..field.len() {
            let (head, tail) = field.split_at_mut(i + 1);
            let a = &mut head[i].vehicle;
            for other in tail.iter_mut() {
                let b = &mut other.vehicle;
                if a.collision_cooldown.is_active() || b.collision_cooldown.is_active() {
                    continue;
                }
                if !touching(a.position, b.position, Self::AI_RADIUS) {
                    continue;
                }

                for car in [&mut *a, &mut *b] {
                    car.brake.arm_at_least(Self::AI_BRAKE);
                    car.collision_cooldown.arm(Self::COOLDOWN);
                    car.lane_offset += rng.gen_range(-1.0f32..1.0) * Self::AI_NUDGE;
                }
                contacts += 1;
                log::debug!("contact: {} and {}", a.id, b.id);
            }
        }
        contacts
    }
}

fn touching(a: Vec2, b: Vec2, radius: f32) -> bool {
    a.distance_squared(b) < radius * radius
}
