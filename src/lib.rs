//! Circuit Racer - Simulation core
//!
//! Builds the circuit, advances the player and AI cars each frame, resolves
//! contacts and keeps race standings. Hosts drive it through `FrameDriver`
//! (or `RaceSimulation::update` directly) and read back `RaceSnapshot`s.

pub mod race_core;

pub use race_core::{
    AiCar, AiController, DriverInput, DriverState, FrameDriver, PlayerController, RaceConfig,
    RaceError, RaceSimulation, RaceSnapshot, RaceStatus, TrackGeometry, TrackLayout, Vec2,
    VehicleClass, VehicleState,
};
