//! Race Core Module
//!
//! Track geometry and the per-frame car/AI simulation for a circuit race:
//! one player car against a field of autonomous cars on a closed spline.
//! Rendering, input capture and windowing live with the host.

pub mod ai;
pub mod collision;
pub mod error;
pub mod player;
pub mod race;
pub mod simulation;
pub mod snapshot;
pub mod track;
pub mod vehicle;

pub use ai::{AiCar, AiController};
pub use error::RaceError;
pub use player::{DriverInput, PlayerController};
pub use race::{RaceConfig, RaceSimulation, RaceStatus};
pub use simulation::{DriverState, FrameDriver};
pub use snapshot::RaceSnapshot;
pub use glam::Vec2;
pub use track::{TrackGeometry, TrackLayout};
pub use vehicle::{VehicleClass, VehicleState};
