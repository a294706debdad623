//! Simulation - Frame driver around a race
//!
//! Hosts feed wall-clock frame deltas in; the driver clamps them and splits
//! them into small equal steps so the race stays numerically stable no
//! matter how irregular the host's frame rate is. Scripted runs can replay
//! an exact duration with `advance_time`.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::race_core::error::RaceError;
use crate::race_core::player::DriverInput;
use crate::race_core::race::RaceSimulation;
use crate::race_core::snapshot::RaceSnapshot;

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Running,
    Paused,
    /// The player has finished; only the camera still moves
    Finished,
}

/// Driver statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverStats {
    pub step_count: u64,
    pub avg_step_time_ms: f32,
    pub vehicle_count: u32,
    pub state: DriverState,
}

/// Fixed-step driver for a `RaceSimulation`
#[derive(Debug)]
pub struct FrameDriver {
    race: RaceSimulation,
    paused: bool,
    step_count: u64,
    /// Recent step costs in milliseconds
    step_times: VecDeque<f32>,
}

impl FrameDriver {
    /// Largest single simulation step (seconds)
    pub const MAX_STEP: f32 = 0.034;
    /// Longest frame accepted; anything beyond is dropped
    pub const MAX_FRAME_DT: f32 = 0.1;
    /// Step length used when replaying a duration
    pub const REPLAY_STEP_MS: f32 = 1000.0 / 60.0;
    const STATS_WINDOW: usize = 60;

    /// Wrap a race; the driver starts running
    pub fn new(race: RaceSimulation) -> Self {
        Self {
            race,
            paused: false,
            step_count: 0,
            step_times: VecDeque::with_capacity(Self::STATS_WINDOW),
        }
    }

    /// Get the driven race
    pub fn race(&self) -> &RaceSimulation {
        &self.race
    }

    pub fn race_mut(&mut self) -> &mut RaceSimulation {
        &mut self.race
    }

    /// Set the player's intents
    pub fn set_input(&mut self, input: DriverInput) {
        self.race.set_input(input);
    }

    /// Advance by one host frame. Returns the number of steps run.
    pub fn frame(&mut self, dt: f32) -> usize {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("ignoring invalid frame delta {dt}");
            return 0;
        }
        if self.paused || dt == 0.0 {
            return 0;
        }

        let dt = dt.min(Self::MAX_FRAME_DT);
        let steps = ((dt / Self::MAX_STEP).ceil() as usize).max(1);
        let step = dt / steps as f32;
        for _ in 0..steps {
            self.step(step);
        }
        steps
    }

    /// Replay `ms` milliseconds in equal steps of about 1/60 s.
    ///
    /// Runs even while paused; this is the scripted-inspection entry point.
    pub fn advance_time(&mut self, ms: f32) -> usize {
        if !ms.is_finite() || ms < 0.0 {
            log::warn!("ignoring invalid replay duration {ms}ms");
            return 0;
        }

        let steps = ((ms / Self::REPLAY_STEP_MS).round() as usize).max(1);
        let dt = ms / steps as f32 / 1000.0;
        for _ in 0..steps {
            self.step(dt);
        }
        steps
    }

    fn step(&mut self, dt: f32) {
        let started = Instant::now();
        self.race.update(dt);

        self.step_count += 1;
        self.step_times
            .push_back(started.elapsed().as_secs_f32() * 1000.0);
        if self.step_times.len() > Self::STATS_WINDOW {
            self.step_times.pop_front();
        }
    }

    /// Pause frame stepping
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume frame stepping
    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Rebuild the race; the driver resumes running
    pub fn reset(&mut self) -> Result<(), RaceError> {
        self.race.reset()?;
        self.clear_stats();
        log::info!("Race reset");
        Ok(())
    }

    pub fn reset_with_seed(&mut self, seed: u64) -> Result<(), RaceError> {
        self.race.reset_with_seed(seed)?;
        self.clear_stats();
        log::info!("Race reset with seed {seed}");
        Ok(())
    }

    fn clear_stats(&mut self) {
        self.paused = false;
        self.step_count = 0;
        self.step_times.clear();
    }

    /// Get current driver state
    pub fn state(&self) -> DriverState {
        if self.race.is_finished() {
            DriverState::Finished
        } else if self.paused {
            DriverState::Paused
        } else {
            DriverState::Running
        }
    }

    /// Get driver statistics
    pub fn stats(&self) -> DriverStats {
        let avg_step_time_ms = if self.step_times.is_empty() {
            0.0
        } else {
            self.step_times.iter().sum::<f32>() / self.step_times.len() as f32
        };

        DriverStats {
            step_count: self.step_count,
            avg_step_time_ms,
            vehicle_count: self.race.field().len() as u32 + 1,
            state: self.state(),
        }
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        self.race.snapshot()
    }
}
