//! Fixed timestep driver
//!
//! Accumulates real frame time and advances a simulation in whole fixed steps
//! so the outcome does not depend on frame rate.

use serde::{Deserialize, Serialize};

use crate::clamp;
use crate::consts::{MAX_FRAME_SECONDS, MAX_SUBSTEPS, SIM_DT};

/// Anything that advances by an explicit dt
pub trait Simulation {
    /// Advance by `dt` seconds. Implementations clamp dt themselves.
    fn step(&mut self, dt: f32);
}

/// Accumulator-based stepper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedStepDriver {
    pub fixed_dt: f32,
    pub max_frame_seconds: f32,
    pub max_substeps: u32,
    accumulator: f32,
}

impl Default for FixedStepDriver {
    fn default() -> Self {
        Self::new(SIM_DT)
    }
}

impl FixedStepDriver {
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(1e-4),
            max_frame_seconds: MAX_FRAME_SECONDS,
            max_substeps: MAX_SUBSTEPS,
            accumulator: 0.0,
        }
    }

    pub fn with_max_substeps(mut self, max_substeps: u32) -> Self {
        self.max_substeps = max_substeps.max(1);
        self
    }

    /// Feed one frame of real time, returning how many steps ran
    pub fn advance<S: Simulation + ?Sized>(&mut self, sim: &mut S, frame_seconds: f32) -> u32 {
        self.accumulator += clamp(frame_seconds, 0.0, self.max_frame_seconds);

        let mut substeps = 0;
        while self.accumulator >= self.fixed_dt && substeps < self.max_substeps {
            sim.step(self.fixed_dt);
            self.accumulator -= self.fixed_dt;
            substeps += 1;
        }

        // Drop the backlog instead of carrying it into the next frame
        if substeps == self.max_substeps {
            self.accumulator = self.accumulator.min(self.fixed_dt);
        }

        substeps
    }

    /// Leftover time as a fraction of one step, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }
}
