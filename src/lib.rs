//! Signal Runner - deterministic simulation core
//!
//! Core modules:
//! - `sim`: Shared plumbing (command queue, bounded event log, fixed-step driver)
//! - `net`: Packet router on a weighted network graph
//! - `runner`: Procedurally generated endless lane runner
//! - `tuning`: Data-driven game balance
//! - `settings`: Headless driver settings
//! - `autopilot`: Scripted input for headless runs
//!
//! Rendering, audio, input mapping and HUD live outside this crate. They read
//! state through the `selectors` modules and write commands into the queue.

pub mod autopilot;
pub mod net;
pub mod runner;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{Settings, Variant};
pub use sim::{CommandQueue, EventLog, FixedStepDriver, LoggedEvent, Simulation};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Largest dt a single step will accept (tab-backgrounding guard)
    pub const MAX_FRAME_SECONDS: f32 = 0.125;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Default ring size for the event log
    pub const EVENT_BUFFER_SIZE: usize = 48;
}

/// Clamp `value` into `[min, max]`
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Linear interpolation from `a` to `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Euclidean distance between two points
#[inline]
pub fn distance3(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

/// Component-wise blend between two points
#[inline]
pub fn mix_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    Vec3::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t), lerp(a.z, b.z, t))
}
