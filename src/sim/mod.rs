//! Shared simulation plumbing
//!
//! Both game variants follow the same shape:
//! - Commands are enqueued by collaborators and drained once per step
//! - `step(dt)` is the only place simulation fields change
//! - Discrete occurrences land in a bounded event log
//! - A fixed-step driver decides when to step, never the sim itself

pub mod command;
pub mod driver;
pub mod event;

pub use command::CommandQueue;
pub use driver::{FixedStepDriver, Simulation};
pub use event::{EventLog, LoggedEvent};
