//! Packet router variant
//!
//! A packet crosses a graph of network nodes toward a goal, visiting
//! required checkpoints on the way. Link costs react to congestion, player
//! pins and hazard tags; sniffers raise detection, and sustained detection
//! brings pursuers that drain integrity.

pub mod level;
pub mod route;
pub mod score;
pub mod selectors;
pub mod state;
pub mod tick;

pub use level::{EdgeId, EdgeTag, Level, LevelDefinition, LevelError, NodeId, NodeKind, network01};
pub use route::{Route, RouteOptions, find_route};
pub use score::{ScoreBreakdown, compute_score};
pub use state::{AbilityId, NetCommand, NetEvent, NetState, RunStatus};
pub use tick::step;
