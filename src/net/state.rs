//! Packet router state and core types
//!
//! Everything a run needs lives in `NetState`. It is created from a level
//! and a balance table, mutated only by `tick::step`, and read by the
//! selectors.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::level::{EdgeId, EdgeTag, Level, NodeId};
use super::score::ScoreBreakdown;
use crate::sim::{CommandQueue, EventLog};
use crate::tuning::NetBalance;

/// Player abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbilityId {
    /// Reduces incoming damage
    Encrypt,
    /// Diverts scanner focus, reducing detection gain
    Decoy,
    /// Faster movement at higher detection risk
    Burst,
}

impl AbilityId {
    pub const ALL: [AbilityId; 3] = [AbilityId::Encrypt, AbilityId::Decoy, AbilityId::Burst];

    pub fn label(&self) -> &'static str {
        match self {
            AbilityId::Encrypt => "Encrypt",
            AbilityId::Decoy => "Decoy",
            AbilityId::Burst => "Burst",
        }
    }
}

/// Countdown timers for one ability
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityRuntime {
    pub cooldown_remaining: f32,
    pub active_remaining: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Abilities {
    pub encrypt: AbilityRuntime,
    pub decoy: AbilityRuntime,
    pub burst: AbilityRuntime,
}

impl Abilities {
    pub fn get(&self, ability: AbilityId) -> &AbilityRuntime {
        match ability {
            AbilityId::Encrypt => &self.encrypt,
            AbilityId::Decoy => &self.decoy,
            AbilityId::Burst => &self.burst,
        }
    }

    pub fn get_mut(&mut self, ability: AbilityId) -> &mut AbilityRuntime {
        match ability {
            AbilityId::Encrypt => &mut self.encrypt,
            AbilityId::Decoy => &mut self.decoy,
            AbilityId::Burst => &mut self.burst,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AbilityRuntime> {
        [&mut self.encrypt, &mut self.decoy, &mut self.burst].into_iter()
    }
}

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Paused,
    Success,
    Failed,
}

impl RunStatus {
    /// Success and failure can only be left through a reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

/// An edge being crossed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    pub edge_id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    /// Fraction of the edge covered, in [0, 1]
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub current_node: NodeId,
    pub traversal: Option<Traversal>,
    pub integrity: f32,
}

/// Player routing intent and the current plan
///
/// `route_nodes[0]` is always the anchor: the current node, or the node the
/// packet is heading to while mid-edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    pub destination: Option<NodeId>,
    pub route_nodes: Vec<NodeId>,
    pub route_edges: Vec<EdgeId>,
    pub pinned_edges: BTreeSet<EdgeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Load per congestion-tagged edge, in [0, max_congestion]
    pub congestion: BTreeMap<EdgeId, f32>,
    pub detection_level: f32,
    /// Derived each step from `detection_level`
    pub pursuers_active: bool,
    pub visited_checkpoints: Vec<NodeId>,
    pub collected_tokens: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub status: RunStatus,
    pub elapsed_seconds: f32,
    pub latency_penalty: f32,
    pub reroute_count: u32,
    pub destination_set_count: u32,
    pub took_damage: bool,
    pub next_network_unlocked: bool,
    /// Frozen on the terminal transition
    pub score: Option<ScoreBreakdown>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            status: RunStatus::Running,
            elapsed_seconds: 0.0,
            latency_penalty: 0.0,
            reroute_count: 0,
            destination_set_count: 0,
            took_damage: false,
            next_network_unlocked: false,
            score: None,
        }
    }
}

/// Commands collaborators can enqueue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetCommand {
    SetDestination { node: NodeId },
    TogglePin { edge: EdgeId },
    UseAbility { ability: AbilityId },
    PauseRun,
    ResumeRun,
}

/// Discrete occurrences for audio/HUD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetEvent {
    Ability { ability: AbilityId },
    Reroute { destination: NodeId },
    Pin { edge: EdgeId, pinned: bool },
    Checkpoint { node: NodeId },
    Token { node: NodeId },
    Success { total: u32 },
    Failure,
}

/// Complete router run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetState {
    pub level: Level,
    pub balance: NetBalance,
    pub packet: Packet,
    pub routing: Routing,
    pub world: World,
    pub abilities: Abilities,
    pub run: RunStats,
    /// Simulation clock; only advances while running
    pub time_seconds: f32,
    pub events: EventLog<NetEvent>,
    #[serde(skip)]
    commands: CommandQueue<NetCommand>,
}

impl NetState {
    /// Fresh run at the level's start node
    pub fn new(level: Level, balance: NetBalance) -> Self {
        Self::with_queue(level, balance, CommandQueue::new())
    }

    fn with_queue(level: Level, balance: NetBalance, commands: CommandQueue<NetCommand>) -> Self {
        let start = level.start_node_id().clone();

        let congestion = level
            .edges()
            .iter()
            .filter(|e| e.has_tag(EdgeTag::Congestion))
            .map(|e| (e.id.clone(), 0.0))
            .collect();

        log::info!("Network run created on level `{}`", level.id());

        Self {
            packet: Packet {
                current_node: start.clone(),
                traversal: None,
                integrity: balance.max_integrity,
            },
            routing: Routing {
                destination: None,
                route_nodes: vec![start],
                route_edges: Vec::new(),
                pinned_edges: BTreeSet::new(),
            },
            world: World {
                congestion,
                detection_level: 0.0,
                pursuers_active: false,
                visited_checkpoints: Vec::new(),
                collected_tokens: Vec::new(),
            },
            abilities: Abilities::default(),
            run: RunStats::default(),
            time_seconds: 0.0,
            events: EventLog::new(balance.event_buffer_size),
            commands,
            level,
            balance,
        }
    }

    /// Replace the run wholesale. Existing queue handles stay valid but any
    /// pending commands are discarded.
    pub fn reset(&mut self) {
        let commands = self.commands.clone();
        commands.clear();
        *self = Self::with_queue(self.level.clone(), self.balance.clone(), commands);
    }

    /// Producer handle for input handlers on any thread
    pub fn commands(&self) -> CommandQueue<NetCommand> {
        self.commands.clone()
    }

    pub fn enqueue(&self, command: NetCommand) {
        self.commands.enqueue(command);
    }

    pub(crate) fn drain_commands(&self) -> Vec<NetCommand> {
        self.commands.drain()
    }

    pub(crate) fn push_event(&mut self, kind: NetEvent) {
        self.events.push(self.time_seconds, kind);
    }
}
