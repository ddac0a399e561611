//! Endless runner state and core types
//!
//! The track is append-only: tiles, obstacles and tokens keep their index
//! and id for the whole run. Visibility windows are computed by the
//! selectors, never by removing entries.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::track;
use crate::sim::{CommandQueue, EventLog};
use crate::tuning::RunnerBalance;

/// One of the three discrete lanes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Left,
    #[default]
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Signed lane index: -1, 0 or 1
    pub fn offset(self) -> f32 {
        match self {
            Lane::Left => -1.0,
            Lane::Center => 0.0,
            Lane::Right => 1.0,
        }
    }

    /// Neighbouring lane toward `direction`, saturating at the edges
    pub fn shifted(self, direction: TurnDirection) -> Lane {
        match (self, direction) {
            (Lane::Left, TurnDirection::Left) | (Lane::Center, TurnDirection::Left) => Lane::Left,
            (Lane::Right, TurnDirection::Right) | (Lane::Center, TurnDirection::Right) => Lane::Right,
            (Lane::Left, TurnDirection::Right) | (Lane::Right, TurnDirection::Left) => Lane::Center,
        }
    }
}

/// Compass heading of a tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    /// +Z
    #[default]
    North,
    /// +X
    East,
    /// -Z
    South,
    /// -X
    West,
}

impl Heading {
    /// Unit vector along the tile
    pub fn forward(self) -> Vec3 {
        match self {
            Heading::North => Vec3::Z,
            Heading::East => Vec3::X,
            Heading::South => Vec3::NEG_Z,
            Heading::West => Vec3::NEG_X,
        }
    }

    /// Unit vector toward the right-hand lane
    pub fn right(self) -> Vec3 {
        match self {
            Heading::North => Vec3::X,
            Heading::East => Vec3::NEG_Z,
            Heading::South => Vec3::NEG_X,
            Heading::West => Vec3::Z,
        }
    }

    /// Heading after a 90 degree turn
    pub fn rotated(self, turn: TurnDirection) -> Heading {
        use Heading::*;
        match (turn, self) {
            (TurnDirection::Right, North) => East,
            (TurnDirection::Right, East) => South,
            (TurnDirection::Right, South) => West,
            (TurnDirection::Right, West) => North,
            (TurnDirection::Left, North) => West,
            (TurnDirection::Left, West) => South,
            (TurnDirection::Left, South) => East,
            (TurnDirection::Left, East) => North,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

/// A straight stretch of track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerTile {
    pub id: u32,
    pub start: Vec3,
    pub heading: Heading,
    pub length: f32,
    /// Junction at the end of this tile
    pub required_turn: Option<TurnDirection>,
}

impl RunnerTile {
    pub fn end(&self) -> Vec3 {
        self.start + self.heading.forward() * self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    /// Cleared by jumping
    Firewall,
    /// Cleared by sliding
    Sniffer,
    /// Only avoided by changing lane
    Congestion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub tile_index: usize,
    pub lane: Lane,
    /// Distance from the tile start
    pub offset: f32,
    pub kind: ObstacleKind,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: u32,
    pub tile_index: usize,
    pub lane: Lane,
    pub offset: f32,
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub lane_target: Lane,
    /// Eased toward `lane_target`, in lane units
    pub lane_position: f32,
    pub height: f32,
    pub vertical_velocity: f32,
    pub slide_remaining: f32,
    pub integrity: u32,
    pub invulnerable_remaining: f32,
}

impl Player {
    fn new(integrity: u32) -> Self {
        Self {
            lane_target: Lane::Center,
            lane_position: 0.0,
            height: 0.0,
            vertical_velocity: 0.0,
            slide_remaining: 0.0,
            integrity,
            invulnerable_remaining: 0.0,
        }
    }

    pub fn is_sliding(&self) -> bool {
        self.slide_remaining > 0.0
    }
}

/// Generated track plus the generator's cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub tiles: Vec<RunnerTile>,
    pub current_tile_index: usize,
    pub distance_in_tile: f32,
    pub queued_turn: Option<TurnDirection>,
    /// Derived each step: inside the current junction's decision window
    pub decision_open: bool,
    /// LCG state; advances with every random draw
    pub seed: u32,
    pub next_tile_id: u32,
    pub next_obstacle_id: u32,
    pub next_token_id: u32,
    pub next_turn_in: i32,
    pub generation_cursor: Vec3,
    pub generation_heading: Heading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    Running,
    Paused,
    /// Terminal; the endless mode has no success state
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerRun {
    pub status: RunnerStatus,
    pub elapsed_seconds: f32,
    pub distance: f32,
    pub speed: f32,
    pub score: f32,
    pub tokens: u32,
    pub collisions: u32,
    pub top_speed: f32,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunnerCommand {
    MoveLeft,
    MoveRight,
    Jump,
    Slide,
    PauseRun,
    ResumeRun,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunnerEvent {
    LaneChange { lane: Lane },
    Jump,
    Slide,
    Token,
    Turn { direction: TurnDirection },
    Collision { obstacle: ObstacleKind },
    GameOver { reason: String },
}

/// Complete runner state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerState {
    pub balance: RunnerBalance,
    pub player: Player,
    pub track: Track,
    pub obstacles: Vec<Obstacle>,
    pub tokens: Vec<Token>,
    pub run: RunnerRun,
    pub time_seconds: f32,
    pub events: EventLog<RunnerEvent>,
    #[serde(skip)]
    commands: CommandQueue<RunnerCommand>,
}

impl RunnerState {
    /// New run with the initial track already generated from `seed`
    pub fn new(seed: u32, balance: RunnerBalance) -> Self {
        Self::with_queue(seed, balance, CommandQueue::new())
    }

    /// New run seeded from the balance table's default seed
    pub fn with_default_seed(balance: RunnerBalance) -> Self {
        let seed = balance.default_seed;
        Self::new(seed, balance)
    }

    fn with_queue(seed: u32, balance: RunnerBalance, commands: CommandQueue<RunnerCommand>) -> Self {
        let mut state = Self {
            player: Player::new(balance.max_integrity),
            track: Track {
                tiles: Vec::new(),
                current_tile_index: 0,
                distance_in_tile: 0.0,
                queued_turn: None,
                decision_open: false,
                seed,
                next_tile_id: 0,
                next_obstacle_id: 0,
                next_token_id: 0,
                next_turn_in: balance.first_turn_in,
                generation_cursor: Vec3::ZERO,
                generation_heading: Heading::North,
            },
            obstacles: Vec::new(),
            tokens: Vec::new(),
            run: RunnerRun {
                status: RunnerStatus::Running,
                elapsed_seconds: 0.0,
                distance: 0.0,
                speed: balance.base_speed,
                score: 0.0,
                tokens: 0,
                collisions: 0,
                top_speed: balance.base_speed,
                failure_reason: None,
            },
            time_seconds: 0.0,
            events: EventLog::new(balance.event_buffer_size),
            commands,
            balance,
        };

        track::bootstrap(&mut state);
        log::info!(
            "Runner created with seed {seed} ({} tiles, {} obstacles, {} tokens)",
            state.track.tiles.len(),
            state.obstacles.len(),
            state.tokens.len()
        );
        state
    }

    /// Restart from `seed`, keeping queue handles valid. Pending commands are
    /// discarded.
    pub fn reset(&mut self, seed: u32) {
        let commands = self.commands.clone();
        commands.clear();
        *self = Self::with_queue(seed, self.balance.clone(), commands);
    }

    pub fn commands(&self) -> CommandQueue<RunnerCommand> {
        self.commands.clone()
    }

    pub fn enqueue(&self, command: RunnerCommand) {
        self.commands.enqueue(command);
    }

    pub(crate) fn drain_commands(&self) -> Vec<RunnerCommand> {
        self.commands.drain()
    }

    pub(crate) fn push_event(&mut self, kind: RunnerEvent) {
        self.events.push(self.time_seconds, kind);
    }

    /// Tile the player is on. Generation keeps it populated.
    pub fn current_tile(&self) -> Option<&RunnerTile> {
        self.track.tiles.get(self.track.current_tile_index)
    }
}
