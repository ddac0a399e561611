//! Scripted input for headless runs
//!
//! Autopilots only read selectors and write commands, the same as a human
//! input layer would.

use crate::net::selectors::{current_objective_node_id, is_ability_ready};
use crate::net::state::{AbilityId, NetCommand, NetState};
use crate::net::{EdgeTag, NodeId};
use crate::runner::selectors::pending_turn;
use crate::runner::state::{Lane, ObstacleKind, RunnerCommand, RunnerState, TurnDirection};

/// Steers the packet from objective to objective
#[derive(Debug, Default)]
pub struct NetAutopilot {
    last_objective: Option<NodeId>,
}

impl NetAutopilot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drive(&mut self, state: &NetState) {
        let objective = current_objective_node_id(state);
        if self.last_objective.as_ref() != Some(objective) {
            state.enqueue(NetCommand::SetDestination {
                node: objective.clone(),
            });
            self.last_objective = Some(objective.clone());
        }

        let on_firewall = state
            .packet
            .traversal
            .as_ref()
            .and_then(|t| state.level.edge(&t.edge_id))
            .is_some_and(|edge| edge.has_tag(EdgeTag::Firewall));
        if (on_firewall || state.world.pursuers_active) && is_ability_ready(state, AbilityId::Encrypt) {
            state.enqueue(NetCommand::UseAbility {
                ability: AbilityId::Encrypt,
            });
        }

        if state.world.detection_level > 0.4 * state.balance.pursuer_threshold
            && is_ability_ready(state, AbilityId::Decoy)
        {
            state.enqueue(NetCommand::UseAbility {
                ability: AbilityId::Decoy,
            });
        }
    }
}

/// Seconds of lead before a firewall when the jump starts
const JUMP_LEAD_SECONDS: f32 = 0.35;
/// Seconds of lead before a sniffer when the slide starts
const SLIDE_LEAD_SECONDS: f32 = 0.3;
/// Seconds of lead before congestion when the lane change starts
const DODGE_LEAD_SECONDS: f32 = 0.6;

/// Takes junction turns and clears obstacles on the current tile
#[derive(Debug, Default)]
pub struct RunnerAutopilot;

impl RunnerAutopilot {
    pub fn new() -> Self {
        Self
    }

    pub fn drive(&mut self, state: &RunnerState) {
        if let Some(turn) = pending_turn(state) {
            if state.track.queued_turn != Some(turn) {
                state.enqueue(steer_command(turn));
            }
            // Left/right are turns inside the window, so no dodging here
            return;
        }

        let speed = state.run.speed;
        let current = state.track.current_tile_index;
        let distance = state.track.distance_in_tile;
        let lane = state.player.lane_target;

        let threat = state
            .obstacles
            .iter()
            .filter(|o| !o.resolved && o.tile_index == current && o.lane == lane)
            .map(|o| (o.kind, o.offset - distance))
            .filter(|(_, ahead)| *ahead > 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((kind, ahead)) = threat else {
            return;
        };

        match kind {
            ObstacleKind::Firewall if ahead <= speed * JUMP_LEAD_SECONDS => {
                state.enqueue(RunnerCommand::Jump);
            }
            ObstacleKind::Sniffer if ahead <= speed * SLIDE_LEAD_SECONDS => {
                state.enqueue(RunnerCommand::Slide);
            }
            ObstacleKind::Congestion if ahead <= speed * DODGE_LEAD_SECONDS => {
                if let Some(direction) = free_side(state, lane) {
                    state.enqueue(steer_command(direction));
                }
            }
            _ => {}
        }
    }
}

fn steer_command(direction: TurnDirection) -> RunnerCommand {
    match direction {
        TurnDirection::Left => RunnerCommand::MoveLeft,
        TurnDirection::Right => RunnerCommand::MoveRight,
    }
}

/// A neighbouring lane with nothing unresolved on the current tile
fn free_side(state: &RunnerState, lane: Lane) -> Option<TurnDirection> {
    let current = state.track.current_tile_index;
    [TurnDirection::Left, TurnDirection::Right]
        .into_iter()
        .filter(|direction| lane.shifted(*direction) != lane)
        .find(|direction| {
            let target = lane.shifted(*direction);
            !state
                .obstacles
                .iter()
                .any(|o| !o.resolved && o.tile_index == current && o.lane == target)
        })
}
