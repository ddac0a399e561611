//! Read-only projections of `NetState` for rendering, audio and HUD
//!
//! Every selector is total over a well-formed state: missing references fall
//! back to neutral values instead of panicking.

use glam::Vec3;
use serde::Serialize;

use super::level::{EdgeId, LevelNode, NodeId};
use super::score::ScoreBreakdown;
use super::state::{AbilityId, NetEvent, NetState, RunStatus};
use crate::mix_vec3;
use crate::sim::LoggedEvent;

pub fn node_by_id<'a>(state: &'a NetState, id: &NodeId) -> Option<&'a LevelNode> {
    state.level.node(id)
}

pub fn node_position(state: &NetState, id: &NodeId) -> Option<Vec3> {
    state.level.node(id).map(|n| n.position)
}

/// Packet position, interpolated along the edge while traversing
pub fn packet_world_position(state: &NetState) -> Vec3 {
    let Some(traversal) = &state.packet.traversal else {
        return node_position(state, &state.packet.current_node).unwrap_or(Vec3::ZERO);
    };

    match (
        node_position(state, &traversal.from),
        node_position(state, &traversal.to),
    ) {
        (Some(from), Some(to)) => mix_vec3(from, to, traversal.progress.clamp(0.0, 1.0)),
        _ => Vec3::ZERO,
    }
}

/// First unvisited required checkpoint, or the goal once all are visited
pub fn current_objective_node_id(state: &NetState) -> &NodeId {
    state
        .level
        .required_checkpoint_ids()
        .iter()
        .find(|id| !state.world.visited_checkpoints.contains(id))
        .unwrap_or(state.level.goal_node_id())
}

pub fn has_all_required_checkpoints(state: &NetState) -> bool {
    state
        .level
        .required_checkpoint_ids()
        .iter()
        .all(|id| state.world.visited_checkpoints.contains(id))
}

/// Points from the packet along the planned route
///
/// Empty when there is no plan and the packet is idle.
pub fn route_polyline(state: &NetState) -> Vec<Vec3> {
    let route = &state.routing.route_nodes;

    if let Some(traversal) = &state.packet.traversal {
        let mut points = vec![packet_world_position(state)];
        points.extend(node_position(state, &traversal.to));
        // route_nodes[0] is the traversal target, already pushed
        points.extend(route.iter().skip(1).filter_map(|id| node_position(state, id)));
        return points;
    }

    if route.len() < 2 {
        return Vec::new();
    }
    route.iter().filter_map(|id| node_position(state, id)).collect()
}

pub fn is_ability_ready(state: &NetState, ability: AbilityId) -> bool {
    state.abilities.get(ability).cooldown_remaining <= 0.0
}

pub fn is_ability_active(state: &NetState, ability: AbilityId) -> bool {
    state.abilities.get(ability).active_remaining > 0.0
}

/// HUD line for one ability
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbilityReadout {
    pub ability: AbilityId,
    pub ready: bool,
    pub active: bool,
    pub cooldown_remaining: f32,
    pub active_remaining: f32,
    /// 1.0 when ready, rising from 0.0 right after use
    pub charge: f32,
}

pub fn ability_readouts(state: &NetState) -> Vec<AbilityReadout> {
    AbilityId::ALL
        .into_iter()
        .map(|ability| {
            let runtime = state.abilities.get(ability);
            let cooldown = state.balance.abilities.get(ability).cooldown;
            AbilityReadout {
                ability,
                ready: is_ability_ready(state, ability),
                active: is_ability_active(state, ability),
                cooldown_remaining: runtime.cooldown_remaining,
                active_remaining: runtime.active_remaining,
                charge: (1.0 - runtime.cooldown_remaining / cooldown).clamp(0.0, 1.0),
            }
        })
        .collect()
}

/// Load on every congestion-tagged edge, in level order
pub fn congestion_levels(state: &NetState) -> impl Iterator<Item = (&EdgeId, f32)> {
    state.world.congestion.iter().map(|(id, load)| (id, *load))
}

pub fn is_edge_pinned(state: &NetState, edge: &EdgeId) -> bool {
    state.routing.pinned_edges.contains(edge)
}

/// Events newer than the caller's cursor
pub fn events_since(state: &NetState, last_seen_id: u64) -> impl Iterator<Item = &LoggedEvent<NetEvent>> {
    state.events.since(last_seen_id)
}

/// Compact run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetHud {
    pub status: RunStatus,
    pub elapsed_seconds: f32,
    pub integrity: f32,
    pub detection_level: f32,
    pub pursuers_active: bool,
    pub objective: NodeId,
    pub checkpoints_visited: usize,
    pub checkpoints_required: usize,
    pub tokens_collected: usize,
    pub reroutes: u32,
    pub score: Option<ScoreBreakdown>,
}

pub fn hud(state: &NetState) -> NetHud {
    NetHud {
        status: state.run.status,
        elapsed_seconds: state.run.elapsed_seconds,
        integrity: state.packet.integrity,
        detection_level: state.world.detection_level,
        pursuers_active: state.world.pursuers_active,
        objective: current_objective_node_id(state).clone(),
        checkpoints_visited: state.world.visited_checkpoints.len(),
        checkpoints_required: state.level.required_checkpoint_ids().len(),
        tokens_collected: state.world.collected_tokens.len(),
        reroutes: state.run.reroute_count,
        score: state.run.score,
    }
}
