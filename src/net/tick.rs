//! Packet router step function
//!
//! One call advances the run by `dt` seconds:
//! 1. Drain and apply queued commands
//! 2. Skip time-based work unless running
//! 3. Advance clocks, ability timers and congestion
//! 4. Move the packet along its edge, resolving arrivals
//! 5. Update detection and pursuit damage
//!
//! Nothing in here returns an error. Bad targets are ignored, unreachable
//! destinations leave an anchored empty plan, and a traversal whose edge
//! vanished is dropped.

use super::level::{EdgeTag, NodeId, NodeKind};
use super::route::{CostWeights, RouteOptions, find_route};
use super::score::compute_score;
use super::selectors::{
    current_objective_node_id, has_all_required_checkpoints, is_ability_active,
    packet_world_position,
};
use super::state::{AbilityId, NetCommand, NetEvent, NetState, RunStatus, Traversal};
use crate::sim::Simulation;
use crate::{clamp, distance3};

impl Simulation for NetState {
    fn step(&mut self, dt: f32) {
        step(self, dt);
    }
}

/// Advance the run by `dt_seconds` (clamped to the balance's max frame)
pub fn step(state: &mut NetState, dt_seconds: f32) {
    let dt = clamp(dt_seconds, 0.0, state.balance.max_frame_seconds);

    process_commands(state);

    if state.run.status == RunStatus::Running {
        state.time_seconds += dt;
        state.run.elapsed_seconds += dt;

        tick_ability_timers(state, dt);
        tick_congestion(state, dt);
        tick_traversal(state, dt);
        begin_next_traversal(state);
        update_detection(state, dt);
    }

    if state.run.status == RunStatus::Failed {
        state.routing.destination = None;
        state.routing.route_nodes = vec![route_anchor(state)];
        state.routing.route_edges.clear();
    }
}

fn process_commands(state: &mut NetState) {
    for command in state.drain_commands() {
        process_command(state, command);
    }
}

fn process_command(state: &mut NetState, command: NetCommand) {
    match command {
        NetCommand::SetDestination { node } => set_destination(state, node),
        NetCommand::TogglePin { edge } => {
            if state.run.status.is_terminal() {
                return;
            }
            if state.level.edge(&edge).is_none() {
                log::debug!("Ignoring pin toggle for unknown edge `{edge}`");
                return;
            }

            let pinned = if state.routing.pinned_edges.remove(&edge) {
                false
            } else {
                state.routing.pinned_edges.insert(edge.clone());
                true
            };
            log::debug!("Edge `{edge}` pinned: {pinned}");
            state.push_event(NetEvent::Pin { edge, pinned });

            recalculate_route(state);
            begin_next_traversal(state);
        }
        NetCommand::UseAbility { ability } => activate_ability(state, ability),
        NetCommand::PauseRun => {
            if state.run.status == RunStatus::Running {
                state.run.status = RunStatus::Paused;
            }
        }
        NetCommand::ResumeRun => {
            if state.run.status == RunStatus::Paused {
                state.run.status = RunStatus::Running;
            }
        }
    }
}

fn set_destination(state: &mut NetState, node: NodeId) {
    if state.run.status.is_terminal() {
        return;
    }
    if state.level.node(&node).is_none() {
        log::debug!("Ignoring destination `{node}`: no such node");
        return;
    }

    let previous = state.routing.destination.as_ref();
    if previous.is_some_and(|p| p != &node) {
        state.run.reroute_count += 1;
        log::debug!("Reroute #{} toward `{node}`", state.run.reroute_count);
        state.push_event(NetEvent::Reroute {
            destination: node.clone(),
        });
    }
    if state.routing.destination.as_ref() != Some(&node) {
        state.run.destination_set_count += 1;
    }

    state.routing.destination = Some(node);
    recalculate_route(state);
    begin_next_traversal(state);
}

fn activate_ability(state: &mut NetState, ability: AbilityId) {
    if state.run.status != RunStatus::Running {
        return;
    }
    let def = state.balance.abilities.get(ability);
    let runtime = state.abilities.get_mut(ability);
    if runtime.cooldown_remaining > 0.0 {
        return;
    }

    runtime.cooldown_remaining = def.cooldown;
    runtime.active_remaining = def.duration;
    log::debug!("{} activated", ability.label());
    state.push_event(NetEvent::Ability { ability });
}

/// The node a new plan starts from: where the packet is, or where it is
/// committed to arriving
fn route_anchor(state: &NetState) -> NodeId {
    match &state.packet.traversal {
        Some(traversal) => traversal.to.clone(),
        None => state.packet.current_node.clone(),
    }
}

fn recalculate_route(state: &mut NetState) {
    let anchor = route_anchor(state);

    let Some(destination) = state.routing.destination.clone() else {
        state.routing.route_nodes = vec![anchor];
        state.routing.route_edges.clear();
        return;
    };

    let options = RouteOptions {
        pinned: &state.routing.pinned_edges,
        congestion: &state.world.congestion,
        weights: CostWeights::from(&state.balance),
    };

    match find_route(&state.level, &anchor, &destination, &options) {
        Some(route) => {
            state.routing.route_nodes = route.nodes;
            state.routing.route_edges = route.edges;
        }
        None => {
            log::debug!("No route from `{anchor}` to `{destination}`");
            state.routing.route_nodes = vec![anchor];
            state.routing.route_edges.clear();
        }
    }
}

/// Commit to the head of the route if the packet is idle on its first node
fn begin_next_traversal(state: &mut NetState) {
    if state.run.status != RunStatus::Running || state.packet.traversal.is_some() {
        return;
    }

    let routing = &mut state.routing;
    if routing.route_nodes.len() < 2 || routing.route_edges.is_empty() {
        return;
    }
    if routing.route_nodes[0] != state.packet.current_node {
        return;
    }

    let from = routing.route_nodes.remove(0);
    let to = routing.route_nodes[0].clone();
    let edge_id = routing.route_edges.remove(0);

    state.packet.traversal = Some(Traversal {
        edge_id,
        from,
        to,
        progress: 0.0,
    });
}

fn tick_ability_timers(state: &mut NetState, dt: f32) {
    for runtime in state.abilities.iter_mut() {
        runtime.cooldown_remaining = (runtime.cooldown_remaining - dt).max(0.0);
        runtime.active_remaining = (runtime.active_remaining - dt).max(0.0);
    }
}

fn tick_congestion(state: &mut NetState, dt: f32) {
    let balance = &state.balance;
    let moving_on = state.packet.traversal.as_ref().map(|t| &t.edge_id);

    for (edge_id, load) in state.world.congestion.iter_mut() {
        let travel = if moving_on == Some(edge_id) {
            balance.congestion_travel_growth_per_second * dt
        } else {
            0.0
        };
        *load = clamp(
            *load + balance.congestion_global_growth_per_second * dt + travel
                - balance.congestion_decay_per_second * dt,
            0.0,
            balance.max_congestion,
        );
    }
}

fn apply_damage(state: &mut NetState, amount: f32) {
    if state.run.status != RunStatus::Running || amount <= 0.0 {
        return;
    }

    let mitigated = if is_ability_active(state, AbilityId::Encrypt) {
        amount * state.balance.encrypt_damage_multiplier
    } else {
        amount
    };

    if mitigated > 0.0 {
        state.run.took_damage = true;
        state.packet.integrity = clamp(
            state.packet.integrity - mitigated,
            0.0,
            state.balance.max_integrity,
        );
    }

    if state.packet.integrity <= 0.0 {
        state.run.status = RunStatus::Failed;
        let score = compute_score(state, false);
        state.run.score = Some(score);
        log::info!(
            "Run failed at {:.1}s: integrity depleted (score {})",
            state.run.elapsed_seconds,
            score.total
        );
        state.push_event(NetEvent::Failure);
    }
}

fn tick_traversal(state: &mut NetState, dt: f32) {
    let Some(traversal) = &state.packet.traversal else {
        return;
    };
    let Some(edge) = state.level.edge(&traversal.edge_id) else {
        log::warn!("Dropping traversal on unknown edge `{}`", traversal.edge_id);
        state.packet.traversal = None;
        return;
    };

    let balance = &state.balance;
    let base_cost = edge.base_cost;
    let firewall = edge.has_tag(EdgeTag::Firewall);
    let load = edge
        .has_tag(EdgeTag::Congestion)
        .then(|| state.world.congestion.get(&edge.id).copied().unwrap_or(0.0));

    let mut speed_multiplier = 1.0;
    let mut latency_penalty = 0.0;
    if is_ability_active(state, AbilityId::Burst) {
        speed_multiplier *= balance.burst_speed_multiplier;
    }
    if edge.has_tag(EdgeTag::Latency) {
        speed_multiplier *= balance.latency_speed_multiplier;
        latency_penalty += dt * balance.latency_penalty_rate;
    }
    if let Some(load) = load {
        speed_multiplier *= 1.0 / (1.0 + load * balance.congestion_travel_slowdown);
        latency_penalty += dt * (1.0 + load * balance.congestion_penalty_factor);
    }
    let firewall_damage = balance.firewall_damage_per_second * dt;

    state.run.latency_penalty += latency_penalty;
    if firewall {
        apply_damage(state, firewall_damage);
        if state.run.status != RunStatus::Running {
            return;
        }
    }

    let duration = (base_cost / speed_multiplier.max(0.2)).max(0.05);
    let Some(traversal) = state.packet.traversal.as_mut() else {
        return;
    };
    traversal.progress += dt / duration;
    if traversal.progress < 1.0 {
        return;
    }

    traversal.progress = 1.0;
    let arrived = traversal.to.clone();
    state.packet.current_node = arrived.clone();
    state.packet.traversal = None;

    handle_arrival(state, &arrived);
    begin_next_traversal(state);
}

fn handle_arrival(state: &mut NetState, node_id: &NodeId) {
    let Some(node) = state.level.node(node_id) else {
        return;
    };
    let kind = node.kind;

    if kind == NodeKind::Checkpoint && !state.world.visited_checkpoints.contains(node_id) {
        state.world.visited_checkpoints.push(node_id.clone());
        log::debug!("Checkpoint `{node_id}` reached");
        state.push_event(NetEvent::Checkpoint {
            node: node_id.clone(),
        });
    }

    if state.level.is_collectible(node_id) && !state.world.collected_tokens.contains(node_id) {
        state.world.collected_tokens.push(node_id.clone());
        state.push_event(NetEvent::Token {
            node: node_id.clone(),
        });
    }

    if state.routing.destination.as_ref() == Some(node_id) && state.routing.route_edges.is_empty() {
        state.routing.destination = None;
    }

    if node_id == state.level.goal_node_id() {
        if has_all_required_checkpoints(state) {
            state.run.status = RunStatus::Success;
            state.run.next_network_unlocked = true;
            let score = compute_score(state, true);
            state.run.score = Some(score);
            log::info!(
                "Run complete in {:.1}s (score {})",
                state.run.elapsed_seconds,
                score.total
            );
            state.push_event(NetEvent::Success { total: score.total });
            return;
        }

        // Reaching the goal early only redirects toward what is still missing
        if state.routing.destination.is_none() {
            let outstanding = current_objective_node_id(state).clone();
            log::debug!("Goal reached early, heading for checkpoint `{outstanding}`");
            state.routing.destination = Some(outstanding);
        }
    }

    if state.routing.destination.is_some() {
        recalculate_route(state);
    }
}

fn update_detection(state: &mut NetState, dt: f32) {
    let balance = &state.balance;
    let position = packet_world_position(state);

    let mut gain_multiplier = 1.0;
    if is_ability_active(state, AbilityId::Decoy) {
        gain_multiplier *= balance.decoy_detection_multiplier;
    }
    if is_ability_active(state, AbilityId::Burst) {
        gain_multiplier *= balance.burst_detection_multiplier;
    }

    let mut gain = 0.0;
    for sniffer in state.level.sniffers() {
        let Some(node) = state.level.node(&sniffer.node_id) else {
            continue;
        };
        let distance = distance3(position, node.position);
        if distance > sniffer.radius {
            continue;
        }

        let phase = state.time_seconds * sniffer.sweep_speed + sniffer.phase_offset;
        let activity = (phase.sin() + 1.0) / 2.0;
        if activity < balance.sniffer_activity_threshold {
            continue;
        }

        let distance_factor = clamp(1.0 - distance / sniffer.radius, 0.2, 1.0);
        gain += balance.detection_gain_per_second * activity * gain_multiplier * distance_factor * dt;
    }

    let decayed = (state.world.detection_level - balance.detection_decay_per_second * dt).max(0.0);
    state.world.detection_level = clamp(decayed + gain, 0.0, balance.max_detection);
    state.world.pursuers_active = state.world.detection_level >= balance.pursuer_threshold;

    if state.world.pursuers_active {
        let damage = state.balance.pursuer_damage_per_second * state.world.detection_level * dt;
        apply_damage(state, damage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::level::{EdgeId, Level, network01};
    use crate::tuning::NetBalance;

    const DT: f32 = 1.0 / 60.0;

    fn state() -> NetState {
        NetState::new(Level::new(network01()).unwrap(), NetBalance::default())
    }

    fn run_for(state: &mut NetState, seconds: f32) {
        let steps = (seconds / DT).ceil() as usize;
        for _ in 0..steps {
            step(state, DT);
        }
    }

    fn on_edge(state: &mut NetState, edge: &str, from: &str, to: &str) {
        state.packet.current_node = from.into();
        state.packet.traversal = Some(Traversal {
            edge_id: edge.into(),
            from: from.into(),
            to: to.into(),
            progress: 0.0,
        });
        state.routing.route_nodes = vec![to.into()];
    }

    #[test]
    fn test_ability_cooldown_lifecycle() {
        // 0.125 is exact in binary, so 14 s is exactly 112 steps
        let dt = 0.125;
        let mut state = state();

        state.enqueue(NetCommand::UseAbility {
            ability: AbilityId::Encrypt,
        });
        step(&mut state, 0.0);
        assert_eq!(state.abilities.encrypt.active_remaining, 4.0);
        assert_eq!(state.abilities.encrypt.cooldown_remaining, 14.0);
        assert_eq!(state.events.last_id(), 1);

        for _ in 0..40 {
            step(&mut state, dt);
        }
        assert_eq!(state.abilities.encrypt.active_remaining, 0.0);
        assert!(state.abilities.encrypt.cooldown_remaining > 0.0);

        // Rejected while cooling down, with no partial effect
        state.enqueue(NetCommand::UseAbility {
            ability: AbilityId::Encrypt,
        });
        step(&mut state, 0.0);
        assert_eq!(state.abilities.encrypt.active_remaining, 0.0);
        assert_eq!(state.events.last_id(), 1);

        for _ in 40..112 {
            step(&mut state, dt);
        }
        assert_eq!(state.abilities.encrypt.cooldown_remaining, 0.0);

        state.enqueue(NetCommand::UseAbility {
            ability: AbilityId::Encrypt,
        });
        step(&mut state, 0.0);
        assert_eq!(state.abilities.encrypt.active_remaining, 4.0);
        assert_eq!(state.abilities.encrypt.cooldown_remaining, 14.0);
    }

    #[test]
    fn test_ability_rejected_while_paused() {
        let mut state = state();
        state.enqueue(NetCommand::PauseRun);
        state.enqueue(NetCommand::UseAbility {
            ability: AbilityId::Burst,
        });
        step(&mut state, DT);
        assert_eq!(state.run.status, RunStatus::Paused);
        assert_eq!(state.abilities.burst.cooldown_remaining, 0.0);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_firewall_damage_for_one_second() {
        let mut balance = NetBalance::default();
        balance.max_frame_seconds = 1.0;

        // A long firewall link and no sniffers, so only the firewall bites
        let mut def = network01();
        def.sniffers.clear();
        for edge in def.edges.iter_mut().filter(|e| e.id.as_str() == "e_a_b") {
            edge.base_cost = 20.0;
        }

        let mut plain = NetState::new(Level::new(def).unwrap(), balance);
        on_edge(&mut plain, "e_a_b", "n_a", "n_b");
        let mut shielded = plain.clone();
        shielded.abilities.encrypt.active_remaining = 4.0;
        shielded.abilities.encrypt.cooldown_remaining = 14.0;

        step(&mut plain, 1.0);
        step(&mut shielded, 1.0);

        assert!((100.0 - plain.packet.integrity - 18.0).abs() < 1e-3);
        assert!((100.0 - shielded.packet.integrity - 6.3).abs() < 1e-3);
        assert!(plain.run.took_damage && shielded.run.took_damage);
        assert!(plain.packet.traversal.is_some());
    }

    #[test]
    fn test_encrypt_mitigates_over_a_window() {
        let mut baseline = state();
        on_edge(&mut baseline, "e_a_b", "n_a", "n_b");
        let mut encrypted = baseline.clone();
        encrypted.abilities.encrypt.active_remaining = 2.0;
        encrypted.abilities.encrypt.cooldown_remaining = 8.0;

        run_for(&mut baseline, 0.8);
        run_for(&mut encrypted, 0.8);

        let baseline_damage = 100.0 - baseline.packet.integrity;
        let encrypted_damage = 100.0 - encrypted.packet.integrity;
        assert!(baseline_damage > 5.0);
        assert!(encrypted_damage * 2.0 < baseline_damage);
    }

    #[test]
    fn test_reroute_counts_distinct_changes() {
        let mut state = state();

        state.enqueue(NetCommand::SetDestination { node: "n_c".into() });
        step(&mut state, DT);
        assert_eq!(state.routing.destination, Some("n_c".into()));
        assert_eq!(state.run.reroute_count, 0);
        assert_eq!(state.run.destination_set_count, 1);
        assert!(state.packet.traversal.is_some());

        run_for(&mut state, 0.5);
        state.enqueue(NetCommand::SetDestination { node: "n_i".into() });
        state.enqueue(NetCommand::SetDestination { node: "n_i".into() });
        step(&mut state, DT);
        assert_eq!(state.routing.destination, Some("n_i".into()));
        assert_eq!(state.run.reroute_count, 1);
        assert_eq!(state.run.destination_set_count, 2);
        assert!(!state.routing.route_nodes.is_empty());
    }

    #[test]
    fn test_reroute_anchors_at_traversal_target() {
        let mut state = state();
        state.enqueue(NetCommand::SetDestination { node: "n_c".into() });
        step(&mut state, DT);
        let traversal = state.packet.traversal.clone().unwrap();
        assert_eq!(traversal.to.as_str(), "n_a");

        state.enqueue(NetCommand::SetDestination { node: "n_e".into() });
        step(&mut state, DT);

        // Still committed to the same edge, plan starts where it lands
        assert_eq!(state.packet.traversal.as_ref().map(|t| &t.edge_id), Some(&traversal.edge_id));
        assert_eq!(state.routing.route_nodes[0].as_str(), "n_a");
        assert_eq!(state.routing.route_edges, vec![EdgeId::from("e_a_e")]);
    }

    #[test]
    fn test_unknown_destination_ignored() {
        let mut state = state();
        state.enqueue(NetCommand::SetDestination { node: "n_void".into() });
        step(&mut state, DT);
        assert_eq!(state.routing.destination, None);
        assert_eq!(state.run.destination_set_count, 0);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_unreachable_destination_leaves_anchored_plan() {
        let mut def = network01();
        def.nodes.push(crate::net::level::LevelNode {
            id: "n_island".into(),
            label: "Island".to_owned(),
            position: glam::Vec3::new(40.0, 0.0, 40.0),
            kind: NodeKind::Normal,
        });
        let mut state = NetState::new(Level::new(def).unwrap(), NetBalance::default());

        state.enqueue(NetCommand::SetDestination { node: "n_island".into() });
        step(&mut state, DT);
        assert_eq!(state.routing.destination, Some("n_island".into()));
        assert_eq!(state.routing.route_nodes, vec![NodeId::from("n_start")]);
        assert!(state.routing.route_edges.is_empty());
        assert!(state.packet.traversal.is_none());
    }

    #[test]
    fn test_pin_toggle_emits_and_replans() {
        let mut state = state();
        state.enqueue(NetCommand::SetDestination { node: "n_goal".into() });
        for edge in ["e_a_e", "e_e_f", "e_f_j", "e_j_k", "e_k_goal"] {
            state.enqueue(NetCommand::TogglePin { edge: edge.into() });
        }
        step(&mut state, DT);

        assert_eq!(state.routing.pinned_edges.len(), 5);
        assert!(state.routing.route_edges.contains(&EdgeId::from("e_a_e")));
        let pins = state
            .events
            .iter()
            .filter(|e| matches!(e.kind, NetEvent::Pin { pinned: true, .. }))
            .count();
        assert_eq!(pins, 5);

        state.enqueue(NetCommand::TogglePin { edge: "e_a_e".into() });
        step(&mut state, DT);
        assert!(!state.routing.pinned_edges.contains(&EdgeId::from("e_a_e")));
        assert!(matches!(
            state.events.latest().map(|e| &e.kind),
            Some(NetEvent::Pin { pinned: false, .. })
        ));
    }

    #[test]
    fn test_congestion_grows_while_travelled() {
        let mut state = state();
        on_edge(&mut state, "e_c_d", "n_c", "n_d");
        run_for(&mut state, 1.0);

        let travelled = state.world.congestion[&EdgeId::from("e_c_d")];
        let idle = state.world.congestion[&EdgeId::from("e_i_goal")];
        assert!(travelled > idle);
        // Idle links: global growth is below decay, so they stay at zero
        assert_eq!(idle, 0.0);
        assert!(travelled <= state.balance.max_congestion);
    }

    #[test]
    fn test_pause_freezes_time() {
        let mut state = state();
        state.enqueue(NetCommand::PauseRun);
        run_for(&mut state, 1.0);
        assert_eq!(state.run.status, RunStatus::Paused);
        assert_eq!(state.time_seconds, 0.0);

        state.enqueue(NetCommand::ResumeRun);
        step(&mut state, DT);
        assert_eq!(state.run.status, RunStatus::Running);
        assert!(state.time_seconds > 0.0);
    }

    #[test]
    fn test_failure_is_terminal_and_clears_routing() {
        let mut state = state();
        state.enqueue(NetCommand::SetDestination { node: "n_b".into() });
        step(&mut state, DT);
        state.packet.integrity = 0.5;
        on_edge(&mut state, "e_a_b", "n_a", "n_b");
        run_for(&mut state, 0.5);

        assert_eq!(state.run.status, RunStatus::Failed);
        assert_eq!(state.packet.integrity, 0.0);
        assert!(state.run.score.is_some());
        assert!(matches!(state.events.latest().map(|e| &e.kind), Some(NetEvent::Failure)));
        assert_eq!(state.routing.destination, None);
        // Failed mid-edge: the plan is anchored where the traversal lands
        assert_eq!(state.packet.traversal.as_ref().map(|t| t.to.as_str()), Some("n_b"));
        assert_eq!(state.routing.route_nodes, vec![NodeId::from("n_b")]);
        assert!(state.routing.route_edges.is_empty());

        // Nothing brings it back
        state.enqueue(NetCommand::ResumeRun);
        state.enqueue(NetCommand::SetDestination { node: "n_c".into() });
        step(&mut state, DT);
        assert_eq!(state.run.status, RunStatus::Failed);
        assert_eq!(state.routing.destination, None);
    }

    #[test]
    fn test_full_run_reaches_goal() {
        let mut state = state();
        let mut last_objective = None;

        for _ in 0..(120.0 / DT) as usize {
            let objective = current_objective_node_id(&state).clone();
            if last_objective.as_ref() != Some(&objective) {
                state.enqueue(NetCommand::SetDestination {
                    node: objective.clone(),
                });
                last_objective = Some(objective);
            }
            step(&mut state, DT);
            if state.run.status.is_terminal() {
                break;
            }
        }

        assert_eq!(state.run.status, RunStatus::Success);
        assert!(state.run.next_network_unlocked);
        assert_eq!(state.world.visited_checkpoints.len(), 2);
        let score = state.run.score.unwrap();
        assert!(score.base == 1000 && score.total >= score.base);
        assert!(matches!(state.events.latest().map(|e| &e.kind), Some(NetEvent::Success { .. })));
    }

    #[test]
    fn test_goal_without_checkpoints_redirects() {
        let mut state = state();
        // One frame short of the goal, no checkpoints visited
        on_edge(&mut state, "e_k_goal", "n_k", "n_goal");
        state.routing.destination = Some("n_goal".into());
        if let Some(traversal) = state.packet.traversal.as_mut() {
            traversal.progress = 0.999;
        }
        step(&mut state, DT);

        assert_eq!(state.run.status, RunStatus::Running);
        assert_eq!(state.packet.current_node.as_str(), "n_goal");
        assert_eq!(state.routing.destination, Some("n_c".into()));
        assert_eq!(state.routing.route_nodes.last().map(NodeId::as_str), Some("n_c"));
        // Redirect is not a player reroute
        assert_eq!(state.run.reroute_count, 0);
    }

    fn parked(state: &mut NetState, node: &str) {
        state.packet.current_node = node.into();
        state.packet.traversal = None;
        state.routing.destination = None;
        state.routing.route_nodes = vec![node.into()];
        state.routing.route_edges.clear();
    }

    /// Detection after one step from zero, parked on the cache sniffer
    fn one_step_gain(configure: impl FnOnce(&mut NetState)) -> f32 {
        let mut state = state();
        parked(&mut state, "n_d");
        configure(&mut state);
        step(&mut state, DT);
        state.world.detection_level
    }

    #[test]
    fn test_detection_rises_on_sniffer_and_triggers_pursuit() {
        let mut state = state();
        parked(&mut state, "n_d");

        let mut max_detection: f32 = 0.0;
        let mut pursued = false;
        for _ in 0..(10.0 / DT) as usize {
            step(&mut state, DT);
            max_detection = max_detection.max(state.world.detection_level);

            if state.world.pursuers_active && !pursued {
                pursued = true;
                assert!(state.world.detection_level >= state.balance.pursuer_threshold);
            }
            if !pursued {
                assert_eq!(state.packet.integrity, 100.0);
            }
        }

        assert!(max_detection > state.balance.pursuer_threshold);
        assert!(max_detection <= state.balance.max_detection);
        assert!(state.run.took_damage);
        assert!(state.packet.integrity < 100.0);
    }

    #[test]
    fn test_detection_clamps_and_pursuit_damage_scales() {
        let mut state = state();
        parked(&mut state, "n_d");
        state.world.detection_level = state.balance.max_detection;

        // Sweep is active right after t = 0, so gain outweighs decay
        step(&mut state, DT);
        assert_eq!(state.world.detection_level, state.balance.max_detection);
        assert!(state.world.pursuers_active);

        let expected = state.balance.pursuer_damage_per_second * state.balance.max_detection * DT;
        assert!((100.0 - state.packet.integrity - expected).abs() < 1e-3);
    }

    #[test]
    fn test_inactive_sweep_only_decays() {
        let mut state = state();
        parked(&mut state, "n_d");
        // sin(1.3 t) is near -1, well under the activity gate
        state.time_seconds = 1.5 * std::f32::consts::PI / 1.3;
        state.world.detection_level = 0.5;

        step(&mut state, DT);
        let expected = 0.5 - state.balance.detection_decay_per_second * DT;
        assert!((state.world.detection_level - expected).abs() < 1e-6);
        assert!(!state.world.pursuers_active);
        assert_eq!(state.packet.integrity, 100.0);
    }

    #[test]
    fn test_detection_decays_to_zero_away_from_sniffers() {
        let mut state = state();
        parked(&mut state, "n_start");
        state.world.detection_level = 0.3;

        run_for(&mut state, 2.0);
        assert_eq!(state.world.detection_level, 0.0);
        assert!(!state.world.pursuers_active);
    }

    #[test]
    fn test_detection_gain_falls_off_with_distance() {
        let on_sniffer = one_step_gain(|_| {});
        let halfway = one_step_gain(|state| {
            on_edge(state, "e_c_d", "n_c", "n_d");
            if let Some(traversal) = state.packet.traversal.as_mut() {
                traversal.progress = 0.5;
            }
        });

        assert!(on_sniffer > 0.0);
        // About half the radius away, so roughly half the gain
        assert!(halfway > 0.3 * on_sniffer);
        assert!(halfway < 0.6 * on_sniffer);
    }

    #[test]
    fn test_decoy_and_burst_scale_detection_gain() {
        let plain = one_step_gain(|_| {});
        let decoy = one_step_gain(|state| state.abilities.decoy.active_remaining = 5.0);
        let burst = one_step_gain(|state| state.abilities.burst.active_remaining = 5.0);

        assert!(plain > 0.0);
        assert!((decoy / plain - 0.35).abs() < 1e-3);
        assert!((burst / plain - 1.45).abs() < 1e-3);
    }

    #[test]
    fn test_decoy_keeps_detection_low() {
        let mut plain = state();
        parked(&mut plain, "n_d");
        let mut decoyed = plain.clone();

        let mut plain_max: f32 = 0.0;
        let mut decoy_max: f32 = 0.0;
        for _ in 0..(10.0 / DT) as usize {
            decoyed.abilities.decoy.active_remaining = 5.0;
            step(&mut plain, DT);
            step(&mut decoyed, DT);
            plain_max = plain_max.max(plain.world.detection_level);
            decoy_max = decoy_max.max(decoyed.world.detection_level);
        }

        assert!(decoy_max * 3.0 < plain_max);
        assert!(decoy_max < decoyed.balance.pursuer_threshold);
        assert_eq!(decoyed.packet.integrity, 100.0);
    }

    #[test]
    fn test_burst_shortens_traversal() {
        let mut plain = state();
        on_edge(&mut plain, "e_start_a", "n_start", "n_a");
        let mut burst = plain.clone();
        burst.abilities.burst.active_remaining = 5.0;

        run_for(&mut plain, 1.2);
        run_for(&mut burst, 1.2);

        // 2.0 s at normal speed, 2.0 / 1.8 s under Burst
        assert!(plain.packet.traversal.is_some());
        assert!(burst.packet.traversal.is_none());
        assert_eq!(burst.packet.current_node.as_str(), "n_a");
    }

    #[test]
    fn test_latency_link_accrues_penalty() {
        let mut slow = state();
        on_edge(&mut slow, "e_g_h", "n_g", "n_h");
        let mut clear = state();
        on_edge(&mut clear, "e_start_a", "n_start", "n_a");

        for _ in 0..30 {
            step(&mut slow, DT);
            step(&mut clear, DT);
        }

        let expected = 30.0 * DT * slow.balance.latency_penalty_rate;
        assert!((slow.run.latency_penalty - expected).abs() < 1e-3);
        assert_eq!(clear.run.latency_penalty, 0.0);
        // 1.8 s link at 0.58 speed is still underway
        assert!(slow.packet.traversal.is_some());
    }
}
