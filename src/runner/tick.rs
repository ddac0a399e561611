//! Runner step function
//!
//! Order within a step:
//! 1. Drain commands
//! 2. Player motion (lane easing, timers, gravity), speed ramp
//! 3. Walk tile boundaries, checking junctions
//! 4. Recompute the decision window
//! 5. Resolve tokens, then obstacles

use super::state::{
    Lane, ObstacleKind, RunnerCommand, RunnerEvent, RunnerState, RunnerStatus, TurnDirection,
};
use super::track::ensure_ahead;
use crate::sim::Simulation;
use crate::{clamp, lerp};

const MISSED_TURN_REASON: &str = "Missed the junction turn. Packet dropped into a dead route.";
const INTEGRITY_LOST_REASON: &str = "Packet integrity collapsed under network pressure.";

/// Highest point still counted as standing for a jump
const JUMP_GROUND_HEIGHT: f32 = 0.01;
/// Highest point a slide can start from
const SLIDE_GROUND_HEIGHT: f32 = 0.1;

impl Simulation for RunnerState {
    fn step(&mut self, dt: f32) {
        step(self, dt);
    }
}

/// Advance the run by `dt_seconds` (clamped to the balance's max frame)
pub fn step(state: &mut RunnerState, dt_seconds: f32) {
    let dt = clamp(dt_seconds, 0.0, state.balance.max_frame_seconds);

    for command in state.drain_commands() {
        process_command(state, command);
    }

    if state.run.status != RunnerStatus::Running {
        state.track.decision_open = false;
        return;
    }

    state.time_seconds += dt;
    state.run.elapsed_seconds += dt;

    tick_player_motion(state, dt);

    let balance = &state.balance;
    state.run.speed = balance
        .max_speed
        .min(balance.base_speed + state.run.elapsed_seconds * balance.speed_acceleration);
    state.run.top_speed = state.run.top_speed.max(state.run.speed);

    let distance = state.run.speed * dt;
    state.run.distance += distance;
    state.run.score += distance * balance.distance_score_rate;

    advance_track(state, distance);

    if state.run.status != RunnerStatus::Running {
        state.track.decision_open = false;
        return;
    }

    state.track.decision_open = is_turn_window_open(state);

    resolve_tokens(state);
    resolve_obstacles(state);

    state.run.score = state.run.score.max(0.0);
}

/// Inside the last stretch of a junction tile, where left/right become turns
pub fn is_turn_window_open(state: &RunnerState) -> bool {
    state.current_tile().is_some_and(|tile| {
        tile.required_turn.is_some()
            && state.track.distance_in_tile >= tile.length - state.balance.turn_decision_window
    })
}

fn process_command(state: &mut RunnerState, command: RunnerCommand) {
    match command {
        RunnerCommand::MoveLeft => steer(state, TurnDirection::Left),
        RunnerCommand::MoveRight => steer(state, TurnDirection::Right),
        RunnerCommand::Jump => {
            if state.run.status != RunnerStatus::Running {
                return;
            }
            let player = &mut state.player;
            if player.height <= JUMP_GROUND_HEIGHT && !player.is_sliding() {
                player.vertical_velocity = state.balance.jump_velocity;
                state.push_event(RunnerEvent::Jump);
            }
        }
        RunnerCommand::Slide => {
            if state.run.status != RunnerStatus::Running {
                return;
            }
            let player = &mut state.player;
            if player.height <= SLIDE_GROUND_HEIGHT && !player.is_sliding() {
                player.slide_remaining = state.balance.slide_duration;
                state.push_event(RunnerEvent::Slide);
            }
        }
        RunnerCommand::PauseRun => {
            if state.run.status == RunnerStatus::Running {
                state.run.status = RunnerStatus::Paused;
            }
        }
        RunnerCommand::ResumeRun => {
            if state.run.status == RunnerStatus::Paused {
                state.run.status = RunnerStatus::Running;
            }
        }
    }
}

/// Left/right input: a turn inside the decision window, a lane change
/// otherwise
fn steer(state: &mut RunnerState, direction: TurnDirection) {
    if state.run.status != RunnerStatus::Running {
        return;
    }

    if is_turn_window_open(state) {
        state.track.queued_turn = Some(direction);
        return;
    }

    let lane = state.player.lane_target.shifted(direction);
    if lane != state.player.lane_target {
        state.player.lane_target = lane;
        state.push_event(RunnerEvent::LaneChange { lane });
    }
}

fn tick_player_motion(state: &mut RunnerState, dt: f32) {
    let balance = &state.balance;
    let player = &mut state.player;

    player.lane_position = lerp(
        player.lane_position,
        player.lane_target.offset(),
        (dt * balance.lane_ease_rate).min(1.0),
    );

    player.invulnerable_remaining = (player.invulnerable_remaining - dt).max(0.0);
    player.slide_remaining = (player.slide_remaining - dt).max(0.0);

    player.vertical_velocity += balance.gravity * dt;
    player.height += player.vertical_velocity * dt;
    if player.height <= 0.0 {
        player.height = 0.0;
        player.vertical_velocity = player.vertical_velocity.max(0.0);
    }
}

fn fail_run(state: &mut RunnerState, reason: &str) {
    if state.run.status != RunnerStatus::Running {
        return;
    }

    state.run.status = RunnerStatus::Failed;
    state.run.failure_reason = Some(reason.to_owned());
    state.run.score = state.run.score.floor();
    log::info!(
        "Runner failed after {:.0}m on tile {}: {reason} (score {})",
        state.run.distance,
        state.track.current_tile_index,
        state.run.score
    );
    state.push_event(RunnerEvent::GameOver {
        reason: reason.to_owned(),
    });
}

/// Move `distance` along the track one tile boundary at a time
fn advance_track(state: &mut RunnerState, distance: f32) {
    let mut remaining = distance;

    while remaining > 0.0 && state.run.status == RunnerStatus::Running {
        let Some(tile) = state.current_tile() else {
            ensure_ahead(state);
            if state.current_tile().is_none() {
                return;
            }
            continue;
        };
        let length = tile.length;
        let required_turn = tile.required_turn;

        let to_boundary = length - state.track.distance_in_tile;
        if remaining < to_boundary {
            state.track.distance_in_tile += remaining;
            return;
        }
        remaining -= to_boundary;
        state.track.distance_in_tile = length;

        if let Some(required) = required_turn {
            if state.track.queued_turn != Some(required) {
                fail_run(state, MISSED_TURN_REASON);
                return;
            }

            state.run.score += state.balance.turn_score;
            log::debug!("Turned {required:?} at tile {}", state.track.current_tile_index);
            state.push_event(RunnerEvent::Turn {
                direction: required,
            });
            state.track.queued_turn = None;
        }

        state.track.current_tile_index += 1;
        state.track.distance_in_tile = 0.0;
        ensure_ahead(state);
    }
}

fn lane_aligned(lane_position: f32, lane: Lane, tolerance: f32) -> bool {
    (lane_position - lane.offset()).abs() <= tolerance
}

fn resolve_tokens(state: &mut RunnerState) {
    let current = state.track.current_tile_index;
    let distance_in_tile = state.track.distance_in_tile;
    let lane_position = state.player.lane_position;
    let balance = &state.balance;

    let mut picked = 0;
    for token in state.tokens.iter_mut().filter(|t| !t.collected) {
        if token.tile_index < current {
            token.collected = true;
            continue;
        }
        if token.tile_index != current {
            continue;
        }

        if lane_aligned(lane_position, token.lane, balance.lane_tolerance)
            && (token.offset - distance_in_tile).abs() <= balance.token_pickup_window
        {
            token.collected = true;
            picked += 1;
        }
    }

    for _ in 0..picked {
        state.run.tokens += 1;
        state.run.score += state.balance.token_score;
        state.push_event(RunnerEvent::Token);
    }
}

fn can_bypass(state: &RunnerState, kind: ObstacleKind) -> bool {
    match kind {
        ObstacleKind::Firewall => state.player.height > state.balance.firewall_clear_height,
        ObstacleKind::Sniffer => state.player.is_sliding(),
        ObstacleKind::Congestion => false,
    }
}

fn resolve_obstacles(state: &mut RunnerState) {
    let current = state.track.current_tile_index;
    let distance_in_tile = state.track.distance_in_tile;
    let lane_position = state.player.lane_position;
    let lane_tolerance = state.balance.lane_tolerance;
    let hit_window = state.balance.obstacle_hit_window;

    for index in 0..state.obstacles.len() {
        let obstacle = &mut state.obstacles[index];
        if obstacle.resolved {
            continue;
        }
        if obstacle.tile_index < current {
            obstacle.resolved = true;
            continue;
        }
        if obstacle.tile_index != current || !lane_aligned(lane_position, obstacle.lane, lane_tolerance) {
            continue;
        }

        let delta = obstacle.offset - distance_in_tile;
        if delta < -hit_window {
            // Already behind the player
            obstacle.resolved = true;
            continue;
        }
        if delta.abs() > hit_window {
            continue;
        }

        obstacle.resolved = true;
        let kind = obstacle.kind;
        if !can_bypass(state, kind) {
            apply_collision(state, kind);
        }
    }
}

fn apply_collision(state: &mut RunnerState, kind: ObstacleKind) {
    if state.player.invulnerable_remaining > 0.0 {
        return;
    }

    state.player.integrity = state.player.integrity.saturating_sub(1);
    state.player.invulnerable_remaining = state.balance.collision_invulnerability;
    state.run.collisions += 1;
    log::debug!(
        "Hit {kind:?} on tile {} ({} integrity left)",
        state.track.current_tile_index,
        state.player.integrity
    );
    state.push_event(RunnerEvent::Collision { obstacle: kind });

    if state.player.integrity == 0 {
        fail_run(state, INTEGRITY_LOST_REASON);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{Obstacle, Token};
    use crate::tuning::RunnerBalance;

    const DT: f32 = 1.0 / 60.0;

    fn state() -> RunnerState {
        let mut state = RunnerState::with_default_seed(RunnerBalance::default());
        // Scenario tests place their own content
        state.obstacles.clear();
        state.tokens.clear();
        state
    }

    fn first_junction(state: &RunnerState) -> usize {
        state
            .track
            .tiles
            .iter()
            .position(|t| t.required_turn.is_some())
            .unwrap()
    }

    /// Put the player `before_end` short of the end of `tile_index`
    fn place(state: &mut RunnerState, tile_index: usize, before_end: f32) {
        state.track.current_tile_index = tile_index;
        state.track.distance_in_tile = state.track.tiles[tile_index].length - before_end;
    }

    fn run_for(state: &mut RunnerState, seconds: f32) {
        for _ in 0..(seconds / DT).ceil() as usize {
            step(state, DT);
        }
    }

    #[test]
    fn test_missed_turn_fails_run() {
        let mut state = state();
        let junction = first_junction(&state);
        place(&mut state, junction, 1.0);
        run_for(&mut state, 0.5);

        assert_eq!(state.run.status, RunnerStatus::Failed);
        assert_eq!(state.run.failure_reason.as_deref(), Some(MISSED_TURN_REASON));
        assert_eq!(state.track.current_tile_index, junction);
        assert!(!state.track.decision_open);
        assert!(matches!(
            state.events.latest().map(|e| &e.kind),
            Some(RunnerEvent::GameOver { .. })
        ));
    }

    #[test]
    fn test_queued_turn_survives_junction() {
        let mut state = state();
        let junction = first_junction(&state);
        let required = state.track.tiles[junction].required_turn.unwrap();
        place(&mut state, junction, 1.0);

        // Inside the window, so this queues a turn rather than a lane change
        state.enqueue(match required {
            TurnDirection::Left => RunnerCommand::MoveLeft,
            TurnDirection::Right => RunnerCommand::MoveRight,
        });
        step(&mut state, DT);
        assert_eq!(state.track.queued_turn, Some(required));
        assert_eq!(state.player.lane_target, Lane::Center);
        assert!(state.track.decision_open);

        run_for(&mut state, 0.5);
        assert_eq!(state.run.status, RunnerStatus::Running);
        assert_eq!(state.track.current_tile_index, junction + 1);
        assert_eq!(state.track.queued_turn, None);
        assert!(state.run.score >= 120.0);
        assert!(
            state
                .events
                .iter()
                .any(|e| e.kind == RunnerEvent::Turn { direction: required })
        );
    }

    #[test]
    fn test_wrong_turn_fails() {
        let mut state = state();
        let junction = first_junction(&state);
        let wrong = match state.track.tiles[junction].required_turn.unwrap() {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        };
        place(&mut state, junction, 1.0);
        state.track.queued_turn = Some(wrong);
        run_for(&mut state, 0.5);
        assert_eq!(state.run.status, RunnerStatus::Failed);
    }

    #[test]
    fn test_lane_change_outside_window() {
        let mut state = state();
        state.enqueue(RunnerCommand::MoveLeft);
        state.enqueue(RunnerCommand::MoveLeft);
        step(&mut state, DT);

        assert_eq!(state.player.lane_target, Lane::Left);
        // Second move saturates, so one event
        assert_eq!(state.events.len(), 1);
        run_for(&mut state, 1.0);
        assert!((state.player.lane_position + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_jump_arc_lands() {
        let mut state = state();
        state.enqueue(RunnerCommand::Jump);
        step(&mut state, DT);
        assert!(state.player.height > 0.0);

        // Airborne jumps are ignored
        state.enqueue(RunnerCommand::Jump);
        step(&mut state, DT);
        assert_eq!(state.events.len(), 1);

        run_for(&mut state, 1.0);
        assert_eq!(state.player.height, 0.0);
        assert_eq!(state.player.vertical_velocity, 0.0);
    }

    #[test]
    fn test_slide_blocks_jump() {
        let mut state = state();
        state.enqueue(RunnerCommand::Slide);
        state.enqueue(RunnerCommand::Jump);
        state.enqueue(RunnerCommand::Slide);
        step(&mut state, DT);
        assert!(state.player.is_sliding());
        assert_eq!(state.player.height, 0.0);
        assert_eq!(state.events.len(), 1);
    }

    fn obstacle(kind: ObstacleKind, tile_index: usize, offset: f32) -> Obstacle {
        Obstacle {
            id: 900,
            tile_index,
            lane: Lane::Center,
            offset,
            kind,
            resolved: false,
        }
    }

    #[test]
    fn test_obstacle_hit_and_bypass() {
        // On the ground a firewall hits
        let mut state = state();
        state.obstacles.push(obstacle(ObstacleKind::Firewall, 0, 1.0));
        run_for(&mut state, 0.2);
        assert_eq!(state.run.collisions, 1);
        assert_eq!(state.player.integrity, 2);
        assert!(state.obstacles[0].resolved);

        // Airborne clears the same firewall
        let mut state = self::state();
        state.obstacles.push(obstacle(ObstacleKind::Firewall, 0, 1.0));
        state.player.height = 2.0;
        run_for(&mut state, 0.1);
        assert_eq!(state.run.collisions, 0);
        assert!(state.obstacles[0].resolved);

        // Sliding clears a sniffer
        let mut state = self::state();
        state.obstacles.push(obstacle(ObstacleKind::Sniffer, 0, 1.0));
        state.enqueue(RunnerCommand::Slide);
        run_for(&mut state, 0.2);
        assert_eq!(state.run.collisions, 0);

        // Congestion ignores height
        let mut state = self::state();
        state.obstacles.push(obstacle(ObstacleKind::Congestion, 0, 1.0));
        state.player.height = 2.0;
        run_for(&mut state, 0.1);
        assert_eq!(state.run.collisions, 1);
    }

    #[test]
    fn test_invulnerability_and_integrity_loss() {
        let mut state = state();
        for offset in [1.0, 1.1, 1.2] {
            state.obstacles.push(obstacle(ObstacleKind::Congestion, 0, offset));
        }
        run_for(&mut state, 0.2);
        // All three resolve but only the first hurts
        assert_eq!(state.run.collisions, 1);
        assert!(state.obstacles.iter().all(|o| o.resolved));

        state.player.integrity = 1;
        state.player.invulnerable_remaining = 0.0;
        state.obstacles.push(obstacle(ObstacleKind::Congestion, 0, state.track.distance_in_tile + 0.2));
        step(&mut state, DT);
        assert_eq!(state.run.status, RunnerStatus::Failed);
        assert_eq!(state.run.failure_reason.as_deref(), Some(INTEGRITY_LOST_REASON));
        assert_eq!(state.run.score, state.run.score.floor());
    }

    #[test]
    fn test_token_pickup() {
        let mut state = state();
        state.tokens.push(Token {
            id: 1,
            tile_index: 0,
            lane: Lane::Center,
            offset: 0.5,
            collected: false,
        });
        state.tokens.push(Token {
            id: 2,
            tile_index: 0,
            lane: Lane::Right,
            offset: 0.5,
            collected: false,
        });
        step(&mut state, DT);

        assert!(state.tokens[0].collected);
        assert!(!state.tokens[1].collected);
        assert_eq!(state.run.tokens, 1);
        assert!(state.run.score >= 50.0);

        // Passed tokens are dropped silently
        place(&mut state, 1, 11.0);
        step(&mut state, DT);
        assert!(state.tokens[1].collected);
        assert_eq!(state.run.tokens, 1);
    }

    #[test]
    fn test_pause_freezes_run() {
        let mut state = state();
        state.enqueue(RunnerCommand::PauseRun);
        state.enqueue(RunnerCommand::Jump);
        run_for(&mut state, 1.0);
        assert_eq!(state.run.status, RunnerStatus::Paused);
        assert_eq!(state.run.distance, 0.0);
        assert!(state.events.is_empty());

        state.enqueue(RunnerCommand::ResumeRun);
        step(&mut state, DT);
        assert!(state.run.distance > 0.0);
    }

    #[test]
    fn test_speed_ramps_to_cap() {
        let mut state = state();
        state.run.elapsed_seconds = 1000.0;
        step(&mut state, DT);
        assert_eq!(state.run.speed, 24.0);
        assert_eq!(state.run.top_speed, 24.0);
    }

    #[test]
    fn test_event_log_stays_bounded_over_long_run() {
        let mut state = state();
        let capacity = state.events.capacity();
        let mut pushed = 0;

        for tick in 0..(capacity * 5) {
            // Hold the player on the opening tile, away from any junction
            state.track.distance_in_tile = 0.0;
            state.enqueue(if tick % 2 == 0 {
                RunnerCommand::MoveLeft
            } else {
                RunnerCommand::MoveRight
            });
            state.enqueue(RunnerCommand::Jump);
            step(&mut state, DT);
            pushed = state.events.last_id();

            assert!(state.events.len() <= capacity);
            let ids: Vec<u64> = state.events.iter().map(|e| e.id).collect();
            assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        }

        assert_eq!(state.run.status, RunnerStatus::Running);
        assert_eq!(state.events.len(), capacity);
        assert!(pushed as usize > capacity * 5);
        assert_eq!(state.events.latest().map(|e| e.id), Some(pushed));
    }

    #[test]
    fn test_large_dt_is_clamped() {
        let mut state = state();
        step(&mut state, 10.0);
        assert!((state.run.elapsed_seconds - 0.125).abs() < 1e-6);
    }
}
