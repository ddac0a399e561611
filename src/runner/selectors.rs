//! Read-only projections of `RunnerState`

use std::ops::RangeInclusive;

use glam::Vec3;
use serde::Serialize;

use super::state::{Obstacle, RunnerEvent, RunnerState, RunnerStatus, RunnerTile, Token, TurnDirection};
use crate::sim::LoggedEvent;

/// Tiles kept visible behind the player by default
pub const DEFAULT_TILES_BEHIND: usize = 2;
/// Tiles kept visible ahead of the player by default
pub const DEFAULT_TILES_AHEAD: usize = 14;

pub fn current_tile(state: &RunnerState) -> Option<&RunnerTile> {
    state.current_tile()
}

/// Player position: along the tile, offset by lane, lifted by jump height
pub fn player_world_position(state: &RunnerState) -> Vec3 {
    let Some(tile) = state.current_tile() else {
        return Vec3::ZERO;
    };

    tile.start
        + tile.heading.forward() * state.track.distance_in_tile
        + tile.heading.right() * (state.player.lane_position * state.balance.lane_width)
        + Vec3::Y * state.player.height
}

/// Heading the player is facing
pub fn player_forward(state: &RunnerState) -> Vec3 {
    state
        .current_tile()
        .map(|tile| tile.heading.forward())
        .unwrap_or(Vec3::Z)
}

fn window(state: &RunnerState, behind: usize, ahead: usize) -> RangeInclusive<usize> {
    let current = state.track.current_tile_index;
    current.saturating_sub(behind)..=current.saturating_add(ahead)
}

/// Entries whose tile falls inside `range`
///
/// `items` are appended in tile order, so both ends are found by bisection.
fn slice_by_tile<'a, T>(
    items: &'a [T],
    range: &RangeInclusive<usize>,
    tile_index: impl Fn(&T) -> usize,
) -> &'a [T] {
    let lo = items.partition_point(|item| tile_index(item) < *range.start());
    let hi = items.partition_point(|item| tile_index(item) <= *range.end());
    items.get(lo..hi).unwrap_or(&[])
}

/// Tiles in `[current - behind, current + ahead]`, with their indices
pub fn visible_tiles(
    state: &RunnerState,
    behind: usize,
    ahead: usize,
) -> impl Iterator<Item = (usize, &RunnerTile)> {
    let range = window(state, behind, ahead);
    let tiles = &state.track.tiles;
    let start = (*range.start()).min(tiles.len());
    let end = range.end().saturating_add(1).min(tiles.len());
    tiles
        .get(start..end)
        .unwrap_or(&[])
        .iter()
        .enumerate()
        .map(move |(offset, tile)| (start + offset, tile))
}

/// Unresolved obstacles on visible tiles
pub fn visible_obstacles(state: &RunnerState, behind: usize, ahead: usize) -> impl Iterator<Item = &Obstacle> {
    let range = window(state, behind, ahead);
    slice_by_tile(&state.obstacles, &range, |o| o.tile_index)
        .iter()
        .filter(|o| !o.resolved)
}

/// Uncollected tokens on visible tiles
pub fn visible_tokens(state: &RunnerState, behind: usize, ahead: usize) -> impl Iterator<Item = &Token> {
    let range = window(state, behind, ahead);
    slice_by_tile(&state.tokens, &range, |t| t.tile_index)
        .iter()
        .filter(|t| !t.collected)
}

/// World position of a track entity
pub fn entity_world_position(state: &RunnerState, tile_index: usize, lane_offset: f32, offset: f32) -> Option<Vec3> {
    let tile = state.track.tiles.get(tile_index)?;
    Some(
        tile.start
            + tile.heading.forward() * offset
            + tile.heading.right() * (lane_offset * state.balance.lane_width),
    )
}

pub fn is_turn_window_open(state: &RunnerState) -> bool {
    state.track.decision_open
}

/// Turn the upcoming junction asks for, while its window is open
pub fn pending_turn(state: &RunnerState) -> Option<TurnDirection> {
    if !state.track.decision_open {
        return None;
    }
    state.current_tile().and_then(|tile| tile.required_turn)
}

pub fn events_since(state: &RunnerState, last_seen_id: u64) -> impl Iterator<Item = &LoggedEvent<RunnerEvent>> {
    state.events.since(last_seen_id)
}

/// Compact run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerHud {
    pub status: RunnerStatus,
    pub elapsed_seconds: f32,
    pub distance: f32,
    pub speed: f32,
    pub top_speed: f32,
    pub score: u32,
    pub tokens: u32,
    pub collisions: u32,
    pub integrity: u32,
    pub max_integrity: u32,
    pub tile_index: usize,
    pub turn_window_open: bool,
    pub queued_turn: Option<TurnDirection>,
    pub failure_reason: Option<String>,
}

pub fn hud(state: &RunnerState) -> RunnerHud {
    RunnerHud {
        status: state.run.status,
        elapsed_seconds: state.run.elapsed_seconds,
        distance: state.run.distance,
        speed: state.run.speed,
        top_speed: state.run.top_speed,
        score: state.run.score.max(0.0).floor() as u32,
        tokens: state.run.tokens,
        collisions: state.run.collisions,
        integrity: state.player.integrity,
        max_integrity: state.balance.max_integrity,
        tile_index: state.track.current_tile_index,
        turn_window_open: state.track.decision_open,
        queued_turn: state.track.queued_turn,
        failure_reason: state.run.failure_reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::Lane;
    use crate::tuning::RunnerBalance;

    fn state() -> RunnerState {
        RunnerState::with_default_seed(RunnerBalance::default())
    }

    #[test]
    fn test_player_position_composes_lane_and_height() {
        let mut state = state();
        state.track.distance_in_tile = 3.0;
        state.player.lane_position = Lane::Right.offset();
        state.player.height = 0.5;
        // First tile heads +Z from the origin, right is +X
        let expected = Vec3::new(2.2, 0.5, 3.0);
        assert!((player_world_position(&state) - expected).length() < 1e-5);
    }

    #[test]
    fn test_window_clamps_at_track_start() {
        let state = state();
        let indices: Vec<usize> = visible_tiles(&state, 2, 3).map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_window_follows_player() {
        let mut state = state();
        state.track.current_tile_index = 10;
        let indices: Vec<usize> = visible_tiles(&state, 2, 3).map(|(i, _)| i).collect();
        assert_eq!(indices, vec![8, 9, 10, 11, 12, 13]);
        assert!(visible_obstacles(&state, 2, 3).all(|o| (8..=13).contains(&o.tile_index)));
        assert!(visible_tokens(&state, 0, 0).all(|t| t.tile_index == 10));
    }

    #[test]
    fn test_visible_entities_match_full_scan() {
        let mut state = state();
        state.track.current_tile_index = 12;
        crate::runner::track::ensure_ahead(&mut state);
        if let Some(first) = state.obstacles.first_mut() {
            first.resolved = true;
        }

        let range = 10..=18;
        let expected: Vec<u32> = state
            .obstacles
            .iter()
            .filter(|o| !o.resolved && range.contains(&o.tile_index))
            .map(|o| o.id)
            .collect();
        let visible: Vec<u32> = visible_obstacles(&state, 2, 6).map(|o| o.id).collect();
        assert_eq!(visible, expected);

        let expected: Vec<u32> = state
            .tokens
            .iter()
            .filter(|t| !t.collected && range.contains(&t.tile_index))
            .map(|t| t.id)
            .collect();
        let visible: Vec<u32> = visible_tokens(&state, 2, 6).map(|t| t.id).collect();
        assert_eq!(visible, expected);
    }

    #[test]
    fn test_window_past_generated_track_is_empty() {
        let mut state = state();
        state.track.current_tile_index = state.track.tiles.len() + 5;
        assert_eq!(visible_tiles(&state, 1, 1).count(), 0);
        assert_eq!(visible_obstacles(&state, 1, 1).count(), 0);
    }

    #[test]
    fn test_hud_starts_clean() {
        let hud = hud(&state());
        assert_eq!(hud.integrity, 3);
        assert_eq!(hud.score, 0);
        assert!(!hud.turn_window_open);
        assert_eq!(hud.failure_reason, None);
    }
}
