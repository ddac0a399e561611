//! Seeded track generation
//!
//! A 32-bit LCG drives every random decision. Draws happen in a fixed order
//! per tile, so a seed always reproduces the same track:
//! 1. Junction: direction, then the next interval
//! 2. Obstacle: presence, kind, offset, lane
//! 3. Tokens: presence, lane, cluster size, base offset

use super::state::{
    Lane, Obstacle, ObstacleKind, RunnerState, RunnerTile, Token, Track, TurnDirection,
};
use crate::tuning::RunnerBalance;

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;
const LCG_MODULUS: f64 = 4_294_967_296.0;

/// Advance the seed and return a draw in [0, 1)
pub fn next_random(seed: &mut u32) -> f64 {
    *seed = seed.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
    f64::from(*seed) / LCG_MODULUS
}

fn random_int_inclusive(seed: &mut u32, min: u32, max: u32) -> u32 {
    let span = max.saturating_sub(min) + 1;
    (next_random(seed) * f64::from(span)).floor() as u32 + min
}

fn random_lane(seed: &mut u32) -> Lane {
    let index = random_int_inclusive(seed, 0, 2) as usize;
    Lane::ALL[index.min(Lane::ALL.len() - 1)]
}

fn roll(seed: &mut u32, chance: f32) -> bool {
    next_random(seed) < f64::from(chance)
}

/// Generate content for a freshly appended tile
fn spawn_tile_content(
    balance: &RunnerBalance,
    track: &mut Track,
    tile_index: usize,
    tile: &RunnerTile,
    obstacles: &mut Vec<Obstacle>,
    tokens: &mut Vec<Token>,
) {
    let seed = &mut track.seed;
    if tile_index < balance.warmup_tiles || tile.required_turn.is_some() {
        return;
    }

    if roll(seed, balance.obstacle_chance) {
        let kind_roll = next_random(seed);
        let kind = if kind_roll < f64::from(balance.firewall_roll) {
            ObstacleKind::Firewall
        } else if kind_roll < f64::from(balance.sniffer_roll) {
            ObstacleKind::Sniffer
        } else {
            ObstacleKind::Congestion
        };
        let span = tile.length - balance.obstacle_front_margin - balance.obstacle_back_margin;
        let offset = balance.obstacle_front_margin + next_random(seed) as f32 * span;
        let lane = random_lane(seed);

        obstacles.push(Obstacle {
            id: track.next_obstacle_id,
            tile_index,
            lane,
            offset,
            kind,
            resolved: false,
        });
        track.next_obstacle_id += 1;
    }

    if roll(seed, balance.token_chance) {
        let lane = random_lane(seed);
        let count = random_int_inclusive(seed, balance.token_cluster_min, balance.token_cluster_max);
        let span = tile.length - balance.token_front_margin - balance.token_back_margin;
        let base_offset = balance.token_front_margin + next_random(seed) as f32 * span;

        for index in 0..count {
            let offset = base_offset + index as f32 * balance.token_spacing;
            if offset >= tile.length - balance.token_end_margin {
                break;
            }
            tokens.push(Token {
                id: track.next_token_id,
                tile_index,
                lane,
                offset,
                collected: false,
            });
            track.next_token_id += 1;
        }
    }
}

/// Append one tile at the generation cursor
pub fn append_tile(state: &mut RunnerState) {
    let RunnerState {
        balance,
        track,
        obstacles,
        tokens,
        ..
    } = state;

    let mut tile = RunnerTile {
        id: track.next_tile_id,
        start: track.generation_cursor,
        heading: track.generation_heading,
        length: balance.tile_length,
        required_turn: None,
    };
    track.next_tile_id += 1;

    track.next_turn_in -= 1;
    if track.next_turn_in <= 0 && track.tiles.len() >= balance.warmup_tiles {
        tile.required_turn = Some(if next_random(&mut track.seed) < 0.5 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        });
        track.next_turn_in =
            random_int_inclusive(&mut track.seed, balance.min_turn_interval, balance.max_turn_interval) as i32;
    }

    let tile_index = track.tiles.len();
    spawn_tile_content(balance, track, tile_index, &tile, obstacles, tokens);

    track.generation_cursor = tile.end();
    if let Some(turn) = tile.required_turn {
        track.generation_heading = tile.heading.rotated(turn);
    }
    track.tiles.push(tile);
}

/// Generate the opening stretch
pub fn bootstrap(state: &mut RunnerState) {
    while state.track.tiles.len() < state.balance.initial_tiles {
        append_tile(state);
    }
}

/// Keep `tiles_ahead_target` tiles generated from the current one onward
pub fn ensure_ahead(state: &mut RunnerState) {
    while state.track.tiles.len().saturating_sub(state.track.current_tile_index)
        < state.balance.tiles_ahead_target
    {
        append_tile(state);
    }
}
