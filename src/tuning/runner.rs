//! Balance for the endless lane runner

use serde::{Deserialize, Serialize};

use super::{TuningError, ensure_non_negative, ensure_positive};
use crate::consts::{EVENT_BUFFER_SIZE, MAX_FRAME_SECONDS};

/// Balance table for the runner variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerBalance {
    pub max_frame_seconds: f32,
    pub event_buffer_size: usize,
    /// Lives at run start
    pub max_integrity: u32,

    // === Track shape ===
    pub tile_length: f32,
    /// Tiles generated when the run starts
    pub initial_tiles: usize,
    /// Tiles kept generated ahead of the current one
    pub tiles_ahead_target: usize,
    pub min_turn_interval: u32,
    pub max_turn_interval: u32,
    /// Countdown to the first junction
    pub first_turn_in: i32,
    /// Tiles below this index never hold content or junctions
    pub warmup_tiles: usize,

    // === Spawning ===
    pub obstacle_chance: f32,
    /// Type roll below this is a firewall
    pub firewall_roll: f32,
    /// Type roll below this (and above `firewall_roll`) is a sniffer
    pub sniffer_roll: f32,
    pub obstacle_front_margin: f32,
    pub obstacle_back_margin: f32,
    pub token_chance: f32,
    pub token_cluster_min: u32,
    pub token_cluster_max: u32,
    pub token_front_margin: f32,
    pub token_back_margin: f32,
    pub token_spacing: f32,
    pub token_end_margin: f32,

    // === Movement ===
    pub base_speed: f32,
    pub max_speed: f32,
    pub speed_acceleration: f32,
    pub lane_width: f32,
    /// Lane easing rate (fraction of the gap closed per second, capped at 1 per step)
    pub lane_ease_rate: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub slide_duration: f32,
    pub collision_invulnerability: f32,

    // === Interaction windows ===
    pub firewall_clear_height: f32,
    pub lane_tolerance: f32,
    pub token_pickup_window: f32,
    pub obstacle_hit_window: f32,
    /// Distance before a junction's end where left/right become turns
    pub turn_decision_window: f32,

    // === Scoring ===
    pub token_score: f32,
    pub turn_score: f32,
    pub distance_score_rate: f32,

    pub default_seed: u32,
}

impl Default for RunnerBalance {
    fn default() -> Self {
        Self {
            max_frame_seconds: MAX_FRAME_SECONDS,
            event_buffer_size: EVENT_BUFFER_SIZE,
            max_integrity: 3,

            tile_length: 12.0,
            initial_tiles: 18,
            tiles_ahead_target: 20,
            min_turn_interval: 6,
            max_turn_interval: 11,
            first_turn_in: 8,
            warmup_tiles: 6,

            obstacle_chance: 0.56,
            firewall_roll: 0.36,
            sniffer_roll: 0.72,
            obstacle_front_margin: 1.9,
            obstacle_back_margin: 1.2,
            token_chance: 0.74,
            token_cluster_min: 2,
            token_cluster_max: 5,
            token_front_margin: 1.1,
            token_back_margin: 2.5,
            token_spacing: 1.08,
            token_end_margin: 0.4,

            base_speed: 9.0,
            max_speed: 24.0,
            speed_acceleration: 0.1,
            lane_width: 2.2,
            lane_ease_rate: 12.0,
            gravity: -28.0,
            jump_velocity: 10.5,
            slide_duration: 0.75,
            collision_invulnerability: 1.2,

            firewall_clear_height: 0.9,
            lane_tolerance: 0.45,
            token_pickup_window: 0.7,
            obstacle_hit_window: 0.55,
            turn_decision_window: 5.5,

            token_score: 50.0,
            turn_score: 120.0,
            distance_score_rate: 10.0,

            default_seed: 1337,
        }
    }
}

impl RunnerBalance {
    /// Parse a (possibly partial) balance table and validate it
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let balance: Self = serde_json::from_str(json)?;
        balance.validate()?;
        Ok(balance)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        ensure_positive("max_frame_seconds", self.max_frame_seconds)?;
        ensure_positive("base_speed", self.base_speed)?;
        ensure_positive("max_speed", self.max_speed)?;
        ensure_non_negative("speed_acceleration", self.speed_acceleration)?;
        ensure_positive("lane_width", self.lane_width)?;
        ensure_positive("jump_velocity", self.jump_velocity)?;
        ensure_non_negative("turn_decision_window", self.turn_decision_window)?;
        if self.gravity >= 0.0 || !self.gravity.is_finite() {
            return Err(TuningError::OutOfRange {
                field: "gravity",
                value: self.gravity,
                expected: "finite and < 0",
            });
        }
        // Content must fit inside a tile
        let min_length = (self.obstacle_front_margin + self.obstacle_back_margin)
            .max(self.token_front_margin + self.token_back_margin);
        if !(self.tile_length > min_length) {
            return Err(TuningError::OutOfRange {
                field: "tile_length",
                value: self.tile_length,
                expected: "longer than the spawn margins",
            });
        }
        if self.min_turn_interval == 0 || self.min_turn_interval > self.max_turn_interval {
            return Err(TuningError::OutOfRange {
                field: "min_turn_interval",
                value: self.min_turn_interval as f32,
                expected: "between 1 and max_turn_interval",
            });
        }
        if self.token_cluster_min > self.token_cluster_max {
            return Err(TuningError::OutOfRange {
                field: "token_cluster_min",
                value: self.token_cluster_min as f32,
                expected: "<= token_cluster_max",
            });
        }
        if self.max_integrity == 0 {
            return Err(TuningError::OutOfRange {
                field: "max_integrity",
                value: 0.0,
                expected: ">= 1",
            });
        }
        if self.tiles_ahead_target == 0 {
            return Err(TuningError::OutOfRange {
                field: "tiles_ahead_target",
                value: 0.0,
                expected: ">= 1",
            });
        }
        Ok(())
    }
}
