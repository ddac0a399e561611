//! Balance for the packet router

use serde::{Deserialize, Serialize};

use super::{TuningError, ensure_non_negative, ensure_positive};
use crate::consts::{EVENT_BUFFER_SIZE, MAX_FRAME_SECONDS};
use crate::net::AbilityId;

/// Timing for one ability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    /// Seconds the effect stays active
    pub duration: f32,
    /// Seconds before it can be used again (counts from activation)
    pub cooldown: f32,
}

/// Per-ability timing table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbilityDefs {
    pub encrypt: AbilityDef,
    pub decoy: AbilityDef,
    pub burst: AbilityDef,
}

impl Default for AbilityDefs {
    fn default() -> Self {
        Self {
            encrypt: AbilityDef {
                duration: 4.0,
                cooldown: 14.0,
            },
            decoy: AbilityDef {
                duration: 5.0,
                cooldown: 16.0,
            },
            burst: AbilityDef {
                duration: 2.2,
                cooldown: 10.0,
            },
        }
    }
}

impl AbilityDefs {
    pub fn get(&self, ability: AbilityId) -> AbilityDef {
        match ability {
            AbilityId::Encrypt => self.encrypt,
            AbilityId::Decoy => self.decoy,
            AbilityId::Burst => self.burst,
        }
    }
}

/// Balance table for the network variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetBalance {
    pub max_frame_seconds: f32,
    pub max_integrity: f32,

    // === Damage ===
    pub firewall_damage_per_second: f32,
    pub pursuer_damage_per_second: f32,
    /// Damage multiplier while Encrypt is active
    pub encrypt_damage_multiplier: f32,

    // === Movement ===
    pub burst_speed_multiplier: f32,
    pub latency_speed_multiplier: f32,
    /// Latency penalty accrued per second on latency links
    pub latency_penalty_rate: f32,
    /// Latency penalty factor per unit of congestion load
    pub congestion_penalty_factor: f32,

    // === Detection ===
    pub burst_detection_multiplier: f32,
    pub decoy_detection_multiplier: f32,
    pub detection_decay_per_second: f32,
    pub detection_gain_per_second: f32,
    /// Sweep activity below this contributes nothing
    pub sniffer_activity_threshold: f32,
    pub max_detection: f32,
    pub pursuer_threshold: f32,

    // === Congestion ===
    pub congestion_global_growth_per_second: f32,
    pub congestion_travel_growth_per_second: f32,
    pub congestion_decay_per_second: f32,
    pub congestion_travel_slowdown: f32,
    pub max_congestion: f32,

    // === Routing costs ===
    pub congestion_cost_weight: f32,
    pub firewall_cost_penalty: f32,
    pub latency_cost_penalty: f32,
    pub pin_cost_multiplier: f32,

    // === Scoring ===
    pub base_completion_score: f32,
    /// Fraction of the completion score granted to unfinished runs
    pub incomplete_base_fraction: f32,
    pub base_time_score_budget: f32,
    pub time_penalty_per_second: f32,
    pub time_penalty_per_latency: f32,
    pub integrity_score_factor: f32,
    pub token_score: f32,
    pub no_damage_bonus: f32,
    pub no_reroute_bonus: f32,
    pub speedrun_bonus: f32,

    pub event_buffer_size: usize,
    pub abilities: AbilityDefs,
}

impl Default for NetBalance {
    fn default() -> Self {
        Self {
            max_frame_seconds: MAX_FRAME_SECONDS,
            max_integrity: 100.0,

            firewall_damage_per_second: 18.0,
            pursuer_damage_per_second: 10.0,
            encrypt_damage_multiplier: 0.35,

            burst_speed_multiplier: 1.8,
            latency_speed_multiplier: 0.58,
            latency_penalty_rate: 2.4,
            congestion_penalty_factor: 1.3,

            burst_detection_multiplier: 1.45,
            decoy_detection_multiplier: 0.35,
            detection_decay_per_second: 0.2,
            detection_gain_per_second: 0.7,
            sniffer_activity_threshold: 0.45,
            max_detection: 1.5,
            pursuer_threshold: 0.65,

            congestion_global_growth_per_second: 0.035,
            congestion_travel_growth_per_second: 0.28,
            congestion_decay_per_second: 0.09,
            congestion_travel_slowdown: 0.25,
            max_congestion: 2.4,

            congestion_cost_weight: 0.75,
            firewall_cost_penalty: 1.8,
            latency_cost_penalty: 1.25,
            pin_cost_multiplier: 0.62,

            base_completion_score: 1000.0,
            incomplete_base_fraction: 0.25,
            base_time_score_budget: 2200.0,
            time_penalty_per_second: 18.0,
            time_penalty_per_latency: 30.0,
            integrity_score_factor: 12.0,
            token_score: 240.0,
            no_damage_bonus: 350.0,
            no_reroute_bonus: 450.0,
            speedrun_bonus: 350.0,

            event_buffer_size: EVENT_BUFFER_SIZE,
            abilities: AbilityDefs::default(),
        }
    }
}

impl NetBalance {
    /// Parse a (possibly partial) balance table and validate it
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let balance: Self = serde_json::from_str(json)?;
        balance.validate()?;
        Ok(balance)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        ensure_positive("max_frame_seconds", self.max_frame_seconds)?;
        ensure_positive("max_integrity", self.max_integrity)?;
        ensure_positive("max_congestion", self.max_congestion)?;
        ensure_positive("max_detection", self.max_detection)?;
        ensure_non_negative("congestion_cost_weight", self.congestion_cost_weight)?;
        ensure_non_negative("firewall_cost_penalty", self.firewall_cost_penalty)?;
        ensure_non_negative("latency_cost_penalty", self.latency_cost_penalty)?;
        ensure_non_negative("encrypt_damage_multiplier", self.encrypt_damage_multiplier)?;
        if !(self.pin_cost_multiplier > 0.0 && self.pin_cost_multiplier < 1.0) {
            return Err(TuningError::OutOfRange {
                field: "pin_cost_multiplier",
                value: self.pin_cost_multiplier,
                expected: "between 0 and 1 exclusive",
            });
        }
        for (field, def) in [
            ("abilities.encrypt.cooldown", self.abilities.encrypt),
            ("abilities.decoy.cooldown", self.abilities.decoy),
            ("abilities.burst.cooldown", self.abilities.burst),
        ] {
            ensure_positive(field, def.cooldown)?;
            ensure_non_negative(field, def.duration)?;
        }
        Ok(())
    }
}
