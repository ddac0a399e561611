//! Run scoring
//!
//! A pure function of the run state: same inputs, same breakdown.

use serde::{Deserialize, Serialize};

use super::state::NetState;

/// Which optional challenges a run satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenges {
    pub no_damage: bool,
    pub no_reroutes: bool,
    pub speedrun: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: u32,
    pub time: u32,
    pub integrity: u32,
    pub tokens: u32,
    pub challenge: u32,
    pub total: u32,
    pub challenges: Challenges,
}

fn non_negative_round(value: f32) -> u32 {
    value.round().max(0.0) as u32
}

/// Score a run. `completed` is true only for a reached goal.
pub fn compute_score(state: &NetState, completed: bool) -> ScoreBreakdown {
    let balance = &state.balance;
    let run = &state.run;

    let challenges = Challenges {
        no_damage: !run.took_damage,
        no_reroutes: run.reroute_count == 0,
        speedrun: completed && run.elapsed_seconds <= state.level.speedrun_target_seconds(),
    };

    let base = if completed {
        non_negative_round(balance.base_completion_score)
    } else {
        non_negative_round(balance.base_completion_score * balance.incomplete_base_fraction)
    };

    let time_penalty = run.elapsed_seconds * balance.time_penalty_per_second
        + run.latency_penalty * balance.time_penalty_per_latency;
    let time = non_negative_round(balance.base_time_score_budget - time_penalty);
    let integrity = non_negative_round(state.packet.integrity * balance.integrity_score_factor);
    let tokens = non_negative_round(state.world.collected_tokens.len() as f32 * balance.token_score);

    let mut challenge = 0.0;
    if challenges.no_damage {
        challenge += balance.no_damage_bonus;
    }
    if challenges.no_reroutes {
        challenge += balance.no_reroute_bonus;
    }
    if challenges.speedrun {
        challenge += balance.speedrun_bonus;
    }
    let challenge = non_negative_round(challenge);

    ScoreBreakdown {
        base,
        time,
        integrity,
        tokens,
        challenge,
        total: base + time + integrity + tokens + challenge,
        challenges,
    }
}
