//! Data-driven game balance
//!
//! Every tunable number the step functions read lives here. Defaults carry
//! the shipped balance; JSON overrides can replace any subset of fields.

pub mod net;
pub mod runner;

pub use net::{AbilityDef, AbilityDefs, NetBalance};
pub use runner::RunnerBalance;

use thiserror::Error;

/// Problems loading or validating a balance table
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("balance JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        expected: &'static str,
    },
}

pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value,
            expected: "finite and > 0",
        })
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value,
            expected: "finite and >= 0",
        })
    }
}
