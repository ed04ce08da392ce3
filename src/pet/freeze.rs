//! Paid suspension of every stat effect.
//!
//! Frozen is derived, never stored: `freeze_end` is set and `now` is before
//! it. A new freeze replaces any active window instead of extending it.

use chrono::{DateTime, Duration, Utc};

use crate::pet::economy::{debit, EconomyConfig};
use crate::pet::errors::PetError;
use crate::pet::types::{truncate_to_seconds, PetRecord};

pub fn is_frozen(pet: &PetRecord, now: DateTime<Utc>) -> bool {
    matches!(pet.freeze_end, Some(end) if now < end)
}

pub fn freeze_cost(days: u32, cfg: &EconomyConfig) -> u64 {
    cfg.freeze_cost_per_day.saturating_mul(days as u64)
}

/// Charge for `days` of freeze and set the window to `now + days`.
pub fn apply_freeze(
    pet: &PetRecord,
    days: u32,
    now: DateTime<Utc>,
    cfg: &EconomyConfig,
) -> Result<PetRecord, PetError> {
    if days == 0 {
        return Err(PetError::InvalidInput(
            "freeze needs at least one day".to_string(),
        ));
    }
    if days > cfg.max_freeze_days {
        return Err(PetError::InvalidInput(format!(
            "freeze is limited to {} days",
            cfg.max_freeze_days
        )));
    }
    let cost = freeze_cost(days, cfg);
    let balance = debit(pet.coins, cost)?;
    let mut next = pet.clone();
    next.coins = balance;
    next.freeze_end = Some(truncate_to_seconds(now) + Duration::days(days as i64));
    Ok(next)
}
