//! Coin balance rules: daily claims, scheduled allowance, transfers.
//!
//! Balances never go negative. A debit larger than the balance is rejected
//! with [`PetError::InsufficientCoins`] and leaves the record untouched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::pet::errors::PetError;
use crate::pet::types::PetRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Coins granted by a successful `daily` claim.
    #[serde(default = "default_daily_claim_coins")]
    pub daily_claim_coins: u64,
    /// Minimum hours between two `daily` claims.
    #[serde(default = "default_claim_cooldown_hours")]
    pub claim_cooldown_hours: i64,
    /// Coins credited to every pet by the scheduled allowance sweep.
    #[serde(default = "default_allowance_coins")]
    pub allowance_coins: u64,
    /// Freeze price per requested day.
    #[serde(default = "default_freeze_cost_per_day")]
    pub freeze_cost_per_day: u64,
    #[serde(default = "default_max_freeze_days")]
    pub max_freeze_days: u32,
}

fn default_daily_claim_coins() -> u64 {
    10
}

fn default_claim_cooldown_hours() -> i64 {
    24
}

fn default_allowance_coins() -> u64 {
    1
}

fn default_freeze_cost_per_day() -> u64 {
    1
}

fn default_max_freeze_days() -> u32 {
    30
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            daily_claim_coins: default_daily_claim_coins(),
            claim_cooldown_hours: default_claim_cooldown_hours(),
            allowance_coins: default_allowance_coins(),
            freeze_cost_per_day: default_freeze_cost_per_day(),
            max_freeze_days: default_max_freeze_days(),
        }
    }
}

impl EconomyConfig {
    pub fn claim_cooldown(&self) -> Duration {
        Duration::hours(self.claim_cooldown_hours)
    }
}

/// Result of a `daily` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed { granted: u64, balance: u64 },
    ComeBackLater { remaining: Duration },
}

impl ClaimOutcome {
    pub fn describe(&self) -> String {
        match self {
            ClaimOutcome::Claimed { granted, balance } => format!(
                "Daily reward claimed! +{} coins, you now have {} coins.",
                granted, balance
            ),
            ClaimOutcome::ComeBackLater { remaining } => format!(
                "Come back in {}h {}m to claim your next reward.",
                remaining.num_hours(),
                remaining.num_minutes() % 60
            ),
        }
    }
}

/// Compute the daily claim against `pet`. On success the returned record has
/// the coins credited and `last_claimed = now`; otherwise `pet` is returned
/// unchanged together with the remaining wait.
pub fn claim_daily(
    pet: &PetRecord,
    now: DateTime<Utc>,
    cfg: &EconomyConfig,
) -> (PetRecord, ClaimOutcome) {
    if let Some(last) = pet.last_claimed {
        let elapsed = now.signed_duration_since(last);
        if elapsed < cfg.claim_cooldown() {
            let remaining = cfg.claim_cooldown() - elapsed;
            return (pet.clone(), ClaimOutcome::ComeBackLater { remaining });
        }
    }
    let mut next = pet.clone();
    next.coins = credit(next.coins, cfg.daily_claim_coins);
    next.last_claimed = Some(now);
    let outcome = ClaimOutcome::Claimed {
        granted: cfg.daily_claim_coins,
        balance: next.coins,
    };
    (next, outcome)
}

pub fn credit(balance: u64, amount: u64) -> u64 {
    balance.saturating_add(amount)
}

/// Subtract `amount` or reject; no partial deduction.
pub fn debit(balance: u64, amount: u64) -> Result<u64, PetError> {
    balance
        .checked_sub(amount)
        .ok_or(PetError::InsufficientCoins {
            needed: amount,
            available: balance,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn first_claim_grants_and_stamps() {
        let pet = PetRecord::new(1, "Rex", t0());
        let cfg = EconomyConfig::default();
        let (next, outcome) = claim_daily(&pet, t0(), &cfg);
        assert_eq!(next.coins, 10);
        assert_eq!(next.last_claimed, Some(t0()));
        assert_eq!(
            outcome,
            ClaimOutcome::Claimed {
                granted: 10,
                balance: 10
            }
        );
    }

    #[test]
    fn second_claim_within_window_reports_remaining() {
        let cfg = EconomyConfig::default();
        let mut pet = PetRecord::new(1, "Rex", t0());
        pet.last_claimed = Some(t0());
        pet.coins = 10;
        let (next, outcome) = claim_daily(&pet, t0() + Duration::hours(5), &cfg);
        assert_eq!(next, pet);
        assert_eq!(
            outcome,
            ClaimOutcome::ComeBackLater {
                remaining: Duration::hours(19)
            }
        );
        assert!(outcome.describe().contains("19h 0m"));
    }

    #[test]
    fn claim_allowed_exactly_at_cooldown() {
        let cfg = EconomyConfig::default();
        let mut pet = PetRecord::new(1, "Rex", t0());
        pet.last_claimed = Some(t0());
        let (next, outcome) = claim_daily(&pet, t0() + Duration::hours(24), &cfg);
        assert!(matches!(outcome, ClaimOutcome::Claimed { .. }));
        assert_eq!(next.coins, 10);
    }

    #[test]
    fn debit_rejects_overdraft() {
        assert_eq!(debit(5, 3).unwrap(), 2);
        match debit(2, 3) {
            Err(PetError::InsufficientCoins { needed, available }) => {
                assert_eq!((needed, available), (3, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
