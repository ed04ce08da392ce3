use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const PET_SCHEMA_VERSION: u8 = 1;

/// Upper bound shared by hunger, happiness and energy.
pub const STAT_MAX: u8 = 100;

pub const INITIAL_HUNGER: u8 = 50;
pub const INITIAL_HAPPINESS: u8 = 50;
pub const INITIAL_ENERGY: u8 = 50;

/// Maximum pet name length in characters.
pub const MAX_NAME_CHARS: usize = 32;

/// Stable external identity of a pet owner (chat user id).
pub type OwnerId = u64;

/// Signed change applied to a stat triple before clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub hunger: i32,
    pub happiness: i32,
    pub energy: i32,
}

impl StatDelta {
    pub const fn new(hunger: i32, happiness: i32, energy: i32) -> Self {
        Self {
            hunger,
            happiness,
            energy,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.hunger == 0 && self.happiness == 0 && self.energy == 0
    }
}

impl std::ops::Add for StatDelta {
    type Output = StatDelta;

    fn add(self, rhs: StatDelta) -> StatDelta {
        StatDelta::new(
            self.hunger + rhs.hunger,
            self.happiness + rhs.happiness,
            self.energy + rhs.energy,
        )
    }
}

impl fmt::Display for StatDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hunger {:+}, happiness {:+}, energy {:+}",
            self.hunger, self.happiness, self.energy
        )
    }
}

/// The three bounded attributes. Lower hunger is better; higher happiness and
/// energy are better. Values never leave `0..=STAT_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hunger: u8,
    pub happiness: u8,
    pub energy: u8,
}

impl Stats {
    pub fn new(hunger: i32, happiness: i32, energy: i32) -> Self {
        Self {
            hunger: clamp_stat(hunger),
            happiness: clamp_stat(happiness),
            energy: clamp_stat(energy),
        }
    }

    /// Apply a delta, clamping every component into range.
    pub fn apply(self, delta: StatDelta) -> Stats {
        Stats::new(
            self.hunger as i32 + delta.hunger,
            self.happiness as i32 + delta.happiness,
            self.energy as i32 + delta.energy,
        )
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            hunger: INITIAL_HUNGER,
            happiness: INITIAL_HAPPINESS,
            energy: INITIAL_ENERGY,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hunger: {}/{}, Happiness: {}/{}, Energy: {}/{}",
            self.hunger, STAT_MAX, self.happiness, STAT_MAX, self.energy, STAT_MAX
        )
    }
}

pub fn clamp_stat(value: i32) -> u8 {
    value.clamp(0, STAT_MAX as i32) as u8
}

/// One live pet per owner. Death deletes the record.
///
/// Timestamps are persisted as epoch seconds, so sub-second precision is
/// dropped on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetRecord {
    pub owner_id: OwnerId,
    pub name: String,
    pub stats: Stats,
    pub coins: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub birth_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub last_claimed: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub freeze_end: Option<DateTime<Utc>>,
    pub schema_version: u8,
}

impl PetRecord {
    pub fn new(owner_id: OwnerId, name: &str, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            name: name.to_string(),
            stats: Stats::default(),
            coins: 0,
            birth_time: truncate_to_seconds(now),
            last_claimed: None,
            freeze_end: None,
            schema_version: PET_SCHEMA_VERSION,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.birth_time)
    }

    /// Age in whole days, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        self.age(now).num_days().max(0)
    }

    pub fn mood(&self) -> Mood {
        Mood::of(&self.stats)
    }
}

/// Drop sub-second precision so in-memory values match what the store keeps.
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}

/// Human-facing summary of a pet's condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Hungry,
    Tired,
    Sad,
    Neutral,
}

impl Mood {
    pub fn of(stats: &Stats) -> Mood {
        if stats.happiness > 80 && stats.energy > 60 {
            Mood::Happy
        } else if stats.hunger > 80 {
            Mood::Hungry
        } else if stats.energy < 20 {
            Mood::Tired
        } else if stats.happiness < 30 {
            Mood::Sad
        } else {
            Mood::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy 😊",
            Mood::Hungry => "Hungry 🍗",
            Mood::Tired => "Tired 😴",
            Mood::Sad => "Sad 😢",
            Mood::Neutral => "Neutral 😐",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a pet died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    RanAway,
    Exhaustion,
}

impl DeathCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeathCause::Starvation => "starvation",
            DeathCause::RanAway => "ran away",
            DeathCause::Exhaustion => "exhaustion",
        }
    }
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured notice emitted when a record is deleted by the mortality rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    pub owner_id: OwnerId,
    pub pet_name: String,
    pub cause: DeathCause,
}

impl DeathEvent {
    pub fn message(&self) -> String {
        match self.cause {
            DeathCause::Starvation => format!("Oh no! {} has starved... 💀", self.pet_name),
            DeathCause::RanAway => {
                format!("{} is too sad and has run away... 😢", self.pet_name)
            }
            DeathCause::Exhaustion => {
                format!("{} collapsed from exhaustion... 💤💀", self.pet_name)
            }
        }
    }
}

/// User-initiated stat actions routed through `act`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Feed,
    Play,
    Rest,
    Adventure,
}

impl Action {
    /// Parse a verb or reaction emoji (case-insensitive).
    pub fn parse(s: &str) -> Option<Action> {
        match s.trim().to_lowercase().as_str() {
            "feed" | "f" | "🍗" | "🍔" => Some(Action::Feed),
            "play" | "p" | "🎾" | "🎉" => Some(Action::Play),
            "rest" | "sleep" | "r" | "💤" => Some(Action::Rest),
            "adventure" | "adv" | "a" | "🗺️" => Some(Action::Adventure),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Feed => "feed",
            Action::Play => "play",
            Action::Rest => "rest",
            Action::Adventure => "adventure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_clamps_both_ends() {
        let stats = Stats::new(95, 3, 50);
        let next = stats.apply(StatDelta::new(20, -10, 0));
        assert_eq!(next.hunger, 100);
        assert_eq!(next.happiness, 0);
        assert_eq!(next.energy, 50);
    }

    #[test]
    fn new_record_uses_initial_stats() {
        let now = Utc::now();
        let pet = PetRecord::new(7, "Rex", now);
        assert_eq!(pet.stats, Stats::new(50, 50, 50));
        assert_eq!(pet.coins, 0);
        assert!(pet.last_claimed.is_none());
        assert!(pet.freeze_end.is_none());
        assert_eq!(pet.birth_time.timestamp(), now.timestamp());
    }

    #[test]
    fn mood_priority_order() {
        assert_eq!(Mood::of(&Stats::new(90, 90, 90)), Mood::Happy);
        assert_eq!(Mood::of(&Stats::new(90, 50, 50)), Mood::Hungry);
        assert_eq!(Mood::of(&Stats::new(10, 50, 10)), Mood::Tired);
        assert_eq!(Mood::of(&Stats::new(10, 20, 50)), Mood::Sad);
        assert_eq!(Mood::of(&Stats::new(50, 50, 50)), Mood::Neutral);
    }

    #[test]
    fn action_parse_accepts_emoji_and_words() {
        assert_eq!(Action::parse("FEED"), Some(Action::Feed));
        assert_eq!(Action::parse("🎾"), Some(Action::Play));
        assert_eq!(Action::parse("sleep"), Some(Action::Rest));
        assert_eq!(Action::parse("dance"), None);
    }
}
