//! Stat engine: pure transforms from a pet (plus clock reading and RNG) to a
//! new stat triple and a short effect summary. Nothing here persists.
//!
//! Every operation checks the freeze window first. A frozen pet yields
//! [`Outcome::Frozen`] and no other effect is computed.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pet::errors::PetError;
use crate::pet::freeze::is_frozen;
use crate::pet::types::{Action, PetRecord, StatDelta, Stats};
use crate::pet::weather::GlobalWeather;

pub const FEED_DELTA: StatDelta = StatDelta::new(-20, 5, 0);
pub const PLAY_DELTA: StatDelta = StatDelta::new(10, 20, -10);
pub const REST_DELTA: StatDelta = StatDelta::new(20, 0, 30);

/// Inclusive roll range for one decay component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayRange {
    pub min: i32,
    pub max: i32,
}

impl DecayRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        rng.gen_range(lo..=hi)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hunger increase per decay tick.
    #[serde(default = "default_hunger_decay")]
    pub hunger_decay: DecayRange,
    /// Happiness decrease per decay tick.
    #[serde(default = "default_happiness_decay")]
    pub happiness_decay: DecayRange,
    /// Energy decrease per decay tick.
    #[serde(default = "default_energy_decay")]
    pub energy_decay: DecayRange,
    /// Probability (0.0..=1.0) that a decay tick also triggers a random event.
    #[serde(default = "default_random_event_chance")]
    pub random_event_chance: f64,
    #[serde(default = "default_adventure_min_energy")]
    pub adventure_min_energy: u8,
    #[serde(default = "default_adventure_energy_cost")]
    pub adventure_energy_cost: u8,
}

fn default_hunger_decay() -> DecayRange {
    DecayRange::new(2, 5)
}

fn default_happiness_decay() -> DecayRange {
    DecayRange::new(1, 4)
}

fn default_energy_decay() -> DecayRange {
    DecayRange::new(1, 3)
}

fn default_random_event_chance() -> f64 {
    0.20
}

fn default_adventure_min_energy() -> u8 {
    20
}

fn default_adventure_energy_cost() -> u8 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hunger_decay: default_hunger_decay(),
            happiness_decay: default_happiness_decay(),
            energy_decay: default_energy_decay(),
            random_event_chance: default_random_event_chance(),
            adventure_min_energy: default_adventure_min_energy(),
            adventure_energy_cost: default_adventure_energy_cost(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, range) in [
            ("hunger_decay", self.hunger_decay),
            ("happiness_decay", self.happiness_decay),
            ("energy_decay", self.energy_decay),
        ] {
            if range.min < 0 || range.min > range.max {
                return Err(format!(
                    "{} must satisfy 0 <= min <= max (got {}..={})",
                    name, range.min, range.max
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.random_event_chance) {
            return Err(format!(
                "random_event_chance must be within 0.0..=1.0 (got {})",
                self.random_event_chance
            ));
        }
        Ok(())
    }
}

/// One entry in the random event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomEvent {
    pub description: &'static str,
    pub delta: StatDelta,
    pub weight: u32,
}

pub const RANDOM_EVENTS: [RandomEvent; 4] = [
    RandomEvent {
        description: "Your pet found a hidden treasure!",
        delta: StatDelta::new(-10, 5, 10),
        weight: 2,
    },
    RandomEvent {
        description: "Your pet had a bad dream.",
        delta: StatDelta::new(-5, -10, -10),
        weight: 3,
    },
    RandomEvent {
        description: "Your pet made a new friend!",
        delta: StatDelta::new(-10, 10, -5),
        weight: 2,
    },
    RandomEvent {
        description: "Your pet is feeling lazy today.",
        delta: StatDelta::new(-5, -10, -10),
        weight: 3,
    },
];

pub const ADVENTURE_OUTCOMES: [&str; 5] = [
    "explored a mossy forest and came back covered in leaves",
    "chased a butterfly all the way to the river",
    "found a shiny pebble and guarded it proudly",
    "got lost in a meadow and found the way home",
    "climbed a hill to watch the clouds roll by",
];

fn pick_event<R: Rng + ?Sized>(rng: &mut R) -> &'static RandomEvent {
    let total: u32 = RANDOM_EVENTS.iter().map(|e| e.weight).sum();
    let mut roll = rng.gen_range(0..total);
    for event in RANDOM_EVENTS.iter() {
        if roll < event.weight {
            return event;
        }
        roll -= event.weight;
    }
    &RANDOM_EVENTS[RANDOM_EVENTS.len() - 1]
}

/// Result of a stat engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Pet is inside a freeze window; nothing changed.
    Frozen,
    Applied { stats: Stats, summary: String },
}

impl Outcome {
    /// Stats after the operation; the input stats when frozen.
    pub fn stats_or(&self, current: Stats) -> Stats {
        match self {
            Outcome::Frozen => current,
            Outcome::Applied { stats, .. } => *stats,
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Outcome::Frozen)
    }
}

pub struct StatEngine {
    cfg: EngineConfig,
}

impl StatEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn feed(&self, pet: &PetRecord, now: DateTime<Utc>) -> Outcome {
        self.fixed(pet, now, FEED_DELTA, "is happily munching on food! 🍗")
    }

    pub fn play(&self, pet: &PetRecord, now: DateTime<Utc>) -> Outcome {
        self.fixed(pet, now, PLAY_DELTA, "is having fun playing! 🎾")
    }

    pub fn rest(&self, pet: &PetRecord, now: DateTime<Utc>) -> Outcome {
        self.fixed(pet, now, REST_DELTA, "is peacefully sleeping! 💤")
    }

    fn fixed(&self, pet: &PetRecord, now: DateTime<Utc>, delta: StatDelta, what: &str) -> Outcome {
        if is_frozen(pet, now) {
            return Outcome::Frozen;
        }
        let stats = pet.stats.apply(delta);
        Outcome::Applied {
            stats,
            summary: format!("{} {} {}", pet.name, what, stats),
        }
    }

    /// Costs energy and picks a flavor outcome; rejected below the energy floor.
    pub fn adventure<R: Rng + ?Sized>(
        &self,
        pet: &PetRecord,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Outcome, PetError> {
        if is_frozen(pet, now) {
            return Ok(Outcome::Frozen);
        }
        if pet.stats.energy < self.cfg.adventure_min_energy {
            return Err(PetError::InsufficientEnergy {
                needed: self.cfg.adventure_min_energy,
                available: pet.stats.energy,
            });
        }
        let flavor = ADVENTURE_OUTCOMES[rng.gen_range(0..ADVENTURE_OUTCOMES.len())];
        let stats = pet
            .stats
            .apply(StatDelta::new(0, 0, -(self.cfg.adventure_energy_cost as i32)));
        Ok(Outcome::Applied {
            stats,
            summary: format!("{} {}. {}", pet.name, flavor, stats),
        })
    }

    pub fn act<R: Rng + ?Sized>(
        &self,
        action: Action,
        pet: &PetRecord,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Outcome, PetError> {
        match action {
            Action::Feed => Ok(self.feed(pet, now)),
            Action::Play => Ok(self.play(pet, now)),
            Action::Rest => Ok(self.rest(pet, now)),
            Action::Adventure => self.adventure(pet, now, rng),
        }
    }

    pub fn apply_random_event<R: Rng + ?Sized>(
        &self,
        pet: &PetRecord,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Outcome {
        if is_frozen(pet, now) {
            return Outcome::Frozen;
        }
        let event = pick_event(rng);
        Outcome::Applied {
            stats: pet.stats.apply(event.delta),
            summary: event.description.to_string(),
        }
    }

    /// Apply the condition of a weather snapshot. The caller guarantees one
    /// application per pet per rotation.
    pub fn apply_weather(
        &self,
        pet: &PetRecord,
        now: DateTime<Utc>,
        weather: &GlobalWeather,
    ) -> Outcome {
        if is_frozen(pet, now) {
            return Outcome::Frozen;
        }
        Outcome::Applied {
            stats: pet.stats.apply(weather.condition.delta()),
            summary: weather.condition.description().to_string(),
        }
    }

    /// Hourly wear: hunger up, happiness and energy down, then maybe a random event.
    pub fn decay_tick<R: Rng + ?Sized>(
        &self,
        pet: &PetRecord,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Outcome {
        if is_frozen(pet, now) {
            return Outcome::Frozen;
        }
        let delta = StatDelta::new(
            self.cfg.hunger_decay.roll(rng),
            -self.cfg.happiness_decay.roll(rng),
            -self.cfg.energy_decay.roll(rng),
        );
        let mut stats = pet.stats.apply(delta);
        let mut summary = format!("decay {}", delta);
        if rng.gen_bool(self.cfg.random_event_chance.clamp(0.0, 1.0)) {
            let event = pick_event(rng);
            stats = stats.apply(event.delta);
            summary.push_str("; ");
            summary.push_str(event.description);
        }
        Outcome::Applied { stats, summary }
    }
}
