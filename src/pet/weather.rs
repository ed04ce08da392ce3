//! Process-wide weather. One writer (the tick scheduler) replaces the value
//! once per rotation period; every other caller takes a snapshot and uses it
//! for the whole evaluation.

use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pet::types::StatDelta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    /// Startup state; carries no effect.
    Calm,
    Sunny,
    Rainy,
    Snowy,
    Windy,
}

/// Conditions eligible for rotation. `Calm` is only the initial state.
pub const ROTATION_SET: [WeatherCondition; 4] = [
    WeatherCondition::Sunny,
    WeatherCondition::Rainy,
    WeatherCondition::Snowy,
    WeatherCondition::Windy,
];

impl WeatherCondition {
    pub fn delta(&self) -> StatDelta {
        match self {
            WeatherCondition::Calm => StatDelta::default(),
            WeatherCondition::Sunny => StatDelta::new(0, 5, -5),
            WeatherCondition::Rainy => StatDelta::new(0, -5, 5),
            WeatherCondition::Snowy => StatDelta::new(5, -5, -5),
            WeatherCondition::Windy => StatDelta::new(-5, 0, -5),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Calm => "Calm",
            WeatherCondition::Sunny => "Sunny ☀️",
            WeatherCondition::Rainy => "Rainy 🌧️",
            WeatherCondition::Snowy => "Snowy ❄️",
            WeatherCondition::Windy => "Windy 🌬️",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WeatherCondition::Calm => "The weather is calm today.",
            WeatherCondition::Sunny => "It's a bright sunny day! Pets feel happy but a bit tired.",
            WeatherCondition::Rainy => "It's raining outside. Pets feel gloomy but well-rested.",
            WeatherCondition::Snowy => {
                "It's snowing! Pets are cold and get hungrier, but it's tough on their energy."
            }
            WeatherCondition::Windy => {
                "It's windy today. Pets feel a bit hungry and tired from the strong wind."
            }
        }
    }

    /// Uniform pick; repeating the current condition is allowed.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> WeatherCondition {
        ROTATION_SET[rng.gen_range(0..ROTATION_SET.len())]
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable snapshot of the global weather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalWeather {
    pub condition: WeatherCondition,
    pub effective_since: DateTime<Utc>,
    /// Incremented on every rotation.
    pub generation: u64,
}

pub struct WeatherState {
    current: RwLock<GlobalWeather>,
    period: Duration,
}

impl WeatherState {
    pub fn new(now: DateTime<Utc>, period: Duration) -> Self {
        Self {
            current: RwLock::new(GlobalWeather {
                condition: WeatherCondition::Calm,
                effective_since: now,
                generation: 0,
            }),
            period,
        }
    }

    pub fn snapshot(&self) -> GlobalWeather {
        *self.current.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Rotation is due once a full period has elapsed since the last change.
    pub fn rotation_due(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.snapshot().effective_since) >= self.period
    }

    /// Replace the condition atomically and return the new snapshot.
    pub fn rotate<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> GlobalWeather {
        let condition = WeatherCondition::random(rng);
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = GlobalWeather {
            condition,
            effective_since: now,
            generation: guard.generation + 1,
        };
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn starts_calm_with_no_effect() {
        let state = WeatherState::new(t0(), Duration::hours(24));
        let snap = state.snapshot();
        assert_eq!(snap.condition, WeatherCondition::Calm);
        assert!(snap.condition.delta().is_zero());
        assert_eq!(snap.generation, 0);
    }

    #[test]
    fn rotation_due_uses_elapsed_period() {
        let state = WeatherState::new(t0(), Duration::hours(24));
        assert!(!state.rotation_due(t0() + Duration::hours(23)));
        assert!(state.rotation_due(t0() + Duration::hours(24)));
    }

    #[test]
    fn rotate_picks_from_rotation_set_and_resets_period() {
        let state = WeatherState::new(t0(), Duration::hours(24));
        let mut rng = StdRng::seed_from_u64(11);
        let later = t0() + Duration::hours(25);
        let snap = state.rotate(later, &mut rng);
        assert!(ROTATION_SET.contains(&snap.condition));
        assert_eq!(snap.effective_since, later);
        assert_eq!(snap.generation, 1);
        assert!(!state.rotation_due(later + Duration::hours(1)));
    }
}
