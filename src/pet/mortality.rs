use serde::{Deserialize, Serialize};

use crate::pet::types::{DeathCause, DeathEvent, PetRecord, STAT_MAX};

/// Lethal thresholds. One instance is shared by the mutation gateway and the
/// dead-pet sweep so both paths agree on who is dead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortalityPolicy {
    /// Treat `energy == 0` as fatal.
    #[serde(default)]
    pub exhaustion_lethal: bool,
}

impl MortalityPolicy {
    /// Returns the cause of death, or `None` while the pet is alive.
    /// Checked in order: starvation, running away, exhaustion.
    pub fn check(&self, pet: &PetRecord) -> Option<DeathCause> {
        if pet.stats.hunger >= STAT_MAX {
            return Some(DeathCause::Starvation);
        }
        if pet.stats.happiness == 0 {
            return Some(DeathCause::RanAway);
        }
        if self.exhaustion_lethal && pet.stats.energy == 0 {
            return Some(DeathCause::Exhaustion);
        }
        None
    }

    pub fn death_event(&self, pet: &PetRecord) -> Option<DeathEvent> {
        self.check(pet).map(|cause| DeathEvent {
            owner_id: pet.owner_id,
            pet_name: pet.name.clone(),
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::types::Stats;
    use chrono::Utc;

    fn pet_with(hunger: i32, happiness: i32, energy: i32) -> PetRecord {
        let mut pet = PetRecord::new(3, "Mochi", Utc::now());
        pet.stats = Stats::new(hunger, happiness, energy);
        pet
    }

    #[test]
    fn starvation_and_running_away() {
        let policy = MortalityPolicy::default();
        assert_eq!(
            policy.check(&pet_with(100, 50, 50)),
            Some(DeathCause::Starvation)
        );
        assert_eq!(policy.check(&pet_with(50, 0, 50)), Some(DeathCause::RanAway));
        assert_eq!(policy.check(&pet_with(99, 1, 0)), None);
    }

    #[test]
    fn exhaustion_is_opt_in() {
        let lethal = MortalityPolicy {
            exhaustion_lethal: true,
        };
        let event = lethal.death_event(&pet_with(10, 10, 0)).expect("dead");
        assert_eq!(event.cause, DeathCause::Exhaustion);
        assert_eq!(event.pet_name, "Mochi");
        assert_eq!(event.owner_id, 3);
    }

    #[test]
    fn starvation_wins_over_other_causes() {
        let lethal = MortalityPolicy {
            exhaustion_lethal: true,
        };
        assert_eq!(lethal.check(&pet_with(100, 0, 0)), Some(DeathCause::Starvation));
    }
}
