//! Per-owner cooldown for reaction-driven actions.
//!
//! A reaction inside the window is rejected with the remaining wait; a
//! rejected attempt does not restart the window.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::pet::errors::PetError;
use crate::pet::types::OwnerId;

fn ceil_secs(left: Duration) -> i64 {
    let secs = left.num_seconds() + i64::from(left.num_milliseconds() % 1000 != 0);
    secs.max(1)
}

pub struct Cooldowns {
    window: Duration,
    last_accepted: RwLock<HashMap<OwnerId, DateTime<Utc>>>,
}

impl Cooldowns {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: RwLock::new(HashMap::new()),
        }
    }

    /// Accept and stamp the attempt, or reject with [`PetError::CoolingDown`].
    pub fn check_and_touch(&self, owner_id: OwnerId, now: DateTime<Utc>) -> Result<(), PetError> {
        let mut last = self.last_accepted.write().unwrap_or_else(|p| p.into_inner());
        if let Some(prev) = last.get(&owner_id) {
            let since = now.signed_duration_since(*prev);
            if since < self.window {
                return Err(PetError::CoolingDown {
                    remaining_secs: ceil_secs(self.window - since),
                });
            }
        }
        last.insert(owner_id, now);
        Ok(())
    }

    /// Owners currently held in the table, cooling or not.
    pub fn tracked(&self) -> usize {
        self.last_accepted
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    /// Drop entries whose window has passed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut last = self.last_accepted.write().unwrap_or_else(|p| p.into_inner());
        let before = last.len();
        let window = self.window;
        last.retain(|_, at| now.signed_duration_since(*at) < window);
        before - last.len()
    }
}
