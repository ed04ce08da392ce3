//! Mutation gateway: the only path that writes pet records.
//!
//! Every read-modify-write runs while holding an owner-scoped async lock for
//! the whole load → compute → save span, so a tick sweep and a user command
//! touching the same owner are totally ordered. Different owners never
//! contend. Lock entries are dropped from the table once nobody holds or
//! waits on them.
//!
//! Records written through [`Write::Save`] pass the mortality rule first: a
//! lethal record is deleted instead of saved and a [`DeathEvent`] is emitted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::logutil::escape_log;
use crate::pet::errors::PetError;
use crate::pet::mortality::MortalityPolicy;
use crate::pet::notify::Notifier;
use crate::pet::storage::PetRepository;
use crate::pet::types::{DeathEvent, OwnerId, PetRecord};

/// What to do with an owner's slot after the closure ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Persist (or delete, if the record is now lethal).
    Save(PetRecord),
    /// Remove the record unconditionally.
    Delete,
    /// Leave storage untouched.
    Keep,
}

/// Value returned by the closure plus any deaths caused by the commit.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub deaths: Vec<DeathEvent>,
}

impl<T> Committed<T> {
    pub fn death(&self) -> Option<&DeathEvent> {
        self.deaths.first()
    }
}

type LockTable = Mutex<HashMap<OwnerId, Arc<AsyncMutex<()>>>>;

/// Keyed lock table, one async mutex per owner currently in use.
#[derive(Default)]
struct OwnerLocks {
    table: LockTable,
}

struct OwnerGuard<'a> {
    table: &'a LockTable,
    owner_id: OwnerId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl OwnerLocks {
    async fn acquire(&self, owner_id: OwnerId) -> OwnerGuard<'_> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|p| p.into_inner());
            table
                .entry(owner_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = entry.lock_owned().await;
        OwnerGuard {
            table: &self.table,
            owner_id,
            guard: Some(guard),
        }
    }

    fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|p| p.into_inner());
        self.guard.take();
        // Only the table itself still references the mutex: nobody is waiting.
        let idle = table
            .get(&self.owner_id)
            .map(|m| Arc::strong_count(m) == 1)
            .unwrap_or(false);
        if idle {
            table.remove(&self.owner_id);
        }
    }
}

pub struct MutationGateway {
    store: Arc<dyn PetRepository>,
    locks: OwnerLocks,
    mortality: MortalityPolicy,
    notifier: Arc<dyn Notifier>,
}

impl MutationGateway {
    pub fn new(
        store: Arc<dyn PetRepository>,
        mortality: MortalityPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            locks: OwnerLocks::default(),
            mortality,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<dyn PetRepository> {
        &self.store
    }

    pub fn mortality(&self) -> &MortalityPolicy {
        &self.mortality
    }

    /// Number of owners with a live lock entry (held or awaited).
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    /// Run `f` against the owner's slot, which may be empty. Used by adopt and
    /// by sweeps that race with deletions.
    pub async fn with_slot<T, F>(&self, owner_id: OwnerId, f: F) -> Result<Committed<T>, PetError>
    where
        F: FnOnce(Option<PetRecord>) -> Result<(Write, T), PetError>,
    {
        let _guard = self.locks.acquire(owner_id).await;
        let current = self.store.get(owner_id)?;
        let (write, value) = f(current)?;
        let deaths = self.commit(vec![(owner_id, write)])?;
        Ok(Committed { value, deaths })
    }

    /// Run `f` against the owner's live pet; [`PetError::NoPet`] if there is none.
    pub async fn with_pet<T, F>(&self, owner_id: OwnerId, f: F) -> Result<Committed<T>, PetError>
    where
        F: FnOnce(PetRecord) -> Result<(Write, T), PetError>,
    {
        self.with_slot(owner_id, |slot| match slot {
            Some(pet) => f(pet),
            None => Err(PetError::NoPet(owner_id)),
        })
        .await
    }

    /// Lock two owners (in ascending id order) and commit both writes as one
    /// batch.
    pub async fn with_pair<T, F>(
        &self,
        first: OwnerId,
        second: OwnerId,
        f: F,
    ) -> Result<Committed<T>, PetError>
    where
        F: FnOnce(PetRecord, PetRecord) -> Result<(Write, Write, T), PetError>,
    {
        if first == second {
            return Err(PetError::InvalidInput(
                "both sides of a pair must be different owners".to_string(),
            ));
        }
        let (lo, hi) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        let _lo_guard = self.locks.acquire(lo).await;
        let _hi_guard = self.locks.acquire(hi).await;
        let a = self.store.get(first)?.ok_or(PetError::NoPet(first))?;
        let b = self.store.get(second)?.ok_or(PetError::NoPet(second))?;
        let (wa, wb, value) = f(a, b)?;
        let deaths = self.commit(vec![(first, wa), (second, wb)])?;
        Ok(Committed { value, deaths })
    }

    /// Delete the owner's pet if it already satisfies the mortality rule.
    pub async fn reap(&self, owner_id: OwnerId) -> Result<Option<DeathEvent>, PetError> {
        let committed = self
            .with_slot(owner_id, |slot| {
                let write = match slot {
                    Some(pet) if self.mortality.check(&pet).is_some() => Write::Save(pet),
                    _ => Write::Keep,
                };
                Ok((write, ()))
            })
            .await?;
        Ok(committed.deaths.into_iter().next())
    }

    /// Caller must hold the locks for every owner in `writes`.
    fn commit(&self, writes: Vec<(OwnerId, Write)>) -> Result<Vec<DeathEvent>, PetError> {
        let mut puts = Vec::new();
        let mut deletes = Vec::new();
        let mut deaths = Vec::new();
        for (owner_id, write) in writes {
            match write {
                Write::Save(pet) => {
                    debug_assert_eq!(pet.owner_id, owner_id);
                    match self.mortality.death_event(&pet) {
                        Some(event) => {
                            deletes.push(owner_id);
                            deaths.push(event);
                        }
                        None => puts.push(pet),
                    }
                }
                Write::Delete => deletes.push(owner_id),
                Write::Keep => {}
            }
        }
        if puts.is_empty() && deletes.is_empty() {
            return Ok(deaths);
        }
        self.store.commit_batch(&puts, &deletes)?;
        debug!(
            "committed {} save(s), {} delete(s)",
            puts.len(),
            deletes.len()
        );
        for event in &deaths {
            info!(
                "pet '{}' of owner {} died: {}",
                escape_log(&event.pet_name),
                event.owner_id,
                event.cause
            );
            self.notifier.death(event);
        }
        Ok(deaths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::notify::ChannelNotifier;
    use crate::pet::storage::PetStoreBuilder;
    use crate::pet::types::{DeathCause, Stats};
    use chrono::Utc;
    use tempfile::TempDir;

    fn gateway(dir: &TempDir) -> (MutationGateway, tokio::sync::mpsc::UnboundedReceiver<crate::pet::notify::Notification>) {
        let store = PetStoreBuilder::new(dir.path()).open().expect("store");
        let (notifier, rx) = ChannelNotifier::new();
        (
            MutationGateway::new(Arc::new(store), MortalityPolicy::default(), Arc::new(notifier)),
            rx,
        )
    }

    #[tokio::test]
    async fn with_pet_without_record_is_no_pet() {
        let dir = TempDir::new().expect("tempdir");
        let (gw, _rx) = gateway(&dir);
        let err = gw
            .with_pet(1, |pet| Ok((Write::Save(pet), ())))
            .await
            .unwrap_err();
        assert!(matches!(err, PetError::NoPet(1)));
        assert_eq!(gw.active_locks(), 0);
    }

    #[tokio::test]
    async fn lethal_save_becomes_delete_with_event() {
        let dir = TempDir::new().expect("tempdir");
        let (gw, mut rx) = gateway(&dir);
        gw.store().put(&PetRecord::new(4, "Rex", Utc::now())).expect("put");
        let committed = gw
            .with_pet(4, |mut pet| {
                pet.stats = Stats::new(100, 40, 40);
                Ok((Write::Save(pet), ()))
            })
            .await
            .expect("commit");
        let death = committed.death().expect("death");
        assert_eq!(death.cause, DeathCause::Starvation);
        assert!(gw.store().get(4).expect("get").is_none());
        let notice = rx.try_recv().expect("notified");
        assert_eq!(notice.owner_id, 4);
        assert_eq!(notice.death.map(|d| d.cause), Some(DeathCause::Starvation));
    }

    #[tokio::test]
    async fn rejected_closure_writes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let (gw, _rx) = gateway(&dir);
        let pet = PetRecord::new(2, "Ash", Utc::now());
        gw.store().put(&pet).expect("put");
        let res: Result<Committed<()>, PetError> = gw
            .with_pet(2, |_| Err(PetError::InvalidInput("nope".into())))
            .await;
        assert!(res.is_err());
        assert_eq!(gw.store().get(2).expect("get"), Some(pet));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_owner_updates_are_serialized() {
        let dir = TempDir::new().expect("tempdir");
        let (gw, _rx) = gateway(&dir);
        gw.store().put(&PetRecord::new(7, "Rex", Utc::now())).expect("put");
        let gw = Arc::new(gw);
        let mut tasks = Vec::new();
        for _ in 0..40 {
            let gw = gw.clone();
            tasks.push(tokio::spawn(async move {
                gw.with_pet(7, |mut pet| {
                    let seen = pet.coins;
                    // Widen the load/save window so unsynchronized writers would collide.
                    std::thread::sleep(std::time::Duration::from_millis(1));
                    pet.coins = seen + 1;
                    Ok((Write::Save(pet), ()))
                })
                .await
                .expect("increment");
            }));
        }
        for t in tasks {
            t.await.expect("join");
        }
        assert_eq!(gw.store().get(7).expect("get").expect("present").coins, 40);
        assert_eq!(gw.active_locks(), 0);
    }

    #[tokio::test]
    async fn pair_rejects_same_owner_and_missing_side() {
        let dir = TempDir::new().expect("tempdir");
        let (gw, _rx) = gateway(&dir);
        gw.store().put(&PetRecord::new(1, "A", Utc::now())).expect("put");
        let same = gw
            .with_pair(1, 1, |a, b| Ok((Write::Save(a), Write::Save(b), ())))
            .await;
        assert!(matches!(same, Err(PetError::InvalidInput(_))));
        let missing = gw
            .with_pair(1, 2, |a, b| Ok((Write::Save(a), Write::Save(b), ())))
            .await;
        assert!(matches!(missing, Err(PetError::NoPet(2))));
    }

    #[tokio::test]
    async fn reap_only_removes_dead_records() {
        let dir = TempDir::new().expect("tempdir");
        let (gw, _rx) = gateway(&dir);
        let mut dead = PetRecord::new(1, "Gone", Utc::now());
        dead.stats = Stats::new(30, 0, 30);
        gw.store().put(&dead).expect("put");
        gw.store().put(&PetRecord::new(2, "Fine", Utc::now())).expect("put");
        let event = gw.reap(1).await.expect("reap").expect("dead");
        assert_eq!(event.cause, DeathCause::RanAway);
        assert!(gw.reap(2).await.expect("reap").is_none());
        assert!(gw.reap(3).await.expect("reap").is_none());
        assert_eq!(gw.store().list_owner_ids().expect("ids"), vec![2]);
    }
}
