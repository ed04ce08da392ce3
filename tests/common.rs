//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use petcare::pet::engine::EngineConfig;
use petcare::pet::{
    ChannelNotifier, ManualClock, Notification, OwnerId, PetRecord, PetRepository, PetService,
    PetServiceBuilder, PetStore, PetStoreBuilder, StoreError,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
}

/// A service over a throwaway sled store, a manual clock and a channel
/// notifier. Keep `dir` alive for as long as the store is used.
pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<dyn PetRepository>,
    pub clock: Arc<ManualClock>,
    pub service: PetService,
    pub notices: UnboundedReceiver<Notification>,
}

pub fn open_store(dir: &TempDir) -> Arc<PetStore> {
    Arc::new(PetStoreBuilder::new(dir.path().join("pets")).open().expect("store"))
}

pub fn fixture() -> Fixture {
    fixture_with(|b| b)
}

/// Random events off so decay stays inside the configured ranges.
pub fn quiet_engine() -> EngineConfig {
    EngineConfig {
        random_event_chance: 0.0,
        ..EngineConfig::default()
    }
}

pub fn fixture_with(customize: impl FnOnce(PetServiceBuilder) -> PetServiceBuilder) -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let store: Arc<dyn PetRepository> = open_store(&dir);
    fixture_on(dir, store, customize)
}

pub fn fixture_on(
    dir: TempDir,
    store: Arc<dyn PetRepository>,
    customize: impl FnOnce(PetServiceBuilder) -> PetServiceBuilder,
) -> Fixture {
    let clock = Arc::new(ManualClock::new(t0()));
    let (notifier, notices) = ChannelNotifier::new();
    let builder = PetServiceBuilder::new(store.clone())
        .clock(clock.clone())
        .notifier(Arc::new(notifier))
        .rng_seed(2024);
    let service = customize(builder).build().expect("service");
    Fixture {
        dir,
        store,
        clock,
        service,
        notices,
    }
}

/// Repository wrapper whose writes fail for selected owners.
pub struct FlakyRepository {
    inner: Arc<PetStore>,
    failing: Mutex<HashSet<OwnerId>>,
}

impl FlakyRepository {
    pub fn new(inner: Arc<PetStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_writes_for(&self, owner_id: OwnerId) {
        self.failing.lock().unwrap().insert(owner_id);
    }

    fn check(&self, owner_id: OwnerId) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&owner_id) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("injected write failure for owner {}", owner_id),
            )));
        }
        Ok(())
    }
}

impl PetRepository for FlakyRepository {
    fn get(&self, owner_id: OwnerId) -> Result<Option<PetRecord>, StoreError> {
        self.inner.get(owner_id)
    }

    fn put(&self, pet: &PetRecord) -> Result<(), StoreError> {
        self.check(pet.owner_id)?;
        self.inner.put(pet)
    }

    fn delete(&self, owner_id: OwnerId) -> Result<bool, StoreError> {
        self.check(owner_id)?;
        self.inner.delete(owner_id)
    }

    fn list_owner_ids(&self) -> Result<Vec<OwnerId>, StoreError> {
        self.inner.list_owner_ids()
    }

    fn commit_batch(&self, puts: &[PetRecord], deletes: &[OwnerId]) -> Result<(), StoreError> {
        for id in puts.iter().map(|p| p.owner_id).chain(deletes.iter().copied()) {
            self.check(id)?;
        }
        self.inner.commit_batch(puts, deletes)
    }
}
