use std::path::{Path, PathBuf};

use sled::IVec;

use crate::pet::errors::StoreError;
use crate::pet::types::{OwnerId, PetRecord, PET_SCHEMA_VERSION};

const TREE_PETS: &str = "pets";
const KEY_PREFIX: &str = "pets:";

/// Durable owner → pet mapping consumed by the mutation gateway.
pub trait PetRepository: Send + Sync {
    fn get(&self, owner_id: OwnerId) -> Result<Option<PetRecord>, StoreError>;
    fn put(&self, pet: &PetRecord) -> Result<(), StoreError>;
    /// Returns `true` when a record was removed.
    fn delete(&self, owner_id: OwnerId) -> Result<bool, StoreError>;
    /// Owner ids in ascending order.
    fn list_owner_ids(&self) -> Result<Vec<OwnerId>, StoreError>;

    /// Every stored record, ascending by owner. Records that fail to decode
    /// are skipped by the default implementation so one bad row does not
    /// hide the rest.
    fn list_all(&self) -> Result<Vec<PetRecord>, StoreError> {
        let mut pets = Vec::new();
        for owner_id in self.list_owner_ids()? {
            match self.get(owner_id) {
                Ok(Some(pet)) => pets.push(pet),
                Ok(None) => {}
                Err(e) => log::warn!("skipping unreadable pet record {}: {}", owner_id, e),
            }
        }
        Ok(pets)
    }

    /// Apply several writes as one unit. The default applies them in order;
    /// stores that support it should make the batch atomic.
    fn commit_batch(&self, puts: &[PetRecord], deletes: &[OwnerId]) -> Result<(), StoreError> {
        for pet in puts {
            self.put(pet)?;
        }
        for owner_id in deletes {
            self.delete(*owner_id)?;
        }
        Ok(())
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct PetStoreBuilder {
    path: PathBuf,
}

impl PetStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<PetStore, StoreError> {
        PetStore::open(self.path)
    }
}

/// Sled-backed persistence for pet records.
pub struct PetStore {
    _db: sled::Db,
    pets: sled::Tree,
}

impl PetStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let pets = db.open_tree(TREE_PETS)?;
        Ok(Self { _db: db, pets })
    }

    /// Zero-padded so lexical key order matches numeric owner order.
    fn pet_key(owner_id: OwnerId) -> Vec<u8> {
        format!("{}{:020}", KEY_PREFIX, owner_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, StoreError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }
}

impl PetRepository for PetStore {
    fn get(&self, owner_id: OwnerId) -> Result<Option<PetRecord>, StoreError> {
        let Some(bytes) = self.pets.get(Self::pet_key(owner_id))? else {
            return Ok(None);
        };
        let record: PetRecord = Self::deserialize(bytes)?;
        if record.schema_version != PET_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                entity: "pet",
                expected: PET_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(Some(record))
    }

    fn put(&self, pet: &PetRecord) -> Result<(), StoreError> {
        let mut record = pet.clone();
        record.schema_version = PET_SCHEMA_VERSION;
        let bytes = Self::serialize(&record)?;
        self.pets.insert(Self::pet_key(record.owner_id), bytes)?;
        self.pets.flush()?;
        Ok(())
    }

    fn delete(&self, owner_id: OwnerId) -> Result<bool, StoreError> {
        let removed = self.pets.remove(Self::pet_key(owner_id))?.is_some();
        self.pets.flush()?;
        Ok(removed)
    }

    fn list_owner_ids(&self) -> Result<Vec<OwnerId>, StoreError> {
        let mut ids = Vec::new();
        for entry in self.pets.scan_prefix(KEY_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(id) = text
                .strip_prefix(KEY_PREFIX)
                .and_then(|s| s.parse::<OwnerId>().ok())
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn commit_batch(&self, puts: &[PetRecord], deletes: &[OwnerId]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for pet in puts {
            let mut record = pet.clone();
            record.schema_version = PET_SCHEMA_VERSION;
            batch.insert(Self::pet_key(record.owner_id), Self::serialize(&record)?);
        }
        for owner_id in deletes {
            batch.remove(Self::pet_key(*owner_id));
        }
        self.pets.apply_batch(batch)?;
        self.pets.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_pet() {
        let dir = TempDir::new().expect("tempdir");
        let store = PetStoreBuilder::new(dir.path()).open().expect("store");
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 9, 30, 15).unwrap();
        let mut pet = PetRecord::new(42, "Biscuit", now);
        pet.coins = 17;
        pet.last_claimed = Some(now);
        pet.freeze_end = Some(now + Duration::days(2));
        store.put(&pet).expect("put");
        let fetched = store.get(42).expect("get").expect("present");
        assert_eq!(fetched, pet);
        assert_eq!(fetched.schema_version, PET_SCHEMA_VERSION);
    }

    #[test]
    fn missing_owner_is_none_and_delete_reports_absence() {
        let dir = TempDir::new().expect("tempdir");
        let store = PetStoreBuilder::new(dir.path()).open().expect("store");
        assert!(store.get(5).expect("get").is_none());
        assert!(!store.delete(5).expect("delete"));
        store.put(&PetRecord::new(5, "Ash", Utc::now())).expect("put");
        assert!(store.delete(5).expect("delete"));
        assert!(store.get(5).expect("get").is_none());
    }

    #[test]
    fn list_all_is_numerically_ordered() {
        let dir = TempDir::new().expect("tempdir");
        let store = PetStoreBuilder::new(dir.path()).open().expect("store");
        for id in [100u64, 9, 20] {
            store.put(&PetRecord::new(id, "p", Utc::now())).expect("put");
        }
        assert_eq!(store.list_owner_ids().expect("ids"), vec![9, 20, 100]);
        let all = store.list_all().expect("all");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].owner_id, 9);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = PetStoreBuilder::new(dir.path()).open().expect("store");
            store.put(&PetRecord::new(1, "Rex", Utc::now())).expect("put");
        }
        let store = PetStoreBuilder::new(dir.path()).open().expect("reopen");
        assert_eq!(store.get(1).expect("get").expect("present").name, "Rex");
        assert!(store.delete(1).expect("delete"));
        assert!(store.list_owner_ids().expect("ids").is_empty());
    }

    #[test]
    fn commit_batch_writes_and_removes_together() {
        let dir = TempDir::new().expect("tempdir");
        let store = PetStoreBuilder::new(dir.path()).open().expect("store");
        store.put(&PetRecord::new(1, "Old", Utc::now())).expect("put");
        let mut a = PetRecord::new(2, "A", Utc::now());
        a.coins = 3;
        let b = PetRecord::new(3, "B", Utc::now());
        store.commit_batch(&[a, b], &[1]).expect("batch");
        assert_eq!(store.list_owner_ids().expect("ids"), vec![2, 3]);
        assert_eq!(store.get(2).expect("get").expect("present").coins, 3);
    }
}
