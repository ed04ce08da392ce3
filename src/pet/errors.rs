use thiserror::Error;

use crate::pet::types::OwnerId;

/// Failures raised by the sled-backed pet store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}

/// Errors surfaced to the command layer. Every variant is a distinct kind so
/// callers can render a specific reply instead of a generic failure.
#[derive(Debug, Error)]
pub enum PetError {
    /// Owner has no live pet.
    #[error("owner {0} has no pet")]
    NoPet(OwnerId),

    /// Adopt was attempted while a pet is alive.
    #[error("owner {owner_id} already has a pet named {name}")]
    AlreadyExists { owner_id: OwnerId, name: String },

    /// Coin balance too small; nothing was deducted.
    #[error("insufficient coins: need {needed}, have {available}")]
    InsufficientCoins { needed: u64, available: u64 },

    /// Energy too low for the requested action.
    #[error("insufficient energy: need {needed}, have {available}")]
    InsufficientEnergy { needed: u8, available: u8 },

    /// Malformed argument (empty name, zero days, self-transfer...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reaction arrived inside the per-owner cooldown window.
    #[error("cooling down: {remaining_secs}s remaining")]
    CoolingDown { remaining_secs: i64 },

    /// Prompt ticket unknown, expired, or answered by someone else.
    #[error("prompt not found or already closed")]
    PromptClosed,

    /// Persistence I/O failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}
