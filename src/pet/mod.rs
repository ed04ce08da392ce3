//! Pet lifecycle and stat-mutation engine.
//!
//! Leaves first: [`types`] and [`storage`] hold the record and its sled
//! persistence; [`engine`], [`freeze`], [`mortality`], [`weather`] and
//! [`economy`] are pure rules; [`gateway`] serializes every write per owner;
//! [`service`] exposes the operations used by [`commands`] and the
//! [`scheduler`].

pub mod clock;
pub mod commands;
pub mod cooldown;
pub mod economy;
pub mod engine;
pub mod errors;
pub mod freeze;
pub mod gateway;
pub mod mortality;
pub mod notify;
pub mod prompt;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod types;
pub mod weather;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{PetError, StoreError};
pub use gateway::{Committed, MutationGateway, Write};
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier};
pub use service::{ActResult, LeaderboardEntry, PetService, PetServiceBuilder, SweepReport};
pub use storage::{PetRepository, PetStore, PetStoreBuilder};
pub use types::{Action, DeathCause, DeathEvent, Mood, OwnerId, PetRecord, StatDelta, Stats};
pub use weather::{GlobalWeather, WeatherCondition};
