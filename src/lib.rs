//! # Petcare - persistent virtual pets
//!
//! Petcare keeps one pet per owner. Its hunger, happiness and energy decay
//! over time, respond to owner actions, shift with a global weather condition
//! and can be frozen by spending coins. Pets that starve or lose all their
//! happiness are deleted.
//!
//! ## Features
//!
//! - **Stat engine**: bounded feed/play/rest/adventure, weighted random events, hourly decay.
//! - **Freeze windows**: paid suspension of every stat effect.
//! - **Weather**: one process-wide condition, rotated on a fixed period and swept onto every pet.
//! - **Economy**: daily claims, scheduled allowance, atomic coin transfers.
//! - **Per-owner serialization**: background sweeps and user commands never lose each other's updates.
//! - **Sled persistence**: bincode records with a schema version byte.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use petcare::config::Config;
//! use petcare::pet::{Action, PetServiceBuilder, PetStoreBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = PetStoreBuilder::new(config.storage.pets_path()).open()?;
//!     let service = PetServiceBuilder::new(Arc::new(store)).config(&config).build()?;
//!
//!     service.adopt(42, "Rex").await?;
//!     let result = service.act(42, Action::Feed).await?;
//!     println!("{}", result.message());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`pet`] - record model, stat engine, mutation gateway, service and scheduler
//! - [`config`] - TOML configuration and validation
//! - [`logutil`] - single-line escaping for user text in logs

pub mod config;
pub mod logutil;
pub mod pet;
