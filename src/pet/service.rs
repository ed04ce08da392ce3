//! Command-facing pet service.
//!
//! `PetService` owns the process-wide state (weather, cooldowns, pending
//! prompts, injected clock and RNG) and routes every write through the
//! [`MutationGateway`]. Background sweeps live here too so the scheduler only
//! decides *when* to run them.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::logutil::escape_log;
use crate::pet::clock::{Clock, SystemClock};
use crate::pet::cooldown::Cooldowns;
use crate::pet::economy::{claim_daily, credit, debit, ClaimOutcome, EconomyConfig};
use crate::pet::engine::{EngineConfig, Outcome, StatEngine};
use crate::pet::errors::PetError;
use crate::pet::freeze::apply_freeze;
use crate::pet::gateway::{Committed, MutationGateway, Write};
use crate::pet::mortality::MortalityPolicy;
use crate::pet::notify::{LogNotifier, Notifier};
use crate::pet::prompt::{PromptRegistry, PromptTicket};
use crate::pet::storage::PetRepository;
use crate::pet::types::{Action, DeathEvent, Mood, OwnerId, PetRecord, MAX_NAME_CHARS};
use crate::pet::weather::{GlobalWeather, WeatherState};

/// Result of a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActResult {
    Applied {
        pet: PetRecord,
        summary: String,
        /// New mood, when the action changed it.
        mood_changed: Option<Mood>,
    },
    /// Freeze window active; the record was left untouched.
    Frozen { pet: PetRecord },
    /// The action was lethal and the record has been deleted.
    Died { event: DeathEvent, summary: String },
}

impl ActResult {
    pub fn message(&self) -> String {
        match self {
            ActResult::Applied {
                summary,
                mood_changed,
                pet,
            } => match mood_changed {
                Some(mood) => format!("{} {} is now feeling {}.", summary, pet.name, mood),
                None => summary.clone(),
            },
            ActResult::Frozen { pet } => format!(
                "{} is frozen and can't do anything right now. ❄️",
                pet.name
            ),
            ActResult::Died { event, summary } => format!("{} {}", summary, event.message()),
        }
    }
}

/// Per-sweep counters. A failure on one pet is counted and the sweep moves on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub visited: usize,
    pub saved: usize,
    pub frozen: usize,
    pub deaths: Vec<DeathEvent>,
    pub failures: usize,
}

impl SweepReport {
    fn record(&mut self, owner_id: OwnerId, label: &str, result: Result<Committed<SweepStep>, PetError>) {
        match result {
            Ok(committed) => {
                if committed.deaths.is_empty() {
                    match committed.value {
                        SweepStep::Save(_) => self.saved += 1,
                        SweepStep::Frozen => self.frozen += 1,
                        SweepStep::Skip => {}
                    }
                }
                self.deaths.extend(committed.deaths);
            }
            Err(e) => {
                self.failures += 1;
                warn!("{} sweep failed for owner {}: {}", label, owner_id, e);
            }
        }
    }
}

/// Per-pet decision inside a sweep.
#[derive(Debug, Clone)]
enum SweepStep {
    Save(PetRecord),
    Frozen,
    Skip,
}

impl SweepStep {
    fn from_outcome(mut pet: PetRecord, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Frozen => SweepStep::Frozen,
            Outcome::Applied { stats, .. } => {
                pet.stats = stats;
                SweepStep::Save(pet)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub owner_id: OwnerId,
    pub name: String,
    pub age_days: i64,
    pub birth_time: DateTime<Utc>,
}

pub struct PetServiceBuilder {
    store: Arc<dyn PetRepository>,
    engine: EngineConfig,
    economy: EconomyConfig,
    mortality: MortalityPolicy,
    weather_period: Duration,
    reaction_cooldown: Duration,
    prompt_timeout: std::time::Duration,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    rng_seed: Option<u64>,
}

impl PetServiceBuilder {
    pub fn new(store: Arc<dyn PetRepository>) -> Self {
        Self {
            store,
            engine: EngineConfig::default(),
            economy: EconomyConfig::default(),
            mortality: MortalityPolicy::default(),
            weather_period: Duration::hours(24),
            reaction_cooldown: Duration::seconds(10),
            prompt_timeout: std::time::Duration::from_secs(60),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            rng_seed: None,
        }
    }

    /// Take every tunable from a loaded configuration.
    pub fn config(mut self, cfg: &Config) -> Self {
        self.engine = cfg.engine.clone();
        self.economy = cfg.economy.clone();
        self.mortality = cfg.mortality.clone();
        self.weather_period = cfg.weather.rotation_period();
        self.reaction_cooldown = cfg.interaction.reaction_cooldown();
        self.prompt_timeout = cfg.interaction.prompt_timeout();
        self.rng_seed = cfg.rng_seed;
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn economy(mut self, economy: EconomyConfig) -> Self {
        self.economy = economy;
        self
    }

    pub fn mortality(mut self, mortality: MortalityPolicy) -> Self {
        self.mortality = mortality;
        self
    }

    pub fn weather_period(mut self, period: Duration) -> Self {
        self.weather_period = period;
        self
    }

    pub fn reaction_cooldown(mut self, window: Duration) -> Self {
        self.reaction_cooldown = window;
        self
    }

    pub fn prompt_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<PetService, PetError> {
        self.engine.validate().map_err(PetError::InvalidInput)?;
        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = self.clock.now();
        Ok(PetService {
            gateway: MutationGateway::new(self.store, self.mortality, self.notifier),
            engine: StatEngine::new(self.engine),
            economy: self.economy,
            weather: WeatherState::new(now, self.weather_period),
            cooldowns: Cooldowns::new(self.reaction_cooldown),
            prompts: PromptRegistry::new(),
            prompt_timeout: self.prompt_timeout,
            clock: self.clock,
            rng: Mutex::new(rng),
        })
    }
}

pub struct PetService {
    gateway: MutationGateway,
    engine: StatEngine,
    economy: EconomyConfig,
    weather: WeatherState,
    cooldowns: Cooldowns,
    prompts: PromptRegistry,
    prompt_timeout: std::time::Duration,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

/// Trim and bound a user-supplied pet name.
pub fn validate_name(raw: &str) -> Result<String, PetError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PetError::InvalidInput("pet name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(PetError::InvalidInput(format!(
            "pet name is limited to {} characters",
            MAX_NAME_CHARS
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(PetError::InvalidInput(
            "pet name cannot contain control characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

impl PetService {
    pub fn gateway(&self) -> &MutationGateway {
        &self.gateway
    }

    pub fn prompt_timeout(&self) -> std::time::Duration {
        self.prompt_timeout
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut rng)
    }

    fn store(&self) -> &Arc<dyn PetRepository> {
        self.gateway.store()
    }

    /// Reject a commit that turned out lethal for `owner_id`, for an
    /// operation that only touches coins, names or freeze windows.
    fn survived<T>(owner_id: OwnerId, committed: Committed<T>) -> Result<T, PetError> {
        if committed.deaths.iter().any(|event| event.owner_id == owner_id) {
            Err(PetError::NoPet(owner_id))
        } else {
            Ok(committed.value)
        }
    }

    pub async fn adopt(&self, owner_id: OwnerId, name: &str) -> Result<PetRecord, PetError> {
        let name = validate_name(name)?;
        let now = self.clock.now();
        let committed = self
            .gateway
            .with_slot(owner_id, |slot| match slot {
                Some(existing) => Err(PetError::AlreadyExists {
                    owner_id,
                    name: existing.name,
                }),
                None => {
                    let pet = PetRecord::new(owner_id, &name, now);
                    Ok((Write::Save(pet.clone()), pet))
                }
            })
            .await?;
        info!("owner {} adopted '{}'", owner_id, escape_log(&name));
        Self::survived(owner_id, committed)
    }

    pub async fn status(&self, owner_id: OwnerId) -> Result<PetRecord, PetError> {
        self.store()
            .get(owner_id)?
            .ok_or(PetError::NoPet(owner_id))
    }

    pub async fn act(&self, owner_id: OwnerId, action: Action) -> Result<ActResult, PetError> {
        let now = self.clock.now();
        let committed = self
            .gateway
            .with_pet(owner_id, |pet| {
                let outcome = self.with_rng(|rng| self.engine.act(action, &pet, now, rng))?;
                match outcome {
                    Outcome::Frozen => Ok((Write::Keep, ActResult::Frozen { pet })),
                    Outcome::Applied { stats, summary } => {
                        let before = pet.mood();
                        let mut next = pet;
                        next.stats = stats;
                        let after = next.mood();
                        let mood_changed = (after != before).then_some(after);
                        Ok((
                            Write::Save(next.clone()),
                            ActResult::Applied {
                                pet: next,
                                summary,
                                mood_changed,
                            },
                        ))
                    }
                }
            })
            .await?;
        debug!("owner {} {} committed", owner_id, action.as_str());
        let Committed { value, deaths } = committed;
        Ok(match deaths.into_iter().next() {
            Some(event) => {
                let summary = match value {
                    ActResult::Applied { summary, .. } => summary,
                    _ => String::new(),
                };
                ActResult::Died { event, summary }
            }
            None => value,
        })
    }

    pub async fn feed(&self, owner_id: OwnerId) -> Result<ActResult, PetError> {
        self.act(owner_id, Action::Feed).await
    }

    pub async fn play(&self, owner_id: OwnerId) -> Result<ActResult, PetError> {
        self.act(owner_id, Action::Play).await
    }

    pub async fn rest(&self, owner_id: OwnerId) -> Result<ActResult, PetError> {
        self.act(owner_id, Action::Rest).await
    }

    pub async fn adventure(&self, owner_id: OwnerId) -> Result<ActResult, PetError> {
        self.act(owner_id, Action::Adventure).await
    }

    /// Charge for and start a freeze window of `days` days.
    pub async fn freeze(&self, owner_id: OwnerId, days: u32) -> Result<PetRecord, PetError> {
        let now = self.clock.now();
        let committed = self
            .gateway
            .with_pet(owner_id, |pet| {
                let next = apply_freeze(&pet, days, now, &self.economy)?;
                Ok((Write::Save(next.clone()), next))
            })
            .await?;
        info!("owner {} froze pet for {} day(s)", owner_id, days);
        Self::survived(owner_id, committed)
    }

    pub async fn claim_daily(&self, owner_id: OwnerId) -> Result<ClaimOutcome, PetError> {
        let now = self.clock.now();
        let committed = self
            .gateway
            .with_pet(owner_id, |pet| {
                let (next, outcome) = claim_daily(&pet, now, &self.economy);
                let write = match outcome {
                    ClaimOutcome::Claimed { .. } => Write::Save(next),
                    ClaimOutcome::ComeBackLater { .. } => Write::Keep,
                };
                Ok((write, outcome))
            })
            .await?;
        Self::survived(owner_id, committed)
    }

    /// Move `amount` coins between two pets atomically. Returns the new
    /// balances `(from, to)`.
    pub async fn transfer_coins(
        &self,
        from: OwnerId,
        to: OwnerId,
        amount: u64,
    ) -> Result<(u64, u64), PetError> {
        if amount == 0 {
            return Err(PetError::InvalidInput(
                "amount must be positive".to_string(),
            ));
        }
        if from == to {
            return Err(PetError::InvalidInput(
                "cannot transfer coins to yourself".to_string(),
            ));
        }
        let mortality = self.gateway.mortality();
        let committed = self
            .gateway
            .with_pair(from, to, |mut sender, mut receiver| {
                // A lethal record awaiting its sweep counts as gone.
                for pet in [&sender, &receiver] {
                    if mortality.check(pet).is_some() {
                        return Err(PetError::NoPet(pet.owner_id));
                    }
                }
                sender.coins = debit(sender.coins, amount)?;
                receiver.coins = credit(receiver.coins, amount);
                let balances = (sender.coins, receiver.coins);
                Ok((Write::Save(sender), Write::Save(receiver), balances))
            })
            .await?;
        info!("owner {} sent {} coin(s) to owner {}", from, amount, to);
        Self::survived(from, committed)
    }

    pub async fn rename(&self, owner_id: OwnerId, new_name: &str) -> Result<PetRecord, PetError> {
        let name = validate_name(new_name)?;
        let committed = self
            .gateway
            .with_pet(owner_id, |mut pet| {
                pet.name = name.clone();
                Ok((Write::Save(pet.clone()), pet))
            })
            .await?;
        info!("owner {} renamed pet to '{}'", owner_id, escape_log(&name));
        Self::survived(owner_id, committed)
    }

    pub async fn balance(&self, owner_id: OwnerId) -> Result<u64, PetError> {
        Ok(self.status(owner_id).await?.coins)
    }

    pub async fn list_all(&self) -> Result<Vec<PetRecord>, PetError> {
        Ok(self.store().list_all()?)
    }

    /// Oldest pets first; ties broken by owner id.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, PetError> {
        let now = self.clock.now();
        let mut pets = self.list_all().await?;
        pets.sort_by(|a, b| {
            a.birth_time
                .cmp(&b.birth_time)
                .then(a.owner_id.cmp(&b.owner_id))
        });
        Ok(pets
            .into_iter()
            .take(limit)
            .map(|pet| LeaderboardEntry {
                owner_id: pet.owner_id,
                age_days: pet.age_days(now),
                birth_time: pet.birth_time,
                name: pet.name,
            })
            .collect())
    }

    pub fn weather(&self) -> GlobalWeather {
        self.weather.snapshot()
    }

    /// Delete every pet, one owner at a time through the gateway.
    pub async fn purge_all(&self) -> Result<usize, PetError> {
        let mut removed = 0usize;
        for owner_id in self.store().list_owner_ids()? {
            let committed = self
                .gateway
                .with_slot(owner_id, |slot| {
                    Ok(match slot {
                        Some(_) => (Write::Delete, true),
                        None => (Write::Keep, false),
                    })
                })
                .await?;
            if committed.value {
                removed += 1;
            }
        }
        warn!("purged {} pet record(s)", removed);
        Ok(removed)
    }

    /// Reaction-driven action, gated by the per-owner cooldown.
    pub async fn react(&self, owner_id: OwnerId, action: Action) -> Result<ActResult, PetError> {
        self.cooldowns.check_and_touch(owner_id, self.clock.now())?;
        self.act(owner_id, action).await
    }

    /// Open a reaction prompt for an owner who has a live pet.
    pub async fn open_prompt(&self, owner_id: OwnerId) -> Result<PromptTicket, PetError> {
        self.status(owner_id).await?;
        Ok(self.prompts.open(owner_id))
    }

    pub fn answer_prompt(
        &self,
        id: Uuid,
        responder: OwnerId,
        action: Action,
    ) -> Result<(), PetError> {
        let now = self.clock.now();
        self.prompts.answer(id, responder, action, || {
            self.cooldowns.check_and_touch(responder, now)
        })
    }

    pub fn open_prompts_for(&self, owner_id: OwnerId) -> Vec<Uuid> {
        self.prompts.open_for(owner_id)
    }

    /// Wait for the prompt to be answered and apply the chosen action. A
    /// timeout returns `Ok(None)` and leaves the record untouched.
    pub async fn await_prompt(&self, ticket: PromptTicket) -> Result<Option<ActResult>, PetError> {
        let owner_id = ticket.owner_id;
        match ticket.wait(self.prompt_timeout).await {
            Some(action) => Ok(Some(self.act(owner_id, action).await?)),
            None => Ok(None),
        }
    }

    async fn sweep<F>(&self, label: &'static str, mut step: F) -> Result<SweepReport, PetError>
    where
        F: FnMut(PetRecord, DateTime<Utc>) -> SweepStep + Send,
    {
        let mut report = SweepReport::default();
        for owner_id in self.store().list_owner_ids()? {
            report.visited += 1;
            let now = self.clock.now();
            let step = &mut step;
            let result = self
                .gateway
                .with_slot(owner_id, |slot| {
                    let decided = match slot {
                        Some(pet) => step(pet, now),
                        None => SweepStep::Skip,
                    };
                    let write = match &decided {
                        SweepStep::Save(pet) => Write::Save(pet.clone()),
                        _ => Write::Keep,
                    };
                    Ok((write, decided))
                })
                .await;
            report.record(owner_id, label, result);
        }
        info!(
            "{} sweep: visited={} saved={} frozen={} deaths={} failures={}",
            label,
            report.visited,
            report.saved,
            report.frozen,
            report.deaths.len(),
            report.failures
        );
        Ok(report)
    }

    /// Hourly wear on every pet.
    pub async fn decay_sweep(&self) -> Result<SweepReport, PetError> {
        self.sweep("decay", |pet, now| {
            let outcome = self.with_rng(|rng| self.engine.decay_tick(&pet, now, rng));
            SweepStep::from_outcome(pet, outcome)
        })
        .await
    }

    /// Credit the scheduled allowance to every pet, frozen or not.
    pub async fn allowance_sweep(&self) -> Result<SweepReport, PetError> {
        let amount = self.economy.allowance_coins;
        self.sweep("allowance", move |mut pet, _| {
            pet.coins = credit(pet.coins, amount);
            SweepStep::Save(pet)
        })
        .await
    }

    /// Rotate the weather if a full period has passed (or `force`), then apply
    /// the new condition to every pet using that one snapshot.
    pub async fn rotate_weather(
        &self,
        force: bool,
    ) -> Result<Option<(GlobalWeather, SweepReport)>, PetError> {
        let now = self.clock.now();
        if !force && !self.weather.rotation_due(now) {
            return Ok(None);
        }
        let snapshot = self.with_rng(|rng| self.weather.rotate(now, rng));
        info!(
            "weather is now {} (generation {})",
            snapshot.condition.label(),
            snapshot.generation
        );
        let report = self
            .sweep("weather", |pet, now| {
                let outcome = self.engine.apply_weather(&pet, now, &snapshot);
                SweepStep::from_outcome(pet, outcome)
            })
            .await?;
        Ok(Some((snapshot, report)))
    }

    /// Remove pets that already satisfy the mortality rule.
    pub async fn mortality_sweep(&self) -> Result<SweepReport, PetError> {
        let mut report = SweepReport::default();
        for owner_id in self.store().list_owner_ids()? {
            report.visited += 1;
            match self.gateway.reap(owner_id).await {
                Ok(Some(event)) => report.deaths.push(event),
                Ok(None) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!("mortality sweep failed for owner {}: {}", owner_id, e);
                }
            }
        }
        let now = self.clock.now();
        let pruned = self.cooldowns.prune(now);
        if pruned > 0 {
            debug!(
                "pruned {} expired reaction cooldown(s), {} still tracked",
                pruned,
                self.cooldowns.tracked()
            );
        }
        if !report.deaths.is_empty() || report.failures > 0 {
            info!(
                "mortality sweep: visited={} deaths={} failures={}",
                report.visited,
                report.deaths.len(),
                report.failures
            );
        }
        Ok(report)
    }
}
