//! Tick scheduler: independent recurring sweeps over every pet.
//!
//! Each sweep runs in its own task with its own interval. A sweep that fails
//! outright (listing the store, for example) is logged and retried on the
//! next tick; per-pet failures are already isolated inside the service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::pet::errors::PetError;
use crate::pet::service::PetService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_decay_interval_secs")]
    pub decay_interval_secs: u64,
    #[serde(default = "default_allowance_interval_secs")]
    pub allowance_interval_secs: u64,
    /// How often to check whether the weather period has elapsed.
    #[serde(default = "default_weather_check_interval_secs")]
    pub weather_check_interval_secs: u64,
    #[serde(default = "default_mortality_sweep_interval_secs")]
    pub mortality_sweep_interval_secs: u64,
}

fn default_decay_interval_secs() -> u64 {
    3600
}

fn default_allowance_interval_secs() -> u64 {
    86_400
}

fn default_weather_check_interval_secs() -> u64 {
    3600
}

fn default_mortality_sweep_interval_secs() -> u64 {
    4 * 3600
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            decay_interval_secs: default_decay_interval_secs(),
            allowance_interval_secs: default_allowance_interval_secs(),
            weather_check_interval_secs: default_weather_check_interval_secs(),
            mortality_sweep_interval_secs: default_mortality_sweep_interval_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, secs) in [
            ("decay_interval_secs", self.decay_interval_secs),
            ("allowance_interval_secs", self.allowance_interval_secs),
            ("weather_check_interval_secs", self.weather_check_interval_secs),
            ("mortality_sweep_interval_secs", self.mortality_sweep_interval_secs),
        ] {
            if secs == 0 {
                return Err(format!("schedule.{} must be greater than zero", name));
            }
        }
        Ok(())
    }
}

/// Running sweep tasks. Dropping the handle without calling
/// [`SchedulerHandle::shutdown`] leaves the tasks running.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every loop to stop and wait for in-flight sweeps to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("scheduler task ended abnormally: {}", e);
            }
        }
        info!("tick scheduler stopped");
    }
}

/// Start the four sweep loops. The first run of each happens one interval
/// after start.
pub fn start_scheduler(service: Arc<PetService>, cfg: &ScheduleConfig) -> SchedulerHandle {
    let (tx, rx) = watch::channel(false);
    let mut tasks = Vec::with_capacity(4);

    let svc = service.clone();
    tasks.push(spawn_loop(
        "decay",
        Duration::from_secs(cfg.decay_interval_secs),
        rx.clone(),
        move || {
            let svc = svc.clone();
            async move { svc.decay_sweep().await.map(|_| ()) }
        },
    ));

    let svc = service.clone();
    tasks.push(spawn_loop(
        "allowance",
        Duration::from_secs(cfg.allowance_interval_secs),
        rx.clone(),
        move || {
            let svc = svc.clone();
            async move { svc.allowance_sweep().await.map(|_| ()) }
        },
    ));

    let svc = service.clone();
    tasks.push(spawn_loop(
        "weather",
        Duration::from_secs(cfg.weather_check_interval_secs),
        rx.clone(),
        move || {
            let svc = svc.clone();
            async move { svc.rotate_weather(false).await.map(|_| ()) }
        },
    ));

    let svc = service;
    tasks.push(spawn_loop(
        "mortality",
        Duration::from_secs(cfg.mortality_sweep_interval_secs),
        rx,
        move || {
            let svc = svc.clone();
            async move { svc.mortality_sweep().await.map(|_| ()) }
        },
    ));

    info!(
        "tick scheduler started (decay={}s allowance={}s weather-check={}s mortality={}s)",
        cfg.decay_interval_secs,
        cfg.allowance_interval_secs,
        cfg.weather_check_interval_secs,
        cfg.mortality_sweep_interval_secs
    );
    SchedulerHandle { shutdown: tx, tasks }
}

fn spawn_loop<F, Fut>(
    label: &'static str,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut run: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), PetError>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("{} sweep tick", label);
                    if let Err(e) = run().await {
                        error!("{} sweep aborted: {}", label, e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("{} loop shutting down", label);
                        break;
                    }
                }
            }
        }
    })
}
