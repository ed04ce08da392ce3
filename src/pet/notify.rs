//! Outbound notices to pet owners. Delivery is fire-and-forget: a failed send
//! is logged and never fails the mutation that produced it.

use log::{debug, info};
use tokio::sync::mpsc;

use crate::logutil::escape_log;
use crate::pet::types::{DeathEvent, OwnerId};

pub trait Notifier: Send + Sync {
    fn notify(&self, owner_id: OwnerId, message: &str);

    fn death(&self, event: &DeathEvent) {
        self.notify(event.owner_id, &event.message());
    }
}

/// Writes notices to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, owner_id: OwnerId, message: &str) {
        info!("notify owner={} {}", owner_id, escape_log(message));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub owner_id: OwnerId,
    pub message: String,
    pub death: Option<DeathEvent>,
}

/// Forwards notices over an unbounded channel to whatever renders them.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("notification receiver dropped; discarding notice");
        }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, owner_id: OwnerId, message: &str) {
        self.send(Notification {
            owner_id,
            message: message.to_string(),
            death: None,
        });
    }

    fn death(&self, event: &DeathEvent) {
        self.send(Notification {
            owner_id: event.owner_id,
            message: event.message(),
            death: Some(event.clone()),
        });
    }
}
