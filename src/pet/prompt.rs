//! Pending reaction prompts.
//!
//! A prompt is a one-shot wait for the owner to pick an action. The pending
//! entry is removed when the prompt is answered, when the wait times out, or
//! when the ticket is dropped, so abandoned prompts never accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::pet::errors::PetError;
use crate::pet::types::{Action, OwnerId};

struct Pending {
    owner_id: OwnerId,
    tx: oneshot::Sender<Action>,
}

type PendingTable = Arc<Mutex<HashMap<Uuid, Pending>>>;

#[derive(Clone, Default)]
pub struct PromptRegistry {
    pending: PendingTable,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, owner_id: OwnerId) -> PromptTicket {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.table().insert(id, Pending { owner_id, tx });
        debug!("opened prompt {} for owner {}", id, owner_id);
        PromptTicket {
            id,
            owner_id,
            rx: Some(rx),
            pending: self.pending.clone(),
        }
    }

    /// Deliver `action` to the prompt. Only the owner the prompt was opened
    /// for may answer it. `admit` runs once the prompt is known to be open
    /// and owned by `responder`; an error from it leaves the prompt open.
    pub fn answer<A>(
        &self,
        id: Uuid,
        responder: OwnerId,
        action: Action,
        admit: A,
    ) -> Result<(), PetError>
    where
        A: FnOnce() -> Result<(), PetError>,
    {
        let mut table = self.table();
        match table.get(&id) {
            None => return Err(PetError::PromptClosed),
            Some(p) if p.owner_id != responder => {
                return Err(PetError::InvalidInput(
                    "only the pet's owner can answer this prompt".to_string(),
                ))
            }
            Some(_) => {}
        }
        admit()?;
        let pending = table.remove(&id).ok_or(PetError::PromptClosed)?;
        pending.tx.send(action).map_err(|_| PetError::PromptClosed)
    }

    /// Open prompt ids for `owner_id`.
    pub fn open_for(&self, owner_id: OwnerId) -> Vec<Uuid> {
        self.table()
            .iter()
            .filter(|(_, p)| p.owner_id == owner_id)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Pending>> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Handle held by whoever is waiting on the prompt.
pub struct PromptTicket {
    pub id: Uuid,
    pub owner_id: OwnerId,
    rx: Option<oneshot::Receiver<Action>>,
    pending: PendingTable,
}

impl PromptTicket {
    /// Wait up to `timeout` for an answer. `None` on timeout; the pending
    /// entry is gone either way.
    pub async fn wait(mut self, timeout: Duration) -> Option<Action> {
        let rx = self.rx.take()?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(action)) => Some(action),
            Ok(Err(_)) => None,
            Err(_) => {
                debug!("prompt {} for owner {} timed out", self.id, self.owner_id);
                None
            }
        }
    }
}

impl Drop for PromptTicket {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answered_prompt_yields_action() {
        let reg = PromptRegistry::new();
        let ticket = reg.open(5);
        let id = ticket.id;
        let waiter = tokio::spawn(ticket.wait(Duration::from_secs(5)));
        reg.answer(id, 5, Action::Play, || Ok(())).expect("answer");
        assert_eq!(waiter.await.expect("join"), Some(Action::Play));
        assert_eq!(reg.pending_count(), 0);
    }

    #[tokio::test]
    async fn stranger_cannot_answer() {
        let reg = PromptRegistry::new();
        let ticket = reg.open(5);
        let mut admitted = false;
        let err = reg
            .answer(ticket.id, 6, Action::Feed, || {
                admitted = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, PetError::InvalidInput(_)));
        assert!(!admitted);
        assert_eq!(reg.open_for(5), vec![ticket.id]);
    }

    #[tokio::test]
    async fn timeout_cleans_up_entry() {
        let reg = PromptRegistry::new();
        let ticket = reg.open(1);
        let id = ticket.id;
        assert_eq!(ticket.wait(Duration::from_millis(20)).await, None);
        assert_eq!(reg.pending_count(), 0);
        assert!(matches!(
            reg.answer(id, 1, Action::Feed, || Ok(())),
            Err(PetError::PromptClosed)
        ));
    }

    #[test]
    fn refused_admission_keeps_prompt_open() {
        let reg = PromptRegistry::new();
        let ticket = reg.open(2);
        let err = reg
            .answer(ticket.id, 2, Action::Rest, || {
                Err(PetError::CoolingDown { remaining_secs: 4 })
            })
            .unwrap_err();
        assert!(matches!(err, PetError::CoolingDown { remaining_secs: 4 }));
        assert_eq!(reg.open_for(2), vec![ticket.id]);
    }

    #[test]
    fn dropped_ticket_is_forgotten() {
        let reg = PromptRegistry::new();
        drop(reg.open(3));
        assert!(reg.open_for(3).is_empty());
    }
}
