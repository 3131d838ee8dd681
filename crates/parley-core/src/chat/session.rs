//! Chat session guard.
//!
//! Wraps a `TurnController` in a single-slot async mutex so at most one
//! turn is in flight per conversation. Front ends that can receive
//! overlapping submissions (the HTTP API) use `try_handle` and surface
//! `SessionError::Busy`; the terminal chat awaits `handle`.
//!
//! Each turn runs on its own task holding an owned guard, so dropping the
//! caller's future (a disconnected HTTP client) never stops a turn halfway.
//! Readers see a history snapshot refreshed after every turn and never
//! contend for the turn slot.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;
use uuid::Uuid;

use parley_types::chat::{Turn, TurnOutcome};
use parley_types::error::SessionError;

use crate::inference::{CausalLm, Tokenizer};

use super::controller::TurnController;

/// One conversation, serialized behind a single-slot lock.
pub struct ChatSession<T: Tokenizer, M: CausalLm> {
    id: Uuid,
    started_at: DateTime<Utc>,
    controller: Arc<Mutex<TurnController<T, M>>>,
    /// Conversation as of the last completed turn.
    snapshot: RwLock<Vec<Turn>>,
    busy: AtomicBool,
    /// Exchanges that recorded a bot turn.
    exchanges: AtomicU32,
    /// Turns that ended with an apology.
    failures: AtomicU32,
}

impl<T, M> ChatSession<T, M>
where
    T: Tokenizer + 'static,
    M: CausalLm + 'static,
{
    pub fn new(controller: TurnController<T, M>) -> Self {
        Self {
            id: Uuid::now_v7(),
            started_at: Utc::now(),
            snapshot: RwLock::new(controller.buffer().turns().to_vec()),
            controller: Arc::new(Mutex::new(controller)),
            busy: AtomicBool::new(false),
            exchanges: AtomicU32::new(0),
            failures: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn exchange_count(&self) -> u32 {
        self.exchanges.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Whether a turn is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Handle a submission, waiting for any in-flight turn to finish first.
    pub async fn handle(self: &Arc<Self>, text: &str) -> Result<TurnOutcome, SessionError> {
        let guard = Arc::clone(&self.controller).lock_owned().await;
        self.run_detached(guard, text).await
    }

    /// Handle a submission only if no other turn is in flight.
    pub async fn try_handle(self: &Arc<Self>, text: &str) -> Result<TurnOutcome, SessionError> {
        let guard = Arc::clone(&self.controller)
            .try_lock_owned()
            .map_err(|_| SessionError::Busy)?;
        self.run_detached(guard, text).await
    }

    /// Snapshot of the conversation as of the last completed turn.
    pub fn history(&self) -> Vec<Turn> {
        match self.snapshot.read() {
            Ok(turns) => turns.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Run the turn on its own task. The task owns the guard, so the turn
    /// completes and is recorded even if the caller stops waiting.
    async fn run_detached(
        self: &Arc<Self>,
        mut guard: OwnedMutexGuard<TurnController<T, M>>,
        text: &str,
    ) -> Result<TurnOutcome, SessionError> {
        self.busy.store(true, Ordering::Release);
        let session = Arc::clone(self);
        let text = text.to_string();

        let task = tokio::spawn(async move {
            let outcome = guard.handle_user_turn(&text).await;
            session.record(&outcome, guard.buffer().turns());
            session.busy.store(false, Ordering::Release);
            outcome
        });

        task.await.map_err(|e| {
            self.busy.store(false, Ordering::Release);
            SessionError::TurnAborted(e.to_string())
        })
    }

    fn record(&self, outcome: &TurnOutcome, turns: &[Turn]) {
        match self.snapshot.write() {
            Ok(mut snapshot) => *snapshot = turns.to_vec(),
            Err(poisoned) => *poisoned.into_inner() = turns.to_vec(),
        }

        match outcome {
            TurnOutcome::Ignored => {}
            TurnOutcome::Replied { .. } => {
                let n = self.exchanges.fetch_add(1, Ordering::Relaxed) + 1;
                info!(session_id = %self.id, exchanges = n, "Exchange completed");
            }
            TurnOutcome::Failed { stage, .. } => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                info!(session_id = %self.id, stage = %stage, "Turn ended with apology");
            }
        }
    }
}
