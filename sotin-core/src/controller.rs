//! Conversation controller: one request cycle at a time.
//!
//! `submit` walks `Idle -> AwaitingResponse -> {Settled, Failed} -> Idle`.
//! Every user turn it appends is followed by exactly one assistant turn, empty
//! when the backend fails or the cycle is cancelled. Readers only see
//! snapshots published after a pair has been committed, so an export never
//! observes a user turn without its answer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::SotinError;
use crate::gateway::{Gateway, GatewayReply};
use crate::models::{normalize_many, Citation, Turn};
use crate::session::{SessionSnapshot, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingResponse,
}

/// A committed user/assistant pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: Turn,
    pub assistant: Turn,
}

pub struct ConversationController {
    gateway: Arc<dyn Gateway>,
    store: Mutex<SessionStore>,
    state: Mutex<ControllerState>,
    published: watch::Sender<SessionSnapshot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity captured when a cycle starts, so the gateway call needs no lock.
struct CycleStart {
    user: Turn,
    user_id: String,
    session_id: String,
}

/// Pairs the in-flight user turn with an assistant turn exactly once, even if
/// the `submit` future is dropped before the backend answers.
struct InFlight<'a> {
    controller: &'a ConversationController,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, answer: &str, reply: Option<&GatewayReply>) -> Turn {
        self.settled = true;
        let citations = normalize_many(reply.and_then(|r| r.citations.as_deref()));
        self.controller.commit_assistant(answer, citations)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Request cycle cancelled before the backend answered");
            self.controller.commit_assistant("", Vec::new());
        }
    }
}

impl ConversationController {
    pub fn new(store: SessionStore, gateway: Arc<dyn Gateway>) -> Self {
        let (published, _rx) = watch::channel(store.snapshot());
        Self {
            gateway,
            store: Mutex::new(store),
            state: Mutex::new(ControllerState::Idle),
            published,
        }
    }

    pub fn state(&self) -> ControllerState {
        *lock(&self.state)
    }

    /// Last committed state of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.published.borrow().clone()
    }

    /// Receiver notified after every committed exchange and every reset.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.published.subscribe()
    }

    pub fn session_id(&self) -> String {
        lock(&self.store).session_id().to_string()
    }

    /// Run one request cycle.
    ///
    /// A backend failure still records an empty assistant turn and is then
    /// returned as `SotinError::Gateway`.
    pub async fn submit(&self, message: &str) -> Result<Exchange, SotinError> {
        let start = self.begin_cycle(message)?;
        let mut cycle = InFlight {
            controller: self,
            settled: false,
        };

        tracing::info!(
            session_id = %start.session_id,
            sequence_index = start.user.sequence_index,
            gateway = self.gateway.name(),
            "Request cycle started"
        );

        match self
            .gateway
            .send(&start.user_id, &start.session_id, message)
            .await
        {
            Ok(reply) => {
                let assistant = cycle.settle(&reply.answer, Some(&reply));
                tracing::info!(
                    session_id = %start.session_id,
                    sequence_index = assistant.sequence_index,
                    citations = assistant.citations.len(),
                    "Request cycle settled"
                );
                Ok(Exchange {
                    user: start.user,
                    assistant,
                })
            }
            Err(e) => {
                let assistant = cycle.settle("", None);
                tracing::warn!(
                    session_id = %start.session_id,
                    sequence_index = assistant.sequence_index,
                    error = %e,
                    "Request cycle failed; recorded empty answer"
                );
                Err(SotinError::Gateway(e))
            }
        }
    }

    fn begin_cycle(&self, message: &str) -> Result<CycleStart, SotinError> {
        let mut state = lock(&self.state);
        if *state == ControllerState::AwaitingResponse {
            return Err(SotinError::RequestInProgress);
        }

        let mut store = lock(&self.store);
        let user = store.append_user_turn(message)?;
        *state = ControllerState::AwaitingResponse;

        Ok(CycleStart {
            user,
            user_id: store.user_id().to_string(),
            session_id: store.session_id().to_string(),
        })
    }

    fn commit_assistant(&self, answer: &str, citations: Vec<Citation>) -> Turn {
        let mut state = lock(&self.state);
        let mut store = lock(&self.store);
        let turn = store.append_assistant_turn(answer, citations);
        self.published.send_replace(store.snapshot());
        *state = ControllerState::Idle;
        turn
    }

    /// Clear the conversation and start a new session id. Refused mid-request.
    pub fn reset(&self) -> Result<String, SotinError> {
        let state = lock(&self.state);
        if *state == ControllerState::AwaitingResponse {
            return Err(SotinError::RequestInProgress);
        }

        let mut store = lock(&self.store);
        let previous = store.session_id().to_string();
        let session_id = store.reset();
        self.published.send_replace(store.snapshot());
        drop(state);

        tracing::info!(previous = %previous, session_id = %session_id, "Session reset");
        Ok(session_id)
    }
}
