//! In-memory session store.
//!
//! A session is an append-only list of turns plus an identity. Sequence
//! indices start at 0, grow by one per appended turn, and restart only when
//! the whole session is reset under a fresh id. Readers outside the
//! controller work from [`SessionSnapshot`]s, never from the store itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::SotinError;
use crate::models::{Citation, Role, Turn};

/// Source of session identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` identifiers, for tests and reproducible exports.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Immutable view of a session at one point in time.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub turns: Arc<[Turn]>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub struct SessionStore {
    session_id: String,
    user_id: String,
    started_at: DateTime<Utc>,
    turns: Vec<Turn>,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("turns", &self.turns.len())
            .finish()
    }
}

impl SessionStore {
    pub fn new(user_id: impl Into<String>, ids: Arc<dyn IdGenerator>) -> Self {
        let session_id = ids.generate();
        Self {
            session_id,
            user_id: user_id.into(),
            started_at: Utc::now(),
            turns: Vec::new(),
            ids,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn next_index(&self) -> u64 {
        self.turns.len() as u64
    }

    /// Rejects empty and whitespace-only messages; stores the content untrimmed.
    pub fn append_user_turn(&mut self, content: &str) -> Result<Turn, SotinError> {
        if content.trim().is_empty() {
            return Err(SotinError::EmptyInput);
        }

        let turn = Turn {
            role: Role::User,
            content: content.to_string(),
            citations: Vec::new(),
            sequence_index: self.next_index(),
        };
        self.turns.push(turn.clone());
        Ok(turn)
    }

    /// Never fails. Empty content records a degraded answer.
    pub fn append_assistant_turn(&mut self, content: &str, citations: Vec<Citation>) -> Turn {
        let turn = Turn {
            role: Role::Assistant,
            content: content.to_string(),
            citations,
            sequence_index: self.next_index(),
        };
        self.turns.push(turn.clone());
        turn
    }

    pub fn all_turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Drop every turn and start over under a new id. `user_id` is kept.
    pub fn reset(&mut self) -> String {
        self.turns.clear();
        self.session_id = self.ids.generate();
        self.started_at = Utc::now();
        self.session_id.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            started_at: self.started_at,
            turns: Arc::from(self.turns.as_slice()),
        }
    }
}
