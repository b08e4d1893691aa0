use serde::{Deserialize, Serialize};
use std::fmt;

use super::citation::Citation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One message in a session. Only the session store creates turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Always empty for user turns.
    pub citations: Vec<Citation>,
    pub sequence_index: u64,
}

impl Turn {
    /// An assistant turn with no content marks a failed backend call.
    pub fn is_degraded(&self) -> bool {
        self.role == Role::Assistant && self.content.is_empty()
    }
}
