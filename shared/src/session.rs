//! Session identity and liveness.
//!
//! Link and timer continuations come back into the core as events. Once the
//! session is torn down every event, including those continuations, is
//! dropped before it can touch the model. The in-flight I/O itself is not
//! aborted.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    alive: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: SessionId::generate(),
            alive: true,
        }
    }
}

impl Session {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Irreversible.
    pub fn teardown(&mut self) {
        self.alive = false;
    }
}
