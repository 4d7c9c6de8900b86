//! Single-slot, auto-expiring feedback message.

use std::time::Duration;
use tracing::debug;

use crate::model::{FeedbackKind, FeedbackMessage};
use crate::DEFAULT_FEEDBACK_TTL;

/// Holds at most one live [`FeedbackMessage`].
///
/// Each `post` bumps a generation counter; the caller arms a timer for
/// that generation. An expiry only clears the slot if it still holds the
/// message from that same generation, so an older timer can never clobber a
/// newer message.
#[derive(Debug, Clone)]
pub struct FeedbackChannel {
    current: Option<FeedbackMessage>,
    generation: u64,
    ttl: Duration,
}

impl Default for FeedbackChannel {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_TTL)
    }
}

impl FeedbackChannel {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: None,
            generation: 0,
            ttl,
        }
    }

    /// Replace the current message and return its generation.
    pub fn post(&mut self, text: impl Into<String>, kind: FeedbackKind) -> u64 {
        self.generation += 1;
        self.current = Some(FeedbackMessage {
            text: text.into(),
            kind,
            expires_after: self.ttl,
            generation: self.generation,
        });
        self.generation
    }

    /// Clear the slot if it still holds the message of `generation`.
    pub fn expire(&mut self, generation: u64) -> bool {
        match &self.current {
            Some(message) if message.generation == generation => {
                self.current = None;
                true
            }
            _ => {
                debug!(generation, current = self.generation, "Stale feedback expiry ignored");
                false
            }
        }
    }

    /// Clear whatever is showing. Pending expiries become no-ops.
    pub fn dismiss(&mut self) {
        self.generation += 1;
        self.current = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<&FeedbackMessage> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Applies to messages posted from now on.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }
}
