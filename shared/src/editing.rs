//! Add/edit form state.
//!
//! `target == None` means the form creates a new alarm; otherwise it edits
//! that alarm. A successful commit resets the form to creation defaults.

use chrono::Timelike;
use std::sync::Arc;

use crate::alarm_store::AlarmStore;
use crate::model::{format_time, Alarm, AlarmId};
use crate::CoreError;

/// Source of the "current time" shown in a freshly opened form.
pub trait Clock: Send + Sync {
    /// Local wall-clock time as "HH:MM".
    fn now_hhmm(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_hhmm(&self) -> String {
        let now = chrono::Local::now();
        format_time(now.hour(), now.minute())
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    #[must_use]
    pub fn new(hhmm: impl Into<String>) -> Self {
        Self(hhmm.into())
    }
}

impl Clock for FixedClock {
    fn now_hhmm(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Created(Alarm),
    Updated(Alarm),
}

impl CommitOutcome {
    #[must_use]
    pub fn alarm(&self) -> &Alarm {
        match self {
            Self::Created(alarm) | Self::Updated(alarm) => alarm,
        }
    }
}

pub struct AlarmEditingSession {
    target: Option<AlarmId>,
    draft_time: String,
    draft_medicine: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AlarmEditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmEditingSession")
            .field("target", &self.target)
            .field("draft_time", &self.draft_time)
            .field("draft_medicine", &self.draft_medicine)
            .finish_non_exhaustive()
    }
}

impl AlarmEditingSession {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let draft_time = clock.now_hhmm();
        Self {
            target: None,
            draft_time,
            draft_medicine: String::new(),
            clock,
        }
    }

    pub fn begin_create(&mut self) {
        self.target = None;
        self.draft_time = self.clock.now_hhmm();
        self.draft_medicine.clear();
    }

    pub fn begin_edit(&mut self, alarm: &Alarm) {
        self.target = Some(alarm.id);
        self.draft_time.clone_from(&alarm.time);
        self.draft_medicine.clone_from(&alarm.medicine);
    }

    pub fn set_time(&mut self, time: impl Into<String>) {
        self.draft_time = time.into();
    }

    pub fn set_medicine(&mut self, medicine: impl Into<String>) {
        self.draft_medicine = medicine.into();
    }

    /// Apply the draft to `store`. On failure the draft and target are left
    /// exactly as they were.
    pub fn commit(&mut self, store: &mut AlarmStore) -> Result<CommitOutcome, CoreError> {
        let outcome = match self.target {
            Some(id) => CommitOutcome::Updated(store.update(
                id,
                self.draft_time.clone(),
                self.draft_medicine.clone(),
            )?),
            None => CommitOutcome::Created(
                store.create(self.draft_time.clone(), self.draft_medicine.clone())?,
            ),
        };
        self.begin_create();
        Ok(outcome)
    }

    #[must_use]
    pub fn target(&self) -> Option<AlarmId> {
        self.target
    }

    #[must_use]
    pub fn draft_time(&self) -> &str {
        &self.draft_time
    }

    #[must_use]
    pub fn draft_medicine(&self) -> &str {
        &self.draft_medicine
    }
}
