//! Two-phase delete: stage an id, then confirm or cancel.

use tracing::debug;

use crate::alarm_store::AlarmStore;
use crate::model::AlarmId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteGate {
    staged: Option<AlarmId>,
}

impl DeleteGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `id`. The last request wins; any previously staged id is
    /// returned.
    pub fn request(&mut self, id: AlarmId) -> Option<AlarmId> {
        let previous = self.staged.replace(id);
        if let Some(previous) = previous.filter(|p| *p != id) {
            debug!(replaced = %previous, staged = %id, "Staged delete replaced");
        }
        previous
    }

    /// Delete the staged alarm from `store`. Returns the id that was staged,
    /// or `None` when nothing was staged.
    pub fn confirm(&mut self, store: &mut AlarmStore) -> Option<AlarmId> {
        let id = self.staged.take()?;
        store.delete(id);
        Some(id)
    }

    pub fn cancel(&mut self) -> Option<AlarmId> {
        self.staged.take()
    }

    #[must_use]
    pub fn staged(&self) -> Option<AlarmId> {
        self.staged
    }
}
