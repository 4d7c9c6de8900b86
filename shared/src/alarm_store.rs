//! Ordered in-memory alarm collection.
//!
//! Every operation is synchronous and completes within one scheduling turn;
//! nothing here is ever touched from a suspended context.

use tracing::{debug, info};

use crate::model::{Alarm, AlarmId};
use crate::{CoreError, MissingField};

#[derive(Debug, Clone)]
pub struct AlarmStore {
    alarms: Vec<Alarm>,
    next_id: u64,
}

impl Default for AlarmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            alarms: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a new alarm. Ids are strictly greater than every id issued
    /// before, including ids of alarms already deleted.
    pub fn create(
        &mut self,
        time: impl Into<String>,
        medicine: impl Into<String>,
    ) -> Result<Alarm, CoreError> {
        let time = time.into();
        let medicine = medicine.into();
        if let Some(missing) = MissingField::check(&time, &medicine) {
            return Err(CoreError::Validation { missing });
        }

        let id = AlarmId(self.next_id);
        self.next_id += 1;

        let alarm = Alarm::new(id, time, medicine);
        self.alarms.push(alarm.clone());
        info!(alarm_id = %id, "Alarm created");
        Ok(alarm)
    }

    /// Replace time and medicine in place. The id and list position are kept.
    pub fn update(
        &mut self,
        id: AlarmId,
        time: impl Into<String>,
        medicine: impl Into<String>,
    ) -> Result<Alarm, CoreError> {
        let time = time.into();
        let medicine = medicine.into();

        let slot = self
            .alarms
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(CoreError::NotFound(id))?;

        if let Some(missing) = MissingField::check(&time, &medicine) {
            return Err(CoreError::Validation { missing });
        }

        slot.time = time;
        slot.medicine = medicine;
        info!(alarm_id = %id, "Alarm updated");
        Ok(slot.clone())
    }

    /// Remove the alarm if present. Returns whether anything was removed.
    pub fn delete(&mut self, id: AlarmId) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|a| a.id != id);
        let removed = self.alarms.len() != before;
        if removed {
            info!(alarm_id = %id, "Alarm deleted");
        } else {
            debug!(alarm_id = %id, "Delete of absent alarm ignored");
        }
        removed
    }

    #[must_use]
    pub fn list(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn get(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}
