use crate::activity::{Activity, ActivityQuery};
use crate::core::{DbError, Result};
use serde::{Deserialize, Serialize};

/// Append-only store of activities. Records are only rewritten in place
/// through [`ActivityLog::save`] with an existing id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    records: Vec<Activity>,
    next_id: i64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends `activity` when it has no id yet, otherwise replaces the
    /// stored record with the same id. Records imported with an id this log
    /// has never issued are appended under that id.
    pub fn save(&mut self, activity: &mut Activity) -> Result<()> {
        let Some(id) = activity.id else {
            let id = self.next_id;
            self.next_id = Self::successor(id)?;
            activity.id = Some(id);
            self.records.push(activity.clone());
            return Ok(());
        };
        if id <= 0 {
            return Err(DbError::ExecutionError(format!("Invalid activity id {}", id)));
        }

        match self.records.iter_mut().find(|record| record.id == Some(id)) {
            Some(slot) => *slot = activity.clone(),
            None => {
                self.next_id = self.next_id.max(Self::successor(id)?);
                self.records.push(activity.clone());
            }
        }
        Ok(())
    }

    fn successor(id: i64) -> Result<i64> {
        id.checked_add(1)
            .ok_or_else(|| DbError::ExecutionError(format!("Activity id {} exhausts the id space", id)))
    }

    pub fn get(&self, id: i64) -> Option<&Activity> {
        self.records.iter().find(|record| record.id == Some(id))
    }

    pub fn find(&self, query: &ActivityQuery) -> Vec<Activity> {
        query.apply(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Activity] {
        &self.records
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
