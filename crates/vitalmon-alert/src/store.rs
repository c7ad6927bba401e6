use crate::error::{HandleError, StoreError};
use crate::lifecycle;
use crate::{AlertFilter, AlertStore, HandleOutcome};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use vitalmon_common::types::Alert;

/// Process-local [`AlertStore`], used by tests and by deployments without a database.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: Mutex<Vec<Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alert>> {
        self.alerts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AlertStore for MemoryAlertStore {
    fn insert_alerts(&self, alerts: &[Alert]) -> Result<Vec<Alert>, StoreError> {
        let now = Utc::now();
        let stored: Vec<Alert> = alerts
            .iter()
            .map(|a| Alert {
                id: Some(vitalmon_common::id::next_id()),
                create_time: Some(now),
                ..a.clone()
            })
            .collect();
        self.lock().extend(stored.iter().cloned());
        Ok(stored)
    }

    fn get_alert(&self, id: &str) -> Result<Option<Alert>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .find(|a| a.id.as_deref() == Some(id))
            .cloned())
    }

    fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.lock();
        let iter = alerts
            .iter()
            .rev()
            .filter(|a| filter.matches(a))
            .skip(filter.offset)
            .cloned();
        Ok(match filter.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        })
    }

    fn count_alerts(&self, filter: &AlertFilter) -> Result<u64, StoreError> {
        Ok(self.lock().iter().filter(|a| filter.matches(a)).count() as u64)
    }

    fn mark_handled(
        &self,
        id: &str,
        operator_id: i64,
        at: DateTime<Utc>,
    ) -> Result<HandleOutcome, StoreError> {
        let mut alerts = self.lock();
        let Some(slot) = alerts.iter_mut().find(|a| a.id.as_deref() == Some(id)) else {
            return Ok(HandleOutcome::NotFound);
        };
        match lifecycle::transition(slot, operator_id, at) {
            Ok(handled) => {
                *slot = handled.clone();
                Ok(HandleOutcome::Handled(handled))
            }
            Err(HandleError::AlreadyHandled { .. }) => Ok(HandleOutcome::AlreadyHandled(slot.clone())),
            Err(e) => Err(StoreError::Other(e.to_string())),
        }
    }
}
