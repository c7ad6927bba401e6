//! Alert handling state machine.
//!
//! `Open -> Handled` is the only transition. Handling an alert that is
//! already handled is rejected with [`HandleError::AlreadyHandled`] and the
//! stored `handled_by` / `handle_time` are left untouched (first handler wins).

use crate::error::HandleError;
use crate::{AlertStore, HandleOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use vitalmon_common::types::{Alert, AlertStatus};

/// Applies the `Open -> Handled` transition to an alert value.
pub fn transition(alert: &Alert, operator_id: i64, at: DateTime<Utc>) -> Result<Alert, HandleError> {
    let alert_id = alert.id.clone().ok_or(HandleError::NotPersisted)?;
    match alert.status {
        AlertStatus::Open => Ok(Alert {
            status: AlertStatus::Handled,
            handled_by: Some(operator_id),
            handle_time: Some(at),
            ..alert.clone()
        }),
        AlertStatus::Handled => Err(already_handled(alert_id, alert)),
    }
}

fn already_handled(alert_id: String, alert: &Alert) -> HandleError {
    HandleError::AlreadyHandled {
        alert_id,
        handled_by: alert.handled_by,
        handle_time: alert.handle_time,
    }
}

/// Drives lifecycle transitions against an [`AlertStore`].
pub struct AlertLifecycleManager {
    store: Arc<dyn AlertStore>,
}

impl AlertLifecycleManager {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    /// Marks `alert_id` handled by `operator_id` at the current time.
    pub fn handle(&self, alert_id: &str, operator_id: i64) -> Result<Alert, HandleError> {
        self.handle_at(alert_id, operator_id, Utc::now())
    }

    pub fn handle_at(
        &self,
        alert_id: &str,
        operator_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Alert, HandleError> {
        match self.store.mark_handled(alert_id, operator_id, at)? {
            HandleOutcome::Handled(alert) => {
                tracing::info!(alert_id, operator_id, "Alert handled");
                Ok(alert)
            }
            HandleOutcome::AlreadyHandled(alert) => {
                tracing::warn!(
                    alert_id,
                    operator_id,
                    handled_by = ?alert.handled_by,
                    "Alert already handled, keeping original handler"
                );
                Err(already_handled(alert_id.to_string(), &alert))
            }
            HandleOutcome::NotFound => Err(HandleError::NotFound(alert_id.to_string())),
        }
    }
}
