use std::sync::Arc;
use vitalmon_alert::engine::RuleEngine;
use vitalmon_alert::error::{PreconditionError, RuleFault, StoreError};
use vitalmon_alert::AlertStore;
use vitalmon_common::types::{Alert, MeasurementSnapshot};

/// Everything one ingested record produced.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Alerts computed by the engine, in ascending rule id order.
    pub alerts: Vec<Alert>,
    /// The same alerts as stored (with ids), when persistence succeeded.
    pub stored: Option<Vec<Alert>>,
    /// Set when the store refused the alerts; `alerts` can be retried with
    /// [`Ingestor::retry_persist`].
    pub persist_error: Option<StoreError>,
    pub faults: Vec<RuleFault>,
}

impl IngestOutcome {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Evaluates freshly recorded health measurements and persists the resulting alerts.
pub struct Ingestor {
    engine: Arc<RuleEngine>,
    store: Arc<dyn AlertStore>,
}

impl Ingestor {
    pub fn new(engine: Arc<RuleEngine>, store: Arc<dyn AlertStore>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    /// Evaluates `snapshot`, then writes the alerts. A store failure does not
    /// discard the computed alerts.
    pub fn ingest(&self, snapshot: &MeasurementSnapshot) -> Result<IngestOutcome, PreconditionError> {
        let evaluation = self.engine.evaluate(snapshot)?;
        let (stored, persist_error) = if evaluation.alerts.is_empty() {
            (Some(Vec::new()), None)
        } else {
            match self.retry_persist(&evaluation.alerts) {
                Ok(stored) => (Some(stored), None),
                Err(e) => (None, Some(e)),
            }
        };
        Ok(IngestOutcome {
            alerts: evaluation.alerts,
            stored,
            persist_error,
            faults: evaluation.faults,
        })
    }

    /// Submits already computed alerts to the store.
    pub fn retry_persist(&self, alerts: &[Alert]) -> Result<Vec<Alert>, StoreError> {
        self.store
            .insert_alerts(alerts)
            .inspect(|stored| {
                tracing::info!(count = stored.len(), "Alerts stored");
            })
            .inspect_err(|e| {
                tracing::error!(count = alerts.len(), error = %e, "Failed to store alerts");
            })
    }
}
