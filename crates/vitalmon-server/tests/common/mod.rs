#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vitalmon_alert::engine::RuleEngine;
use vitalmon_alert::error::StoreError;
use vitalmon_alert::{AlertFilter, AlertStore, HandleOutcome};
use vitalmon_common::types::{Alert, MeasurementSnapshot};
use vitalmon_server::ingest::Ingestor;
use vitalmon_server::rule_seed;
use vitalmon_storage::SqliteAlertStore;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteAlertStore>,
    pub engine: Arc<RuleEngine>,
    pub ingestor: Ingestor,
}

/// Default clinical rules over a fresh SQLite store in a temp dir.
pub fn build_test_context() -> Result<TestContext> {
    vitalmon_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let store = Arc::new(SqliteAlertStore::new(temp_dir.path())?);
    let engine = Arc::new(RuleEngine::from_definitions(&rule_seed::default_rules())?);
    let ingestor = Ingestor::new(engine.clone(), store.clone());

    Ok(TestContext {
        temp_dir,
        store,
        engine,
        ingestor,
    })
}

pub fn snapshot(user_id: i64, record_id: i64) -> MeasurementSnapshot {
    MeasurementSnapshot::new(user_id, record_id)
}

/// Store whose writes fail until `healthy` is set; reads delegate to memory.
#[derive(Default)]
pub struct FlakyStore {
    pub healthy: Mutex<bool>,
    inner: vitalmon_alert::store::MemoryAlertStore,
}

impl FlakyStore {
    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }
}

impl AlertStore for FlakyStore {
    fn insert_alerts(&self, alerts: &[Alert]) -> Result<Vec<Alert>, StoreError> {
        if !*self.healthy.lock().unwrap() {
            return Err(StoreError::Other("database unavailable".to_string()));
        }
        self.inner.insert_alerts(alerts)
    }

    fn get_alert(&self, id: &str) -> Result<Option<Alert>, StoreError> {
        self.inner.get_alert(id)
    }

    fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError> {
        self.inner.list_alerts(filter)
    }

    fn count_alerts(&self, filter: &AlertFilter) -> Result<u64, StoreError> {
        self.inner.count_alerts(filter)
    }

    fn mark_handled(
        &self,
        id: &str,
        operator_id: i64,
        at: DateTime<Utc>,
    ) -> Result<HandleOutcome, StoreError> {
        self.inner.mark_handled(id, operator_id, at)
    }
}
