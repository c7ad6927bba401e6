use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use vitalmon_alert::error::StoreError;
use vitalmon_alert::{AlertFilter, AlertStore, HandleOutcome};
use vitalmon_common::types::{Alert, AlertLevel, AlertStatus};

const ALERTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    record_id INTEGER NOT NULL,
    rule_id INTEGER NOT NULL,
    alert_type TEXT NOT NULL,
    alert_level INTEGER NOT NULL,
    indicator TEXT NOT NULL,
    observed_value TEXT NOT NULL,
    threshold TEXT NOT NULL,
    message TEXT NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    handled_by INTEGER,
    handle_time INTEGER,
    create_time INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_user_status ON alerts(user_id, status);
CREATE INDEX IF NOT EXISTS idx_alerts_record ON alerts(record_id);
CREATE INDEX IF NOT EXISTS idx_alerts_create_time ON alerts(create_time);
";

const ALERT_COLUMNS: &str = "id, user_id, record_id, rule_id, alert_type, alert_level, indicator, \
     observed_value, threshold, message, status, handled_by, handle_time, create_time";

/// Raw column values, decoded into an [`Alert`] outside the rusqlite row callback.
struct AlertRow {
    id: String,
    user_id: i64,
    record_id: i64,
    rule_id: i64,
    alert_type: String,
    alert_level: i64,
    indicator: String,
    observed_value: String,
    threshold: String,
    message: String,
    status: i64,
    handled_by: Option<i64>,
    handle_time: Option<i64>,
    create_time: i64,
}

impl AlertRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            record_id: row.get(2)?,
            rule_id: row.get(3)?,
            alert_type: row.get(4)?,
            alert_level: row.get(5)?,
            indicator: row.get(6)?,
            observed_value: row.get(7)?,
            threshold: row.get(8)?,
            message: row.get(9)?,
            status: row.get(10)?,
            handled_by: row.get(11)?,
            handle_time: row.get(12)?,
            create_time: row.get(13)?,
        })
    }

    fn into_alert(self) -> Result<Alert> {
        let alert_level = u8::try_from(self.alert_level)
            .ok()
            .and_then(AlertLevel::from_code)
            .ok_or(StorageError::UnexpectedColumnValue {
                column: "alert_level",
                value: self.alert_level,
            })?;
        let status = u8::try_from(self.status)
            .ok()
            .and_then(AlertStatus::from_code)
            .ok_or(StorageError::UnexpectedColumnValue {
                column: "status",
                value: self.status,
            })?;
        Ok(Alert {
            id: Some(self.id),
            user_id: self.user_id,
            record_id: self.record_id,
            rule_id: self.rule_id,
            alert_type: self.alert_type,
            alert_level,
            indicator: self.indicator,
            observed_value: self.observed_value,
            threshold_description: self.threshold,
            message: self.message,
            status,
            handled_by: self.handled_by,
            handle_time: self.handle_time.and_then(DateTime::from_timestamp_millis),
            create_time: Some(DateTime::from_timestamp_millis(self.create_time).unwrap_or_default()),
        })
    }
}

/// Builds the `WHERE` clause and bound values for an [`AlertFilter`].
fn filter_clause(filter: &AlertFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(user_id) = filter.user_id {
        clauses.push("user_id = ?");
        values.push(Value::Integer(user_id));
    }
    if let Some(record_id) = filter.record_id {
        clauses.push("record_id = ?");
        values.push(Value::Integer(record_id));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Integer(i64::from(status.code())));
    }
    if let Some(level) = filter.level {
        clauses.push("alert_level = ?");
        values.push(Value::Integer(i64::from(level.code())));
    }
    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, values)
}

pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteAlertStore {
    /// Opens (or creates) `alerts.db` under `data_dir`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("alerts.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(ALERTS_SCHEMA)?;
        tracing::info!(path = %db_path.display(), "Initialized alert store");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Alert>> {
        let row = conn
            .query_row(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
                params![id],
                AlertRow::from_row,
            )
            .optional()?;
        row.map(AlertRow::into_alert).transpose()
    }

    pub fn insert(&self, alerts: &[Alert]) -> Result<Vec<Alert>> {
        let now = Utc::now();
        let stored: Vec<Alert> = alerts
            .iter()
            .map(|a| Alert {
                id: Some(vitalmon_common::id::next_id()),
                create_time: Some(now),
                ..a.clone()
            })
            .collect();

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO alerts ({ALERT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ))?;
            for alert in &stored {
                stmt.execute(params![
                    alert.id,
                    alert.user_id,
                    alert.record_id,
                    alert.rule_id,
                    alert.alert_type,
                    alert.alert_level.code(),
                    alert.indicator,
                    alert.observed_value,
                    alert.threshold_description,
                    alert.message,
                    alert.status.code(),
                    alert.handled_by,
                    alert.handle_time.map(|t| t.timestamp_millis()),
                    now.timestamp_millis(),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = stored.len(), "Alerts persisted");
        Ok(stored)
    }

    pub fn get(&self, id: &str) -> Result<Option<Alert>> {
        Self::fetch(&self.lock(), id)
    }

    pub fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>> {
        let (where_sql, mut values) = filter_clause(filter);
        // SQLite treats a negative LIMIT as "no limit".
        let limit = filter.limit.map_or(-1, |l| l as i64);
        values.push(Value::Integer(limit));
        values.push(Value::Integer(filter.offset as i64));

        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts{where_sql} \
             ORDER BY create_time DESC, rowid DESC LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), AlertRow::from_row)?;
        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?.into_alert()?);
        }
        Ok(alerts)
    }

    pub fn count(&self, filter: &AlertFilter) -> Result<u64> {
        let (where_sql, values) = filter_clause(filter);
        let conn = self.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM alerts{where_sql}"),
            rusqlite::params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Conditional update from open to handled; the lock makes update and
    /// read-back a single step.
    pub fn handle(&self, id: &str, operator_id: i64, at: DateTime<Utc>) -> Result<HandleOutcome> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE alerts SET status = ?1, handled_by = ?2, handle_time = ?3 \
             WHERE id = ?4 AND status = ?5",
            params![
                AlertStatus::Handled.code(),
                operator_id,
                at.timestamp_millis(),
                id,
                AlertStatus::Open.code(),
            ],
        )?;
        Ok(match Self::fetch(&conn, id)? {
            None => HandleOutcome::NotFound,
            Some(alert) if updated == 1 => HandleOutcome::Handled(alert),
            Some(alert) => HandleOutcome::AlreadyHandled(alert),
        })
    }
}

impl AlertStore for SqliteAlertStore {
    fn insert_alerts(&self, alerts: &[Alert]) -> std::result::Result<Vec<Alert>, StoreError> {
        Ok(self.insert(alerts)?)
    }

    fn get_alert(&self, id: &str) -> std::result::Result<Option<Alert>, StoreError> {
        Ok(self.get(id)?)
    }

    fn list_alerts(&self, filter: &AlertFilter) -> std::result::Result<Vec<Alert>, StoreError> {
        Ok(self.list(filter)?)
    }

    fn count_alerts(&self, filter: &AlertFilter) -> std::result::Result<u64, StoreError> {
        Ok(self.count(filter)?)
    }

    fn mark_handled(
        &self,
        id: &str,
        operator_id: i64,
        at: DateTime<Utc>,
    ) -> std::result::Result<HandleOutcome, StoreError> {
        Ok(self.handle(id, operator_id, at)?)
    }
}
