//! Rule engine that turns a freshly recorded health measurement into alerts.
//!
//! Rules are declarative data ([`rule::RuleDefinition`]) validated into an
//! immutable [`rule::RuleSet`]. The [`engine::RuleEngine`] evaluates each
//! incoming [`MeasurementSnapshot`](vitalmon_common::types::MeasurementSnapshot)
//! in an isolated [`session::EvaluationSession`] and returns the alerts in
//! ascending rule id order. Persisting and handling alerts goes through the
//! [`AlertStore`] trait and the [`lifecycle::AlertLifecycleManager`].

pub mod condition;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod rule;
pub mod session;
pub mod store;
pub mod template;


use chrono::{DateTime, Utc};
use error::StoreError;
use vitalmon_common::types::{Alert, AlertLevel, AlertStatus};

/// Filter for listing stored alerts. Results are newest first.
///
/// # Examples
///
/// ```
/// use vitalmon_alert::AlertFilter;
/// use vitalmon_common::types::AlertStatus;
///
/// let filter = AlertFilter {
///     user_id: Some(7),
///     status: Some(AlertStatus::Open),
///     limit: Some(20),
///     ..AlertFilter::default()
/// };
/// assert_eq!(filter.offset, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub user_id: Option<i64>,
    pub record_id: Option<i64>,
    pub status: Option<AlertStatus>,
    pub level: Option<AlertLevel>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.user_id.map_or(true, |u| alert.user_id == u)
            && self.record_id.map_or(true, |r| alert.record_id == r)
            && self.status.map_or(true, |s| alert.status == s)
            && self.level.map_or(true, |l| alert.alert_level == l)
    }
}

/// Outcome of an atomic `Open -> Handled` update in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// The alert was open and is now handled.
    Handled(Alert),
    /// The alert was already handled; carries the stored, unchanged alert.
    AlreadyHandled(Alert),
    NotFound,
}

/// Persistence backend for alerts produced by the engine.
///
/// Implementations must be `Send + Sync`: alerts are written from the
/// ingestion path while operators handle them concurrently.
pub trait AlertStore: Send + Sync {
    /// Persists alerts in the given order, assigning `id` and `create_time`.
    fn insert_alerts(&self, alerts: &[Alert]) -> Result<Vec<Alert>, StoreError>;

    fn get_alert(&self, id: &str) -> Result<Option<Alert>, StoreError>;

    fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StoreError>;

    /// Counts alerts matching `filter`, ignoring `limit` and `offset`.
    fn count_alerts(&self, filter: &AlertFilter) -> Result<u64, StoreError>;

    /// Atomically moves an open alert to handled. Must never overwrite the
    /// handler of an alert that is already handled.
    fn mark_handled(
        &self,
        id: &str,
        operator_id: i64,
        at: DateTime<Utc>,
    ) -> Result<HandleOutcome, StoreError>;
}
