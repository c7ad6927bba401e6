use chrono::{DateTime, Utc};
use vitalmon_common::types::{Alert, Indicator};

/// A rule definition that cannot be loaded.
///
/// Any of these aborts the load of the whole rule set; the engine never
/// serves a partially loaded set.
///
/// # Examples
///
/// ```rust
/// use vitalmon_alert::error::RuleDefinitionError;
///
/// let err = RuleDefinitionError::InvertedRange { rule_id: 3, low: 140.0, high: 100.0 };
/// assert!(err.to_string().contains("rule 3"));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleDefinitionError {
    #[error("Rule definition: rule {rule_id} has no conditions")]
    NoConditions { rule_id: i64 },

    #[error("Rule definition: rule {rule_id} has blank {field}")]
    BlankField { rule_id: i64, field: &'static str },

    #[error("Rule definition: rule {rule_id} is defined more than once")]
    DuplicateId { rule_id: i64 },

    #[error("Rule definition: rule {rule_id} uses unknown indicator '{indicator}'")]
    UnknownIndicator { rule_id: i64, indicator: String },

    #[error("Rule definition: rule {rule_id} uses unknown operator '{operator}'")]
    UnknownOperator { rule_id: i64, operator: String },

    #[error("Rule definition: rule {rule_id} operator '{operator}' requires {expected}")]
    MissingThreshold {
        rule_id: i64,
        operator: String,
        expected: &'static str,
    },

    #[error("Rule definition: rule {rule_id} threshold {value} is not a finite number")]
    NonFiniteThreshold { rule_id: i64, value: f64 },

    #[error("Rule definition: rule {rule_id} range low {low} is greater than high {high}")]
    InvertedRange { rule_id: i64, low: f64, high: f64 },

    #[error("Rule definition: rule {rule_id} has unknown severity '{severity}'")]
    UnknownSeverity { rule_id: i64, severity: String },

    #[error("Rule definition: rule {rule_id} message placeholder '{{{placeholder}}}' cannot be resolved")]
    UnresolvedPlaceholder { rule_id: i64, placeholder: String },

    #[error("Rule definition: rule {rule_id} has a malformed message template: {reason}")]
    MalformedTemplate { rule_id: i64, reason: String },
}

/// The snapshot cannot be evaluated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("Precondition: snapshot is missing user_id")]
    MissingUserId,

    #[error("Precondition: snapshot is missing record_id")]
    MissingRecordId,
}

/// A fault raised while checking one condition against a well-typed snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionFault {
    #[error("non-finite reading {value} for {indicator}")]
    NonFiniteReading { indicator: Indicator, value: f64 },
}

/// A single rule that faulted during evaluation. The remaining rules still ran.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("rule {rule_id} ({rule_name}) faulted: {fault}")]
pub struct RuleFault {
    pub rule_id: i64,
    pub rule_name: String,
    #[source]
    pub fault: ConditionFault,
}

/// One or more rules faulted; carries everything that did evaluate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Partial evaluation: {} rule(s) faulted, {} alert(s) produced", .faults.len(), .alerts.len())]
pub struct PartialEvaluationError {
    pub alerts: Vec<Alert>,
    pub faults: Vec<RuleFault>,
}

/// Failure reported by an [`crate::AlertStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Alert store: backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Alert store: {0}")]
    Other(String),
}

/// An alert lifecycle transition that was refused.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("Handle: alert {0} not found")]
    NotFound(String),

    /// The alert was handled earlier; the original handler and time are kept.
    #[error("Handle: alert {alert_id} was already handled")]
    AlreadyHandled {
        alert_id: String,
        handled_by: Option<i64>,
        handle_time: Option<DateTime<Utc>>,
    },

    #[error("Handle: alert has not been persisted yet")]
    NotPersisted,

    #[error(transparent)]
    Store(#[from] StoreError),
}
