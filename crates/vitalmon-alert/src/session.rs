use crate::error::{PartialEvaluationError, PreconditionError, RuleFault};
use crate::rule::{Rule, RuleSet};
use vitalmon_common::types::{Alert, MeasurementSnapshot};

/// Result of evaluating one snapshot: the alerts produced, in ascending rule
/// id order, plus any rules that faulted along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub alerts: Vec<Alert>,
    pub faults: Vec<RuleFault>,
}

impl Evaluation {
    pub fn is_complete(&self) -> bool {
        self.faults.is_empty()
    }

    /// Converts a faulted evaluation into a [`PartialEvaluationError`] that
    /// still carries the produced alerts.
    pub fn into_result(self) -> Result<Vec<Alert>, PartialEvaluationError> {
        if self.faults.is_empty() {
            Ok(self.alerts)
        } else {
            Err(PartialEvaluationError {
                alerts: self.alerts,
                faults: self.faults,
            })
        }
    }
}

/// Single-use working context for one snapshot.
///
/// Borrows the snapshot for its own lifetime only and is consumed by
/// [`EvaluationSession::finish`], so nothing carries over between records.
pub struct EvaluationSession<'a> {
    snapshot: &'a MeasurementSnapshot,
    user_id: i64,
    record_id: i64,
    alerts: Vec<Alert>,
    faults: Vec<RuleFault>,
}

impl<'a> EvaluationSession<'a> {
    pub fn open(snapshot: &'a MeasurementSnapshot) -> Result<Self, PreconditionError> {
        let user_id = snapshot.user_id.ok_or(PreconditionError::MissingUserId)?;
        let record_id = snapshot.record_id.ok_or(PreconditionError::MissingRecordId)?;
        Ok(Self {
            snapshot,
            user_id,
            record_id,
            alerts: Vec::new(),
            faults: Vec::new(),
        })
    }

    /// Checks one rule. Inactive rules are skipped without evaluating their conditions.
    pub fn check(&mut self, rule: &Rule) {
        if !rule.active {
            return;
        }
        match rule.evaluate(self.snapshot) {
            Ok(Some(matched)) => {
                let alert = rule.build_alert(self.user_id, self.record_id, &matched);
                tracing::debug!(
                    rule_id = rule.id,
                    record_id = self.record_id,
                    level = %alert.alert_level,
                    indicator = %alert.indicator,
                    value = %alert.observed_value,
                    "Rule matched"
                );
                self.alerts.push(alert);
            }
            Ok(None) => {}
            Err(fault) => {
                tracing::warn!(
                    rule_id = rule.id,
                    record_id = self.record_id,
                    error = %fault,
                    "Rule evaluation faulted, continuing with remaining rules"
                );
                self.faults.push(RuleFault {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    fault,
                });
            }
        }
    }

    pub fn finish(self) -> Evaluation {
        Evaluation {
            alerts: self.alerts,
            faults: self.faults,
        }
    }
}

/// Evaluates `snapshot` against every active rule of `rules`.
///
/// A pure function of its inputs: calling it twice yields identical results.
pub fn evaluate_snapshot(
    rules: &RuleSet,
    snapshot: &MeasurementSnapshot,
) -> Result<Evaluation, PreconditionError> {
    let mut session = EvaluationSession::open(snapshot)?;
    for rule in rules.rules() {
        session.check(rule);
    }
    Ok(session.finish())
}
