use crate::condition::{Comparator, Condition, Operator};
use crate::error::{ConditionFault, RuleDefinitionError};
use crate::template::{MessageTemplate, TemplateContext, TemplateError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use vitalmon_common::types::{Alert, AlertLevel, AlertStatus, Indicator, MeasurementSnapshot, Reading};

// ---- Declarative rule definition (as stored by the rule store) ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub indicator: String,
    pub operator: String,
    /// Threshold for single-value operators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub severity: String,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    pub alert_type: String,
    pub message_template: String,
}

fn default_active() -> bool {
    true
}

// ---- Loaded rule ----

/// The readings that satisfied every condition of a rule, in condition order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub readings: Vec<(Indicator, Reading)>,
}

/// A validated, immutable rule: AND-combined conditions plus the alert to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub severity: AlertLevel,
    pub conditions: Vec<Condition>,
    pub alert_type: String,
    template: MessageTemplate,
}

impl Rule {
    pub fn from_definition(def: &RuleDefinition) -> Result<Self, RuleDefinitionError> {
        let rule_id = def.id;
        if def.name.trim().is_empty() {
            return Err(RuleDefinitionError::BlankField {
                rule_id,
                field: "name",
            });
        }
        if def.alert_type.trim().is_empty() {
            return Err(RuleDefinitionError::BlankField {
                rule_id,
                field: "alert_type",
            });
        }
        if def.conditions.is_empty() {
            return Err(RuleDefinitionError::NoConditions { rule_id });
        }

        let severity: AlertLevel =
            def.severity
                .parse()
                .map_err(|_| RuleDefinitionError::UnknownSeverity {
                    rule_id,
                    severity: def.severity.clone(),
                })?;

        let conditions = def
            .conditions
            .iter()
            .map(|c| build_condition(rule_id, c))
            .collect::<Result<Vec<_>, _>>()?;

        let referenced: Vec<Indicator> = conditions.iter().map(|c| c.indicator).collect();
        let template = MessageTemplate::parse(&def.message_template, &referenced).map_err(|e| {
            match e {
                TemplateError::Unresolved(placeholder) => {
                    RuleDefinitionError::UnresolvedPlaceholder {
                        rule_id,
                        placeholder,
                    }
                }
                TemplateError::Malformed(reason) => {
                    RuleDefinitionError::MalformedTemplate { rule_id, reason }
                }
            }
        })?;

        Ok(Self {
            id: rule_id,
            name: def.name.trim().to_string(),
            active: def.active,
            severity,
            conditions,
            alert_type: def.alert_type.trim().to_string(),
            template,
        })
    }

    pub fn message_template(&self) -> &str {
        self.template.source()
    }

    /// Checks every condition in order, stopping at the first one that does not match.
    pub fn evaluate(&self, snapshot: &MeasurementSnapshot) -> Result<Option<RuleMatch>, ConditionFault> {
        // Zero conditions never match; loading rejects them anyway.
        if self.conditions.is_empty() {
            return Ok(None);
        }
        let mut readings = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            match condition.check(snapshot)? {
                Some(reading) => readings.push((condition.indicator, reading)),
                None => return Ok(None),
            }
        }
        Ok(Some(RuleMatch { readings }))
    }

    /// AND of all conditions. Does not consider the `active` flag.
    pub fn matches(&self, snapshot: &MeasurementSnapshot) -> bool {
        matches!(self.evaluate(snapshot), Ok(Some(_)))
    }

    /// Builds the open alert for a match. `id` and `create_time` are left for the store.
    pub fn build_alert(&self, user_id: i64, record_id: i64, matched: &RuleMatch) -> Alert {
        let mut indicators: Vec<Indicator> = Vec::with_capacity(matched.readings.len());
        let mut values: Vec<String> = Vec::with_capacity(matched.readings.len());
        for (ind, reading) in &matched.readings {
            if !indicators.contains(ind) {
                indicators.push(*ind);
                values.push(reading.to_string());
            }
        }
        let indicator = indicators
            .iter()
            .map(Indicator::as_str)
            .collect::<Vec<_>>()
            .join("/");
        let observed_value = values.join("/");
        let threshold_description = self
            .conditions
            .iter()
            .map(Condition::describe)
            .collect::<Vec<_>>()
            .join("; ");
        let unit = indicators.first().map(Indicator::unit).unwrap_or("");
        let level = self.severity.to_string();

        let message = self.template.render(&TemplateContext {
            rule: &self.name,
            alert_type: &self.alert_type,
            level: &level,
            indicator: &indicator,
            value: &observed_value,
            threshold: &threshold_description,
            unit,
            readings: &matched.readings,
        });

        Alert {
            id: None,
            user_id,
            record_id,
            rule_id: self.id,
            alert_type: self.alert_type.clone(),
            alert_level: self.severity,
            indicator,
            observed_value,
            threshold_description,
            message,
            status: AlertStatus::Open,
            handled_by: None,
            handle_time: None,
            create_time: None,
        }
    }
}

fn build_condition(rule_id: i64, def: &ConditionDefinition) -> Result<Condition, RuleDefinitionError> {
    let indicator: Indicator =
        def.indicator
            .parse()
            .map_err(|_| RuleDefinitionError::UnknownIndicator {
                rule_id,
                indicator: def.indicator.clone(),
            })?;
    let operator: Operator =
        def.operator
            .trim()
            .parse()
            .map_err(|_| RuleDefinitionError::UnknownOperator {
                rule_id,
                operator: def.operator.clone(),
            })?;

    let finite = |value: f64| {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(RuleDefinitionError::NonFiniteThreshold { rule_id, value })
        }
    };

    let comparator = if operator.is_range() {
        let (Some(low), Some(high)) = (def.low, def.high) else {
            return Err(RuleDefinitionError::MissingThreshold {
                rule_id,
                operator: operator.to_string(),
                expected: "both 'low' and 'high'",
            });
        };
        let (low, high) = (finite(low)?, finite(high)?);
        if low > high {
            return Err(RuleDefinitionError::InvertedRange { rule_id, low, high });
        }
        match operator {
            Operator::OutsideRange => Comparator::OutsideRange { low, high },
            _ => Comparator::InsideRange { low, high },
        }
    } else {
        let value = def.value.ok_or_else(|| RuleDefinitionError::MissingThreshold {
            rule_id,
            operator: operator.to_string(),
            expected: "'value'",
        })?;
        let value = finite(value)?;
        match operator {
            Operator::GreaterThan => Comparator::GreaterThan(value),
            Operator::GreaterEqual => Comparator::GreaterEqual(value),
            Operator::LessThan => Comparator::LessThan(value),
            Operator::LessEqual => Comparator::LessEqual(value),
            _ => Comparator::Equal(value),
        }
    };

    Ok(Condition::new(indicator, comparator))
}

// ---- Rule set ----

/// An immutable, fully validated rule set ordered by ascending rule id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates every definition; any error rejects the whole set.
    pub fn load(defs: &[RuleDefinition]) -> Result<Self, RuleDefinitionError> {
        let mut seen = HashSet::with_capacity(defs.len());
        let mut rules = Vec::with_capacity(defs.len());
        for def in defs {
            if !seen.insert(def.id) {
                return Err(RuleDefinitionError::DuplicateId { rule_id: def.id });
            }
            rules.push(Rule::from_definition(def)?);
        }
        Ok(Self::from_rules(rules))
    }

    fn from_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.id);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: i64) -> Option<&Rule> {
        self.rules
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| &self.rules[idx])
    }

    pub fn active(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.active)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(indicator: &str, operator: &str, value: f64) -> ConditionDefinition {
        ConditionDefinition {
            indicator: indicator.into(),
            operator: operator.into(),
            value: Some(value),
            low: None,
            high: None,
        }
    }

    fn def(id: i64, conditions: Vec<ConditionDefinition>) -> RuleDefinition {
        RuleDefinition {
            id,
            name: format!("rule-{id}"),
            active: true,
            severity: "medium".into(),
            conditions,
            alert_type: "test".into(),
            message_template: "{indicator} {value}".into(),
        }
    }

    #[test]
    fn zero_conditions_fail_to_load() {
        let err = RuleSet::load(&[def(1, vec![])]).unwrap_err();
        assert_eq!(err, RuleDefinitionError::NoConditions { rule_id: 1 });
    }

    #[test]
    fn inverted_range_fails_to_load() {
        let mut d = def(2, vec![]);
        d.conditions.push(ConditionDefinition {
            indicator: "systolic_pressure".into(),
            operator: "inside_range".into(),
            value: None,
            low: Some(140.0),
            high: Some(100.0),
        });
        assert_eq!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::InvertedRange {
                rule_id: 2,
                low: 140.0,
                high: 100.0
            }
        );
    }

    #[test]
    fn equal_bounds_are_a_valid_range() {
        let mut d = def(2, vec![]);
        d.conditions.push(ConditionDefinition {
            indicator: "heart_rate".into(),
            operator: "inside_range".into(),
            value: None,
            low: Some(60.0),
            high: Some(60.0),
        });
        assert!(RuleSet::load(&[d]).is_ok());
    }

    #[test]
    fn range_without_bounds_fails_to_load() {
        let d = def(3, vec![cond("heart_rate", "outside_range", 100.0)]);
        assert!(matches!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::MissingThreshold { rule_id: 3, .. }
        ));
    }

    #[test]
    fn unknown_names_fail_to_load() {
        let d = def(4, vec![cond("cholesterol", "gt", 5.0)]);
        assert!(matches!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::UnknownIndicator { rule_id: 4, .. }
        ));

        let d = def(5, vec![cond("heart_rate", "roughly", 5.0)]);
        assert!(matches!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::UnknownOperator { rule_id: 5, .. }
        ));

        let mut d = def(6, vec![cond("heart_rate", "gt", 100.0)]);
        d.severity = "critical".into();
        assert!(matches!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::UnknownSeverity { rule_id: 6, .. }
        ));
    }

    #[test]
    fn unresolved_placeholder_fails_at_load_time() {
        let mut d = def(7, vec![cond("heart_rate", "gt", 100.0)]);
        d.message_template = "HR {heart_rate}, BP {systolic_pressure}".into();
        assert_eq!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::UnresolvedPlaceholder {
                rule_id: 7,
                placeholder: "systolic_pressure".into()
            }
        );
    }

    #[test]
    fn duplicate_ids_fail_to_load() {
        let a = def(8, vec![cond("heart_rate", "gt", 100.0)]);
        let b = def(8, vec![cond("heart_rate", "lt", 60.0)]);
        assert_eq!(
            RuleSet::load(&[a, b]).unwrap_err(),
            RuleDefinitionError::DuplicateId { rule_id: 8 }
        );
    }

    #[test]
    fn non_finite_threshold_fails_to_load() {
        let d = def(9, vec![cond("heart_rate", "gt", f64::INFINITY)]);
        assert!(matches!(
            RuleSet::load(&[d]).unwrap_err(),
            RuleDefinitionError::NonFiniteThreshold { rule_id: 9, .. }
        ));
    }

    #[test]
    fn rules_are_sorted_by_id() {
        let set = RuleSet::load(&[
            def(30, vec![cond("heart_rate", "gt", 100.0)]),
            def(10, vec![cond("heart_rate", "gt", 120.0)]),
            def(20, vec![cond("heart_rate", "lt", 60.0)]),
        ])
        .unwrap();
        let ids: Vec<i64> = set.rules().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(set.get(20).map(|r| r.name.as_str()), Some("rule-20"));
        assert!(set.get(25).is_none());
    }

    #[test]
    fn multi_condition_alert_joins_indicators() {
        let mut d = def(
            11,
            vec![
                cond("systolic_pressure", "gte", 140.0),
                cond("diastolic_pressure", "gte", 90.0),
            ],
        );
        d.message_template = "BP {systolic_pressure}/{diastolic_pressure} {unit}".into();
        let rule = Rule::from_definition(&d).unwrap();
        let snap = MeasurementSnapshot {
            systolic_pressure: Some(150),
            diastolic_pressure: Some(95),
            ..MeasurementSnapshot::new(3, 4)
        };
        let matched = rule.evaluate(&snap).unwrap().unwrap();
        let alert = rule.build_alert(3, 4, &matched);
        assert_eq!(alert.indicator, "systolic_pressure/diastolic_pressure");
        assert_eq!(alert.observed_value, "150/95");
        assert_eq!(
            alert.threshold_description,
            "systolic_pressure >= 140; diastolic_pressure >= 90"
        );
        assert_eq!(alert.message, "BP 150/95 mmHg");

        let partial = MeasurementSnapshot {
            systolic_pressure: Some(150),
            diastolic_pressure: Some(85),
            ..MeasurementSnapshot::new(3, 4)
        };
        assert!(!rule.matches(&partial));
    }

    #[test]
    fn definition_deserializes_from_toml() {
        let src = r#"
            id = 1
            name = "Tachycardia"
            severity = "medium"
            alert_type = "heart_rate"
            message_template = "Heart rate {value} {unit}"

            [[conditions]]
            indicator = "heart_rate"
            operator = "greater_than"
            value = 100
        "#;
        let d: RuleDefinition = toml::from_str(src).unwrap();
        assert!(d.active);
        assert_eq!(d.conditions[0].value, Some(100.0));
        assert!(Rule::from_definition(&d).is_ok());
    }
}
