use vitalmon_alert::rule::{ConditionDefinition, RuleDefinition};

/// Built-in clinical rules, used when no rule file is configured.
struct RuleDef {
    id: i64,
    name: &'static str,
    indicator: &'static str,
    operator: &'static str,
    value: f64,
    severity: &'static str,
    alert_type: &'static str,
    message_template: &'static str,
}

const DEFAULT_RULES: &[RuleDef] = &[
    // ---- Blood pressure ----
    RuleDef {
        id: 1,
        name: "Hypertension (systolic)",
        indicator: "systolic_pressure",
        operator: ">=",
        value: 140.0,
        severity: "medium",
        alert_type: "blood_pressure",
        message_template: "{rule}: systolic pressure {value} {unit} ({threshold})",
    },
    RuleDef {
        id: 2,
        name: "Hypertension (diastolic)",
        indicator: "diastolic_pressure",
        operator: ">=",
        value: 90.0,
        severity: "medium",
        alert_type: "blood_pressure",
        message_template: "{rule}: diastolic pressure {value} {unit} ({threshold})",
    },
    RuleDef {
        id: 3,
        name: "Severe hypertension",
        indicator: "systolic_pressure",
        operator: ">=",
        value: 180.0,
        severity: "high",
        alert_type: "blood_pressure",
        message_template: "{rule}: systolic pressure {value} {unit}, seek care immediately",
    },
    RuleDef {
        id: 4,
        name: "Hypotension",
        indicator: "systolic_pressure",
        operator: "<",
        value: 90.0,
        severity: "medium",
        alert_type: "blood_pressure",
        message_template: "{rule}: systolic pressure {value} {unit} ({threshold})",
    },
    // ---- Heart rate ----
    RuleDef {
        id: 5,
        name: "Tachycardia",
        indicator: "heart_rate",
        operator: ">",
        value: 100.0,
        severity: "medium",
        alert_type: "heart_rate",
        message_template: "{rule}: heart rate {value} {unit} ({threshold})",
    },
    RuleDef {
        id: 6,
        name: "Bradycardia",
        indicator: "heart_rate",
        operator: "<",
        value: 60.0,
        severity: "low",
        alert_type: "heart_rate",
        message_template: "{rule}: heart rate {value} {unit} ({threshold})",
    },
    // ---- Blood sugar ----
    RuleDef {
        id: 7,
        name: "Hyperglycemia",
        indicator: "blood_sugar",
        operator: ">",
        value: 7.0,
        severity: "medium",
        alert_type: "blood_sugar",
        message_template: "{rule}: fasting blood sugar {value} {unit} ({threshold})",
    },
    RuleDef {
        id: 8,
        name: "Hypoglycemia",
        indicator: "blood_sugar",
        operator: "<",
        value: 3.9,
        severity: "high",
        alert_type: "blood_sugar",
        message_template: "{rule}: blood sugar {value} {unit} ({threshold})",
    },
    // ---- Temperature ----
    RuleDef {
        id: 9,
        name: "Fever",
        indicator: "temperature",
        operator: ">=",
        value: 37.3,
        severity: "low",
        alert_type: "temperature",
        message_template: "{rule}: body temperature {value} {unit}",
    },
    RuleDef {
        id: 10,
        name: "High fever",
        indicator: "temperature",
        operator: ">=",
        value: 39.0,
        severity: "high",
        alert_type: "temperature",
        message_template: "{rule}: body temperature {value} {unit}",
    },
    // ---- Blood oxygen ----
    RuleDef {
        id: 11,
        name: "Low blood oxygen",
        indicator: "blood_oxygen",
        operator: "<",
        value: 95.0,
        severity: "medium",
        alert_type: "blood_oxygen",
        message_template: "{rule}: SpO2 {value} {unit} ({threshold})",
    },
    RuleDef {
        id: 12,
        name: "Severe hypoxia",
        indicator: "blood_oxygen",
        operator: "<",
        value: 90.0,
        severity: "high",
        alert_type: "blood_oxygen",
        message_template: "{rule}: SpO2 {value} {unit} ({threshold})",
    },
    // ---- Sleep ----
    RuleDef {
        id: 13,
        name: "Short sleep",
        indicator: "sleep_hours",
        operator: "<",
        value: 6.0,
        severity: "low",
        alert_type: "sleep",
        message_template: "{rule}: slept {value} {unit}",
    },
];

pub fn default_rules() -> Vec<RuleDefinition> {
    DEFAULT_RULES
        .iter()
        .map(|def| RuleDefinition {
            id: def.id,
            name: def.name.to_string(),
            active: true,
            severity: def.severity.to_string(),
            conditions: vec![ConditionDefinition {
                indicator: def.indicator.to_string(),
                operator: def.operator.to_string(),
                value: Some(def.value),
                low: None,
                high: None,
            }],
            alert_type: def.alert_type.to_string(),
            message_template: def.message_template.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalmon_alert::rule::RuleSet;
    use vitalmon_common::types::{AlertLevel, MeasurementSnapshot};

    #[test]
    fn default_rules_validate() {
        let set = RuleSet::load(&default_rules()).unwrap();
        assert_eq!(set.len(), DEFAULT_RULES.len());
    }

    #[test]
    fn severe_hypertension_triggers_both_systolic_rules() {
        let set = RuleSet::load(&default_rules()).unwrap();
        let mut snapshot = MeasurementSnapshot::new(1, 1);
        snapshot.systolic_pressure = Some(185);
        let ids: Vec<i64> = set
            .active()
            .filter(|r| r.matches(&snapshot))
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(set.get(3).unwrap().severity, AlertLevel::High);
    }
}
