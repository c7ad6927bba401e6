mod common;

use common::{build_test_context, snapshot, FlakyStore};
use std::sync::Arc;
use vitalmon_alert::engine::RuleEngine;
use vitalmon_alert::error::{HandleError, PreconditionError};
use vitalmon_alert::lifecycle::AlertLifecycleManager;
use vitalmon_alert::rule::{ConditionDefinition, RuleDefinition};
use vitalmon_alert::{AlertFilter, AlertStore};
use vitalmon_common::types::{AlertLevel, AlertStatus, MeasurementSnapshot};
use vitalmon_server::ingest::Ingestor;
use vitalmon_server::rule_seed;

#[test]
fn hypertensive_record_is_evaluated_and_stored() {
    let ctx = build_test_context().unwrap();
    let mut record = snapshot(7, 1001);
    record.systolic_pressure = Some(160);
    record.diastolic_pressure = Some(95);
    record.heart_rate = Some(72);

    let outcome = ctx.ingestor.ingest(&record).unwrap();
    assert!(outcome.is_persisted());
    assert!(outcome.faults.is_empty());

    let rule_ids: Vec<i64> = outcome.alerts.iter().map(|a| a.rule_id).collect();
    assert_eq!(rule_ids, vec![1, 2]);
    let stored = outcome.stored.unwrap();
    assert!(stored.iter().all(|a| a.id.is_some() && a.status == AlertStatus::Open));
    assert_eq!(stored[0].observed_value, "160");
    assert_eq!(stored[0].message, "Hypertension (systolic): systolic pressure 160 mmHg (systolic_pressure >= 140)");

    let filter = AlertFilter {
        record_id: Some(1001),
        ..AlertFilter::default()
    };
    assert_eq!(ctx.store.count_alerts(&filter).unwrap(), 2);
}

#[test]
fn normal_record_produces_nothing() {
    let ctx = build_test_context().unwrap();
    let mut record = snapshot(7, 1002);
    record.systolic_pressure = Some(118);
    record.heart_rate = Some(70);
    record.temperature = Some(36.6);

    let outcome = ctx.ingestor.ingest(&record).unwrap();
    assert!(outcome.alerts.is_empty());
    assert_eq!(outcome.stored, Some(Vec::new()));
    assert_eq!(ctx.store.count_alerts(&AlertFilter::default()).unwrap(), 0);
}

#[test]
fn record_without_user_is_rejected_before_evaluation() {
    let ctx = build_test_context().unwrap();
    let record = MeasurementSnapshot {
        record_id: Some(1),
        systolic_pressure: Some(200),
        ..MeasurementSnapshot::default()
    };
    assert!(matches!(
        ctx.ingestor.ingest(&record),
        Err(PreconditionError::MissingUserId)
    ));
    assert_eq!(ctx.store.count_alerts(&AlertFilter::default()).unwrap(), 0);
}

#[test]
fn persist_failure_keeps_alerts_for_retry() {
    vitalmon_common::id::init(1, 1);
    let store = Arc::new(FlakyStore::default());
    let engine = Arc::new(RuleEngine::from_definitions(&rule_seed::default_rules()).unwrap());
    let ingestor = Ingestor::new(engine, store.clone());

    let mut record = snapshot(3, 30);
    record.blood_oxygen = Some(88);
    let outcome = ingestor.ingest(&record).unwrap();
    assert!(outcome.persist_error.is_some());
    assert!(outcome.stored.is_none());
    assert_eq!(outcome.alerts.len(), 2);

    store.set_healthy(true);
    let stored = ingestor.retry_persist(&outcome.alerts).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].alert_level, AlertLevel::High);
}

#[test]
fn alert_is_handled_once() {
    let ctx = build_test_context().unwrap();
    let mut record = snapshot(9, 900);
    record.temperature = Some(39.4);
    let stored = ctx.ingestor.ingest(&record).unwrap().stored.unwrap();
    assert_eq!(stored.len(), 2);

    let manager = AlertLifecycleManager::new(ctx.store.clone());
    let id = stored[1].id.clone().unwrap();
    let handled = manager.handle(&id, 501).unwrap();
    assert_eq!(handled.handled_by, Some(501));
    assert!(handled.handle_time.is_some());

    let err = manager.handle(&id, 502).unwrap_err();
    assert!(matches!(
        err,
        HandleError::AlreadyHandled {
            handled_by: Some(501),
            ..
        }
    ));
    let reloaded = ctx.store.get_alert(&id).unwrap().unwrap();
    assert_eq!(reloaded.handled_by, Some(501));

    let open = AlertFilter {
        user_id: Some(9),
        status: Some(AlertStatus::Open),
        ..AlertFilter::default()
    };
    assert_eq!(ctx.store.count_alerts(&open).unwrap(), 1);
}

#[test]
fn reload_applies_to_next_record_only() {
    let ctx = build_test_context().unwrap();
    let mut record = snapshot(4, 40);
    record.steps = Some(500);
    assert!(ctx.ingestor.ingest(&record).unwrap().alerts.is_empty());

    let mut rules = rule_seed::default_rules();
    rules.push(RuleDefinition {
        id: 100,
        name: "Sedentary day".to_string(),
        active: true,
        severity: "low".to_string(),
        conditions: vec![ConditionDefinition {
            indicator: "steps".to_string(),
            operator: "<".to_string(),
            value: Some(1000.0),
            low: None,
            high: None,
        }],
        alert_type: "activity".to_string(),
        message_template: "{rule}: {value} steps".to_string(),
    });
    let before = ctx.engine.version();
    let version = ctx.engine.reload(&rules).unwrap();
    assert!(version > before);

    record.record_id = Some(41);
    let outcome = ctx.ingestor.ingest(&record).unwrap();
    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].message, "Sedentary day: 500 steps");
}
