use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vitalmon_alert::engine::RuleEngine;
use vitalmon_alert::lifecycle::AlertLifecycleManager;
use vitalmon_alert::rule::RuleSet;
use vitalmon_alert::{AlertFilter, AlertStore};
use vitalmon_common::types::MeasurementSnapshot;

use vitalmon_server::config::ServerConfig;
use vitalmon_server::ingest::Ingestor;
use vitalmon_server::rule_loader;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vitalmon evaluate <config.toml> <record.json>               Evaluate a health record and store its alerts");
    eprintln!("  vitalmon handle <config.toml> <alert_id> <operator_id>      Mark an open alert as handled");
    eprintln!("  vitalmon list-alerts <config.toml> [user_id]                List stored alerts, newest first");
    eprintln!("  vitalmon check-rules <config.toml>                          Validate the configured rule set");
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(config: &ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_filter.parse()?))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let command = match args.get(1).map(|s| s.as_str()) {
        Some(cmd @ ("evaluate" | "handle" | "list-alerts" | "check-rules")) => cmd,
        Some("--help" | "-h") | None => {
            print_usage();
            return Ok(());
        }
        Some(other) => {
            print_usage();
            anyhow::bail!("unknown command '{other}'");
        }
    };

    let config_path = args.get(2).ok_or_else(|| {
        print_usage();
        anyhow::anyhow!("{command} requires <config.toml> argument")
    })?;
    let config = ServerConfig::load(config_path)?;
    init_logging(&config)?;
    vitalmon_common::id::init(config.id_machine, config.id_node);

    match command {
        "evaluate" => {
            let record_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("evaluate requires <record.json> argument")
            })?;
            run_evaluate(&config, record_path)
        }
        "handle" => {
            let (alert_id, operator_id) = match (args.get(3), args.get(4)) {
                (Some(alert_id), Some(operator_id)) => (alert_id, operator_id),
                _ => {
                    print_usage();
                    anyhow::bail!("handle requires <alert_id> and <operator_id> arguments");
                }
            };
            let operator_id: i64 = operator_id
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid operator_id '{}': {}", operator_id, e))?;
            run_handle(&config, alert_id, operator_id)
        }
        "list-alerts" => {
            let user_id = args
                .get(3)
                .map(|s| {
                    s.parse::<i64>()
                        .map_err(|e| anyhow::anyhow!("Invalid user_id '{}': {}", s, e))
                })
                .transpose()?;
            run_list_alerts(&config, user_id)
        }
        _ => run_check_rules(&config),
    }
}

/// Evaluate one record read from a JSON file and persist the resulting alerts.
fn run_evaluate(config: &ServerConfig, record_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(record_path)
        .map_err(|e| anyhow::anyhow!("Failed to read record '{}': {}", record_path, e))?;
    let snapshot: MeasurementSnapshot = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse record '{}': {}", record_path, e))?;

    let rules = rule_loader::load_rules(config)?;
    let engine = Arc::new(RuleEngine::from_definitions(&rules)?);
    let ingestor = Ingestor::new(engine, config.open_store()?);

    let outcome = ingestor.ingest(&snapshot)?;
    for fault in &outcome.faults {
        tracing::warn!(rule_id = fault.rule_id, error = %fault, "Rule skipped");
    }
    match (outcome.stored, outcome.persist_error) {
        (Some(stored), _) => print_json(&stored),
        (None, Some(e)) => {
            print_json(&outcome.alerts)?;
            Err(anyhow::anyhow!("{} alert(s) computed but not stored: {}", outcome.alerts.len(), e))
        }
        (None, None) => print_json(&outcome.alerts),
    }
}

fn run_handle(config: &ServerConfig, alert_id: &str, operator_id: i64) -> Result<()> {
    let manager = AlertLifecycleManager::new(config.open_store()?);
    let alert = manager.handle(alert_id, operator_id)?;
    print_json(&alert)
}

fn run_list_alerts(config: &ServerConfig, user_id: Option<i64>) -> Result<()> {
    let store = config.open_store()?;
    let filter = AlertFilter {
        user_id,
        ..AlertFilter::default()
    };
    let alerts = store.list_alerts(&filter)?;
    tracing::debug!(count = alerts.len(), ?user_id, "Listed alerts");
    print_json(&alerts)
}

#[derive(Serialize)]
struct RuleSummary {
    id: i64,
    name: String,
    active: bool,
    severity: String,
    alert_type: String,
    conditions: Vec<String>,
}

/// Load and validate the configured rules without evaluating anything.
fn run_check_rules(config: &ServerConfig) -> Result<()> {
    let definitions = rule_loader::load_rules(config)?;
    let set = RuleSet::load(&definitions)?;
    tracing::info!(rule_count = set.len(), "Rule set is valid");
    let summary: Vec<RuleSummary> = set
        .rules()
        .iter()
        .map(|rule| RuleSummary {
            id: rule.id,
            name: rule.name.clone(),
            active: rule.active,
            severity: rule.severity.to_string(),
            alert_type: rule.alert_type.clone(),
            conditions: rule.conditions.iter().map(|c| c.describe()).collect(),
        })
        .collect();
    print_json(&summary)
}
