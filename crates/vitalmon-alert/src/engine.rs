use crate::error::{PreconditionError, RuleDefinitionError};
use crate::rule::{Rule, RuleDefinition, RuleSet};
use crate::session::{evaluate_snapshot, Evaluation};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vitalmon_common::types::MeasurementSnapshot;

/// A rule set together with the version number it was activated under.
#[derive(Debug)]
pub struct ActiveRules {
    pub version: u64,
    pub rules: RuleSet,
}

/// Owns the currently active rule set and evaluates snapshots against it.
///
/// The rule set lives behind an `ArcSwap`: evaluations take a snapshot of
/// the `Arc` and never observe a half-applied reload.
pub struct RuleEngine {
    active: ArcSwap<ActiveRules>,
    versions: AtomicU64,
}

impl RuleEngine {
    pub fn new(rules: RuleSet) -> Self {
        tracing::info!(
            rule_count = rules.len(),
            active = rules.active().count(),
            version = 1,
            "Rule engine started"
        );
        Self {
            active: ArcSwap::from_pointee(ActiveRules { version: 1, rules }),
            versions: AtomicU64::new(1),
        }
    }

    /// Builds an engine from rule definitions. Refuses to start if any definition is invalid.
    pub fn from_definitions(defs: &[RuleDefinition]) -> Result<Self, RuleDefinitionError> {
        let rules = RuleSet::load(defs).inspect_err(|e| {
            tracing::error!(error = %e, "Rule set failed to load, engine not started");
        })?;
        Ok(Self::new(rules))
    }

    /// The rule set in effect right now. Cheap to clone.
    pub fn active_rules(&self) -> Arc<ActiveRules> {
        self.active.load_full()
    }

    pub fn version(&self) -> u64 {
        self.active.load().version
    }

    pub fn get_rule(&self, id: i64) -> Option<Rule> {
        self.active.load().rules.get(id).cloned()
    }

    /// Validates `defs` into a new rule set and swaps it in. On error the
    /// previous rule set keeps serving. Returns the new version.
    pub fn reload(&self, defs: &[RuleDefinition]) -> Result<u64, RuleDefinitionError> {
        let rules = RuleSet::load(defs).inspect_err(|e| {
            tracing::error!(
                error = %e,
                version = self.version(),
                "Rule set reload rejected, keeping current version"
            );
        })?;
        Ok(self.replace_rules(rules))
    }

    /// Swaps in an already validated rule set. Returns the new version.
    pub fn replace_rules(&self, rules: RuleSet) -> u64 {
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let rule_count = rules.len();
        self.active.store(Arc::new(ActiveRules { version, rules }));
        tracing::info!(rule_count, version, "Rule engine reloaded");
        version
    }

    /// Evaluates one snapshot in an isolated session.
    pub fn evaluate(&self, snapshot: &MeasurementSnapshot) -> Result<Evaluation, PreconditionError> {
        let active = self.active.load_full();
        let evaluation = evaluate_snapshot(&active.rules, snapshot).inspect_err(|e| {
            tracing::warn!(error = %e, "Snapshot rejected");
        })?;
        tracing::debug!(
            record_id = ?snapshot.record_id,
            version = active.version,
            alerts = evaluation.alerts.len(),
            faults = evaluation.faults.len(),
            "Snapshot evaluated"
        );
        Ok(evaluation)
    }
}
