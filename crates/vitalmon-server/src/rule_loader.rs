use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vitalmon_alert::rule::RuleDefinition;

use crate::config::ServerConfig;
use crate::rule_seed;

/// Top-level layout of a rule file: `[[rules]]` in TOML, `{"rules": [...]}` in JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

/// Reads rule definitions from `path`. The format follows the extension:
/// `.json` is JSON, anything else is TOML.
pub fn load_rule_file(path: &Path) -> Result<Vec<RuleDefinition>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read rule file '{}': {}", path.display(), e))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let file: RulesFile = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse rule file '{}': {}", path.display(), e))?
    } else {
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse rule file '{}': {}", path.display(), e))?
    };
    tracing::info!(path = %path.display(), count = file.rules.len(), "Loaded rule file");
    Ok(file.rules)
}

/// Rule definitions for `config`: the configured file, or the built-in defaults.
pub fn load_rules(config: &ServerConfig) -> Result<Vec<RuleDefinition>> {
    match &config.rules_path {
        Some(path) => load_rule_file(Path::new(path)),
        None => {
            tracing::info!("No rules_path configured, using default clinical rules");
            Ok(rule_seed::default_rules())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_RULES: &str = r#"
[[rules]]
id = 1
name = "High systolic"
severity = "high"
alert_type = "blood_pressure"
message_template = "{rule}: {value} {unit}"

[[rules.conditions]]
indicator = "systolic_pressure"
operator = ">="
value = 140.0
"#;

    #[test]
    fn loads_toml_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, TOML_RULES).unwrap();
        let rules = load_rule_file(&path).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].conditions[0].value, Some(140.0));
        assert!(rules[0].active);
    }

    #[test]
    fn loads_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"rules":[{"id":9,"name":"Fever","severity":"medium","alert_type":"temperature",
                "message_template":"{value}","active":false,
                "conditions":[{"indicator":"temperature","operator":"gte","value":37.3}]}]}"#,
        )
        .unwrap();
        let rules = load_rule_file(&path).unwrap();
        assert_eq!(rules[0].id, 9);
        assert!(!rules[0].active);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_rule_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn sample_rule_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/rules.toml");
        let defs = load_rule_file(&path).unwrap();
        let set = vitalmon_alert::rule::RuleSet::load(&defs).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn falls_back_to_default_rules() {
        let rules = load_rules(&ServerConfig::default()).unwrap();
        assert_eq!(rules.len(), rule_seed::default_rules().len());
    }
}
