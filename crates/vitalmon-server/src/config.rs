use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use vitalmon_alert::store::MemoryAlertStore;
use vitalmon_alert::AlertStore;
use vitalmon_storage::SqliteAlertStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directory holding `alerts.db` when `store = "sqlite"`
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Rule file (TOML or JSON). The built-in clinical rules are used when unset.
    #[serde(default)]
    pub rules_path: Option<String>,
    #[serde(default)]
    pub store: StoreKind,
    /// `tracing` filter directive, e.g. `vitalmon=debug`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_id_machine")]
    pub id_machine: i32,
    #[serde(default = "default_id_node")]
    pub id_node: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    Sqlite,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rules_path: None,
            store: StoreKind::default(),
            log_filter: default_log_filter(),
            id_machine: default_id_machine(),
            id_node: default_id_node(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_log_filter() -> String {
    "vitalmon=info".to_string()
}

fn default_id_machine() -> i32 {
    1
}

fn default_id_node() -> i32 {
    1
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config '{}': {}", path, e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))?;
        if !(0..=31).contains(&config.id_machine) || !(0..=31).contains(&config.id_node) {
            anyhow::bail!(
                "id_machine and id_node must be in 0..=31 (got {} / {})",
                config.id_machine,
                config.id_node
            );
        }
        Ok(config)
    }

    /// Opens the configured alert store.
    pub fn open_store(&self) -> anyhow::Result<Arc<dyn AlertStore>> {
        Ok(match self.store {
            StoreKind::Memory => Arc::new(MemoryAlertStore::new()),
            StoreKind::Sqlite => Arc::new(SqliteAlertStore::new(Path::new(&self.data_dir))?),
        })
    }
}
