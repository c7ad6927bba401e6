//! SQLite persistence for alerts produced by the rule engine.
//!
//! [`alert_store::SqliteAlertStore`] implements
//! [`vitalmon_alert::AlertStore`] on a single `alerts.db` database in WAL
//! mode. Handling an alert is a conditional `UPDATE` so that the first
//! handler always wins.

pub mod alert_store;
pub mod error;


pub use alert_store::SqliteAlertStore;
pub use error::StorageError;
