pub mod config;
pub mod ingest;
pub mod rule_loader;
pub mod rule_seed;
