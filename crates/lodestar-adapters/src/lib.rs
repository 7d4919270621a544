//! Adapters around the Lodestar core: configuration, evidence-file
//! ingestion, and catalog export.

pub mod config;
pub mod export;
pub mod ingest;
