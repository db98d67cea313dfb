// Ingestion pipeline: normalize fetched postings, dedup them into the job
// store, and keep a per-run audit trail for source health.

pub mod health;
pub mod normalize;
pub mod persist;
pub mod postgres;
pub mod region;
pub mod run_stats;
pub mod runner;
pub mod store;

#[cfg(test)]
pub mod memory;
