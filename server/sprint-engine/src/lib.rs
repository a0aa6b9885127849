//! Sprint analytics engine: deterministic, threshold-based sprint analysis.
//!
//! Takes a snapshot of sprints and issues, aggregates per-sprint metrics, and
//! runs health, velocity trend, workload and priority gap analyzers over them.
//! Findings are synthesized from fixed templates.
//!
//! No network, no storage, no clock reads; every input arrives in the request.

pub mod config;
pub mod engine;
pub mod error;
pub mod finding_id;
pub mod health;
pub mod metrics;
pub mod normalize;
pub mod priority;
pub mod recommend;
pub mod trend;
pub mod types;
pub mod workload;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use types::{AnalysisRequest, SprintReport};
