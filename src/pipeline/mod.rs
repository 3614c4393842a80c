//! Grid Analysis Pipeline Module
//!
//! ## Stages
//!
//! ```text
//! center ──► GridSampler ──► 9 GridTasks
//!                               │
//!                GridScheduler (bounded fan-out, order preserving)
//!                               │
//!           GridWorker × 9: fetch tile ─► score tile ─► GridResult
//!                               │
//!                         aggregate() ──► AnalysisReport
//! ```
//!
//! A failed tile yields a zero-contribution result carrying its reason; the
//! grid always produces nine results.

mod sampler;
mod worker;
mod aggregator;
mod analyzer;
pub mod scheduler;

pub use sampler::GridSampler;
pub use worker::GridWorker;
pub use aggregator::aggregate;
pub use analyzer::{AnalysisError, RiskAnalyzer};
pub use scheduler::{FanOut, GridScheduler, TaskAborted};
