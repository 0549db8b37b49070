pub mod config;
pub mod error;
pub mod data;
pub mod preprocess;
pub mod eval;
pub mod report;
pub mod pipeline;

pub use config::Config;
pub use error::{EvalError, Result};
pub use eval::{compute_metrics, compute_metrics_per_turn, score_dataset, Metric, Report, ScoringOptions};
