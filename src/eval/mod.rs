//! Scoring core: metric primitives, per-turn scoring and dataset aggregation.

pub mod aggregate;
pub mod metrics;
pub mod turns;

/// Default cutoffs for every metric.
pub const DEFAULT_K_VALUES: [usize; 5] = [1, 5, 10, 20, 100];

/// Default number of per-turn-position columns in a report.
pub const DEFAULT_MAX_TURNS: usize = 10;

pub use aggregate::{score_dataset, Aggregator, MetricSummary, Report, ReportRow, RunningMean, ScoringOptions};
pub use metrics::{compute_metrics, Metric, MetricValues};
pub use turns::{compute_metrics_per_turn, TurnMetrics};
