//! Dataset-level aggregation of per-turn metrics.
//!
//! Every metric key keeps three kinds of running means: macro (one update per
//! dialog with that dialog's mean), micro (one update per turn observation)
//! and one bucket per turn position below `max_turns`. Raw values are never
//! buffered across dialogs.

use crate::error::{EvalError, Result};
use crate::eval::metrics::Metric;
use crate::eval::turns::{compute_metrics_per_turn, TurnMetrics};
use crate::eval::{DEFAULT_K_VALUES, DEFAULT_MAX_TURNS};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Log a progress line every this many dialogs.
const PROGRESS_EVERY: usize = 1000;

/// Running arithmetic mean updated one observation at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunningMean {
    mean: f64,
    count: u64,
}

impl RunningMean {
    /// Folds `value` into the mean and returns the updated mean.
    pub fn update(&mut self, value: f64) -> f64 {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.mean
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl fmt::Display for RunningMean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} / {}", self.mean, self.count)
    }
}

/// Macro, micro and per-turn-position running means for one metric key.
#[derive(Debug, Clone)]
pub struct MetricSummary {
    macro_average: RunningMean,
    micro_average: RunningMean,
    per_turn: Vec<RunningMean>,
}

impl MetricSummary {
    pub fn new(max_turns: usize) -> Self {
        Self {
            macro_average: RunningMean::default(),
            micro_average: RunningMean::default(),
            per_turn: vec![RunningMean::default(); max_turns],
        }
    }

    /// Folds one dialog's per-turn values in. An empty slice is ignored.
    pub fn update(&mut self, values: &[f64]) {
        if values.is_empty() {
            return;
        }
        self.macro_average
            .update(values.iter().sum::<f64>() / values.len() as f64);
        for (turn_idx, &value) in values.iter().enumerate() {
            if let Some(bucket) = self.per_turn.get_mut(turn_idx) {
                bucket.update(value);
            }
            self.micro_average.update(value);
        }
    }

    pub fn macro_average(&self) -> &RunningMean {
        &self.macro_average
    }

    pub fn micro_average(&self) -> &RunningMean {
        &self.micro_average
    }

    pub fn per_turn(&self) -> &[RunningMean] {
        &self.per_turn
    }

    /// `[macro, micro, turn_0, ..., turn_{max_turns-1}]`
    pub fn values(&self) -> Vec<f64> {
        self.columns().map(RunningMean::mean).collect()
    }

    /// Observation counts in the same layout as [`values`](Self::values).
    pub fn counts(&self) -> Vec<u64> {
        self.columns().map(RunningMean::count).collect()
    }

    fn columns(&self) -> impl Iterator<Item = &RunningMean> {
        [&self.macro_average, &self.micro_average]
            .into_iter()
            .chain(self.per_turn.iter())
    }
}

impl fmt::Display for MetricSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_turn: Vec<String> = self.per_turn.iter().map(ToString::to_string).collect();
        writeln!(f, "Micro: {}", self.micro_average)?;
        writeln!(f, "Macro: {}", self.macro_average)?;
        writeln!(f, "Turns: {}", per_turn.join("; "))
    }
}

/// One row of the aggregated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// `[macro, micro, turn_0, ..., turn_{max_turns-1}]`
    pub values: Vec<f64>,
    /// Observation count behind each value.
    pub counts: Vec<u64>,
}

/// Aggregated scores for a whole evaluation run, keyed by metric key in the
/// order the keys were first observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub max_turns: usize,
    pub dialogs: usize,
    pub metrics: IndexMap<String, ReportRow>,
}

impl Report {
    /// Column names following the metric name: `macro`, `micro`, `Turn 0`, ...
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec!["macro".to_string(), "micro".to_string()];
        names.extend((0..self.max_turns).map(|i| format!("Turn {}", i)));
        names
    }

    pub fn get(&self, key: &str) -> Option<&ReportRow> {
        self.metrics.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Counts shared by every metric, or `None` if any two metrics differ
    /// (or the report is empty).
    pub fn shared_counts(&self) -> Option<&[u64]> {
        let mut rows = self.metrics.values();
        let first = rows.next()?;
        rows.all(|row| row.counts == first.counts)
            .then_some(first.counts.as_slice())
    }

    /// Flat mapping of metric key to values, plus `"<key>__counts"` entries.
    pub fn to_table(&self) -> IndexMap<String, Vec<f64>> {
        let mut table = IndexMap::with_capacity(self.metrics.len() * 2);
        for (key, row) in &self.metrics {
            table.insert(key.clone(), row.values.clone());
        }
        for (key, row) in &self.metrics {
            table.insert(
                format!("{}__counts", key),
                row.counts.iter().map(|&c| c as f64).collect(),
            );
        }
        table
    }
}

/// Cutoffs, metrics and positional depth for a scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub k_values: Vec<usize>,
    pub metrics: Vec<Metric>,
    pub max_turns: usize,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            k_values: DEFAULT_K_VALUES.to_vec(),
            metrics: Metric::STANDARD.to_vec(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// Streams dialog results into per-metric summaries.
#[derive(Debug)]
pub struct Aggregator {
    max_turns: usize,
    dialogs: usize,
    summaries: IndexMap<String, MetricSummary>,
}

impl Aggregator {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            dialogs: 0,
            summaries: IndexMap::new(),
        }
    }

    /// Folds one dialog's per-turn metrics in. Summaries are created the
    /// first time a metric key is observed.
    pub fn observe(&mut self, dialog_metrics: &TurnMetrics) {
        self.dialogs += 1;
        for (key, values) in dialog_metrics {
            self.summary_mut(key).update(values);
        }
    }

    fn summary_mut(&mut self, key: &str) -> &mut MetricSummary {
        if !self.summaries.contains_key(key) {
            self.summaries
                .insert(key.to_string(), MetricSummary::new(self.max_turns));
        }
        &mut self.summaries[key]
    }

    pub fn summary(&self, key: &str) -> Option<&MetricSummary> {
        self.summaries.get(key)
    }

    pub fn dialogs(&self) -> usize {
        self.dialogs
    }

    pub fn finish(self) -> Report {
        let metrics = self
            .summaries
            .into_iter()
            .map(|(key, summary)| {
                let row = ReportRow {
                    values: summary.values(),
                    counts: summary.counts(),
                };
                (key, row)
            })
            .collect();
        Report {
            max_turns: self.max_turns,
            dialogs: self.dialogs,
            metrics,
        }
    }
}

/// Scores every predicted dialog and aggregates the results.
///
/// Dialogs are visited in `preds` order. A predicted dialog without a gold or
/// seed entry is an error; gold dialogs without predictions are skipped.
pub fn score_dataset<S: AsRef<str>>(
    preds: &IndexMap<String, Vec<Vec<S>>>,
    gold: &HashMap<String, Vec<S>>,
    seed_tracks: &HashMap<String, Vec<Vec<S>>>,
    options: &ScoringOptions,
) -> Result<Report> {
    let unpredicted = gold.keys().filter(|id| !preds.contains_key(*id)).count();
    if unpredicted > 0 {
        log::warn!("{} gold dialogs have no predictions and are not scored", unpredicted);
    }

    let mut aggregator = Aggregator::new(options.max_turns);
    let total = preds.len();

    for (dialog_id, dialog_preds) in preds {
        let dialog_gold = gold
            .get(dialog_id)
            .ok_or_else(|| EvalError::MissingDialog(dialog_id.clone()))?;
        let dialog_seeds = seed_tracks
            .get(dialog_id)
            .ok_or_else(|| EvalError::MissingDialog(dialog_id.clone()))?;

        let dialog_metrics = compute_metrics_per_turn(
            dialog_preds,
            dialog_gold,
            dialog_seeds,
            &options.k_values,
            &options.metrics,
        )?;
        log::debug!(
            "Dialog {}: {} scored turns",
            dialog_id,
            dialog_metrics.values().next().map_or(0, Vec::len)
        );
        aggregator.observe(&dialog_metrics);

        if aggregator.dialogs() % PROGRESS_EVERY == 0 {
            log::info!("Scored {}/{} dialogs", aggregator.dialogs(), total);
        }
    }

    Ok(aggregator.finish())
}
