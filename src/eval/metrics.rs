//! Retrieval metrics: Hit@K, MRR@K, Precision@K, Recall@K and MAP@K.
//!
//! Every metric truncates the prediction list to its first `k` entries before
//! scoring. See
//! <https://en.wikipedia.org/wiki/Evaluation_measures_(information_retrieval)#Offline_metrics>.

use crate::error::{EvalError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Metric key (`"<name>@<k>"`) to score, in computation order.
pub type MetricValues = IndexMap<String, f64>;

/// A registered retrieval metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Hit,
    Map,
    Mrr,
    Precision,
    Recall,
}

impl Metric {
    /// All registered metrics, sorted by name.
    pub const STANDARD: [Metric; 5] = [
        Metric::Hit,
        Metric::Map,
        Metric::Mrr,
        Metric::Precision,
        Metric::Recall,
    ];

    /// Registered name of the metric.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Hit => "hit",
            Metric::Map => "map",
            Metric::Mrr => "mrr",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
        }
    }

    /// Report key for this metric at cutoff `k`, e.g. `recall@10`.
    pub fn key(self, k: usize) -> String {
        format!("{}@{}", self.name(), k)
    }

    /// Parse a list of metric names, failing on the first unregistered one.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Metric>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }

    fn score(self, gold: &HashSet<&str>, preds: &[&str], k: usize) -> f64 {
        match self {
            Metric::Hit => hit(gold, preds, k),
            Metric::Map => average_precision(gold, preds, k),
            Metric::Mrr => reciprocal_rank(gold, preds, k),
            Metric::Precision => precision(gold, preds, k),
            Metric::Recall => recall(gold, preds, k),
        }
    }
}

impl FromStr for Metric {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::STANDARD
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| EvalError::UnknownMetric(s.to_string()))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn top_k<'a, 'b>(preds: &'a [&'b str], k: usize) -> &'a [&'b str] {
    &preds[..k.min(preds.len())]
}

fn count_hits(gold: &HashSet<&str>, preds: &[&str]) -> usize {
    preds.iter().filter(|p| gold.contains(*p)).count()
}

/// Hit at K: 1.0 if any of the top-K predictions is relevant, else 0.0.
pub fn hit(gold: &HashSet<&str>, preds: &[&str], k: usize) -> f64 {
    if top_k(preds, k).iter().any(|p| gold.contains(p)) {
        1.0
    } else {
        0.0
    }
}

/// Reciprocal rank at K: 1/rank of the first relevant prediction (1-indexed).
/// Returns 0.0 if no relevant item appears in the top K.
pub fn reciprocal_rank(gold: &HashSet<&str>, preds: &[&str], k: usize) -> f64 {
    top_k(preds, k)
        .iter()
        .position(|p| gold.contains(p))
        .map(|idx| 1.0 / (idx + 1) as f64)
        .unwrap_or(0.0)
}

/// Precision at K: relevant predictions in the top K over the number of
/// predictions actually considered (`min(k, preds.len())`).
/// Returns 0.0 when nothing is considered.
pub fn precision(gold: &HashSet<&str>, preds: &[&str], k: usize) -> f64 {
    let top = top_k(preds, k);
    if top.is_empty() {
        return 0.0;
    }
    count_hits(gold, top) as f64 / top.len() as f64
}

/// Recall at K: relevant predictions in the top K over |gold|.
/// Returns 0.0 for empty gold; [`compute_metrics`] rejects that case instead.
pub fn recall(gold: &HashSet<&str>, preds: &[&str], k: usize) -> f64 {
    if gold.is_empty() {
        return 0.0;
    }
    count_hits(gold, top_k(preds, k)) as f64 / gold.len() as f64
}

/// Average precision at K: sum of precision at each relevant rank,
/// normalised by `min(|gold|, min(k, preds.len()))`.
pub fn average_precision(gold: &HashSet<&str>, preds: &[&str], k: usize) -> f64 {
    let top = top_k(preds, k);
    let denominator = gold.len().min(top.len());
    if denominator == 0 {
        return 0.0;
    }
    let mut num_hit = 0usize;
    let mut total_precision = 0.0;
    for (i, pred) in top.iter().enumerate() {
        if gold.contains(pred) {
            num_hit += 1;
            total_precision += num_hit as f64 / (i + 1) as f64;
        }
    }
    total_precision / denominator as f64
}

fn has_duplicates<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    !values.iter().all(|v| seen.insert(v))
}

/// Computes `metrics × k_values` for one ranked prediction list.
///
/// Fails if `preds` or `gold` contain duplicates, if `gold` is empty, if
/// `k_values` is empty or contains 0, or if the largest k exceeds
/// `preds.len()`. Keys are produced metric-major in the order given.
pub fn compute_metrics<P, G>(
    preds: &[P],
    gold: &[G],
    k_values: &[usize],
    metrics: &[Metric],
) -> Result<MetricValues>
where
    P: AsRef<str>,
    G: AsRef<str>,
{
    let preds: Vec<&str> = preds.iter().map(AsRef::as_ref).collect();
    let gold_list: Vec<&str> = gold.iter().map(AsRef::as_ref).collect();

    if has_duplicates(&preds) {
        return Err(EvalError::DuplicatePredictions);
    }
    if has_duplicates(&gold_list) {
        return Err(EvalError::DuplicateGold);
    }
    if gold_list.is_empty() {
        return Err(EvalError::EmptyGold);
    }
    let max_k = match k_values.iter().max() {
        Some(&k) => k,
        None => return Err(EvalError::InvalidCutoff("no k values given".to_string())),
    };
    if k_values.contains(&0) {
        return Err(EvalError::InvalidCutoff("k must be at least 1".to_string()));
    }
    if max_k > preds.len() {
        return Err(EvalError::CutoffExceedsPredictions {
            k: max_k,
            available: preds.len(),
        });
    }

    let gold: HashSet<&str> = gold_list.into_iter().collect();
    let mut values = MetricValues::with_capacity(metrics.len() * k_values.len());
    for &metric in metrics {
        for &k in k_values {
            values.insert(metric.key(k), metric.score(&gold, &preds, k));
        }
    }
    Ok(values)
}
