//! Per-dialog scoring with cumulative seed exclusion.

use crate::error::Result;
use crate::eval::metrics::{compute_metrics, Metric};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Metric key to the values observed for each scored turn, in turn order.
pub type TurnMetrics = IndexMap<String, Vec<f64>>;

fn filter_seen<'a, S: AsRef<str>>(items: &'a [S], seen: &HashSet<&str>) -> Vec<&'a str> {
    items
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| !seen.contains(item))
        .collect()
}

/// Computes retrieval metrics per turn for a single dialog.
///
/// Seed batch `t` is added to a running exclusion set before turn `t` is
/// scored, so items surfaced in earlier turns are removed from both the
/// predictions and the gold list. Turns are paired with seed batches
/// positionally and scoring stops at the shorter of the two. A turn whose
/// filtered gold is empty is skipped; since the exclusion set only grows,
/// every later turn is skipped as well.
pub fn compute_metrics_per_turn<S: AsRef<str>>(
    preds: &[Vec<S>],
    gold: &[S],
    seed_tracks: &[Vec<S>],
    k_values: &[usize],
    metrics: &[Metric],
) -> Result<TurnMetrics> {
    let mut per_turn = TurnMetrics::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (turn_idx, (turn_preds, turn_seeds)) in preds.iter().zip(seed_tracks).enumerate() {
        seen.extend(turn_seeds.iter().map(AsRef::as_ref));

        let filtered_gold = filter_seen(gold, &seen);
        if filtered_gold.is_empty() {
            log::trace!("Turn {} has no gold left after seed exclusion", turn_idx);
            continue;
        }
        let filtered_preds = filter_seen(turn_preds, &seen);

        let turn_metrics = compute_metrics(&filtered_preds, &filtered_gold, k_values, metrics)?;
        for (key, value) in turn_metrics {
            per_turn.entry(key).or_default().push(value);
        }
    }
    Ok(per_turn)
}
