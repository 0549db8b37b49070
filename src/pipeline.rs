//! End-to-end evaluation run: load, resolve cluster ids, score.

use crate::config::Config;
use crate::data::{load_dialogs, load_results, load_tracks};
use crate::eval::{score_dataset, Report};
use crate::preprocess::prepare_inputs;
use anyhow::{Context, Result};

/// Runs a full evaluation as described by `config`.
///
/// `config.data.model_output` must be set.
pub fn run(config: &Config) -> Result<Report> {
    let options = config.scoring_options()?;
    let model_output = config
        .data
        .model_output
        .as_deref()
        .context("No model output given (set --model-output or data.model_output)")?;

    log::info!("Loading predictions from {}", model_output.display());
    let model_results = load_results(model_output)
        .with_context(|| format!("Failed to load predictions from {}", model_output.display()))?;
    log::info!("Loading gold labels from {}", config.data.gold_data.display());
    let dialogs = load_dialogs(&config.data.gold_data).with_context(|| {
        format!("Failed to load dialogs from {}", config.data.gold_data.display())
    })?;
    log::info!("Loading tracks from {}", config.data.tracks.display());
    let tracks = load_tracks(&config.data.tracks)
        .with_context(|| format!("Failed to load tracks from {}", config.data.tracks.display()))?;

    let inputs = prepare_inputs(
        &model_results,
        &dialogs,
        &tracks,
        config.scoring.num_prev_tracks,
    )?;

    log::info!(
        "Computing metrics for {} dialogs (k = {:?})",
        inputs.preds.len(),
        options.k_values
    );
    let report = score_dataset(&inputs.preds, &inputs.gold, &inputs.seed_tracks, &options)?;
    log::info!("Scored {} dialogs, {} metric keys", report.dialogs, report.metrics.len());

    Ok(report)
}
