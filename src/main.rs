//! Evaluation CLI: score a CPCD model output file and write per-turn,
//! macro and micro averaged retrieval metrics.
//!
//! ```text
//! cpcd-eval \
//!     --model-output model_output/bm25.test.jsonl \
//!     --gold-data data/cpcd_v1.dialogs.test.jsonl \
//!     --output scores/bm25.test.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cpcd_eval::{pipeline, report, Config};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Canonical retrieval metrics for the CPCD benchmark.
#[derive(Parser, Debug)]
#[command(name = "cpcd-eval", version)]
struct Args {
    /// Path to JSONL file containing model predictions.
    #[arg(long)]
    model_output: Option<PathBuf>,

    /// Path to gold dialogs JSONL.
    #[arg(long)]
    gold_data: Option<PathBuf>,

    /// Path to tracks JSONL.
    #[arg(long)]
    tracks: Option<PathBuf>,

    /// Number of previously liked tracks per turn used as seed tracks.
    #[arg(long)]
    num_prev_tracks: Option<usize>,

    /// Where to save the eval results (default: eval_results.<format>).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Cutoffs, comma separated (e.g. 1,5,10).
    #[arg(long, value_delimiter = ',')]
    k_values: Option<Vec<usize>>,

    /// Metrics to compute, comma separated (hit, map, mrr, precision, recall).
    #[arg(long, value_delimiter = ',')]
    metrics: Option<Vec<String>>,

    /// Number of per-turn columns in the report.
    #[arg(long)]
    max_turns: Option<usize>,

    /// Output file format.
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Path to a TOML config file (default: $CPCD_EVAL_CONFIG or ./cpcd_eval.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also print the summary table to stdout.
    #[arg(long)]
    print: bool,
}

impl Args {
    /// Command-line values take precedence over the config file.
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.model_output {
            config.data.model_output = Some(path);
        }
        if let Some(path) = self.gold_data {
            config.data.gold_data = path;
        }
        if let Some(path) = self.tracks {
            config.data.tracks = path;
        }
        if let Some(path) = self.output {
            config.data.output = Some(path);
        }
        if let Some(n) = self.num_prev_tracks {
            config.scoring.num_prev_tracks = n;
        }
        if let Some(k_values) = self.k_values {
            config.scoring.k_values = k_values;
        }
        if let Some(metrics) = self.metrics {
            config.scoring.metrics = metrics;
        }
        if let Some(max_turns) = self.max_turns {
            config.scoring.max_turns = max_turns;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let format = args.format;
    let print = args.print;

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let report = pipeline::run(&config)?;
    if report.is_empty() {
        log::warn!("No turns were scored; the report has no metric rows");
    }

    let output = config.output_path(format.extension());
    log::info!("Writing results to {}", output.display());
    let written = match format {
        OutputFormat::Csv => report::write_csv_file(&report, &output),
        OutputFormat::Json => report::write_json_file(&report, &output),
    };
    written.with_context(|| format!("Failed to write {}", output.display()))?;

    if print {
        println!("\n=== Evaluation Results ({} dialogs) ===\n", report.dialogs);
        print!("{}", report::render_table(&report));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::from_toml_str(
            "[scoring]\nk_values = [1, 10]\nmetrics = [\"ndcg\"]\nmax_turns = 2\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let args = Args::try_parse_from([
            "cpcd-eval",
            "--model-output",
            "model_output/bm25.test.jsonl",
            "--metrics",
            "recall,mrr",
            "--k-values",
            "1,5",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        args.apply(&mut config);

        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.metrics, vec!["recall", "mrr"]);
        assert_eq!(config.scoring.k_values, vec![1, 5]);
        assert_eq!(config.scoring.max_turns, 2);
        assert_eq!(
            config.data.model_output,
            Some(PathBuf::from("model_output/bm25.test.jsonl"))
        );
        assert_eq!(config.output_path("json"), PathBuf::from("eval_results.json"));
    }

    #[test]
    fn test_explicit_output_wins_over_format_default() {
        let mut config = Config::default();
        let args =
            Args::try_parse_from(["cpcd-eval", "--output", "scores/run.csv", "--format", "json"])
                .unwrap();
        let extension = args.format.extension();
        args.apply(&mut config);
        assert_eq!(config.output_path(extension), PathBuf::from("scores/run.csv"));
    }
}
