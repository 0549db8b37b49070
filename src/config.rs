use crate::eval::{Metric, ScoringOptions, DEFAULT_K_VALUES, DEFAULT_MAX_TURNS};
use crate::preprocess::DEFAULT_NUM_PREV_TRACKS;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CPCD_EVAL_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "cpcd_eval.toml";

/// Report file name, without extension, used when no output is configured.
pub const DEFAULT_OUTPUT_STEM: &str = "eval_results";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Input and output file locations
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Model output JSONL. Usually given on the command line.
    #[serde(default)]
    pub model_output: Option<PathBuf>,
    #[serde(default = "default_gold_data")]
    pub gold_data: PathBuf,
    #[serde(default = "default_tracks")]
    pub tracks: PathBuf,
    /// Report path. Defaults to `eval_results.<format>`.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            model_output: None,
            gold_data: default_gold_data(),
            tracks: default_tracks(),
            output: None,
        }
    }
}

/// Metric selection and turn bookkeeping
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_k_values")]
    pub k_values: Vec<usize>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Liked tracks per turn that are excluded from later turns.
    #[serde(default = "default_num_prev_tracks")]
    pub num_prev_tracks: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            k_values: default_k_values(),
            metrics: default_metrics(),
            max_turns: default_max_turns(),
            num_prev_tracks: default_num_prev_tracks(),
        }
    }
}

fn default_gold_data() -> PathBuf {
    PathBuf::from("data/cpcd_v1.dialogs.test.jsonl")
}

fn default_tracks() -> PathBuf {
    PathBuf::from("data/cpcd_v1.tracks.jsonl")
}

fn default_k_values() -> Vec<usize> {
    DEFAULT_K_VALUES.to_vec()
}

fn default_metrics() -> Vec<String> {
    Metric::STANDARD.iter().map(|m| m.name().to_string()).collect()
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_num_prev_tracks() -> usize {
    DEFAULT_NUM_PREV_TRACKS
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) first.
    /// Looks for a config file in this order:
    /// 1. `path`, when given
    /// 2. Path specified in the CPCD_EVAL_CONFIG environment variable
    /// 3. ./cpcd_eval.toml, if it exists
    ///
    /// Without any config file, defaults are used. Values are not validated
    /// here so command-line overrides can still replace them; call
    /// [`Config::validate`] once they are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => match std::env::var(CONFIG_ENV_VAR) {
                Ok(p) => Some(PathBuf::from(p)),
                Err(_) => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
            },
        };

        let config = match config_path {
            Some(config_path) => {
                let config_str = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read config file: {}", config_path.display())
                })?;
                log::info!("Loaded configuration from {}", config_path.display());
                Self::from_toml_str(&config_str)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?
            }
            None => Config::default(),
        };

        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;

        if scoring.k_values.is_empty() {
            anyhow::bail!("scoring.k_values must not be empty");
        }
        if scoring.k_values.contains(&0) {
            anyhow::bail!("scoring.k_values must all be greater than 0");
        }
        let unique: HashSet<usize> = scoring.k_values.iter().copied().collect();
        if unique.len() != scoring.k_values.len() {
            anyhow::bail!("scoring.k_values contains duplicates: {:?}", scoring.k_values);
        }

        if scoring.metrics.is_empty() {
            anyhow::bail!("scoring.metrics must not be empty");
        }
        Metric::parse_all(&scoring.metrics).context("Invalid scoring.metrics")?;

        Ok(())
    }

    /// Report path: the configured output, else `eval_results.<extension>`
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.data
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.{}", DEFAULT_OUTPUT_STEM, extension)))
    }

    /// Scoring options for [`score_dataset`](crate::eval::score_dataset)
    pub fn scoring_options(&self) -> Result<ScoringOptions> {
        Ok(ScoringOptions {
            k_values: self.scoring.k_values.clone(),
            metrics: Metric::parse_all(&self.scoring.metrics)?,
            max_turns: self.scoring.max_turns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_config_env(value: Option<&str>, f: impl FnOnce()) {
        let original = std::env::var(CONFIG_ENV_VAR).ok();
        match value {
            Some(v) => std::env::set_var(CONFIG_ENV_VAR, v),
            None => std::env::remove_var(CONFIG_ENV_VAR),
        }
        f();
        std::env::remove_var(CONFIG_ENV_VAR);
        if let Some(val) = original {
            std::env::set_var(CONFIG_ENV_VAR, val);
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.scoring.k_values, vec![1, 5, 10, 20, 100]);
        assert_eq!(config.scoring.metrics, vec!["hit", "map", "mrr", "precision", "recall"]);
        assert_eq!(config.scoring.max_turns, 10);
        assert_eq!(config.scoring.num_prev_tracks, 3);
        assert!(config.data.model_output.is_none());
        assert!(config.data.output.is_none());
        assert_eq!(config.output_path("csv"), PathBuf::from("eval_results.csv"));
        assert_eq!(config.output_path("json"), PathBuf::from("eval_results.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml_str(
            r#"
[data]
model_output = "model_output/bm25.test.jsonl"

[scoring]
k_values = [1, 10]
metrics = ["recall", "mrr"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.data.model_output,
            Some(PathBuf::from("model_output/bm25.test.jsonl"))
        );
        assert_eq!(config.scoring.max_turns, 10);
        assert_eq!(config.output_path("json"), PathBuf::from("eval_results.json"));

        let options = config.scoring_options().unwrap();
        assert_eq!(options.k_values, vec![1, 10]);
        assert_eq!(options.metrics, vec![Metric::Recall, Metric::Mrr]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.scoring.k_values = vec![];
        assert!(config.validate().is_err());

        config.scoring.k_values = vec![0, 5];
        assert!(config.validate().is_err());

        config.scoring.k_values = vec![5, 5];
        assert!(config.validate().unwrap_err().to_string().contains("duplicates"));

        config.scoring.k_values = vec![5];
        config.scoring.metrics = vec!["ndcg".to_string()];
        assert!(config.validate().is_err());

        config.scoring.metrics = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("eval.toml");
        fs::write(&config_path, "[scoring]\nmax_turns = 4\nnum_prev_tracks = 1\n").unwrap();

        with_config_env(None, || {
            let config = Config::load(Some(&config_path)).unwrap();
            assert_eq!(config.scoring.max_turns, 4);
            assert_eq!(config.scoring.num_prev_tracks, 1);
        });
    }

    #[test]
    fn test_load_from_env_var() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("eval.toml");
        fs::write(&config_path, "[scoring]\nk_values = [1, 2]\n").unwrap();

        with_config_env(config_path.to_str(), || {
            let config = Config::load(None).unwrap();
            assert_eq!(config.scoring.k_values, vec![1, 2]);
        });
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(None, || {
            let err = Config::load(Some(Path::new("nonexistent.toml"))).unwrap_err();
            assert!(err.to_string().contains("nonexistent.toml"));
        });
    }

    #[test]
    fn test_load_invalid_values() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("eval.toml");
        fs::write(&config_path, "[scoring]\nmetrics = [\"hit\", \"ndcg\"]\n").unwrap();

        with_config_env(None, || {
            let mut config = Config::load(Some(&config_path)).unwrap();
            assert!(config.validate().is_err());

            config.scoring.metrics = vec!["recall".to_string()];
            assert!(config.validate().is_ok());
        });
    }
}
