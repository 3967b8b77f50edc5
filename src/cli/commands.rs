// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// One subcommand per workflow:
//
//   init-db      create the SQLite store
//   collect      fetch, store and chart the latest readings
//   inspect      row count and the first rows of the store
//   train-uci    fit CO(GT) from PT08.S1(CO) on the UCI CSV
//   train-store  fit aqi from the pollutants in the store
//   predict      run a trained model on feature rows
//
// Paths left unset fall back to the environment Settings.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{
    collect_use_case::{CollectConfig, FetchSource},
    predict_use_case::PredictConfig,
    store_use_case::{InitDbConfig, InspectConfig},
    train_use_case::{TrainConfig, TrainingSource, UCI_MODEL_NAME},
};
use crate::data::splitter::{DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::ml::trainer::{TrainerConfig, DEFAULT_REL_TOLERANCE};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and its schema
    InitDb(InitDbArgs),

    /// Fetch the current reading for each city and store it
    Collect(CollectArgs),

    /// Show how many readings are stored and the first few
    Inspect(InspectArgs),

    /// Train on the UCI Air Quality CSV and verify the ONNX export
    TrainUci(TrainUciArgs),

    /// Train on stored readings and verify the ONNX export
    TrainStore(TrainStoreArgs),

    /// Predict with a trained model
    Predict(PredictArgs),
}

// ─── init-db ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct InitDbArgs {
    /// SQLite file (default: <data dir>/aqi_history.sqlite)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

impl From<InitDbArgs> for InitDbConfig {
    fn from(a: InitDbArgs) -> Self {
        InitDbConfig { db: a.db }
    }
}

// ─── collect ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Comma separated cities (default: AQI_CITIES)
    #[arg(long, value_delimiter = ',')]
    pub cities: Vec<String>,

    /// Replay readings from a JSON file instead of calling the API
    #[arg(long, conflicts_with = "synthetic")]
    pub fixture: Option<PathBuf>,

    /// Generate deterministic readings instead of calling the API
    #[arg(long)]
    pub synthetic: bool,

    /// Seed for --synthetic
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Skip the latest-AQI bar chart
    #[arg(long)]
    pub no_plot: bool,
}

impl From<CollectArgs> for CollectConfig {
    fn from(a: CollectArgs) -> Self {
        let source = match (a.fixture, a.synthetic) {
            (Some(path), _) => FetchSource::Fixture(path),
            (None, true)    => FetchSource::Synthetic { seed: a.seed },
            (None, false)   => FetchSource::Live,
        };
        CollectConfig {
            source,
            cities: a
                .cities
                .iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
            db:     a.db,
            plot:   !a.no_plot,
        }
    }
}

// ─── inspect ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Number of rows to show
    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

impl From<InspectArgs> for InspectConfig {
    fn from(a: InspectArgs) -> Self {
        InspectConfig { db: a.db, limit: a.limit }
    }
}

// ─── train-uci / train-store ──────────────────────────────────────────────────
/// Flags shared by both training commands
#[derive(Args, Debug)]
pub struct TrainingArgs {
    /// Model name; files are <models dir>/<name>.onnx and <name>.json
    #[arg(long)]
    pub name: Option<String>,

    /// Directory for model files (default: <data dir>/models)
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Share of rows held out for testing
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,

    /// Relative tolerance between native and reloaded MAE
    #[arg(long, default_value_t = DEFAULT_REL_TOLERANCE)]
    pub rel_tolerance: f64,

    /// Skip the scatter and histogram plots
    #[arg(long)]
    pub no_plots: bool,
}

impl TrainingArgs {
    /// Apply the flags on top of a source's default config.
    fn into_config(self, base: TrainConfig) -> TrainConfig {
        TrainConfig {
            model_name: self.name.unwrap_or(base.model_name),
            models_dir: self.models_dir,
            plots:      !self.no_plots,
            trainer:    TrainerConfig {
                seed:          self.seed,
                test_fraction: self.test_fraction,
                rel_tolerance: self.rel_tolerance,
                ..base.trainer
            },
            ..base
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainUciArgs {
    /// UCI CSV (default: <data dir>/uci/AirQualityUCI.csv)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    #[command(flatten)]
    pub training: TrainingArgs,
}

impl From<TrainUciArgs> for TrainConfig {
    fn from(a: TrainUciArgs) -> Self {
        let base = TrainConfig { source: TrainingSource::Uci { csv: a.csv }, ..TrainConfig::uci() };
        a.training.into_config(base)
    }
}

#[derive(Args, Debug)]
pub struct TrainStoreArgs {
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(flatten)]
    pub training: TrainingArgs,
}

impl From<TrainStoreArgs> for TrainConfig {
    fn from(a: TrainStoreArgs) -> Self {
        let base = TrainConfig { source: TrainingSource::Store { db: a.db }, ..TrainConfig::store() };
        a.training.into_config(base)
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────
/// One comma separated feature row, e.g. `1046,2.6`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow(pub Vec<f64>);

fn parse_row(s: &str) -> Result<FeatureRow, String> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .ok_or_else(|| format!("'{}' is not a finite number", v.trim()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FeatureRow)
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Model name used at training time
    #[arg(long, default_value = UCI_MODEL_NAME)]
    pub name: String,

    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Feature values, repeat for several rows
    #[arg(long = "row", required = true, value_parser = parse_row)]
    pub rows: Vec<FeatureRow>,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            model_name: a.name,
            models_dir: a.models_dir,
            rows:       a.rows.into_iter().map(|r| r.0).collect(),
        }
    }
}
