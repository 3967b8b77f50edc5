// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, loads the environment Settings
// once, hands the converted config to a use case and prints
// what came back. No pipeline logic lives here.
//
// Reference: clap derive tutorial

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{CollectArgs, Commands, InitDbArgs, InspectArgs, PredictArgs, TrainStoreArgs, TrainUciArgs};

use crate::application::train_use_case::TrainReport;
use crate::domain::reading::Reading;
use crate::infra::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "aqi-pipeline",
    version,
    about = "Collect air-quality readings, fit a linear model and verify its ONNX export."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        let settings = Settings::load()?;
        tracing::debug!("Settings: data dir '{}'", settings.data_dir().display());

        match self.command {
            Commands::InitDb(args)     => run_init_db(args, settings),
            Commands::Collect(args)    => run_collect(args, settings),
            Commands::Inspect(args)    => run_inspect(args, settings),
            Commands::TrainUci(args)   => run_train_uci(args, settings),
            Commands::TrainStore(args) => run_train_store(args, settings),
            Commands::Predict(args)    => run_predict(args, settings),
        }
    }
}

fn run_init_db(args: InitDbArgs, settings: Settings) -> Result<()> {
    use crate::application::store_use_case::InitDbUseCase;

    let path = InitDbUseCase::new(args.into(), settings).execute()?;
    println!("Database ready: {}", path.display());
    Ok(())
}

fn run_collect(args: CollectArgs, settings: Settings) -> Result<()> {
    use crate::application::collect_use_case::CollectUseCase;

    let summary = CollectUseCase::new(args.into(), settings).execute()?;

    println!("Stored {} reading(s).", summary.stored);
    for err in &summary.errors {
        println!("  failed: {err}");
    }
    println!("\nLatest per city:");
    print_readings(&summary.latest);
    if let Some(path) = summary.plot_path {
        println!("\nChart: {}", path.display());
    }
    Ok(())
}

fn run_inspect(args: InspectArgs, settings: Settings) -> Result<()> {
    use crate::application::store_use_case::InspectUseCase;

    let report = InspectUseCase::new(args.into(), settings).execute()?;
    println!("{}: {} reading(s)", report.path.display(), report.total);
    print_readings(&report.head);
    Ok(())
}

fn run_train_uci(args: TrainUciArgs, settings: Settings) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let report = TrainUseCase::new(args.into(), settings).execute()?;
    print_train_report(&report);
    Ok(())
}

fn run_train_store(args: TrainStoreArgs, settings: Settings) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let report = TrainUseCase::new(args.into(), settings).execute()?;
    print_train_report(&report);
    Ok(())
}

fn run_predict(args: PredictArgs, settings: Settings) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let prediction = PredictUseCase::new(args.into(), settings).execute()?;
    println!(
        "{} = f({})",
        prediction.card.target,
        prediction.card.features.join(", ")
    );
    for value in &prediction.values {
        println!("{value:.4}");
    }
    Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────
fn print_readings(readings: &[Reading]) {
    if readings.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "  {:<12} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}  timestamp",
        "city", "aqi", "pm25", "pm10", "co", "no2", "so2", "o3"
    );
    for r in readings {
        let cells: Vec<String> = r
            .measurements()
            .iter()
            .map(|v| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}")))
            .map(|s| format!("{s:>7}"))
            .collect();
        println!("  {:<12} {}  {}", r.city, cells.join(" "), r.timestamp);
    }
}

fn print_train_report(report: &TrainReport) {
    let eval = &report.evaluation;
    println!("Trained {} = f({})", eval.target, eval.model.feature_names.join(", "));
    println!("  rows:          {} train / {} test", eval.train_rows, eval.test_rows);
    println!("  MAE native:    {:.6}", eval.mae_native);
    println!("  MAE reloaded:  {:.6}", eval.mae_reloaded);
    println!("  model:         {}", report.onnx_path.display());
    println!("  card:          {}", report.card_path.display());
    for plot in &report.plots {
        println!("  plot:          {}", plot.display());
    }
}
