use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod actions;
mod constraints;
mod controller;
mod dataset;
mod domain;
mod inputter;
mod model;
mod pipeline;
mod scope;
mod ui;
mod weights;

use controller::Controller;
use dataset::{Dataset, DatasetKind};
use domain::{TTVConfig, TTVError};
use model::{Model, Status};
use pipeline::SortDirection;
use ui::TableUI;
use weights::WeightKey;

/// Browse timetable master data and tune generation constraints.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Additional tables to open (csv, parquet or arrow)
    files: Vec<String>,

    /// Column key every tab is sorted by on startup
    #[arg(long)]
    sort_key: Option<String>,

    /// Direction for --sort-key (asc or desc)
    #[arg(long, default_value = "asc")]
    sort: String,

    /// Optimization weight as KEY=PERCENT, e.g. facultyLoad=50 (repeatable)
    #[arg(long = "weight", value_name = "KEY=PERCENT")]
    weights: Vec<String>,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Upper bound for the width of a table column
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Where to write the log
    #[arg(long, default_value = "ttv.log")]
    log_file: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Error: Failed to set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Err(e) => {
            error!("ttv failed: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand_path(path: &str) -> Result<PathBuf, TTVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| TTVError::LoadingFailed(format!("Can not expand {path}: {e}")))
}

fn init_logging(cli: &Cli) -> Result<(), TTVError> {
    let log_file = File::create(expand_path(&cli.log_file)?)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level.clone().into()))
        .with(
            fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn parse_weight(arg: &str) -> Result<(WeightKey, f64), TTVError> {
    let (key, percent) = arg
        .split_once('=')
        .ok_or_else(|| TTVError::UnknownWeight(arg.to_string()))?;
    let key = key.trim().parse::<WeightKey>()?;
    let percent = percent
        .trim()
        .parse::<f64>()
        .map_err(|_| TTVError::UnknownWeight(arg.to_string()))?;
    Ok((key, percent))
}

fn build_config(cli: &Cli) -> Result<TTVConfig, TTVError> {
    let weights = cli
        .weights
        .iter()
        .map(|w| parse_weight(w))
        .collect::<Result<Vec<_>, TTVError>>()?;

    let mut config = TTVConfig::default()
        .event_poll_time(cli.poll_ms)
        .max_column_width(cli.max_column_width)
        .weights(weights);
    if let Some(key) = &cli.sort_key {
        let dir = cli.sort.parse::<SortDirection>()?;
        config = config.initial_sort((key.clone(), dir));
    }
    Ok(config)
}

// Everything that can fail before the terminal is switched over.
fn prepare(cli: &Cli) -> Result<(TTVConfig, Vec<Dataset>), TTVError> {
    let cfg = build_config(cli)?;
    info!("Starting ttv with {:?}", cfg);

    let mut datasets = DatasetKind::ALL
        .into_iter()
        .map(Dataset::sample)
        .collect::<Vec<Dataset>>();
    for file in cli.files.iter() {
        datasets.push(Dataset::load(expand_path(file)?)?);
    }
    Ok((cfg, datasets))
}

fn run(cli: &Cli) -> Result<(), TTVError> {
    let (cfg, datasets) = prepare(cli)?;

    let mut terminal = ratatui::init();
    let result = run_tui(&cfg, datasets, &mut terminal);
    ratatui::restore();
    result
}

fn run_tui(
    cfg: &TTVConfig,
    datasets: Vec<Dataset>,
    terminal: &mut DefaultTerminal,
) -> Result<(), TTVError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, datasets, size.width as usize, size.height as usize)?;
    let ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Quitting ttv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("ttv").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let cli = cli(&[]);
        assert!(cli.files.is_empty());
        assert_eq!(cli.log_file, "ttv.log");
        let cfg = build_config(&cli).unwrap();
        assert_eq!(cfg.event_poll_time, 100);
        assert_eq!(cfg.max_column_width, 40);
        assert!(cfg.initial_sort.is_none());
    }

    #[test]
    fn sort_and_weights() {
        let cli = cli(&[
            "rooms.csv",
            "--sort-key",
            "capacity",
            "--sort",
            "DESC",
            "--weight",
            "facultyLoad=50",
            "--weight",
            "studentGaps = 10",
        ]);
        assert_eq!(cli.files, vec!["rooms.csv"]);
        let cfg = build_config(&cli).unwrap();
        assert_eq!(
            cfg.initial_sort,
            Some(("capacity".to_string(), SortDirection::Descending))
        );
        assert_eq!(
            cfg.weights,
            vec![(WeightKey::FacultyLoad, 50.0), (WeightKey::StudentGaps, 10.0)]
        );
    }

    #[test]
    fn bad_arguments_are_rejected() {
        let cfg = build_config(&cli(&["--sort-key", "id", "--sort", "up"]));
        assert!(matches!(cfg, Err(TTVError::InvalidSortDirection(_))));

        let cfg = build_config(&cli(&["--weight", "comfort=20"]));
        assert!(matches!(cfg, Err(TTVError::UnknownWeight(_))));

        let cfg = build_config(&cli(&["--weight", "facultyLoad"]));
        assert!(matches!(cfg, Err(TTVError::UnknownWeight(_))));
    }

    #[test]
    fn startup_failures_happen_before_the_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("rooms.csv");
        let with_missing_file = cli(&[missing.to_str().unwrap()]);
        assert!(matches!(prepare(&with_missing_file), Err(TTVError::FileNotFound)));

        let (cfg, datasets) = prepare(&cli(&["--poll-ms", "50"])).unwrap();
        assert_eq!(cfg.event_poll_time, 50);
        assert_eq!(datasets.len(), 4);
    }

    #[test]
    fn home_is_expanded() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_path("~/ttv.log").unwrap(), PathBuf::from(home).join("ttv.log"));
        }
    }
}
