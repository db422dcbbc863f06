use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use osmlen::batch::{current_jobs, historic_jobs, BatchRunner, CsvSink, Job};
use osmlen::collect::global_variables::{CURRENT_CITIES, HISTORIC_CITIES};
use osmlen::collect::overpass::{OverpassCollect, INFRASTRUCTURE_FILTERS};
use osmlen::commons::basic_functions::{historic_dates, normalize_date};
use osmlen::commons::boundary::BoundaryStore;
use osmlen::{Measurer, Settings};

/// Road and cycle infrastructure length per region, from OpenStreetMap via Overpass
#[derive(clap::Parser, Debug)]
#[command(name = "osmlen", version, about, propagate_version = true)]
struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON settings file
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Directory of `<name>.txt` boundary files, overrides the settings
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    boundaries: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Measure the latest data, one row per region
    Current(CurrentArgs),

    /// Measure past snapshots, one row per date and region
    Historic(HistoricArgs),
}

#[derive(clap::Args, Debug)]
struct CurrentArgs {
    /// Region names, defaults to the built-in list
    cities: Vec<String>,

    /// Output CSV file
    #[arg(short, long, default_value = "current.csv", value_hint = clap::ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(clap::Args, Debug)]
struct HistoricArgs {
    /// Region names, defaults to the built-in list
    cities: Vec<String>,

    /// Output CSV file
    #[arg(short, long, default_value = "historic.csv", value_hint = clap::ValueHint::FilePath)]
    output: PathBuf,

    /// RFC 3339 snapshot date, repeatable; defaults to every odd month 2013-2021
    #[arg(short, long = "date")]
    dates: Vec<String>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn or_defaults(cities: &[String], defaults: &[&str]) -> Vec<String> {
    if cities.is_empty() {
        defaults.iter().map(|c| c.to_string()).collect()
    } else {
        cities.to_vec()
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(dir) = &cli.boundaries {
        settings.boundary_dir = dir.clone();
    }
    settings.validate()?;

    let (jobs, output, with_date): (Vec<Job>, &PathBuf, bool) = match &cli.command {
        Commands::Current(args) => (
            current_jobs(&or_defaults(&args.cities, &CURRENT_CITIES)),
            &args.output,
            false,
        ),
        Commands::Historic(args) => {
            let dates = if args.dates.is_empty() {
                historic_dates()
            } else {
                args.dates
                    .iter()
                    .map(|d| normalize_date(d).with_context(|| format!("Invalid date: {d}")))
                    .collect::<Result<Vec<_>>>()?
            };
            (
                historic_jobs(&or_defaults(&args.cities, &HISTORIC_CITIES), &dates),
                &args.output,
                true,
            )
        }
    };

    let measurer = Measurer::new(settings.measure_options()).context("Failed to set up projection")?;
    let mut overpass = OverpassCollect::new(
        settings.endpoint_url()?,
        &settings.user_agent,
        settings.timeout_secs,
        settings.retry_policy(),
    )?;
    let store = BoundaryStore::new(&settings.boundary_dir);

    info!(
        jobs = jobs.len(),
        output = %output.display(),
        boundaries = %store.dir().display(),
        "starting batch"
    );

    let mut sink = CsvSink::create(output, &INFRASTRUCTURE_FILTERS, with_date)?;
    let report = BatchRunner::new(&measurer, &mut overpass, &INFRASTRUCTURE_FILTERS)
        .with_pause(settings.boundary_pause())
        .run(&jobs, |name| store.load(name), &mut sink)?;
    sink.finish()?;

    info!(rows = report.rows, failures = report.failures.len(), "batch finished");
    for failure in &report.failures {
        warn!(
            name = %failure.name,
            date = failure.date.as_deref().unwrap_or("latest"),
            error = %failure.error,
            invalid_boundary = failure.invalid_boundary,
            "no row written"
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(&cli)
}
