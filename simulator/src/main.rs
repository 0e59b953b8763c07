mod simulation_config;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use frbsim_common::init_tracer;
use frbsim_population::{
    Export, ObserveOptions, Population, RateReport, SurveyCatalog, generate, log_n_log_s,
    observe_with, rates,
};
use simulation_config::SimulationConfig;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON file with the population configuration and survey overrides
    #[clap(long, env = "FRBSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Survey catalog to use instead of the built-in one
    #[clap(long, env = "FRBSIM_CATALOG")]
    catalog: Option<PathBuf>,

    /// Name given to the generated population
    #[clap(long, default_value = "cosmic")]
    name: String,

    /// Number of sources to generate
    #[clap(long, default_value = "10000")]
    n_srcs: usize,

    /// Time span the population represents, in days
    #[clap(long, default_value = "1")]
    n_days: f64,

    /// Seed for generation and observation, drawn at random if absent
    #[clap(long)]
    seed: Option<u64>,

    /// Include scatter broadening in the effective pulse width
    #[clap(long)]
    scattering: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Print a JSON rate report for one or more surveys
    Rates(RatesArgs),

    /// Print the cumulative signal to noise distribution of detections as a table
    Lognlogs(LognlogsArgs),

    /// Write a JSON snapshot of the population, or of its observation by a survey
    Export(ExportArgs),
}

#[derive(Debug, Parser)]
struct RatesArgs {
    /// Catalog names of the surveys
    #[clap(long, num_args = 1.., default_values = ["htru"])]
    surveys: Vec<String>,
}

#[derive(Debug, Parser)]
struct LognlogsArgs {
    #[clap(long, default_value = "htru")]
    survey: String,

    #[clap(long, default_value = "25")]
    n_bins: usize,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    /// Observe with this survey and export the result instead of the population
    #[clap(long)]
    survey: Option<String>,

    /// Output file, standard output if absent
    #[clap(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(LevelFilter::INFO)?;

    let config = match &args.config {
        Some(path) => SimulationConfig::from_path(path)
            .with_context(|| format!("Cannot load configuration {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => SurveyCatalog::from_path(path)?,
        None => SurveyCatalog::embedded()?,
    };

    let population = generate(
        &config.population,
        &args.name,
        args.n_srcs,
        args.n_days,
        args.seed,
    )?;
    info!(seed = ?population.seed(), "Population ready");

    let options = ObserveOptions {
        seed: args.seed,
        offsets: None,
        scattering: args.scattering,
    };

    match &args.mode {
        Mode::Rates(rates_args) => {
            let mut report = RateReport::default();
            for survey in config.surveys(&catalog, &rates_args.surveys)? {
                let observed = observe_with(&population, &survey, &options)?;
                report.insert(rates(&observed));
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Mode::Lognlogs(lognlogs_args) => {
            let surveys = config.surveys(&catalog, std::slice::from_ref(&lognlogs_args.survey))?;
            let Some(survey) = surveys.first() else {
                bail!("Survey {} not loaded", lognlogs_args.survey);
            };
            let observed = observe_with(&population, survey, &options)?;
            let histogram = log_n_log_s(&observed.detected_snr(), lognlogs_args.n_bins)
                .with_context(|| format!("No usable detections by {}", survey.name))?;
            println!("relative_snr\tn_above");
            for (edge, count) in histogram.edges.iter().zip(histogram.counts.iter()) {
                println!("{edge:.6e}\t{count}");
            }
        }
        Mode::Export(export_args) => {
            let json = match &export_args.survey {
                Some(name) => {
                    let surveys = config.surveys(&catalog, std::slice::from_ref(name))?;
                    let Some(survey) = surveys.first() else {
                        bail!("Survey {name} not loaded");
                    };
                    observe_with(&population, survey, &options)?
                        .snapshot()
                        .to_json()?
                }
                None => Population::to_json(&population)?,
            };
            match &export_args.output {
                Some(path) => std::fs::write(path, json)
                    .with_context(|| format!("Cannot write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
    }
    Ok(())
}
