//! Sentinel CLI - generate forecast reports from the command line.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use sentinel_report::dispatch::dispatcher_for;
use sentinel_report::metrics::{MoonPhase, compass_label};
use sentinel_report::{
    Location, OpenMeteoClient, PlottersRenderer, ReportKind, ReportOrchestrator, SentinelConfig,
    logging,
};

#[derive(Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Surf, night-sky and weather forecast reports as PDF"
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one report and print the written path
    Report {
        /// surf, sky (or night) or weather
        #[arg(long)]
        kind: ReportKind,

        /// Display name of the location
        #[arg(long)]
        name: String,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Overrides `output.root` from the configuration
        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Send the finished report via telegram or email
        #[arg(long)]
        dispatch: Option<String>,
    },

    /// Print the moon phase for a date
    Phase {
        /// YYYY-MM-DD, defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the 16-point compass label for a bearing
    Compass {
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Report {
            kind,
            name,
            lat,
            lon,
            output_root,
            dispatch,
        } => {
            let mut config = SentinelConfig::load_from_path(cli.config)?;
            if let Some(root) = output_root {
                config.output.root = root;
            }
            logging::init(&config.logging, cli.verbose)?;

            let location = Location::new(lat, lon, name);
            run_report(config, &location, kind, dispatch.as_deref())
        }
        Command::Phase { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let phase = MoonPhase::for_date(date);
            println!("{date}: {phase}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Compass { degrees } => {
            let Some(label) = compass_label(degrees) else {
                bail!("Bearing must be a finite number");
            };
            println!("{label}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_report(
    config: SentinelConfig,
    location: &Location,
    kind: ReportKind,
    channel: Option<&str>,
) -> Result<ExitCode> {
    let dispatcher = channel
        .map(|channel| dispatcher_for(channel, &config.dispatch))
        .transpose()
        .context("Dispatch channel unavailable")?;

    let client = OpenMeteoClient::new(config.forecast.clone())?;
    let orchestrator = ReportOrchestrator::new(config, client, PlottersRenderer::new());

    let report = match orchestrator.generate(location, kind, Utc::now()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::from(2));
        }
    };

    for chart in &report.charts_omitted {
        warn!("Chart '{}' was left out of the report", chart);
    }
    println!("{}", report.path.display());

    if let Some(dispatcher) = dispatcher {
        dispatcher
            .dispatch(&report)
            .with_context(|| format!("Report written but {} delivery failed", dispatcher.name()))?;
        info!("Report delivered via {}", dispatcher.name());
    }

    Ok(ExitCode::SUCCESS)
}
