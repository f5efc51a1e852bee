use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use geoweather_core::{
    Config, Coordinate, LocationAcquirer, NominatimBackend, OpenWeatherClient, PipelineFailure,
    PipelineOptions, PositionSource, ReverseGeocoder, UnitSource, Units, WeatherPipeline,
};
use inquire::{Password, PasswordDisplayMode, Select};
use tokio_util::sync::CancellationToken;

use crate::{
    position::{FixedPosition, IpPosition},
    reachability::DnsReachability,
    terminal::{TerminalPrompter, TerminalSink},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "geoweather", version, about = "Current weather for where you are")]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and display preferences.
    Configure,

    /// Locate this machine and show the current weather there.
    Show {
        /// Latitude in decimal degrees; skips IP-based positioning.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Grant location access without asking.
        #[arg(short, long)]
        yes: bool,

        /// Override the configured unit system (metric, imperial, standard).
        #[arg(long, value_parser = parse_units)]
        units: Option<Units>,
    },
}

fn parse_units(value: &str) -> Result<Units, String> {
    Units::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Configure => configure().map(|()| ExitCode::SUCCESS),
            Command::Show { lat, lon, yes, units } => {
                let fixed = lat.zip(lon).map(|(lat, lon)| Coordinate::new(lat, lon));
                show(fixed, yes, units).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key.trim().to_string());

    let units = Units::all().to_vec();
    let current = units.iter().position(|u| *u == config.api.units).unwrap_or(0);
    config.api.units = Select::new("Unit system requested from the API:", units)
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read unit system")?;

    let sources = vec![UnitSource::PayloadCountry, UnitSource::DeviceLocale];
    let current = sources.iter().position(|s| *s == config.unit_source).unwrap_or(0);
    config.unit_source = Select::new("Pick °C/°F from:", sources)
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read unit source")?;

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}

/// A failed run has already been reported by the sink, so it only sets the exit code.
async fn show(
    fixed: Option<Coordinate>,
    assume_yes: bool,
    units: Option<Units>,
) -> anyhow::Result<ExitCode> {
    let mut config = Config::load()?;
    if let Some(units) = units {
        config.api.units = units;
    }

    let api = config.api_config()?;
    let network = Arc::new(DnsReachability::for_base_url(&api.base_url)?);
    let weather = Arc::new(OpenWeatherClient::new(api));
    let geocoder = ReverseGeocoder::new(
        Arc::new(NominatimBackend::new(&config.geocoder)?),
        config.deadlines.geocode(),
    );

    let source: Arc<dyn PositionSource> = match fixed {
        Some(coord) => Arc::new(FixedPosition::new(coord)),
        None => Arc::new(IpPosition::new()),
    };
    let locator = LocationAcquirer::new(source, Arc::new(TerminalPrompter::new(assume_yes)));

    let pipeline = WeatherPipeline::new(
        locator,
        weather,
        geocoder,
        network,
        Arc::new(TerminalSink),
        PipelineOptions::from_config(&config),
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match pipeline.run_until_cancelled(cancel).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(failure) => Ok(exit_code(&failure)),
    }
}

fn exit_code(failure: &PipelineFailure) -> ExitCode {
    match failure {
        // 130: conventional status for a run stopped by SIGINT.
        PipelineFailure::Cancelled => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    }
}
