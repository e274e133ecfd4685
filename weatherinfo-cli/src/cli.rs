use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Password};
use weatherinfo_core::{
    Config, Coordinates, Delivery, DeviceFix, FetchResult, FileWeatherCache, LocationRequest,
    WeatherSession, device_location,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherinfo", version, about = "Current weather with offline fallback")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and an optional home location.
    Configure,

    /// Show current weather. Falls back to the last stored reading when offline.
    Show {
        /// Place name to search for. Omit to use the home location.
        place: Option<String>,

        #[arg(long, requires = "lon", conflicts_with = "place", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", conflicts_with = "place", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Name to display instead of the weather station's name.
        #[arg(long, requires = "lat")]
        label: Option<String>,
    },

    /// Inspect or remove the stored reading.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    Show,
    Clear,
}

impl Cli {
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(config),
            Command::Show {
                place,
                lat,
                lon,
                label,
            } => {
                let request = match (lat, lon) {
                    (Some(lat), Some(lon)) => {
                        let request = LocationRequest::coordinates(lat, lon);
                        match label {
                            Some(label) => request.with_label(label),
                            None => request,
                        }
                    }
                    _ => place
                        .map(LocationRequest::Place)
                        .unwrap_or(LocationRequest::CurrentDevice),
                };
                show(&config, request).await
            }
            Command::Cache { action } => {
                let cache = FileWeatherCache::new(config.resolved_cache_path()?);
                match action {
                    CacheAction::Show => match cache.try_read().await {
                        Ok(Some(record)) => print!("{}", render::render_record(&record)),
                        Ok(None) => println!("No cached weather."),
                        Err(e) => println!("Cached weather is unusable: {e}"),
                    },
                    CacheAction::Clear => {
                        cache.clear().await?;
                        println!("Removed {}", cache.path().display());
                    }
                }
                Ok(())
            }
        }
    }
}

async fn show(config: &Config, request: LocationRequest) -> anyhow::Result<()> {
    // No platform location service here: device requests are answered with
    // the configured home location, or "unknown" when there is none.
    let (device, feed) = device_location();
    let fix = config.home.map(DeviceFix::Position).unwrap_or(DeviceFix::Unknown);
    tokio::spawn(feed.answer_all_with(fix));

    let session = WeatherSession::from_config(config, Some(device))?;

    match session.fetch(&request).await {
        Delivery::Delivered(result) => {
            print!("{}", render::render_result(&result));
            if let FetchResult::Failed(notice) = result {
                return Err(anyhow!("{notice}"));
            }
        }
        Delivery::Superseded => tracing::debug!("Fetch superseded"),
    }

    Ok(())
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key.trim().to_string());

    let set_home = Confirm::new("Set a home location for `weatherinfo show` without arguments?")
        .with_default(config.home.is_some())
        .prompt()?;

    config.home = if set_home {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a decimal number")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a decimal number")
            .prompt()?;
        Some(Coordinates::new(latitude, longitude).validate()?)
    } else {
        None
    };

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
