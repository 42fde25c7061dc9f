use anyhow::{Context, anyhow, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use skycast_core::{
    App, CloudCover, Config, FeatureRecord, LocationType, NoticeLevel, Season, Session,
    config::parse_country_code, provider::providers_from_config,
};
use std::path::{Path, PathBuf};

use crate::{interactive, view};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "skycast",
    version,
    about = "Predict the weather category for a place and date, with an explanation"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model artifact to load instead of the configured one.
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Defaults to the interactive session.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive session: choose a place and date, adjust parameters, predict.
    Interactive,

    /// Update stored settings.
    Configure {
        /// Model artifact path to store.
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Default two-letter country code for city search.
        #[arg(long)]
        country: Option<String>,

        /// Print the resulting configuration.
        #[arg(long)]
        show: bool,
    },

    /// Search cities by name within a country.
    Search {
        city: String,

        /// Two-letter country code; defaults to the configured one.
        #[arg(long)]
        country: Option<String>,
    },

    /// Fetch the model's input parameters for a point and date.
    Fetch {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// YYYY-MM-DD; today if absent.
        #[arg(long)]
        date: Option<String>,
    },

    /// Predict from explicit parameters (unset ones keep their defaults).
    Predict(PredictArgs),
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub temperature: Option<f64>,
    #[arg(long)]
    pub humidity: Option<u8>,
    #[arg(long)]
    pub wind_speed: Option<f64>,
    #[arg(long)]
    pub precipitation: Option<f64>,
    #[arg(long)]
    pub pressure: Option<f64>,
    /// clear, partly cloudy, cloudy or overcast
    #[arg(long)]
    pub cloud_cover: Option<String>,
    /// Spring, Summer, Autumn or Winter
    #[arg(long)]
    pub season: Option<String>,
    #[arg(long)]
    pub visibility: Option<f64>,
    /// inland, mountain or coastal
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub uv_index: Option<u8>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PredictArgs {
    pub fn to_record(&self) -> anyhow::Result<FeatureRecord> {
        let mut record = FeatureRecord::default();

        if let Some(v) = self.temperature {
            record.temperature = v;
        }
        if let Some(v) = self.humidity {
            record.humidity = v;
        }
        if let Some(v) = self.wind_speed {
            record.wind_speed = v;
        }
        if let Some(v) = self.precipitation {
            record.precipitation = v;
        }
        if let Some(v) = self.pressure {
            record.pressure = v;
        }
        if let Some(v) = &self.cloud_cover {
            record.cloud_cover = CloudCover::try_from(v.as_str())?;
        }
        if let Some(v) = &self.season {
            record.season = Season::try_from(v.as_str())?;
        }
        if let Some(v) = self.visibility {
            record.visibility_km = v;
        }
        if let Some(v) = &self.location {
            record.location = LocationType::try_from(v.as_str())?;
        }
        if let Some(v) = self.uv_index {
            record.uv_index = v;
        }

        Ok(record)
    }
}

/// Parse a YYYY-MM-DD date no later than the picker allows.
pub fn parse_date(value: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}'. Expected YYYY-MM-DD."))?;

    let max = interactive::max_date(today);
    if date > max {
        return Err(anyhow!(
            "Date {date} is too far ahead. Forecasts are available up to {max}."
        ));
    }
    Ok(date)
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config_path = match &self.config {
            Some(p) => p.clone(),
            None => Config::config_file_path()?,
        };
        let config = Config::load_from(&config_path)?;
        let model_path = self.model.clone().unwrap_or_else(|| config.model_path.clone());

        match self.command.unwrap_or(Command::Interactive) {
            Command::Interactive => {
                let app = load_app(&config, &model_path)?;
                interactive::run(&app, &config).await?;
            }
            Command::Configure { model_path, country, show } => {
                let mut config = config;
                if let Some(p) = model_path {
                    config.model_path = p;
                }
                if let Some(c) = country {
                    config.set_default_country(&c)?;
                }
                config.save_to(&config_path)?;
                println!("Saved configuration to {}", config_path.display());
                if show {
                    println!("{}", config.to_toml()?);
                }
            }
            Command::Search { city, country } => {
                let country = match country {
                    Some(c) => parse_country_code(&c)?,
                    None => config.default_country.clone(),
                };
                let (geocoder, _) = providers_from_config(&config)?;
                let results = geocoder
                    .forward_search(&city, &country)
                    .await
                    .with_context(|| format!("City search for '{city}' failed"))?;
                println!("{}", view::search_results(&results));
            }
            Command::Fetch { lat, lon, date } => {
                let today = Local::now().date_naive();
                let date = date.as_deref().map(|d| parse_date(d, today)).transpose()?;

                let app = load_app(&config, &model_path)?;
                let mut session = Session::new(today);
                if let Some(d) = date {
                    session = App::select_date(session, d);
                }
                let session = app.pick_coordinates(session, lat, lon).await;
                println!("{}", view::session(&session));
                fetch_outcome(&session)?;
            }
            Command::Predict(args) => {
                let record = args.to_record()?;
                let app = load_app(&config, &model_path)?;
                let result = app.predict(&record)?;

                if args.json {
                    let json = serde_json::to_string_pretty(&result)
                        .context("Failed to serialize prediction")?;
                    println!("{json}");
                } else {
                    println!("{}", view::form(&record));
                    println!("{}", view::prediction(&result));
                }
            }
        }

        Ok(())
    }
}

/// A fetch that ended in an error notice fails the command. The notice itself
/// has already been printed with the session.
fn fetch_outcome(session: &Session) -> anyhow::Result<()> {
    match &session.notice {
        Some(n) if n.level == NoticeLevel::Error => bail!("Could not fetch weather data"),
        _ => Ok(()),
    }
}

/// The model must load before anything else runs.
fn load_app(config: &Config, model_path: &Path) -> anyhow::Result<App> {
    App::from_config(config, model_path)
        .with_context(|| {
            format!("Cannot start without the model artifact ({})", model_path.display())
        })
}
