use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::{fmt::Debug, time::Duration};

use crate::{
    Config, FeatureRecord,
    error::FetchError,
    model::CityCandidate,
    provider::{geocoding::GeocodingClient, openmeteo::OpenMeteoWeather},
};

pub mod geocoding;
pub mod openmeteo;

/// Which weather endpoint serves a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRequest {
    /// Today or later: forecast endpoint.
    Forecast,
    /// Strictly before today: historical archive.
    Archive,
}

/// Today itself takes the forecast path.
pub fn classify_date(today: NaiveDate, target: NaiveDate) -> DateRequest {
    if target >= today {
        DateRequest::Forecast
    } else {
        DateRequest::Archive
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Up to ten candidates for `city_name` inside `country_code`, in provider
    /// order. An empty list means no match; `Err` means the service could not be reached.
    async fn forward_search(
        &self,
        city_name: &str,
        country_code: &str,
    ) -> Result<Vec<CityCandidate>, FetchError>;

    /// Display label for a coordinate pair. Never fails; falls back to a placeholder.
    async fn reverse_lookup(&self, lat: f64, lon: f64) -> String;
}

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Feature record for the local-noon sample of `target` at the given point.
    async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        target: NaiveDate,
    ) -> Result<FeatureRecord, FetchError>;
}

/// Shared HTTP client honoring the configured timeout and client identifier.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

/// Construct the geocoder and weather source from config.
pub fn providers_from_config(
    config: &Config,
) -> anyhow::Result<(Box<dyn Geocoder>, Box<dyn WeatherSource>)> {
    let http = http_client(config)?;

    let geocoder = GeocodingClient::new(
        http.clone(),
        config.endpoints.geocoding.clone(),
        config.endpoints.reverse.clone(),
    );
    let weather = OpenMeteoWeather::new(
        http,
        config.endpoints.forecast.clone(),
        config.endpoints.archive.clone(),
    );

    Ok((Box::new(geocoder), Box::new(weather)))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
