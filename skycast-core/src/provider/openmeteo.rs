//! Open-Meteo forecast and archive endpoints.
//!
//! Both return an hourly series for the requested day. We read a single sample
//! (local noon) rather than averaging the day.

use async_trait::async_trait;
use chrono::{Datelike, Days, Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::{FeatureRecord, LocationType, UV_INDEX_MAX},
    normalize::{cloud_category, season},
    provider::{DateRequest, classify_date, truncate_body},
};

use super::WeatherSource;

const FORECAST_FIELDS: &str = "temperature_2m,relative_humidity_2m,rain,pressure_msl,cloud_cover,visibility,wind_speed_10m,uv_index";
const ARCHIVE_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,rain,pressure_msl,cloud_cover,visibility,wind_speed_10m";

/// Hour of day used as the representative sample.
pub const NOON_INDEX: usize = 12;
/// Furthest day ahead the forecast endpoint serves.
pub const FORECAST_HORIZON_DAYS: u64 = 16;
/// Rain above this amount (mm) counts as a rainy hour.
pub const RAIN_THRESHOLD_MM: f64 = 0.5;
pub const RAINY_PRECIPITATION: f64 = 90.0;
pub const DEFAULT_VISIBILITY_KM: f64 = 10.0;
/// The archive has no UV data.
pub const DEFAULT_UV_INDEX: u8 = 5;

#[derive(Debug, Clone)]
pub struct OpenMeteoWeather {
    http: Client,
    forecast_url: String,
    archive_url: String,
}

impl OpenMeteoWeather {
    pub fn new(http: Client, forecast_url: String, archive_url: String) -> Self {
        Self { http, forecast_url, archive_url }
    }

    /// Same as [`WeatherSource::fetch`] with an explicit notion of "today".
    pub async fn fetch_on(
        &self,
        today: NaiveDate,
        lat: f64,
        lon: f64,
        target: NaiveDate,
    ) -> Result<FeatureRecord, FetchError> {
        let horizon = today.checked_add_days(Days::new(FORECAST_HORIZON_DAYS));
        if horizon.is_some_and(|h| target > h) {
            tracing::debug!(%target, %today, "target date beyond forecast horizon");
            return Err(FetchError::OutOfRange);
        }

        let kind = classify_date(today, target);
        let (url, fields) = match kind {
            DateRequest::Forecast => (&self.forecast_url, FORECAST_FIELDS),
            DateRequest::Archive => (&self.archive_url, ARCHIVE_FIELDS),
        };

        let day = target.format("%Y-%m-%d").to_string();
        let lat_s = lat.to_string();
        let lon_s = lon.to_string();

        tracing::debug!(?kind, lat, lon, date = %day, "requesting hourly weather");

        let res = self
            .http
            .get(url)
            .query(&[
                ("latitude", lat_s.as_str()),
                ("longitude", lon_s.as_str()),
                ("hourly", fields),
                ("timezone", "auto"),
                ("start_date", day.as_str()),
                ("end_date", day.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        let parsed: HourlyResponse = match serde_json::from_str(&body) {
            Ok(p) => p,
            Err(e) if status.is_success() => {
                return Err(FetchError::Connection(format!("invalid weather JSON: {e}")));
            }
            Err(_) => {
                return Err(FetchError::Connection(format!(
                    "weather request failed with status {status}: {}",
                    truncate_body(&body)
                )));
            }
        };

        // Open-Meteo reports out-of-range dates as {"error": true, "reason": ...}.
        if parsed.error.is_some() {
            tracing::info!(reason = ?parsed.reason, "weather service rejected the date");
            return Err(FetchError::OutOfRange);
        }

        if !status.is_success() {
            return Err(FetchError::Connection(format!(
                "weather request failed with status {status}: {}",
                truncate_body(&body)
            )));
        }

        let hourly = parsed.hourly.ok_or(FetchError::InsufficientData)?;
        extract_noon(&hourly, target, kind)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoWeather {
    async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        target: NaiveDate,
    ) -> Result<FeatureRecord, FetchError> {
        let today = Local::now().date_naive();
        self.fetch_on(today, lat, lon, target).await
    }
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    hourly: Option<Hourly>,
}

/// Hourly arrays as returned by Open-Meteo. Individual samples may be null.
#[derive(Debug, Default, Deserialize)]
pub struct Hourly {
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub rain: Vec<Option<f64>>,
    #[serde(default)]
    pub pressure_msl: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub visibility: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub uv_index: Option<Vec<Option<f64>>>,
}

fn at_noon(series: &[Option<f64>]) -> Option<f64> {
    series.get(NOON_INDEX).copied().flatten()
}

fn required(series: &[Option<f64>]) -> Result<f64, FetchError> {
    at_noon(series).ok_or(FetchError::InsufficientData)
}

/// Coarse rain proxy: 90% when the noon hour had measurable rain, else 0%.
pub fn precipitation_estimate(rain_mm: f64) -> f64 {
    if rain_mm > RAIN_THRESHOLD_MM { RAINY_PRECIPITATION } else { 0.0 }
}

/// Metres to kilometres; a missing or zero reading means unobstructed (10 km).
pub fn visibility_km(metres: Option<f64>) -> f64 {
    match metres {
        Some(m) if m != 0.0 => m / 1000.0,
        _ => DEFAULT_VISIBILITY_KM,
    }
}

/// Build the feature record from the noon sample of an hourly series.
pub fn extract_noon(
    hourly: &Hourly,
    target: NaiveDate,
    kind: DateRequest,
) -> Result<FeatureRecord, FetchError> {
    if hourly.temperature_2m.len() <= NOON_INDEX {
        return Err(FetchError::InsufficientData);
    }

    let humidity = required(&hourly.relative_humidity_2m)?.round().clamp(0.0, 100.0) as u8;

    let uv_index = match (kind, hourly.uv_index.as_deref().and_then(at_noon)) {
        (DateRequest::Forecast, Some(uv)) => uv.clamp(0.0, f64::from(UV_INDEX_MAX)) as u8,
        _ => DEFAULT_UV_INDEX,
    };

    Ok(FeatureRecord {
        temperature: required(&hourly.temperature_2m)?,
        humidity,
        wind_speed: required(&hourly.wind_speed_10m)?,
        precipitation: precipitation_estimate(required(&hourly.rain)?),
        pressure: required(&hourly.pressure_msl)?,
        cloud_cover: cloud_category(required(&hourly.cloud_cover)?),
        season: season(target.month()),
        visibility_km: visibility_km(at_noon(&hourly.visibility)),
        location: LocationType::Inland,
        uv_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudCover, Season};

    fn series(value: f64) -> Vec<Option<f64>> {
        vec![Some(value); 24]
    }

    fn hourly() -> Hourly {
        Hourly {
            temperature_2m: series(28.4),
            relative_humidity_2m: series(74.0),
            rain: series(0.6),
            pressure_msl: series(1009.2),
            cloud_cover: series(55.0),
            visibility: series(24_140.0),
            wind_speed_10m: series(12.3),
            uv_index: Some(series(7.65)),
        }
    }

    fn july() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    #[test]
    fn rain_threshold() {
        assert_eq!(precipitation_estimate(0.6), 90.0);
        assert_eq!(precipitation_estimate(0.5), 0.0);
        assert_eq!(precipitation_estimate(0.0), 0.0);
    }

    #[test]
    fn visibility_defaults_when_missing_or_zero() {
        assert_eq!(visibility_km(Some(24_140.0)), 24.14);
        assert_eq!(visibility_km(Some(0.0)), 10.0);
        assert_eq!(visibility_km(None), 10.0);
    }

    #[test]
    fn forecast_sample_reads_uv() {
        let record = extract_noon(&hourly(), july(), DateRequest::Forecast).unwrap();
        assert_eq!(record.temperature, 28.4);
        assert_eq!(record.humidity, 74);
        assert_eq!(record.precipitation, 90.0);
        assert_eq!(record.cloud_cover, CloudCover::Cloudy);
        assert_eq!(record.season, Season::Summer);
        assert_eq!(record.visibility_km, 24.14);
        assert_eq!(record.location, LocationType::Inland);
        assert_eq!(record.uv_index, 7);
    }

    #[test]
    fn archive_sample_defaults_uv() {
        let mut h = hourly();
        h.uv_index = None;
        let record = extract_noon(&h, july(), DateRequest::Archive).unwrap();
        assert_eq!(record.uv_index, DEFAULT_UV_INDEX);
    }

    #[test]
    fn archive_ignores_uv_even_if_present() {
        let record = extract_noon(&hourly(), july(), DateRequest::Archive).unwrap();
        assert_eq!(record.uv_index, DEFAULT_UV_INDEX);
    }

    #[test]
    fn short_series_is_insufficient() {
        let mut h = hourly();
        h.temperature_2m = vec![Some(20.0); 12];
        assert_eq!(
            extract_noon(&h, july(), DateRequest::Forecast),
            Err(FetchError::InsufficientData)
        );
    }

    #[test]
    fn null_noon_sample_is_insufficient() {
        let mut h = hourly();
        h.pressure_msl[NOON_INDEX] = None;
        assert_eq!(
            extract_noon(&h, july(), DateRequest::Forecast),
            Err(FetchError::InsufficientData)
        );
    }

    #[test]
    fn null_visibility_uses_default() {
        let mut h = hourly();
        h.visibility[NOON_INDEX] = None;
        let record = extract_noon(&h, july(), DateRequest::Forecast).unwrap();
        assert_eq!(record.visibility_km, DEFAULT_VISIBILITY_KM);
    }
}
