//! Place lookup: Open-Meteo geocoding for city names, Nominatim (OpenStreetMap)
//! for coordinates. Neither needs an API key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{error::FetchError, model::CityCandidate, provider::truncate_body};

use super::Geocoder;

pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const UNRESOLVED_LOCATION: &str = "Unresolved location";
const SEARCH_COUNT: usize = 10;

/// Nominatim rejects anonymous clients, so `http` must carry a User-Agent
/// (see [`super::http_client`]).
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    http: Client,
    search_url: String,
    reverse_url: String,
}

impl GeocodingClient {
    pub fn new(http: Client, search_url: String, reverse_url: String) -> Self {
        Self { http, search_url, reverse_url }
    }

    async fn search(&self, city_name: &str) -> Result<SearchResponse, FetchError> {
        let count = SEARCH_COUNT.to_string();
        let res = self
            .http
            .get(&self.search_url)
            .query(&[
                ("name", city_name),
                ("count", count.as_str()),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Connection(format!(
                "geocoding search failed with status {status}: {}",
                truncate_body(&body)
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| FetchError::Connection(format!("invalid geocoding JSON: {e}")))
    }

    async fn reverse(&self, lat: f64, lon: f64) -> Result<ReverseResponse, FetchError> {
        let lat = lat.to_string();
        let lon = lon.to_string();
        let res = self
            .http
            .get(&self.reverse_url)
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "10"),
                ("accept-language", "en"),
            ])
            .send()
            .await?;

        Ok(res.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    admin1: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<ReverseAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

impl ReverseAddress {
    fn label(self) -> String {
        let place = [self.city, self.town, self.village, self.county]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

        match self.country.filter(|c| !c.is_empty()) {
            Some(country) => format!("{place}, {country}"),
            None => place,
        }
    }
}

#[async_trait]
impl Geocoder for GeocodingClient {
    async fn forward_search(
        &self,
        city_name: &str,
        country_code: &str,
    ) -> Result<Vec<CityCandidate>, FetchError> {
        let city_name = city_name.trim();
        if city_name.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(city = city_name, country = country_code, "searching city");
        let parsed = self.search(city_name).await?;

        let wanted = country_code.trim().to_uppercase();
        let candidates: Vec<CityCandidate> = parsed
            .results
            .into_iter()
            .filter(|r| r.country_code.as_deref().unwrap_or("").to_uppercase() == wanted)
            .take(SEARCH_COUNT)
            .map(|r| CityCandidate {
                name: r.name,
                admin1: r.admin1,
                latitude: r.latitude,
                longitude: r.longitude,
                country_code: wanted.clone(),
                country: r.country,
            })
            .collect();

        tracing::debug!(found = candidates.len(), "city search finished");
        Ok(candidates)
    }

    async fn reverse_lookup(&self, lat: f64, lon: f64) -> String {
        match self.reverse(lat, lon).await {
            Ok(body) => {
                let label = body.address.unwrap_or_default().label();
                tracing::info!(lat, lon, label = %label, "reverse geocoded");
                label
            }
            Err(e) => {
                tracing::warn!(lat, lon, error = %e, "reverse geocoding failed");
                UNRESOLVED_LOCATION.to_string()
            }
        }
    }
}
