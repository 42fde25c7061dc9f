//! Turns user intents into session events, performing the I/O each one needs.
//!
//! Every method runs to completion before returning the next session; there
//! are no retries and no background work.

use anyhow::Context;
use chrono::NaiveDate;
use std::path::Path;

use crate::{
    Config,
    error::{ModelError, PredictError},
    inference::{Explainer, ModelArtifact, Pipeline},
    model::{CityCandidate, FeatureRecord, PredictionResult},
    normalize::{clamp_latitude, normalize_longitude},
    provider::{Geocoder, WeatherSource, providers_from_config},
    session::{Event, FetchSource, Session},
};

#[derive(Debug)]
pub struct App {
    geocoder: Box<dyn Geocoder>,
    weather: Box<dyn WeatherSource>,
    pipeline: Box<dyn Pipeline>,
    explainer: Box<dyn Explainer>,
}

impl App {
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        weather: Box<dyn WeatherSource>,
        pipeline: Box<dyn Pipeline>,
        explainer: Box<dyn Explainer>,
    ) -> Self {
        Self { geocoder, weather, pipeline, explainer }
    }

    /// Build the application from config. A missing or broken model artifact is
    /// returned as an error the caller must treat as fatal.
    pub fn from_config(config: &Config, model_path: &Path) -> anyhow::Result<Self> {
        let artifact = ModelArtifact::load(model_path)?;
        let (pipeline, explainer) = artifact.into_parts();
        let (geocoder, weather) =
            providers_from_config(config).context("Failed to set up weather services")?;

        Ok(Self::new(geocoder, weather, pipeline, explainer))
    }

    /// A point picked on the map: label it, then fetch its weather.
    pub async fn pick_coordinates(
        &self,
        session: Session,
        latitude: f64,
        longitude: f64,
    ) -> Session {
        if !session.is_new_pick(latitude, longitude) {
            tracing::debug!(latitude, longitude, "same point picked again, ignoring");
            return session;
        }

        let label = self
            .geocoder
            .reverse_lookup(clamp_latitude(latitude), normalize_longitude(longitude))
            .await;

        let session = session.reduce(Event::CoordinatesPicked { latitude, longitude, label });
        self.fetch_into(session, FetchSource::Map).await
    }

    /// Search cities by name within one country. A failed search sets an error
    /// notice and keeps the previous results.
    pub async fn search_city(&self, session: Session, query: &str, country_code: &str) -> Session {
        let query = query.trim();
        if query.is_empty() {
            return session;
        }

        match self.geocoder.forward_search(query, country_code).await {
            Ok(results) => {
                session.reduce(Event::SearchCompleted { query: query.to_string(), results })
            }
            Err(e) => {
                tracing::warn!(query, country_code, error = %e, "city search failed");
                session.reduce(Event::SearchFailed(e.to_string()))
            }
        }
    }

    /// Use one of the search results as the location and fetch its weather.
    pub async fn choose_city(
        &self,
        session: Session,
        candidate: CityCandidate,
        country_name: String,
    ) -> Session {
        let session = session.reduce(Event::CityChosen { candidate, country_name });
        self.fetch_into(session, FetchSource::Manual).await
    }

    /// Re-fetch for the current location and date.
    pub async fn refresh(&self, session: Session) -> Session {
        if session.location.is_none() {
            return session.reduce(Event::RefreshWithoutLocation);
        }
        self.fetch_into(session, FetchSource::Refresh).await
    }

    pub fn select_date(session: Session, date: NaiveDate) -> Session {
        session.reduce(Event::DateSelected(date))
    }

    pub fn submit_form(session: Session, record: FeatureRecord) -> Session {
        session.reduce(Event::FormSubmitted(record))
    }

    /// Classify a record and explain the predicted class.
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, PredictError> {
        record.validate()?;

        let prediction = self.pipeline.predict(record);
        let label = prediction.label().ok_or_else(|| {
            ModelError::Invalid(format!("class index {} has no label", prediction.class_index))
        })?;

        let preprocessed = self.pipeline.preprocess(record);
        let explanation = self.explainer.explain(&preprocessed, label.class_index())?;

        let confidence =
            prediction.probabilities.get(label.class_index()).copied().unwrap_or_default();
        tracing::info!(label = %label, confidence, "prediction complete");

        Ok(PredictionResult { label, probabilities: prediction.probabilities, explanation })
    }

    async fn fetch_into(&self, session: Session, source: FetchSource) -> Session {
        let Some(location) = session.location.as_ref() else {
            return session;
        };

        let (lat, lon, date) = (location.latitude, location.longitude, session.target_date);
        match self.weather.fetch(lat, lon, date).await {
            Ok(record) => {
                tracing::info!(lat, lon, %date, ?source, "weather data updated");
                session.reduce(Event::FetchSucceeded { record, source })
            }
            Err(e) => {
                tracing::warn!(lat, lon, %date, error = %e, "weather fetch failed");
                session.reduce(Event::FetchFailed(e.to_string()))
            }
        }
    }
}
