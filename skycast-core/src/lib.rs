//! Core library for the `skycast` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - Place lookup and weather retrieval over external HTTP services
//! - Normalization of raw weather values into the model's vocabulary
//! - Loading and evaluating the pre-trained classifier and its explainer
//! - Session state and the reducer that advances it
//!
//! It is used by `skycast-cli`, but can also be reused by other front ends.

pub mod app;
pub mod config;
pub mod error;
pub mod inference;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod session;

pub use app::App;
pub use config::{Config, Endpoints};
pub use error::{FetchError, ModelError, PredictError, ValidationError};
pub use inference::{Explainer, ModelArtifact, Pipeline, Prediction};
pub use model::{
    CityCandidate, CloudCover, Explanation, FeatureRecord, Location, LocationType,
    PredictionResult, Season, WeatherLabel,
};
pub use provider::{Geocoder, WeatherSource};
pub use session::{Event, FetchSource, Notice, NoticeLevel, Session};
