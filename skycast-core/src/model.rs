use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

use crate::{error::ValidationError, normalize};

/// Column names the model artifact refers to.
pub mod columns {
    pub const TEMPERATURE: &str = "Temperature";
    pub const HUMIDITY: &str = "Humidity";
    pub const WIND_SPEED: &str = "Wind Speed";
    pub const PRECIPITATION: &str = "Precipitation (%)";
    pub const PRESSURE: &str = "Atmospheric Pressure";
    pub const UV_INDEX: &str = "UV Index";
    pub const VISIBILITY: &str = "Visibility (km)";
    pub const CLOUD_COVER: &str = "Cloud Cover";
    pub const SEASON: &str = "Season";
    pub const LOCATION: &str = "Location";

    /// Every column a record carries, in record order.
    pub const ALL: [&str; 10] = [
        TEMPERATURE,
        HUMIDITY,
        WIND_SPEED,
        PRECIPITATION,
        PRESSURE,
        CLOUD_COVER,
        SEASON,
        VISIBILITY,
        LOCATION,
        UV_INDEX,
    ];
}

macro_rules! categorical_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub const fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = anyhow::Error;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                let lower = value.trim().to_lowercase();
                $name::all()
                    .iter()
                    .copied()
                    .find(|v| v.as_str().to_lowercase() == lower)
                    .ok_or_else(|| {
                        let supported: Vec<&str> =
                            $name::all().iter().map(|v| v.as_str()).collect();
                        anyhow::anyhow!(
                            "Unknown {} '{value}'. Supported values: {}.",
                            $what,
                            supported.join(", ")
                        )
                    })
            }
        }
    };
}

categorical_enum! {
    /// Cloud cover bucket the model was trained on.
    CloudCover, "cloud cover" {
        Clear => "clear",
        PartlyCloudy => "partly cloudy",
        Cloudy => "cloudy",
        Overcast => "overcast",
    }
}

categorical_enum! {
    /// Northern-hemisphere season derived from the calendar month.
    Season, "season" {
        Spring => "Spring",
        Summer => "Summer",
        Autumn => "Autumn",
        Winter => "Winter",
    }
}

categorical_enum! {
    /// Terrain type. The fetcher never infers it; it is always `Inland` unless edited.
    LocationType, "location type" {
        Inland => "inland",
        Mountain => "mountain",
        Coastal => "coastal",
    }
}

categorical_enum! {
    /// Predicted weather category. The declaration order is the classifier's class order.
    WeatherLabel, "weather label" {
        Snowy => "Snowy",
        Cloudy => "Cloudy",
        Rainy => "Rainy",
        Sunny => "Sunny",
    }
}

impl WeatherLabel {
    /// Map a classifier output index to its label. Order is fixed: Snowy, Cloudy, Rainy, Sunny.
    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    pub fn class_index(&self) -> usize {
        match self {
            WeatherLabel::Snowy => 0,
            WeatherLabel::Cloudy => 1,
            WeatherLabel::Rainy => 2,
            WeatherLabel::Sunny => 3,
        }
    }
}

/// A selected place. Coordinates are always kept in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl Location {
    /// Build a location from raw map-style coordinates, wrapping the longitude
    /// and clamping the latitude.
    pub fn from_raw(latitude: f64, longitude: f64, label: impl Into<String>) -> Self {
        Self {
            latitude: normalize::clamp_latitude(latitude),
            longitude: normalize::normalize_longitude(longitude),
            label: label.into(),
        }
    }
}

/// One row of a city search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityCandidate {
    pub name: String,
    pub admin1: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: String,
    pub country: Option<String>,
}

impl CityCandidate {
    /// "Name (Region)", as offered in the result picker.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.admin1.as_deref().unwrap_or(""))
    }
}

impl fmt::Display for CityCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

pub const TEMPERATURE_RANGE: (f64, f64) = (-80.0, 80.0);
pub const PRESSURE_RANGE: (f64, f64) = (850.0, 1110.0);
pub const PERCENT_RANGE: (f64, f64) = (0.0, 100.0);
pub const VISIBILITY_RANGE: (f64, f64) = (0.0, 100.0);
pub const UV_INDEX_MAX: u8 = 20;
/// Sanity bound only; the model has no upper limit of its own.
pub const WIND_SPEED_RANGE: (f64, f64) = (0.0, 500.0);

/// The model's input schema: one value for each of the ten columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: u8,
    #[serde(rename = "Wind Speed")]
    pub wind_speed: f64,
    #[serde(rename = "Precipitation (%)")]
    pub precipitation: f64,
    #[serde(rename = "Atmospheric Pressure")]
    pub pressure: f64,
    #[serde(rename = "Cloud Cover")]
    pub cloud_cover: CloudCover,
    #[serde(rename = "Season")]
    pub season: Season,
    #[serde(rename = "Visibility (km)")]
    pub visibility_km: f64,
    #[serde(rename = "Location")]
    pub location: LocationType,
    #[serde(rename = "UV Index")]
    pub uv_index: u8,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 60,
            wind_speed: 10.0,
            precipitation: 0.0,
            pressure: 1013.0,
            cloud_cover: CloudCover::PartlyCloudy,
            season: Season::Spring,
            visibility_km: 10.0,
            location: LocationType::Inland,
            uv_index: 5,
        }
    }
}

impl FeatureRecord {
    /// Value of a numeric column, by the name the model uses.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        let value = match column {
            columns::TEMPERATURE => self.temperature,
            columns::HUMIDITY => f64::from(self.humidity),
            columns::WIND_SPEED => self.wind_speed,
            columns::PRECIPITATION => self.precipitation,
            columns::PRESSURE => self.pressure,
            columns::UV_INDEX => f64::from(self.uv_index),
            columns::VISIBILITY => self.visibility_km,
            _ => return None,
        };
        Some(value)
    }

    /// Value of a categorical column, by the name the model uses.
    pub fn categorical(&self, column: &str) -> Option<&'static str> {
        match column {
            columns::CLOUD_COVER => Some(self.cloud_cover.as_str()),
            columns::SEASON => Some(self.season.as_str()),
            columns::LOCATION => Some(self.location.as_str()),
            _ => None,
        }
    }

    /// Check every field against its declared range. Inference must not run on
    /// a record that fails this.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(columns::TEMPERATURE, self.temperature, TEMPERATURE_RANGE)?;
        check(columns::HUMIDITY, f64::from(self.humidity), PERCENT_RANGE)?;
        check(columns::WIND_SPEED, self.wind_speed, WIND_SPEED_RANGE)?;
        check(columns::PRECIPITATION, self.precipitation, PERCENT_RANGE)?;
        check(columns::PRESSURE, self.pressure, PRESSURE_RANGE)?;
        check(columns::VISIBILITY, self.visibility_km, VISIBILITY_RANGE)?;
        check(
            columns::UV_INDEX,
            f64::from(self.uv_index),
            (0.0, f64::from(UV_INDEX_MAX)),
        )?;
        Ok(())
    }
}

fn check(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ValidationError> {
    // NaN fails `contains`, which is what we want.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError { field, value, min, max })
    }
}

/// Per-feature contributions for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub feature_names: Vec<String>,
    /// Contribution of each preprocessed feature, same order as `feature_names`.
    pub values: Vec<f64>,
    /// The preprocessed input the contributions were computed for.
    pub data: Vec<f64>,
    /// Expected model output for the predicted class.
    pub baseline: f64,
}

impl Explanation {
    /// Model output reconstructed from the baseline and the contributions.
    pub fn output(&self) -> f64 {
        self.baseline + self.values.iter().sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: WeatherLabel,
    /// Class probabilities in label order.
    pub probabilities: Vec<f64>,
    pub explanation: Explanation,
}

impl PredictionResult {
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .get(self.label.class_index())
            .copied()
            .unwrap_or_default()
    }
}
