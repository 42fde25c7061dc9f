//! Loading and evaluating the pre-trained weather classifier.
//!
//! The artifact is a JSON document bundling a preprocessing step (standard
//! scaling for numeric columns, one-hot encoding for categorical ones), a
//! multinomial linear classifier, and the data the attribution step needs.
//! Nothing here trains or tunes the model.

use serde::Deserialize;
use std::{
    collections::HashSet,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::ModelError,
    model::{Explanation, FeatureRecord, WeatherLabel, columns},
};

/// Raw classifier output for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    /// Softmax over the class scores, in label order.
    pub probabilities: Vec<f64>,
}

impl Prediction {
    pub fn label(&self) -> Option<WeatherLabel> {
        WeatherLabel::from_class_index(self.class_index)
    }
}

/// Preprocessing plus classifier.
pub trait Pipeline: Send + Sync + Debug {
    /// Run the preprocessing stage alone; the explainer consumes its output.
    fn preprocess(&self, record: &FeatureRecord) -> Vec<f64>;

    /// Run the whole pipeline.
    fn predict(&self, record: &FeatureRecord) -> Prediction;
}

/// Per-feature attribution for a predicted class.
pub trait Explainer: Send + Sync + Debug {
    fn explain(&self, preprocessed: &[f64], class_index: usize) -> Result<Explanation, ModelError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumericColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoricalColumn {
    pub column: String,
    pub categories: Vec<String>,
}

/// Column transform: scaled numeric columns first, then one-hot blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct Preprocessor {
    #[serde(default)]
    pub numeric: Vec<NumericColumn>,
    #[serde(default)]
    pub categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    pub fn output_len(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Unknown categories encode as all zeros.
    pub fn transform(&self, record: &FeatureRecord) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.output_len());

        for col in &self.numeric {
            let raw = record.numeric(&col.column).unwrap_or(col.mean);
            out.push((raw - col.mean) / col.scale);
        }

        for col in &self.categorical {
            let value = record.categorical(&col.column);
            out.extend(
                col.categories
                    .iter()
                    .map(|c| if Some(c.as_str()) == value { 1.0 } else { 0.0 }),
            );
        }

        out
    }

    fn validate(&self) -> Result<(), ModelError> {
        let probe = FeatureRecord::default();

        for col in &self.numeric {
            if probe.numeric(&col.column).is_none() {
                return Err(ModelError::Invalid(format!(
                    "'{}' is not a numeric feature column",
                    col.column
                )));
            }
            if col.scale == 0.0 || !col.scale.is_finite() || !col.mean.is_finite() {
                return Err(ModelError::Invalid(format!(
                    "column '{}' has an unusable scaling (mean {}, scale {})",
                    col.column, col.mean, col.scale
                )));
            }
        }

        for col in &self.categorical {
            if probe.categorical(&col.column).is_none() {
                return Err(ModelError::Invalid(format!(
                    "'{}' is not a categorical feature column",
                    col.column
                )));
            }
        }

        let mut seen = HashSet::new();
        let listed = self
            .numeric
            .iter()
            .map(|c| &c.column)
            .chain(self.categorical.iter().map(|c| &c.column));
        for column in listed {
            if !seen.insert(column.as_str()) {
                return Err(ModelError::Invalid(format!(
                    "column '{column}' is listed more than once"
                )));
            }
        }

        if let Some(missing) = columns::ALL.iter().find(|c| !seen.contains(*c)) {
            return Err(ModelError::Invalid(format!("missing feature column '{missing}'")));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearClassifier {
    /// One row per class, one column per preprocessed feature.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearClassifier {
    pub fn scores(&self, x: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| b + row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>())
            .collect()
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

/// First index wins on ties.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearPipeline {
    pub preprocessor: Preprocessor,
    pub classifier: LinearClassifier,
}

impl Pipeline for LinearPipeline {
    fn preprocess(&self, record: &FeatureRecord) -> Vec<f64> {
        self.preprocessor.transform(record)
    }

    fn predict(&self, record: &FeatureRecord) -> Prediction {
        let scores = self.classifier.scores(&self.preprocess(record));
        Prediction { class_index: argmax(&scores), probabilities: softmax(&scores) }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ExplainerData {
    expected_values: Vec<f64>,
    background_mean: Vec<f64>,
}

/// Exact attributions for a linear model: each feature contributes its weight
/// times its distance from the background mean.
#[derive(Debug, Clone)]
pub struct LinearExplainer {
    feature_names: Vec<String>,
    coefficients: Vec<Vec<f64>>,
    expected_values: Vec<f64>,
    background_mean: Vec<f64>,
}

impl Explainer for LinearExplainer {
    fn explain(&self, preprocessed: &[f64], class_index: usize) -> Result<Explanation, ModelError> {
        let (weights, baseline) = self
            .coefficients
            .get(class_index)
            .zip(self.expected_values.get(class_index))
            .ok_or_else(|| ModelError::Invalid(format!("no class with index {class_index}")))?;

        if preprocessed.len() != weights.len() {
            return Err(ModelError::Invalid(format!(
                "expected {} preprocessed values, got {}",
                weights.len(),
                preprocessed.len()
            )));
        }

        let values = weights
            .iter()
            .zip(preprocessed)
            .zip(&self.background_mean)
            .map(|((w, x), m)| w * (x - m))
            .collect();

        Ok(Explanation {
            feature_names: self.feature_names.clone(),
            values,
            data: preprocessed.to_vec(),
            baseline: *baseline,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    feature_names: Vec<String>,
    pipeline: LinearPipeline,
    explainer: ExplainerData,
}

/// A loaded, consistency-checked model artifact.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub pipeline: LinearPipeline,
    pub explainer: LinearExplainer,
}

impl ModelArtifact {
    /// Load the artifact from disk. Callers treat any error as fatal.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|source| ModelError::Io { path: PathBuf::from(path), source })?;

        let artifact = Self::from_json(&contents)?;
        tracing::info!(
            path = %path.display(),
            features = artifact.feature_names().len(),
            "model artifact loaded"
        );
        Ok(artifact)
    }

    pub fn from_json(contents: &str) -> Result<Self, ModelError> {
        let file: ArtifactFile = serde_json::from_str(contents)?;
        Self::assemble(file)
    }

    /// Ordered names of the preprocessed features.
    pub fn feature_names(&self) -> &[String] {
        &self.explainer.feature_names
    }

    pub fn into_parts(self) -> (Box<dyn Pipeline>, Box<dyn Explainer>) {
        (Box::new(self.pipeline), Box::new(self.explainer))
    }

    fn assemble(file: ArtifactFile) -> Result<Self, ModelError> {
        let ArtifactFile { feature_names, pipeline, explainer } = file;
        let classes = WeatherLabel::all().len();
        let width = pipeline.preprocessor.output_len();

        pipeline.preprocessor.validate()?;

        let mismatch = |what: &str, want: usize, got: usize| {
            ModelError::Invalid(format!("{what}: expected {want}, found {got}"))
        };

        if feature_names.len() != width {
            return Err(mismatch("feature names", width, feature_names.len()));
        }
        let classifier = &pipeline.classifier;
        if classifier.coefficients.len() != classes {
            return Err(mismatch("coefficient rows", classes, classifier.coefficients.len()));
        }
        if let Some(row) = classifier.coefficients.iter().find(|r| r.len() != width) {
            return Err(mismatch("coefficients per class", width, row.len()));
        }
        if classifier.intercepts.len() != classes {
            return Err(mismatch("intercepts", classes, classifier.intercepts.len()));
        }
        if explainer.expected_values.len() != classes {
            return Err(mismatch("expected values", classes, explainer.expected_values.len()));
        }
        if explainer.background_mean.len() != width {
            return Err(mismatch("background mean", width, explainer.background_mean.len()));
        }

        let explainer = LinearExplainer {
            feature_names,
            coefficients: classifier.coefficients.clone(),
            expected_values: explainer.expected_values,
            background_mean: explainer.background_mean,
        };

        Ok(Self { pipeline, explainer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudCover, Season};

    /// Width of the preprocessed vector in [`small_artifact`].
    const WIDTH: usize = 13;

    /// Coefficient row with the given entries set and the rest zero.
    fn row(entries: &[(usize, f64)]) -> Vec<f64> {
        let mut r = vec![0.0; WIDTH];
        for &(i, w) in entries {
            r[i] = w;
        }
        r
    }

    /// Every record column, but only temperature, humidity and season carry
    /// weight. Numeric means sit at the record defaults so untouched fields
    /// scale to zero. Class 3 (Sunny) follows temperature.
    fn small_artifact() -> serde_json::Value {
        serde_json::json!({
            "feature_names": [
                "num__Temperature", "num__Humidity", "num__Wind Speed", "num__Precipitation (%)",
                "num__Atmospheric Pressure", "num__UV Index", "num__Visibility (km)",
                "cat__Season_Summer", "cat__Season_Winter",
                "cat__Cloud Cover_clear", "cat__Cloud Cover_overcast",
                "cat__Location_inland", "cat__Location_coastal"
            ],
            "pipeline": {
                "preprocessor": {
                    "numeric": [
                        {"column": "Temperature", "mean": 20.0, "scale": 10.0},
                        {"column": "Humidity", "mean": 50.0, "scale": 25.0},
                        {"column": "Wind Speed", "mean": 10.0, "scale": 5.0},
                        {"column": "Precipitation (%)", "mean": 0.0, "scale": 50.0},
                        {"column": "Atmospheric Pressure", "mean": 1013.0, "scale": 10.0},
                        {"column": "UV Index", "mean": 5.0, "scale": 2.0},
                        {"column": "Visibility (km)", "mean": 10.0, "scale": 5.0}
                    ],
                    "categorical": [
                        {"column": "Season", "categories": ["Summer", "Winter"]},
                        {"column": "Cloud Cover", "categories": ["clear", "overcast"]},
                        {"column": "Location", "categories": ["inland", "coastal"]}
                    ]
                },
                "classifier": {
                    "coefficients": [
                        row(&[(0, -2.0), (8, 1.0)]),
                        row(&[(1, 0.5)]),
                        row(&[(1, 1.0)]),
                        row(&[(0, 2.0), (7, 1.0)])
                    ],
                    "intercepts": [0.0, 0.0, 0.0, 0.0]
                }
            },
            "explainer": {
                "expected_values": [0.25, 0.0, 0.0, 0.25],
                "background_mean": row(&[
                    (7, 0.5), (8, 0.5), (9, 0.5), (10, 0.5), (11, 0.5), (12, 0.5)
                ])
            }
        })
    }

    fn load(value: serde_json::Value) -> Result<ModelArtifact, ModelError> {
        ModelArtifact::from_json(&value.to_string())
    }

    #[test]
    fn preprocess_scales_then_one_hot_encodes() {
        let artifact = load(small_artifact()).unwrap();
        let record = FeatureRecord {
            temperature: 30.0,
            humidity: 75,
            season: Season::Winter,
            ..FeatureRecord::default()
        };
        assert_eq!(
            artifact.pipeline.preprocess(&record),
            vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn unknown_category_encodes_as_zeros() {
        let artifact = load(small_artifact()).unwrap();
        let record = FeatureRecord { season: Season::Autumn, ..FeatureRecord::default() };
        let x = artifact.pipeline.preprocess(&record);
        assert_eq!(&x[7..9], &[0.0, 0.0]);
    }

    #[test]
    fn hot_summer_day_predicts_sunny() {
        let artifact = load(small_artifact()).unwrap();
        let record = FeatureRecord {
            temperature: 35.0,
            humidity: 50,
            season: Season::Summer,
            ..FeatureRecord::default()
        };
        let prediction = artifact.pipeline.predict(&record);
        assert_eq!(prediction.label(), Some(WeatherLabel::Sunny));
        let total: f64 = prediction.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(prediction.probabilities[3] > 0.9);
    }

    #[test]
    fn attributions_sum_to_score_minus_baseline() {
        let artifact = load(small_artifact()).unwrap();
        let record = FeatureRecord {
            temperature: 35.0,
            season: Season::Summer,
            cloud_cover: CloudCover::Clear,
            ..FeatureRecord::default()
        };
        let x = artifact.pipeline.preprocess(&record);
        let explanation = artifact.explainer.explain(&x, 3).unwrap();

        assert_eq!(explanation.feature_names.len(), WIDTH);
        assert_eq!(explanation.baseline, 0.25);
        // 2.0 * 1.5 for temperature, 1.0 * (1 - 0.5) for the summer flag
        assert_eq!(explanation.values[0], 3.0);
        assert_eq!(explanation.values[7], 0.5);
        assert_eq!(explanation.values.iter().filter(|v| **v != 0.0).count(), 2);
        assert_eq!(explanation.output(), 3.75);
    }

    #[test]
    fn explain_rejects_unknown_class() {
        let artifact = load(small_artifact()).unwrap();
        let err = artifact.explainer.explain(&[0.0; WIDTH], 7).unwrap_err();
        assert!(err.to_string().contains("no class with index 7"));
    }

    #[test]
    fn mismatched_coefficients_are_rejected() {
        let mut value = small_artifact();
        value["pipeline"]["classifier"]["coefficients"][1] = serde_json::json!([0.0, 0.0]);
        let err = load(value).unwrap_err();
        assert!(err.to_string().contains("coefficients per class"));
    }

    #[test]
    fn three_class_artifact_is_rejected() {
        let mut value = small_artifact();
        value["pipeline"]["classifier"]["intercepts"] = serde_json::json!([0.0, 0.0, 0.0]);
        assert!(matches!(load(value), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let mut value = small_artifact();
        value["pipeline"]["preprocessor"]["numeric"][1]["column"] = serde_json::json!("Elevation");
        let err = load(value).unwrap_err();
        assert!(err.to_string().contains("Elevation"));
    }

    #[test]
    fn missing_column_is_rejected() {
        let mut value = small_artifact();
        let categorical = value["pipeline"]["preprocessor"]["categorical"].as_array_mut().unwrap();
        categorical.retain(|c| c["column"] != "Location");
        let err = load(value).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
        assert!(err.to_string().contains("missing feature column 'Location'"));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let mut value = small_artifact();
        let numeric = &mut value["pipeline"]["preprocessor"]["numeric"];
        numeric[1]["column"] = serde_json::json!("Temperature");
        let err = load(value).unwrap_err();
        assert!(err.to_string().contains("'Temperature' is listed more than once"));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut value = small_artifact();
        value["pipeline"]["preprocessor"]["numeric"][0]["scale"] = serde_json::json!(0.0);
        assert!(matches!(load(value), Err(ModelError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        assert!(matches!(ModelArtifact::load(&path), Err(ModelError::NotFound(_))));
    }

    #[test]
    fn garbage_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(ModelArtifact::load(&path), Err(ModelError::Parse(_))));
    }

    #[test]
    fn argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 0.0]), 1);
    }
}
