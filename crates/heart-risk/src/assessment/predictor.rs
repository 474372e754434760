use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::info;

use super::encoder::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// Artifact layout revision this build understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

const LOW_TIER_CEILING: f64 = 0.30;
const MODERATE_TIER_CEILING: f64 = 0.60;

/// Binary model output: 0 is low risk, 1 is high risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Low,
    High,
}

impl RiskLabel {
    pub fn code(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    /// Summary stored alongside persisted records.
    pub fn summary(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::High => "High Risk",
        }
    }
}

/// Bucket over the positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    pub fn from_probability(probability: f64) -> Self {
        if probability < LOW_TIER_CEILING {
            Self::Low
        } else if probability < MODERATE_TIER_CEILING {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// Read-only classifier shared across requests.
pub trait RiskModel: Send + Sync + fmt::Debug {
    /// Identifier of the loaded artifact, for logs and diagnostics.
    fn version(&self) -> &str;

    /// Probability of the high-risk class, within `[0, 1]`.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    fn predict(&self, features: &FeatureVector) -> Result<RiskLabel, InferenceError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("feature {position} ({name}) is not a finite number")]
    MalformedVector { position: usize, name: &'static str },
    #[error("model produced a non-finite score")]
    NonFiniteOutput,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model artifact not found at {}", .path.display())]
    Missing { path: PathBuf },
    #[error("unable to read model artifact {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact {} is corrupt", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported artifact format version {found} (expected {SUPPORTED_FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("{field} has {actual} entries, expected {FEATURE_COUNT}")]
    Shape { field: &'static str, actual: usize },
    #[error("feature {position} is '{actual}', expected '{expected}'")]
    FeatureOrder {
        position: usize,
        expected: &'static str,
        actual: String,
    },
    #[error("invalid model parameter: {0}")]
    InvalidParameter(String),
}

/// Serialized logistic-regression pipeline (optional standard scaler
/// followed by a linear decision function).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub model_id: Option<String>,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone)]
pub struct LogisticRiskModel {
    model_id: String,
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
    threshold: f64,
}

impl LogisticRiskModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ModelError::Missing {
                path: path.to_path_buf(),
            },
            _ => ModelError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let artifact: ModelArtifact =
            serde_json::from_slice(&raw).map_err(|source| ModelError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: artifact.format_version,
            });
        }

        if artifact.feature_names.len() != FEATURE_COUNT {
            return Err(ModelError::Shape {
                field: "feature_names",
                actual: artifact.feature_names.len(),
            });
        }
        for (position, (actual, expected)) in artifact
            .feature_names
            .iter()
            .zip(FEATURE_NAMES)
            .enumerate()
        {
            if actual != expected {
                return Err(ModelError::FeatureOrder {
                    position,
                    expected,
                    actual: actual.clone(),
                });
            }
        }

        let coefficients = fixed("coefficients", artifact.coefficients)?;
        let mean = match artifact.mean {
            Some(values) => fixed("mean", values)?,
            None => [0.0; FEATURE_COUNT],
        };
        let scale = match artifact.scale {
            Some(values) => fixed("scale", values)?,
            None => [1.0; FEATURE_COUNT],
        };

        if let Some(position) = scale.iter().position(|value| *value == 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "scale for '{}' is zero",
                FEATURE_NAMES[position]
            )));
        }
        let all_finite = coefficients
            .iter()
            .chain(mean.iter())
            .chain(scale.iter())
            .chain(std::iter::once(&artifact.intercept))
            .all(|value| value.is_finite());
        if !all_finite {
            return Err(ModelError::InvalidParameter(
                "parameters must be finite".to_string(),
            ));
        }
        if !(artifact.threshold > 0.0 && artifact.threshold < 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "threshold {} outside (0, 1)",
                artifact.threshold
            )));
        }

        Ok(Self {
            model_id: artifact
                .model_id
                .unwrap_or_else(|| format!("logistic-v{}", artifact.format_version)),
            mean,
            scale,
            coefficients,
            intercept: artifact.intercept,
            threshold: artifact.threshold,
        })
    }

    fn decision(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let mut score = self.intercept;
        for (position, value) in features.iter().enumerate() {
            if !value.is_finite() {
                return Err(InferenceError::MalformedVector {
                    position,
                    name: FEATURE_NAMES[position],
                });
            }
            let standardized = (value - self.mean[position]) / self.scale[position];
            score += self.coefficients[position] * standardized;
        }
        if score.is_nan() {
            return Err(InferenceError::NonFiniteOutput);
        }
        Ok(score)
    }
}

fn fixed(field: &'static str, values: Vec<f64>) -> Result<[f64; FEATURE_COUNT], ModelError> {
    let actual = values.len();
    values
        .try_into()
        .map_err(|_| ModelError::Shape { field, actual })
}

fn sigmoid(score: f64) -> f64 {
    if score >= 0.0 {
        1.0 / (1.0 + (-score).exp())
    } else {
        let e = score.exp();
        e / (1.0 + e)
    }
}

impl RiskModel for LogisticRiskModel {
    fn version(&self) -> &str {
        &self.model_id
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let probability = sigmoid(self.decision(features)?);
        Ok(probability.clamp(0.0, 1.0))
    }

    fn predict(&self, features: &FeatureVector) -> Result<RiskLabel, InferenceError> {
        let probability = self.predict_probability(features)?;
        Ok(if probability >= self.threshold {
            RiskLabel::High
        } else {
            RiskLabel::Low
        })
    }
}

/// Defers parsing the artifact until the first authenticated prediction.
///
/// A failed load leaves the cell empty so the next request retries.
#[derive(Debug)]
pub struct LazyRiskModel {
    path: PathBuf,
    cell: OnceCell<Arc<dyn RiskModel>>,
}

impl LazyRiskModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn preloaded(model: Arc<dyn RiskModel>) -> Self {
        Self {
            path: PathBuf::new(),
            cell: OnceCell::new_with(Some(model)),
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Startup precondition: the artifact file must exist even though it is
    /// parsed lazily.
    pub fn ensure_present(&self) -> Result<(), ModelError> {
        if self.is_loaded() || self.path.is_file() {
            Ok(())
        } else {
            Err(ModelError::Missing {
                path: self.path.clone(),
            })
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn RiskModel>, ModelError> {
        self.cell
            .get_or_try_init(|| async {
                let model = LogisticRiskModel::load(&self.path)?;
                info!(
                    model = model.version(),
                    path = %self.path.display(),
                    "risk model loaded"
                );
                Ok::<Arc<dyn RiskModel>, ModelError>(Arc::new(model))
            })
            .await
            .map(Arc::clone)
    }
}
