use serde::Serialize;

use super::observation::PatientObservation;

pub const FEATURE_COUNT: usize = 13;

/// Column order the model was fitted with.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Fixed-order numeric input for the risk model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

/// Maps one observation onto the model's feature layout.
pub fn encode(observation: &PatientObservation) -> FeatureVector {
    FeatureVector([
        f64::from(observation.age),
        f64::from(observation.sex.code()),
        f64::from(observation.chest_pain_type.code()),
        f64::from(observation.resting_blood_pressure),
        f64::from(observation.cholesterol),
        flag(observation.fasting_blood_sugar_high),
        f64::from(observation.resting_ecg.code()),
        f64::from(observation.max_heart_rate),
        flag(observation.exercise_induced_angina),
        observation.oldpeak,
        f64::from(observation.st_slope.code()),
        f64::from(observation.major_vessels),
        f64::from(observation.thallium_result.code()),
    ])
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
