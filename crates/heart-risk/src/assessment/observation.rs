use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const AGE_RANGE: RangeInclusive<u16> = 18..=120;
pub const RESTING_BP_RANGE: RangeInclusive<u16> = 80..=200;
pub const CHOLESTEROL_RANGE: RangeInclusive<u16> = 100..=600;
pub const MAX_HEART_RATE_RANGE: RangeInclusive<u16> = 60..=220;
pub const OLDPEAK_RANGE: RangeInclusive<f64> = 0.0..=10.0;
pub const MAX_MAJOR_VESSELS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    #[serde(alias = "Male")]
    Male,
    #[serde(alias = "Female")]
    Female,
}

impl Sex {
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    pub fn code(self) -> u8 {
        match self {
            Self::Male => 1,
            Self::Female => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChestPainType {
    #[serde(alias = "Typical Angina (Pressure/Squeeze)")]
    TypicalAngina,
    #[serde(alias = "Atypical Angina (Sharp/Stabbing)")]
    AtypicalAngina,
    #[serde(alias = "Non-anginal Pain (Not Heart Related)")]
    NonAnginalPain,
    #[serde(alias = "Asymptomatic (No Pain)")]
    Asymptomatic,
}

impl ChestPainType {
    pub const ALL: [Self; 4] = [
        Self::TypicalAngina,
        Self::AtypicalAngina,
        Self::NonAnginalPain,
        Self::Asymptomatic,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::TypicalAngina => 0,
            Self::AtypicalAngina => 1,
            Self::NonAnginalPain => 2,
            Self::Asymptomatic => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TypicalAngina => "Typical Angina (Pressure/Squeeze)",
            Self::AtypicalAngina => "Atypical Angina (Sharp/Stabbing)",
            Self::NonAnginalPain => "Non-anginal Pain (Not Heart Related)",
            Self::Asymptomatic => "Asymptomatic (No Pain)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestingEcg {
    #[serde(alias = "Normal")]
    Normal,
    #[serde(alias = "ST-T Wave Abnormality (Irregular)")]
    StTWaveAbnormality,
    #[serde(alias = "Left Ventricular Hypertrophy (Thickened Heart)")]
    LeftVentricularHypertrophy,
}

impl RestingEcg {
    pub const ALL: [Self; 3] = [
        Self::Normal,
        Self::StTWaveAbnormality,
        Self::LeftVentricularHypertrophy,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::StTWaveAbnormality => 1,
            Self::LeftVentricularHypertrophy => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::StTWaveAbnormality => "ST-T Wave Abnormality (Irregular)",
            Self::LeftVentricularHypertrophy => "Left Ventricular Hypertrophy (Thickened Heart)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StSlope {
    #[serde(alias = "Upsloping (Healthy/Normal)")]
    Upsloping,
    #[serde(alias = "Flatsloping (Minimal Change)")]
    Flatsloping,
    #[serde(alias = "Downsloping (Unhealthy Sign)")]
    Downsloping,
}

impl StSlope {
    pub const ALL: [Self; 3] = [Self::Upsloping, Self::Flatsloping, Self::Downsloping];

    pub fn code(self) -> u8 {
        match self {
            Self::Upsloping => 0,
            Self::Flatsloping => 1,
            Self::Downsloping => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Upsloping => "Upsloping (Healthy/Normal)",
            Self::Flatsloping => "Flatsloping (Minimal Change)",
            Self::Downsloping => "Downsloping (Unhealthy Sign)",
        }
    }
}

/// Thallium stress test outcome. The codes follow the label encoder the
/// model was trained with and are not contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThalliumResult {
    #[serde(alias = "Normal")]
    Normal,
    #[serde(alias = "Fixed Defect (Past Heart Issue)")]
    FixedDefect,
    #[serde(alias = "Reversible Defect (Current Issue)")]
    ReversibleDefect,
}

impl ThalliumResult {
    pub const ALL: [Self; 3] = [Self::Normal, Self::FixedDefect, Self::ReversibleDefect];

    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 2,
            Self::FixedDefect => 1,
            Self::ReversibleDefect => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::FixedDefect => "Fixed Defect (Past Heart Issue)",
            Self::ReversibleDefect => "Reversible Defect (Current Issue)",
        }
    }
}

/// One submission of the clinical form. Consumed by a single assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    pub age: u16,
    pub sex: Sex,
    pub chest_pain_type: ChestPainType,
    /// mm Hg
    pub resting_blood_pressure: u16,
    /// mg/dl
    pub cholesterol: u16,
    /// Fasting blood sugar above 120 mg/dl.
    pub fasting_blood_sugar_high: bool,
    pub resting_ecg: RestingEcg,
    pub max_heart_rate: u16,
    pub exercise_induced_angina: bool,
    /// ST depression induced by exercise relative to rest.
    pub oldpeak: f64,
    pub st_slope: StSlope,
    pub major_vessels: u8,
    pub thallium_result: ThalliumResult,
}

impl PatientObservation {
    /// Checks the numeric inputs against the form's slider bounds. Categorical
    /// fields are closed enums and need no further checks.
    pub fn validate(&self, require_patient_name: bool) -> Result<(), ValidationError> {
        if require_patient_name && self.patient_name().is_none() {
            return Err(ValidationError::MissingPatientName);
        }

        check_range("age", self.age, &AGE_RANGE)?;
        check_range(
            "resting_blood_pressure",
            self.resting_blood_pressure,
            &RESTING_BP_RANGE,
        )?;
        check_range("cholesterol", self.cholesterol, &CHOLESTEROL_RANGE)?;
        check_range("max_heart_rate", self.max_heart_rate, &MAX_HEART_RATE_RANGE)?;

        if !self.oldpeak.is_finite() {
            return Err(ValidationError::NonFinite { field: "oldpeak" });
        }
        if !OLDPEAK_RANGE.contains(&self.oldpeak) {
            return Err(ValidationError::OutOfRange {
                field: "oldpeak",
                min: *OLDPEAK_RANGE.start(),
                max: *OLDPEAK_RANGE.end(),
                value: self.oldpeak,
            });
        }

        if self.major_vessels > MAX_MAJOR_VESSELS {
            return Err(ValidationError::OutOfRange {
                field: "major_vessels",
                min: 0.0,
                max: f64::from(MAX_MAJOR_VESSELS),
                value: f64::from(self.major_vessels),
            });
        }

        Ok(())
    }

    /// Trimmed patient name, if one was supplied.
    pub fn patient_name(&self) -> Option<&str> {
        self.patient_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

fn check_range(
    field: &'static str,
    value: u16,
    range: &RangeInclusive<u16>,
) -> Result<(), ValidationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            min: f64::from(*range.start()),
            max: f64::from(*range.end()),
            value: f64::from(value),
        })
    }
}

/// Rejected form input, caught before any model or network call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("Please enter the patient's name before analysing")]
    MissingPatientName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observation() -> PatientObservation {
        PatientObservation {
            patient_name: None,
            age: 50,
            sex: Sex::Male,
            chest_pain_type: ChestPainType::Asymptomatic,
            resting_blood_pressure: 120,
            cholesterol: 200,
            fasting_blood_sugar_high: false,
            resting_ecg: RestingEcg::Normal,
            max_heart_rate: 150,
            exercise_induced_angina: false,
            oldpeak: 0.0,
            st_slope: StSlope::Upsloping,
            major_vessels: 0,
            thallium_result: ThalliumResult::Normal,
        }
    }

    #[test]
    fn accepts_form_labels_and_machine_names() {
        let payload = json!({
            "age": 63,
            "sex": "Female",
            "chest_pain_type": "Non-anginal Pain (Not Heart Related)",
            "resting_blood_pressure": 145,
            "cholesterol": 233,
            "fasting_blood_sugar_high": true,
            "resting_ecg": "st_t_wave_abnormality",
            "max_heart_rate": 150,
            "exercise_induced_angina": false,
            "oldpeak": 2.3,
            "st_slope": "Downsloping (Unhealthy Sign)",
            "major_vessels": 0,
            "thallium_result": "Fixed Defect (Past Heart Issue)"
        });

        let parsed: PatientObservation = serde_json::from_value(payload).expect("parses");
        assert_eq!(parsed.sex, Sex::Female);
        assert_eq!(parsed.chest_pain_type, ChestPainType::NonAnginalPain);
        assert_eq!(parsed.resting_ecg, RestingEcg::StTWaveAbnormality);
        assert_eq!(parsed.st_slope, StSlope::Downsloping);
        assert_eq!(parsed.thallium_result, ThalliumResult::FixedDefect);
        assert!(parsed.patient_name.is_none());
    }

    #[test]
    fn rejects_unknown_category() {
        let mut payload = serde_json::to_value(observation()).expect("serializes");
        payload["thallium_result"] = json!("Unknown");
        assert!(serde_json::from_value::<PatientObservation>(payload).is_err());
    }

    #[test]
    fn accepts_slider_bounds() {
        let mut low = observation();
        low.age = 18;
        low.resting_blood_pressure = 80;
        low.cholesterol = 100;
        low.max_heart_rate = 60;
        assert_eq!(low.validate(false), Ok(()));

        let mut high = observation();
        high.age = 120;
        high.resting_blood_pressure = 200;
        high.cholesterol = 600;
        high.max_heart_rate = 220;
        high.oldpeak = 10.0;
        high.major_vessels = 3;
        assert_eq!(high.validate(false), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        let mut young = observation();
        young.age = 17;
        assert!(matches!(
            young.validate(false),
            Err(ValidationError::OutOfRange { field: "age", .. })
        ));

        let mut vessels = observation();
        vessels.major_vessels = 4;
        assert!(matches!(
            vessels.validate(false),
            Err(ValidationError::OutOfRange {
                field: "major_vessels",
                ..
            })
        ));

        let mut oldpeak = observation();
        oldpeak.oldpeak = f64::NAN;
        assert_eq!(
            oldpeak.validate(false),
            Err(ValidationError::NonFinite { field: "oldpeak" })
        );
    }

    #[test]
    fn patient_name_requirement_is_configurable() {
        let mut unnamed = observation();
        unnamed.patient_name = Some("   ".to_string());
        assert_eq!(unnamed.validate(false), Ok(()));
        assert_eq!(
            unnamed.validate(true),
            Err(ValidationError::MissingPatientName)
        );

        unnamed.patient_name = Some(" Jane Roe ".to_string());
        assert_eq!(unnamed.validate(true), Ok(()));
        assert_eq!(unnamed.patient_name(), Some("Jane Roe"));
    }
}
