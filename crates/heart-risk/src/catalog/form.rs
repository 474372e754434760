use serde::Serialize;
use serde_json::Value;

use crate::assessment::observation::{
    ChestPainType, RestingEcg, Sex, StSlope, ThalliumResult, AGE_RANGE, CHOLESTEROL_RANGE,
    MAX_HEART_RATE_RANGE, MAX_MAJOR_VESSELS, OLDPEAK_RANGE, RESTING_BP_RANGE,
};

pub const SUBMIT_LABEL: &str = "Analyze Risk";

/// Client-side description of the clinical form. Field keys match the
/// assessment request body.
#[derive(Debug, Clone, Serialize)]
pub struct FormSchema {
    pub title: &'static str,
    pub caption: &'static str,
    pub sections: Vec<FormSection>,
    pub submit_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSection {
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'static str>,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
    #[serde(flatten)]
    pub input: FieldInput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldInput {
    Text {
        required: bool,
    },
    Slider {
        min: f64,
        max: f64,
        default: f64,
    },
    Number {
        min: f64,
        max: f64,
        default: f64,
        step: f64,
    },
    Choice {
        options: Vec<ChoiceOption>,
        default: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub value: Value,
    pub label: &'static str,
}

fn field(
    key: &'static str,
    label: &'static str,
    help: Option<&'static str>,
    input: FieldInput,
) -> FormField {
    FormField {
        key,
        label,
        help,
        input,
    }
}

fn slider(range: &std::ops::RangeInclusive<u16>, default: u16) -> FieldInput {
    FieldInput::Slider {
        min: f64::from(*range.start()),
        max: f64::from(*range.end()),
        default: f64::from(default),
    }
}

fn enum_choice<T>(all: &[T], label: fn(T) -> &'static str) -> FieldInput
where
    T: Serialize + Copy,
{
    let options: Vec<ChoiceOption> = all
        .iter()
        .filter_map(|variant| {
            serde_json::to_value(variant)
                .ok()
                .map(|value| ChoiceOption {
                    value,
                    label: label(*variant),
                })
        })
        .collect();
    let default = options
        .first()
        .map(|option| option.value.clone())
        .unwrap_or(Value::Null);
    FieldInput::Choice { options, default }
}

fn yes_no(no: &'static str, yes: &'static str) -> FieldInput {
    FieldInput::Choice {
        options: vec![
            ChoiceOption {
                value: Value::Bool(false),
                label: no,
            },
            ChoiceOption {
                value: Value::Bool(true),
                label: yes,
            },
        ],
        default: Value::Bool(false),
    }
}

impl FormSchema {
    pub fn heart_risk(require_patient_name: bool) -> Self {
        let patient = FormSection {
            title: "Patient",
            caption: None,
            fields: vec![field(
                "patient_name",
                "Patient Name",
                Some("Stored with the prediction record."),
                FieldInput::Text {
                    required: require_patient_name,
                },
            )],
        };

        let vitals = FormSection {
            title: "1. Patient Vitals",
            caption: None,
            fields: vec![
                field("age", "Age", None, slider(&AGE_RANGE, 50)),
                field("sex", "Gender", None, enum_choice(&Sex::ALL, Sex::label)),
                field(
                    "resting_blood_pressure",
                    "Resting Blood Pressure (mm Hg)",
                    Some("Normal BP is around 120/80. High BP is a risk factor."),
                    slider(&RESTING_BP_RANGE, 120),
                ),
                field(
                    "cholesterol",
                    "Cholesterol (mg/dl)",
                    Some("Total cholesterol level. Higher levels can indicate blocked arteries."),
                    slider(&CHOLESTEROL_RANGE, 200),
                ),
                field(
                    "fasting_blood_sugar_high",
                    "Fasting Blood Sugar > 120 mg/dl?",
                    Some("Is your blood sugar high after fasting? This is a sign of diabetes risk."),
                    yes_no("No (Normal)", "Yes (High)"),
                ),
                field(
                    "max_heart_rate",
                    "Max Heart Rate Achieved",
                    Some("The highest heart rate you reached during the stress test."),
                    slider(&MAX_HEART_RATE_RANGE, 150),
                ),
                field(
                    "exercise_induced_angina",
                    "Exercise Induced Angina?",
                    Some("Do you feel chest pain when you exercise?"),
                    yes_no("No", "Yes"),
                ),
            ],
        };

        let vessels = (0..=MAX_MAJOR_VESSELS)
            .zip(["0", "1", "2", "3"])
            .map(|(count, label)| ChoiceOption {
                value: Value::from(count),
                label,
            })
            .collect();

        let clinical = FormSection {
            title: "2. Clinical Test Results",
            caption: Some("These values usually come from a doctor's report or ECG test."),
            fields: vec![
                field(
                    "chest_pain_type",
                    "Chest Pain Type",
                    Some(
                        "Typical: Squeezing sensation during stress. Atypical: Sharp pain. \
                         Non-anginal: Muscular/Digestive.",
                    ),
                    enum_choice(&ChestPainType::ALL, ChestPainType::label),
                ),
                field(
                    "resting_ecg",
                    "Resting ECG Results",
                    Some("Results from the electrocardiogram while at rest."),
                    enum_choice(&RestingEcg::ALL, RestingEcg::label),
                ),
                field(
                    "oldpeak",
                    "Oldpeak (ST Depression)",
                    Some(
                        "A technical reading from the ECG indicating how much the heart is \
                         stressed during exercise.",
                    ),
                    FieldInput::Number {
                        min: *OLDPEAK_RANGE.start(),
                        max: *OLDPEAK_RANGE.end(),
                        default: 0.0,
                        step: 0.1,
                    },
                ),
                field(
                    "st_slope",
                    "Heart Rate Slope (During Exercise)",
                    Some("How your heart rate recovers or changes during peak exercise."),
                    enum_choice(&StSlope::ALL, StSlope::label),
                ),
                field(
                    "major_vessels",
                    "Number of Major Vessels (0-3)",
                    Some(
                        "Number of major blood vessels seen clearly on the Fluoroscopy scan. \
                         Fewer visible vessels can mean blockages.",
                    ),
                    FieldInput::Choice {
                        options: vessels,
                        default: Value::from(0),
                    },
                ),
                field(
                    "thallium_result",
                    "Thallium Stress Result",
                    Some(
                        "Result of the Thallium stress test. 'Fixed' means permanent damage \
                         (scar), 'Reversible' means reduced blood flow.",
                    ),
                    enum_choice(&ThalliumResult::ALL, ThalliumResult::label),
                ),
            ],
        };

        Self {
            title: "Heart Attack Risk",
            caption: "Please fill out the medical form below. Each field carries a short \
                      explanation.",
            sections: vec![patient, vitals, clinical],
            submit_label: SUBMIT_LABEL,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .find(|field| field.key == key)
    }
}
