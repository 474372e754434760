use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::encoder::{encode, FeatureVector};
use super::notify::ResultNotifier;
use super::observation::{PatientObservation, ValidationError};
use super::persistence::{PredictionRecorder, PushId};
use super::predictor::{InferenceError, LazyRiskModel, ModelError, RiskLabel, RiskTier};
use super::report::{result_message, result_text};
use crate::gatekeeper::AuthenticatedUser;

/// Generic notice shown whenever inference cannot produce a result.
pub const ANALYSIS_FAILED: &str = "An error occurred while analysing the risk.";

/// Computed prediction for one observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub features: FeatureVector,
    pub label: RiskLabel,
    pub label_code: u8,
    pub probability: f64,
    pub tier: RiskTier,
    pub message: &'static str,
    pub result_text: String,
    pub model_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistenceStatus {
    Saved { record_id: PushId },
    Failed { reason: String },
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    Sent,
    Failed,
    Disabled,
}

/// Assessment plus the fate of its side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentOutcome {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub persistence: PersistenceStatus,
    pub email: EmailStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("risk model unavailable: {0}")]
    Model(#[from] ModelError),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Validate, encode, predict, then record and email the result.
#[derive(Debug, Clone)]
pub struct PredictionWorkflow {
    model: Arc<LazyRiskModel>,
    recorder: Option<PredictionRecorder>,
    notifier: Option<ResultNotifier>,
    require_patient_name: bool,
}

impl PredictionWorkflow {
    pub fn new(model: Arc<LazyRiskModel>) -> Self {
        Self {
            model,
            recorder: None,
            notifier: None,
            require_patient_name: false,
        }
    }

    pub fn with_recorder(mut self, recorder: Option<PredictionRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_notifier(mut self, notifier: Option<ResultNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn require_patient_name(mut self, required: bool) -> Self {
        self.require_patient_name = required;
        self
    }

    pub fn model(&self) -> &LazyRiskModel {
        &self.model
    }

    /// Pure prediction: no record is written and no email is sent.
    pub async fn assess(
        &self,
        observation: &PatientObservation,
    ) -> Result<RiskAssessment, WorkflowError> {
        observation.validate(self.require_patient_name)?;
        let features = encode(observation);
        let model = self.model.get().await?;

        let probability = model.predict_probability(&features)?;
        let label = model.predict(&features)?;
        let tier = RiskTier::from_probability(probability);

        Ok(RiskAssessment {
            features,
            label,
            label_code: label.code(),
            probability,
            tier,
            message: result_message(label),
            result_text: result_text(label, probability, tier),
            model_version: model.version().to_string(),
        })
    }

    /// Full submission for a logged-in user. Persistence and email run only
    /// after a successful prediction and never fail the request.
    pub async fn run(
        &self,
        user: &AuthenticatedUser,
        observation: &PatientObservation,
    ) -> Result<AssessmentOutcome, WorkflowError> {
        let assessment = self.assess(observation).await?;
        info!(
            user_id = %user.user.local_id,
            label = assessment.label_code,
            probability = assessment.probability,
            tier = assessment.tier.label(),
            "risk assessed"
        );

        let persistence = match &self.recorder {
            Some(recorder) => match recorder
                .record_prediction(observation, assessment.label, &user.email)
                .await
            {
                Ok(record_id) => PersistenceStatus::Saved { record_id },
                Err(err) => {
                    warn!(error = %err, collection = recorder.collection(), "record not saved");
                    PersistenceStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            },
            None => PersistenceStatus::Disabled,
        };

        let email = match &self.notifier {
            Some(notifier) => {
                if notifier
                    .send_report(&user.email, &assessment.result_text)
                    .await
                {
                    EmailStatus::Sent
                } else {
                    EmailStatus::Failed
                }
            }
            None => EmailStatus::Disabled,
        };

        Ok(AssessmentOutcome {
            assessment,
            persistence,
            email,
        })
    }
}
