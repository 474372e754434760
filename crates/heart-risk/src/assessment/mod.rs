//! Clinical form intake, risk prediction and the side effects that follow it.

pub mod encoder;
pub mod notify;
pub mod observation;
pub mod persistence;
pub mod predictor;
pub mod report;
pub mod router;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use encoder::{encode, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use notify::{NotifyError, ReportMailer, ResultNotifier, SmtpReportMailer};
pub use observation::{
    ChestPainType, PatientObservation, RestingEcg, Sex, StSlope, ThalliumResult, ValidationError,
};
pub use persistence::{
    FirebaseRecordSink, PatientRecord, PersistenceError, PredictionRecorder, PushId, RecordSink,
    PATIENTS_COLLECTION,
};
pub use predictor::{
    InferenceError, LazyRiskModel, LogisticRiskModel, ModelArtifact, ModelError, RiskLabel,
    RiskModel, RiskTier,
};
pub use router::assessment_router;
pub use workflow::{
    AssessmentOutcome, EmailStatus, PersistenceStatus, PredictionWorkflow, RiskAssessment,
    WorkflowError, ANALYSIS_FAILED,
};
