use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::assessment::encoder::FeatureVector;
use crate::assessment::notify::{NotifyError, ReportMailer, ResultNotifier};
use crate::assessment::observation::{
    ChestPainType, PatientObservation, RestingEcg, Sex, StSlope, ThalliumResult,
};
use crate::assessment::persistence::{
    PatientRecord, PersistenceError, PredictionRecorder, PushId, RecordSink,
};
use crate::assessment::predictor::{InferenceError, LazyRiskModel, RiskLabel, RiskModel};
use crate::assessment::workflow::PredictionWorkflow;
use crate::gatekeeper::{AuthenticatedUser, UserHandle};

pub(super) const USER_EMAIL: &str = "doctor@example.com";

/// Returns a fixed probability and counts how often it was asked.
#[derive(Debug)]
pub(super) struct FixedModel {
    probability: f64,
    calls: AtomicUsize,
}

impl FixedModel {
    pub(super) fn new(probability: f64) -> Arc<Self> {
        Arc::new(Self {
            probability,
            calls: AtomicUsize::new(0),
        })
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RiskModel for FixedModel {
    fn version(&self) -> &str {
        "fixed-test-model"
    }

    fn predict_probability(&self, _: &FeatureVector) -> Result<f64, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probability)
    }

    fn predict(&self, features: &FeatureVector) -> Result<RiskLabel, InferenceError> {
        let probability = self.predict_probability(features)?;
        Ok(if probability >= 0.5 {
            RiskLabel::High
        } else {
            RiskLabel::Low
        })
    }
}

#[derive(Debug)]
pub(super) struct BrokenModel;

impl RiskModel for BrokenModel {
    fn version(&self) -> &str {
        "broken-test-model"
    }

    fn predict_probability(&self, _: &FeatureVector) -> Result<f64, InferenceError> {
        Err(InferenceError::NonFiniteOutput)
    }

    fn predict(&self, _: &FeatureVector) -> Result<RiskLabel, InferenceError> {
        Err(InferenceError::NonFiniteOutput)
    }
}

#[derive(Debug, Default)]
pub(super) struct MemorySink {
    records: Mutex<Vec<(String, PatientRecord)>>,
}

impl MemorySink {
    pub(super) fn records(&self) -> Vec<(String, PatientRecord)> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn push(
        &self,
        collection: &str,
        record: &PatientRecord,
    ) -> Result<PushId, PersistenceError> {
        let mut records = self.records.lock().expect("sink mutex poisoned");
        records.push((collection.to_string(), record.clone()));
        Ok(PushId(format!("-Nrecord{:04}", records.len())))
    }
}

#[derive(Debug)]
pub(super) struct RejectingSink;

#[async_trait]
impl RecordSink for RejectingSink {
    async fn push(&self, _: &str, _: &PatientRecord) -> Result<PushId, PersistenceError> {
        Err(PersistenceError::Rejected { status: 401 })
    }
}

#[derive(Debug, Default)]
pub(super) struct CapturingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingMailer {
    /// (recipient, body) pairs in delivery order.
    pub(super) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl ReportMailer for CapturingMailer {
    async fn deliver(&self, recipient: &str, _: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push((recipient.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct RefusingMailer;

#[async_trait]
impl ReportMailer for RefusingMailer {
    async fn deliver(&self, _: &str, _: &str, _: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Relay("535 5.7.8 credentials rejected".to_string()))
    }
}

pub(super) fn observation() -> PatientObservation {
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

pub(super) fn user() -> AuthenticatedUser {
    AuthenticatedUser {
        user: UserHandle {
            local_id: "uid-doctor".to_string(),
            email: USER_EMAIL.to_string(),
            id_token: "id-token".to_string(),
        },
        email: USER_EMAIL.to_string(),
    }
}

pub(super) fn preloaded(model: Arc<dyn RiskModel>) -> Arc<LazyRiskModel> {
    Arc::new(LazyRiskModel::preloaded(model))
}

pub(super) fn workflow(
    model: Arc<dyn RiskModel>,
    sink: Arc<dyn RecordSink>,
    mailer: Arc<dyn ReportMailer>,
) -> PredictionWorkflow {
    PredictionWorkflow::new(preloaded(model))
        .with_recorder(Some(PredictionRecorder::new(sink)))
        .with_notifier(Some(ResultNotifier::new(mailer)))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 8192)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
