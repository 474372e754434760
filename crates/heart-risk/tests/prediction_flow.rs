use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use heart_risk::assessment::{
    assessment_router, ChestPainType, LazyRiskModel, PatientObservation, PatientRecord,
    PersistenceError, PredictionRecorder, PredictionWorkflow, PushId, RecordSink, RestingEcg,
    RiskLabel, RiskTier, Sex, StSlope, ThalliumResult,
};
use heart_risk::gatekeeper::{
    auth_router, Gatekeeper, IdentityError, IdentityProvider, MemorySessionStore, SessionGate,
    UserHandle, SESSION_HEADER,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn bundled_model() -> Arc<LazyRiskModel> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/heart_attack_model.json");
    Arc::new(LazyRiskModel::new(path))
}

fn reference_observation() -> PatientObservation {
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

#[tokio::test]
async fn bundled_model_scores_reference_patient() {
    let model = bundled_model();
    model.ensure_present().expect("artifact shipped with the repo");
    let workflow = PredictionWorkflow::new(model.clone());
    assert!(!model.is_loaded());

    let assessment = workflow
        .assess(&reference_observation())
        .await
        .expect("assessment");

    assert_eq!(
        assessment.features.values(),
        &[50.0, 1.0, 3.0, 120.0, 200.0, 0.0, 0.0, 150.0, 0.0, 0.0, 0.0, 0.0, 2.0]
    );
    assert!((0.0..=1.0).contains(&assessment.probability));
    assert!(assessment.probability > 0.9);
    assert_eq!(assessment.label, RiskLabel::High);
    assert_eq!(assessment.tier, RiskTier::High);
    assert_eq!(assessment.model_version, "heart-attack-logreg-2024.03");
    assert!(model.is_loaded());
}

#[tokio::test]
async fn bundled_model_scores_low_risk_patient() {
    let workflow = PredictionWorkflow::new(bundled_model());
    let observation = PatientObservation {
        patient_name: Some("John Doe".to_string()),
        age: 67,
        sex: Sex::Male,
        chest_pain_type: ChestPainType::TypicalAngina,
        resting_blood_pressure: 160,
        cholesterol: 286,
        fasting_blood_sugar_high: false,
        resting_ecg: RestingEcg::LeftVentricularHypertrophy,
        max_heart_rate: 108,
        exercise_induced_angina: true,
        oldpeak: 1.5,
        st_slope: StSlope::Flatsloping,
        major_vessels: 3,
        thallium_result: ThalliumResult::Normal,
    };

    let assessment = workflow.assess(&observation).await.expect("assessment");

    assert_eq!(assessment.label, RiskLabel::Low);
    assert_eq!(assessment.label_code, 0);
    assert_eq!(assessment.tier, RiskTier::Low);
}

#[derive(Debug, Default)]
struct Accounts {
    users: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl IdentityProvider for Accounts {
    async fn sign_in_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        let users = self.users.lock().expect("accounts mutex poisoned");
        match users.get(email) {
            Some(stored) if stored == password => Ok(UserHandle {
                local_id: format!("uid-{}", users.len()),
                email: email.to_string(),
                id_token: "token".to_string(),
            }),
            _ => Err(IdentityError::Rejected("INVALID_LOGIN_CREDENTIALS".to_string())),
        }
    }

    async fn create_user_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        let mut users = self.users.lock().expect("accounts mutex poisoned");
        if users.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }
        users.insert(email.to_string(), password.to_string());
        Ok(UserHandle {
            local_id: format!("uid-{}", users.len()),
            email: email.to_string(),
            id_token: "token".to_string(),
        })
    }

    async fn send_password_reset_email(&self, _: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Ledger {
    records: Mutex<Vec<PatientRecord>>,
}

#[async_trait]
impl RecordSink for Ledger {
    async fn push(&self, _: &str, record: &PatientRecord) -> Result<PushId, PersistenceError> {
        let mut records = self.records.lock().expect("ledger mutex poisoned");
        records.push(record.clone());
        Ok(PushId(format!("-Nledger{}", records.len())))
    }
}

fn application(ledger: Arc<Ledger>) -> Router {
    let identity: Arc<dyn IdentityProvider> = Arc::new(Accounts::default());
    let gate = SessionGate::new(
        Arc::new(Gatekeeper::new(Some(identity))),
        Arc::new(MemorySessionStore::default()),
    );
    let workflow = PredictionWorkflow::new(bundled_model())
        .with_recorder(Some(PredictionRecorder::new(ledger)));
    auth_router(gate.clone()).merge(assessment_router(gate, Arc::new(workflow)))
}

fn post(uri: &str, payload: Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 8192)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json")
}

#[tokio::test]
async fn signup_then_assess_records_under_normalized_email() {
    let ledger = Arc::new(Ledger::default());
    let app = application(ledger.clone());
    let observation = serde_json::to_value(reference_observation()).expect("serializes");

    let response = app
        .clone()
        .oneshot(post("/api/v1/assessments", observation.clone(), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post(
            "/api/v1/auth/signup",
            json!({ "email": " Clinician@Example.ORG", "password": "s3cret!" }),
            None,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let session = json_body(response).await["session_id"]
        .as_str()
        .expect("session id")
        .to_string();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post(
                "/api/v1/assessments",
                observation.clone(),
                Some(&session),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["label_code"], 1);
        assert_eq!(body["persistence"]["status"], "saved");
        assert_eq!(body["email"], "disabled");
    }

    let records = ledger.records.lock().expect("ledger mutex poisoned");
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|record| record.submitter_email == "clinician@example.org"));
    assert_eq!(records[0].prediction, "High Risk");
}
