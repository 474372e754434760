use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::observation::PatientObservation;
use super::workflow::{PredictionWorkflow, WorkflowError, ANALYSIS_FAILED};
use crate::gatekeeper::{auth_error_response, SessionGate};

#[derive(Clone)]
pub struct AssessmentState {
    gate: SessionGate,
    workflow: Arc<PredictionWorkflow>,
}

/// Router builder exposing the gated prediction endpoint.
pub fn assessment_router(gate: SessionGate, workflow: Arc<PredictionWorkflow>) -> Router {
    Router::new()
        .route("/api/v1/assessments", post(assess_handler))
        .with_state(AssessmentState { gate, workflow })
}

pub(crate) async fn assess_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
    body: Result<Json<PatientObservation>, JsonRejection>,
) -> Response {
    let user = match state.gate.authenticated_user(&headers) {
        Ok(user) => user,
        Err(err) => return auth_error_response(err),
    };

    let Json(observation) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let payload = json!({ "error": rejection.body_text() });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    match state.workflow.run(&user, &observation).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(WorkflowError::Validation(err)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(WorkflowError::Model(err)) => {
            error!(error = %err, "risk model unavailable");
            let payload = json!({ "error": ANALYSIS_FAILED });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
        Err(WorkflowError::Inference(err)) => {
            error!(error = %err, "inference failed");
            let payload = json!({ "error": ANALYSIS_FAILED });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
