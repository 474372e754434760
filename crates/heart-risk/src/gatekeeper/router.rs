use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::{AuthError, GateOutcome, Gatekeeper};
use super::session::{AuthenticatedUser, Session, SessionId, SessionStore, SESSION_HEADER};

/// Gatekeeper plus the store that carries sessions between requests.
#[derive(Clone)]
pub struct SessionGate {
    gatekeeper: Arc<Gatekeeper>,
    sessions: Arc<dyn SessionStore>,
}

impl SessionGate {
    pub fn new(gatekeeper: Arc<Gatekeeper>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            gatekeeper,
            sessions,
        }
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    fn current(&self, headers: &HeaderMap) -> (SessionId, Session) {
        match SessionId::from_headers(headers) {
            Some(id) => {
                let session = self.sessions.load(&id);
                (id, session)
            }
            None => (SessionId::generate(), Session::LoggedOut),
        }
    }

    /// Resolves the logged-in user for a gated request.
    pub fn authenticated_user(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        let id = SessionId::from_headers(headers).ok_or(AuthError::NotLoggedIn)?;
        match self.sessions.load(&id) {
            Session::LoggedIn(user) => Ok(user),
            Session::LoggedOut => Err(AuthError::NotLoggedIn),
        }
    }

    /// Persists the outcome and returns the id the client should carry.
    /// Entering `LoggedIn` always rotates to a server-issued id and drops
    /// the one presented with the request.
    fn commit(&self, id: SessionId, before: &Session, outcome: &GateOutcome) -> SessionId {
        if outcome.session.is_logged_in() && !before.is_logged_in() {
            self.sessions.save(id, Session::LoggedOut);
            let issued = SessionId::generate();
            self.sessions.save(issued.clone(), outcome.session.clone());
            return issued;
        }
        self.sessions.save(id.clone(), outcome.session.clone());
        id
    }
}

pub fn auth_status(error: AuthError) -> StatusCode {
    match error {
        AuthError::MissingCredentials
        | AuthError::MissingEmail
        | AuthError::PasswordTooShort
        | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
        AuthError::EmailExists | AuthError::AlreadyLoggedIn => StatusCode::CONFLICT,
        AuthError::SignupFailed | AuthError::ResetFailed => StatusCode::BAD_GATEWAY,
        AuthError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn auth_error_response(error: AuthError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (auth_status(error), Json(payload)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub email: String,
}

/// Router builder exposing the login/signup/reset/logout chooser.
pub fn auth_router(gate: SessionGate) -> Router {
    Router::new()
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/signup", post(signup_handler))
        .route("/api/v1/auth/reset", post(reset_handler))
        .route("/api/v1/auth/logout", post(logout_handler))
        .route("/api/v1/auth/session", get(session_handler))
        .with_state(gate)
}

fn rejected_body(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (rejection.status(), Json(payload)).into_response()
}

fn session_payload(session: &Session) -> serde_json::Value {
    match session.user() {
        Some(user) => json!({ "status": "logged_in", "email": user.email }),
        None => json!({ "status": "logged_out" }),
    }
}

fn respond(id: &SessionId, outcome: GateOutcome, success: StatusCode) -> Response {
    let mut response = match outcome.result {
        Ok(notice) => {
            let mut payload = session_payload(&outcome.session);
            payload["message"] = json!(notice);
            if outcome.session.is_logged_in() {
                payload["session_id"] = json!(id.as_str());
            }
            (success, Json(payload)).into_response()
        }
        Err(error) => auth_error_response(error),
    };

    if outcome.session.is_logged_in() {
        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}

pub(crate) async fn login_handler(
    State(gate): State<SessionGate>,
    headers: HeaderMap,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection),
    };
    let (id, session) = gate.current(&headers);
    let outcome = gate
        .gatekeeper
        .login(session.clone(), &request.email, &request.password)
        .await;
    let id = gate.commit(id, &session, &outcome);
    respond(&id, outcome, StatusCode::OK)
}

pub(crate) async fn signup_handler(
    State(gate): State<SessionGate>,
    headers: HeaderMap,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection),
    };
    let (id, session) = gate.current(&headers);
    let outcome = gate
        .gatekeeper
        .signup(session.clone(), &request.email, &request.password)
        .await;
    let id = gate.commit(id, &session, &outcome);
    respond(&id, outcome, StatusCode::CREATED)
}

pub(crate) async fn reset_handler(
    State(gate): State<SessionGate>,
    headers: HeaderMap,
    body: Result<Json<ResetRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected_body(rejection),
    };
    let (id, session) = gate.current(&headers);
    let outcome = gate
        .gatekeeper
        .reset_password(session.clone(), &request.email)
        .await;
    let id = gate.commit(id, &session, &outcome);
    respond(&id, outcome, StatusCode::OK)
}

pub(crate) async fn logout_handler(State(gate): State<SessionGate>, headers: HeaderMap) -> Response {
    let (id, session) = gate.current(&headers);
    let outcome = gate.gatekeeper.logout(session.clone());
    let id = gate.commit(id, &session, &outcome);
    respond(&id, outcome, StatusCode::OK)
}

pub(crate) async fn session_handler(
    State(gate): State<SessionGate>,
    headers: HeaderMap,
) -> Response {
    let (_, session) = gate.current(&headers);
    (StatusCode::OK, Json(session_payload(&session))).into_response()
}
