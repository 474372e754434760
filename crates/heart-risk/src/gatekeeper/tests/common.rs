use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::gatekeeper::identity::{IdentityError, IdentityProvider, UserHandle};
use crate::gatekeeper::service::{Gatekeeper, MIN_PASSWORD_LEN};
use crate::gatekeeper::session::{AuthenticatedUser, MemorySessionStore, Session};
use crate::gatekeeper::SessionGate;

pub(super) const EMAIL: &str = "user@example.com";
pub(super) const PASSWORD: &str = "correct-horse";

#[derive(Debug)]
pub(super) struct FakeIdentity {
    accounts: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    min_password: usize,
    offline: bool,
    fail_sign_in: bool,
}

impl Default for FakeIdentity {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            min_password: MIN_PASSWORD_LEN,
            offline: false,
            fail_sign_in: false,
        }
    }
}

impl FakeIdentity {
    pub(super) fn with_account(email: &str, password: &str) -> Self {
        let fake = Self::default();
        fake.accounts
            .lock()
            .expect("accounts mutex poisoned")
            .insert(email.to_string(), password.to_string());
        fake
    }

    pub(super) fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub(super) fn strict(min_password: usize) -> Self {
        Self {
            min_password,
            ..Self::default()
        }
    }

    pub(super) fn without_sign_in() -> Self {
        Self {
            fail_sign_in: true,
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, call: String) -> Result<(), IdentityError> {
        self.calls.lock().expect("calls mutex poisoned").push(call);
        if self.offline {
            Err(IdentityError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

pub(super) fn handle(email: &str) -> UserHandle {
    UserHandle {
        local_id: format!("uid-{email}"),
        email: email.to_string(),
        id_token: "id-token".to_string(),
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        self.record(format!("sign_in:{email}"))?;
        if self.fail_sign_in {
            return Err(IdentityError::Rejected("USER_DISABLED".to_string()));
        }
        let accounts = self.accounts.lock().expect("accounts mutex poisoned");
        match accounts.get(email) {
            Some(stored) if stored == password => Ok(handle(email)),
            _ => Err(IdentityError::Rejected(
                "INVALID_LOGIN_CREDENTIALS".to_string(),
            )),
        }
    }

    async fn create_user_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        self.record(format!("create:{email}"))?;
        let mut accounts = self.accounts.lock().expect("accounts mutex poisoned");
        if accounts.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }
        if password.chars().count() < self.min_password {
            return Err(IdentityError::WeakPassword);
        }
        if !email.contains('@') {
            return Err(IdentityError::Rejected("INVALID_EMAIL".to_string()));
        }
        accounts.insert(email.to_string(), password.to_string());
        Ok(handle(email))
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), IdentityError> {
        self.record(format!("reset:{email}"))?;
        let accounts = self.accounts.lock().expect("accounts mutex poisoned");
        if accounts.contains_key(email) {
            Ok(())
        } else {
            Err(IdentityError::Rejected("EMAIL_NOT_FOUND".to_string()))
        }
    }
}

pub(super) fn gatekeeper(identity: Arc<FakeIdentity>) -> Gatekeeper {
    let identity: Arc<dyn IdentityProvider> = identity;
    Gatekeeper::new(Some(identity))
}

pub(super) fn logged_in_session() -> Session {
    Session::LoggedIn(AuthenticatedUser {
        user: handle(EMAIL),
        email: EMAIL.to_string(),
    })
}

pub(super) fn session_gate(identity: Arc<FakeIdentity>) -> (SessionGate, MemorySessionStore) {
    let store = MemorySessionStore::default();
    let gate = SessionGate::new(Arc::new(gatekeeper(identity)), Arc::new(store.clone()));
    (gate, store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
