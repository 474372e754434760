use async_trait::async_trait;
use chrono::Utc;
use heart_risk::assessment::{
    LazyRiskModel, NotifyError, PatientRecord, PersistenceError, PushId, RecordSink,
    ReportMailer,
};
use heart_risk::gatekeeper::{IdentityError, IdentityProvider, UserHandle, MIN_PASSWORD_LEN};
use metrics_exporter_prometheus::PrometheusHandle;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) model: Arc<LazyRiskModel>,
}

/// Alphabet of realtime-database push ids, in lexicographic order.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// 8 timestamp characters followed by 12 random ones, so ids sort by
/// creation time.
pub(crate) fn generate_push_id<R: Rng>(timestamp_ms: u64, rng: &mut R) -> PushId {
    let mut time_chars = [0u8; 8];
    let mut remaining = timestamp_ms;
    for slot in time_chars.iter_mut().rev() {
        *slot = PUSH_CHARS[(remaining % 64) as usize];
        remaining /= 64;
    }

    let mut id: String = time_chars.iter().map(|&c| char::from(c)).collect();
    for _ in 0..12 {
        id.push(char::from(PUSH_CHARS[rng.gen_range(0..PUSH_CHARS.len())]));
    }
    PushId(id)
}

#[derive(Debug, Clone)]
pub(crate) struct StoredRecord {
    pub(crate) id: PushId,
    pub(crate) collection: String,
    pub(crate) record: PatientRecord,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryRecordSink {
    records: Arc<Mutex<Vec<StoredRecord>>>,
}

impl InMemoryRecordSink {
    pub(crate) fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().expect("record mutex poisoned").clone()
    }
}

#[async_trait]
impl RecordSink for InMemoryRecordSink {
    async fn push(
        &self,
        collection: &str,
        record: &PatientRecord,
    ) -> Result<PushId, PersistenceError> {
        let timestamp = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let id = generate_push_id(timestamp, &mut rand::thread_rng());
        let mut guard = self.records.lock().expect("record mutex poisoned");
        guard.push(StoredRecord {
            id: id.clone(),
            collection: collection.to_string(),
            record: record.clone(),
        });
        Ok(id)
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryIdentityProvider {
    accounts: Arc<Mutex<HashMap<String, (String, String)>>>,
}

impl InMemoryIdentityProvider {
    fn handle(local_id: &str, email: &str) -> UserHandle {
        UserHandle {
            local_id: local_id.to_string(),
            email: email.to_string(),
            id_token: format!("local-token-{local_id}"),
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        let guard = self.accounts.lock().expect("identity mutex poisoned");
        match guard.get(email) {
            Some((local_id, stored)) if stored == password => Ok(Self::handle(local_id, email)),
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
        let mut guard = self.accounts.lock().expect("identity mutex poisoned");
        if guard.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        if !email.contains('@') {
            return Err(IdentityError::Rejected("INVALID_EMAIL".to_string()));
        }
        let local_id = format!("local-{:04}", guard.len() + 1);
        guard.insert(email.to_string(), (local_id.clone(), password.to_string()));
        Ok(Self::handle(&local_id, email))
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), IdentityError> {
        let guard = self.accounts.lock().expect("identity mutex poisoned");
        if guard.contains_key(email) {
            Ok(())
        } else {
            Err(IdentityError::Rejected("EMAIL_NOT_FOUND".to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundEmail {
    pub(crate) recipient: String,
    pub(crate) subject: String,
    pub(crate) body: String,
}

/// Keeps outgoing mail in memory instead of relaying it.
#[derive(Debug, Default, Clone)]
pub(crate) struct OutboxMailer {
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl OutboxMailer {
    pub(crate) fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }
}

#[async_trait]
impl ReportMailer for OutboxMailer {
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        if !recipient.contains('@') {
            return Err(NotifyError::InvalidAddress(recipient.to_string()));
        }
        self.outbox
            .lock()
            .expect("outbox mutex poisoned")
            .push(OutboundEmail {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
