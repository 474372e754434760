use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::observation::PatientObservation;
use super::predictor::RiskLabel;
use crate::config::FirebaseConfig;

/// Collection every prediction is appended to.
pub const PATIENTS_COLLECTION: &str = "Patients_Analysis";

/// Database-generated identifier of an appended record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushId(pub String);

impl fmt::Display for PushId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row written once per successful prediction. Field names match the
/// existing `Patients_Analysis` documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(rename = "PatientName", skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(rename = "Age")]
    pub age: u16,
    #[serde(rename = "Sex")]
    pub sex: String,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: u16,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: u16,
    #[serde(rename = "HeartRate")]
    pub heart_rate: u16,
    #[serde(rename = "Prediction")]
    pub prediction: String,
    #[serde(rename = "Doctor_Email")]
    pub submitter_email: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

impl PatientRecord {
    pub fn new(
        observation: &PatientObservation,
        label: RiskLabel,
        submitter_email: &str,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            patient_name: observation.patient_name().map(str::to_string),
            age: observation.age,
            sex: observation.sex.label().to_string(),
            blood_pressure: observation.resting_blood_pressure,
            cholesterol: observation.cholesterol,
            heart_rate: observation.max_heart_rate,
            prediction: label.summary().to_string(),
            submitter_email: submitter_email.to_string(),
            timestamp: recorded_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

/// Append-only store for prediction records.
#[async_trait]
pub trait RecordSink: Send + Sync + fmt::Debug {
    async fn push(&self, collection: &str, record: &PatientRecord)
        -> Result<PushId, PersistenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("invalid database url: {0}")]
    InvalidUrl(String),
    #[error("database request failed: {0}")]
    Transport(String),
    #[error("database rejected write with status {status}")]
    Rejected { status: u16 },
    #[error("database response did not contain a push id")]
    MalformedResponse,
}

/// Realtime Database REST client: `POST <root>/<collection>.json`.
#[derive(Clone)]
pub struct FirebaseRecordSink {
    client: Client,
    database_url: String,
    auth: Option<String>,
}

impl FirebaseRecordSink {
    pub fn new(client: Client, database_url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            client,
            database_url: database_url.into(),
            auth,
        }
    }

    /// `None` when no database URL is configured.
    pub fn from_config(client: Client, config: &FirebaseConfig) -> Option<Self> {
        config
            .database_url
            .as_ref()
            .map(|url| Self::new(client, url.clone(), config.database_auth.clone()))
    }

    fn collection_url(&self, collection: &str) -> Result<Url, PersistenceError> {
        let base = format!(
            "{}/{}.json",
            self.database_url.trim_end_matches('/'),
            collection
        );
        let parsed = match &self.auth {
            Some(token) => Url::parse_with_params(&base, &[("auth", token.as_str())]),
            None => Url::parse(&base),
        };
        parsed.map_err(|err| PersistenceError::InvalidUrl(err.to_string()))
    }
}

impl fmt::Debug for FirebaseRecordSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseRecordSink")
            .field("database_url", &self.database_url)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: Option<String>,
}

#[async_trait]
impl RecordSink for FirebaseRecordSink {
    async fn push(
        &self,
        collection: &str,
        record: &PatientRecord,
    ) -> Result<PushId, PersistenceError> {
        let url = self.collection_url(collection)?;
        let response = self
            .client
            .post(url)
            .json(record)
            .send()
            .await
            .map_err(|err| PersistenceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersistenceError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: PushResponse = response
            .json()
            .await
            .map_err(|_| PersistenceError::MalformedResponse)?;
        let id = body
            .name
            .filter(|name| !name.is_empty())
            .ok_or(PersistenceError::MalformedResponse)?;
        debug!(collection, push_id = %id, "record appended");
        Ok(PushId(id))
    }
}

/// Builds and appends one record per prediction.
#[derive(Debug, Clone)]
pub struct PredictionRecorder {
    sink: Arc<dyn RecordSink>,
    collection: String,
}

impl PredictionRecorder {
    pub fn new(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            sink,
            collection: PATIENTS_COLLECTION.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// No idempotency key is sent: resubmitting the same observation
    /// appends a second record.
    pub async fn record_prediction(
        &self,
        observation: &PatientObservation,
        label: RiskLabel,
        submitter_email: &str,
    ) -> Result<PushId, PersistenceError> {
        let record = PatientRecord::new(observation, label, submitter_email, Utc::now());
        self.sink.push(&self.collection, &record).await
    }
}
