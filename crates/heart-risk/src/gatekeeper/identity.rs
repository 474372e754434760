use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::FirebaseConfig;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Account returned by the identity provider after sign-in or sign-up.
#[derive(Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub local_id: String,
    pub email: String,
    pub id_token: String,
}

impl fmt::Debug for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserHandle")
            .field("local_id", &self.local_id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// External email/password identity store.
#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    async fn sign_in_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError>;

    async fn create_user_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError>;

    async fn send_password_reset_email(&self, email: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailExists,
    #[error("password rejected as too weak")]
    WeakPassword,
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Maps an identity toolkit error message (e.g. `WEAK_PASSWORD : Password
/// should be at least 6 characters`) onto the error taxonomy.
pub fn classify_provider_message(message: &str) -> IdentityError {
    let code = message
        .split(|c: char| c == ':' || c.is_whitespace())
        .find(|part| !part.is_empty())
        .unwrap_or_default();
    match code {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "WEAK_PASSWORD" => IdentityError::WeakPassword,
        "" => IdentityError::Rejected("unknown error".to_string()),
        other => IdentityError::Rejected(other.to_string()),
    }
}

/// Firebase Identity Toolkit REST client.
#[derive(Clone)]
pub struct FirebaseIdentityClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirebaseIdentityClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: IDENTITY_TOOLKIT_URL.to_string(),
        }
    }

    pub fn from_config(client: Client, config: &FirebaseConfig) -> Self {
        Self::new(client, config.api_key.clone())
    }

    /// Points the client at another endpoint, such as the auth emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str) -> Result<Url, IdentityError> {
        Url::parse_with_params(
            &format!("{}/accounts:{}", self.base_url, method),
            &[("key", self.api_key.as_str())],
        )
        .map_err(|err| IdentityError::Transport(err.to_string()))
    }

    async fn call<T>(&self, method: &str, payload: serde_json::Value) -> Result<T, IdentityError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.endpoint(method)?)
            .json(&payload)
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| IdentityError::Transport(err.to_string()));
        }

        if status.is_server_error() {
            return Err(IdentityError::Transport(format!("status {status}")));
        }

        let body: ProviderErrorBody = response
            .json()
            .await
            .map_err(|_| IdentityError::Rejected(format!("status {status}")))?;
        Err(classify_provider_message(&body.error.message))
    }
}

impl fmt::Debug for FirebaseIdentityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseIdentityClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
}

impl AccountResponse {
    fn into_handle(self, fallback_email: &str) -> UserHandle {
        let email = if self.email.is_empty() {
            fallback_email.to_string()
        } else {
            self.email
        };
        UserHandle {
            local_id: self.local_id,
            email,
            id_token: self.id_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OobResponse {}

#[async_trait]
impl IdentityProvider for FirebaseIdentityClient {
    async fn sign_in_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        let account: AccountResponse = self
            .call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(account.into_handle(email))
    }

    async fn create_user_with_email_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserHandle, IdentityError> {
        let account: AccountResponse = self
            .call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(account.into_handle(email))
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), IdentityError> {
        let _: OobResponse = self
            .call(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }
}
