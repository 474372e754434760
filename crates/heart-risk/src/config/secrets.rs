//! Structured secrets: the `[firebase]` and `[email]` sections of the secrets
//! file, layered with environment overrides.

use std::fmt;

use serde::Deserialize;

/// Contact address used when `email.contact_email` is not configured.
pub const DEFAULT_CONTACT_EMAIL: &str = "contact@heart-risk.example";

const GMAIL_SMTP_HOST: &str = "smtp.gmail.com";
const GMAIL_SMTP_PORT: u16 = 587;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SecretsFile {
    #[serde(default)]
    firebase: FirebaseSection,
    #[serde(default)]
    email: EmailSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirebaseSection {
    api_key: Option<String>,
    auth_domain: Option<String>,
    #[serde(rename = "databaseURL")]
    database_url: Option<String>,
    project_id: Option<String>,
    database_auth: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailSection {
    gmail_user: Option<String>,
    gmail_password: Option<String>,
    contact_email: Option<String>,
}

impl SecretsFile {
    pub(crate) fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub(crate) fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut Option<String>); 6] = [
            ("FIREBASE_API_KEY", &mut self.firebase.api_key),
            ("FIREBASE_DATABASE_URL", &mut self.firebase.database_url),
            ("FIREBASE_DATABASE_AUTH", &mut self.firebase.database_auth),
            ("EMAIL_GMAIL_USER", &mut self.email.gmail_user),
            ("EMAIL_GMAIL_PASSWORD", &mut self.email.gmail_password),
            ("EMAIL_CONTACT_EMAIL", &mut self.email.contact_email),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }
    }

    pub(crate) fn resolve(self) -> Secrets {
        let SecretsFile { firebase, email } = self;

        let firebase = non_empty(firebase.api_key).map(|api_key| FirebaseConfig {
            api_key,
            auth_domain: non_empty(firebase.auth_domain),
            database_url: non_empty(firebase.database_url)
                .map(|url| url.trim_end_matches('/').to_string()),
            project_id: non_empty(firebase.project_id),
            database_auth: non_empty(firebase.database_auth),
        });

        let mail = match (non_empty(email.gmail_user), non_empty(email.gmail_password)) {
            (Some(gmail_user), Some(gmail_password)) => Some(MailConfig {
                gmail_user,
                gmail_password,
                smtp_host: GMAIL_SMTP_HOST.to_string(),
                smtp_port: GMAIL_SMTP_PORT,
            }),
            _ => None,
        };

        let contact_email =
            non_empty(email.contact_email).unwrap_or_else(|| DEFAULT_CONTACT_EMAIL.to_string());

        Secrets {
            firebase,
            mail,
            contact_email,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolved secrets. Integrations whose credentials are missing stay `None`.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub firebase: Option<FirebaseConfig>,
    pub mail: Option<MailConfig>,
    pub contact_email: String,
}

impl Default for Secrets {
    fn default() -> Self {
        SecretsFile::default().resolve()
    }
}

/// Identity toolkit and realtime database settings.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: Option<String>,
    /// Realtime database root, without a trailing slash.
    pub database_url: Option<String>,
    pub project_id: Option<String>,
    /// Token appended as `auth=` to database writes.
    pub database_auth: Option<String>,
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("auth_domain", &self.auth_domain)
            .field("database_url", &self.database_url)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

/// Outbound mail relay credentials.
#[derive(Clone)]
pub struct MailConfig {
    pub gmail_user: String,
    pub gmail_password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("gmail_user", &self.gmail_user)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish_non_exhaustive()
    }
}
