use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

mod secrets;

pub use secrets::{FirebaseConfig, MailConfig, Secrets, DEFAULT_CONTACT_EMAIL};

const DEFAULT_SECRETS_PATH: &str = "secrets.toml";
pub const DEFAULT_MODEL_PATH: &str = "models/heart_attack_model.json";
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
    pub workflow: WorkflowConfig,
    pub session: SessionConfig,
    pub secrets: Secrets,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        let artifact_path = env::var("APP_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let require_patient_name = match env::var("APP_REQUIRE_PATIENT_NAME") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "APP_REQUIRE_PATIENT_NAME",
                value: raw,
            })?,
            Err(_) => false,
        };

        let idle_timeout = match env::var("APP_SESSION_TTL_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidSessionTtl(raw)),
            },
            Err(_) => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        let secrets = load_secrets()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            model: ModelConfig { artifact_path },
            workflow: WorkflowConfig {
                require_patient_name,
            },
            session: SessionConfig { idle_timeout },
            secrets,
        })
    }
}

fn load_secrets() -> Result<Secrets, ConfigError> {
    let file = match env::var("APP_SECRETS_PATH") {
        Ok(path) => Some(read_secrets_file(Path::new(&path))?),
        Err(_) => {
            let fallback = Path::new(DEFAULT_SECRETS_PATH);
            if fallback.exists() {
                Some(read_secrets_file(fallback)?)
            } else {
                None
            }
        }
    };

    let mut secrets = file.unwrap_or_default();
    secrets.apply_env_overrides(|key| env::var(key).ok());
    Ok(secrets.resolve())
}

fn read_secrets_file(path: &Path) -> Result<secrets::SecretsFile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::SecretsUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    secrets::SecretsFile::parse(&raw).map_err(|source| ConfigError::SecretsInvalid {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Output layout of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Location of the pre-trained model artifact.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
}

/// Product switches for the prediction form.
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// When set, a patient name must accompany every assessment.
    pub require_patient_name: bool,
}

/// Lifetime of logged-in sessions held by the server.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidLogFormat(String),
    InvalidFlag {
        name: &'static str,
        value: String,
    },
    InvalidSessionTtl(String),
    SecretsUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    SecretsInvalid {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be a boolean flag, got '{value}'")
            }
            ConfigError::InvalidSessionTtl(value) => {
                write!(
                    f,
                    "APP_SESSION_TTL_SECS must be a positive number of seconds, got '{value}'"
                )
            }
            ConfigError::SecretsUnreadable { path, .. } => {
                write!(f, "unable to read secrets file {}", path.display())
            }
            ConfigError::SecretsInvalid { path, .. } => {
                write!(f, "secrets file {} is not valid TOML", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidSessionTtl(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::SecretsUnreadable { source, .. } => Some(source),
            ConfigError::SecretsInvalid { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "APP_MODEL_PATH",
            "APP_REQUIRE_PATIENT_NAME",
            "APP_SESSION_TTL_SECS",
            "FIREBASE_API_KEY",
            "FIREBASE_DATABASE_URL",
            "FIREBASE_DATABASE_AUTH",
            "EMAIL_GMAIL_USER",
            "EMAIL_GMAIL_PASSWORD",
            "EMAIL_CONTACT_EMAIL",
        ] {
            env::remove_var(key);
        }
        env::set_var("APP_SECRETS_PATH", "/nonexistent/heart-risk-secrets.toml");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::remove_var("APP_SECRETS_PATH");
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(
            config.model.artifact_path,
            PathBuf::from("models/heart_attack_model.json")
        );
        assert!(!config.workflow.require_patient_name);
        assert_eq!(config.session.idle_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn session_ttl_reads_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::remove_var("APP_SECRETS_PATH");
        env::set_var("APP_SESSION_TTL_SECS", "90");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.session.idle_timeout, Duration::from_secs(90));

        for invalid in ["0", "soon"] {
            env::set_var("APP_SESSION_TTL_SECS", invalid);
            assert!(matches!(
                AppConfig::load(),
                Err(ConfigError::InvalidSessionTtl(value)) if value == invalid
            ));
        }
        env::remove_var("APP_SESSION_TTL_SECS");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::remove_var("APP_SECRETS_PATH");
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn explicit_missing_secrets_file_is_fatal() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        match AppConfig::load() {
            Err(ConfigError::SecretsUnreadable { .. }) => {}
            other => panic!("expected unreadable secrets error, got {other:?}"),
        }
        env::remove_var("APP_SECRETS_PATH");
    }

    #[test]
    fn env_overrides_enable_integrations() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::remove_var("APP_SECRETS_PATH");
        env::set_var("FIREBASE_API_KEY", "key-123");
        env::set_var("FIREBASE_DATABASE_URL", "https://heart.example.firebaseio.com/");
        env::set_var("EMAIL_GMAIL_USER", "reports@example.com");
        env::set_var("EMAIL_GMAIL_PASSWORD", "app-password");
        env::set_var("APP_REQUIRE_PATIENT_NAME", "yes");

        let config = AppConfig::load().expect("config loads");
        let firebase = config.secrets.firebase.expect("firebase configured");
        assert_eq!(firebase.api_key, "key-123");
        assert_eq!(
            firebase.database_url.as_deref(),
            Some("https://heart.example.firebaseio.com")
        );
        let mail = config.secrets.mail.expect("mail configured");
        assert_eq!(mail.gmail_user, "reports@example.com");
        assert_eq!(mail.smtp_port, 587);
        assert!(config.workflow.require_patient_name);

        reset_env();
        env::remove_var("APP_SECRETS_PATH");
    }

    #[test]
    fn rejects_unknown_log_format() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::remove_var("APP_SECRETS_PATH");
        env::set_var("APP_LOG_FORMAT", "xml");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidLogFormat(value)) if value == "xml"
        ));
        env::remove_var("APP_LOG_FORMAT");
    }
}
