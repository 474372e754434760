use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::service_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use heart_risk::assessment::{
    FirebaseRecordSink, LazyRiskModel, PredictionRecorder, PredictionWorkflow, ResultNotifier,
    SmtpReportMailer,
};
use heart_risk::catalog::Catalog;
use heart_risk::config::AppConfig;
use heart_risk::error::AppError;
use heart_risk::gatekeeper::{
    FirebaseIdentityClient, Gatekeeper, IdentityProvider, MemorySessionStore, SessionGate,
};
use heart_risk::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Long-lived handles shared by every request.
pub(crate) struct Components {
    pub(crate) gate: SessionGate,
    pub(crate) workflow: Arc<PredictionWorkflow>,
    pub(crate) catalog: Arc<Catalog>,
}

pub(crate) fn build_components(
    config: &AppConfig,
    model: Arc<LazyRiskModel>,
    client: reqwest::Client,
) -> Components {
    let secrets = &config.secrets;

    let identity = secrets.firebase.as_ref().map(|firebase| {
        Arc::new(FirebaseIdentityClient::from_config(client.clone(), firebase))
            as Arc<dyn IdentityProvider>
    });
    if identity.is_none() {
        warn!("firebase settings missing; authentication disabled");
    }

    let recorder = secrets
        .firebase
        .as_ref()
        .and_then(|firebase| FirebaseRecordSink::from_config(client.clone(), firebase))
        .map(|sink| PredictionRecorder::new(Arc::new(sink)));
    if recorder.is_none() {
        warn!("database url missing; predictions will not be recorded");
    }

    let notifier = match secrets.mail.as_ref().map(SmtpReportMailer::from_config) {
        Some(Ok(mailer)) => Some(ResultNotifier::new(Arc::new(mailer))),
        Some(Err(err)) => {
            warn!(error = %err, "mail relay misconfigured; result emails disabled");
            None
        }
        None => {
            warn!("email settings missing; result emails disabled");
            None
        }
    };

    let require_patient_name = config.workflow.require_patient_name;
    let workflow = PredictionWorkflow::new(model)
        .with_recorder(recorder)
        .with_notifier(notifier)
        .require_patient_name(require_patient_name);

    let gate = SessionGate::new(
        Arc::new(Gatekeeper::new(identity)),
        Arc::new(MemorySessionStore::with_idle_timeout(
            config.session.idle_timeout,
        )),
    );

    Components {
        gate,
        workflow: Arc::new(workflow),
        catalog: Arc::new(Catalog::new(&secrets.contact_email, require_patient_name)),
    }
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let model = Arc::new(LazyRiskModel::new(&config.model.artifact_path));
    model.ensure_present()?;

    let Components {
        gate,
        workflow,
        catalog,
    } = build_components(&config, model.clone(), reqwest::Client::new());

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        model,
    };

    let app = service_router(gate, workflow, catalog)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        model = %config.model.artifact_path.display(),
        "heart risk service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heart_risk::config::{
        AppEnvironment, FirebaseConfig, LogFormat, MailConfig, ModelConfig, Secrets,
        ServerConfig, SessionConfig, TelemetryConfig, WorkflowConfig, DEFAULT_MODEL_PATH,
    };
    use std::path::PathBuf;
    use std::time::Duration;

    fn config(secrets: Secrets) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
                log_format: LogFormat::Compact,
            },
            model: ModelConfig {
                artifact_path: PathBuf::from(DEFAULT_MODEL_PATH),
            },
            workflow: WorkflowConfig {
                require_patient_name: true,
            },
            session: SessionConfig {
                idle_timeout: Duration::from_secs(1800),
            },
            secrets,
        }
    }

    #[test]
    fn missing_secrets_disable_provider_backed_features() {
        let config = config(Secrets {
            contact_email: "desk@example.org".to_string(),
            ..Secrets::default()
        });
        let model = Arc::new(LazyRiskModel::new(&config.model.artifact_path));

        let components = build_components(&config, model, reqwest::Client::new());

        assert!(!components.gate.gatekeeper().is_available());
        assert_eq!(
            components.catalog.contact.action,
            "https://formsubmit.co/desk@example.org"
        );
    }

    #[tokio::test]
    async fn configured_secrets_enable_authentication() {
        let config = config(Secrets {
            firebase: Some(FirebaseConfig {
                api_key: "AIza-test".to_string(),
                auth_domain: None,
                database_url: Some("https://heart-risk-test.firebaseio.com".to_string()),
                project_id: None,
                database_auth: None,
            }),
            mail: Some(MailConfig {
                gmail_user: "reports@example.org".to_string(),
                gmail_password: "app-password".to_string(),
                smtp_host: "smtp.gmail.com".to_string(),
                smtp_port: 587,
            }),
            contact_email: "desk@example.org".to_string(),
        });
        let model = Arc::new(LazyRiskModel::new(&config.model.artifact_path));

        let components = build_components(&config, model, reqwest::Client::new());

        assert!(components.gate.gatekeeper().is_available());
        assert!(components.catalog.form.field("patient_name").is_some());
    }
}
