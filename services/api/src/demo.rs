use crate::infra::{InMemoryIdentityProvider, InMemoryRecordSink, OutboxMailer};
use clap::Args;
use heart_risk::assessment::{
    encode, ChestPainType, LazyRiskModel, LogisticRiskModel, PatientObservation,
    PersistenceStatus, PredictionRecorder, PredictionWorkflow, RestingEcg, ResultNotifier,
    RiskModel, RiskTier, Sex, StSlope, ThalliumResult, FEATURE_NAMES,
};
use heart_risk::config::{AppConfig, DEFAULT_MODEL_PATH};
use heart_risk::error::AppError;
use heart_risk::gatekeeper::{Gatekeeper, Session};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Model artifact to score with (defaults to the bundled artifact).
    #[arg(long)]
    pub(crate) model_path: Option<PathBuf>,
    /// Email used for the demo account.
    #[arg(long, default_value = "demo.clinician@example.org")]
    pub(crate) email: String,
    /// Print the composed result email.
    #[arg(long)]
    pub(crate) show_email: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ModelCheckArgs {
    /// Artifact to check instead of the configured APP_MODEL_PATH.
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,
}

pub(crate) fn reference_patient() -> PatientObservation {
    PatientObservation {
        patient_name: Some("Demo Patient".to_string()),
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

fn demo_model_path(requested: Option<PathBuf>) -> PathBuf {
    requested.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
}

pub(crate) fn run_model_check(args: ModelCheckArgs) -> Result<(), AppError> {
    let path = match args.path {
        Some(path) => path,
        None => AppConfig::load()?.model.artifact_path,
    };

    let model = LogisticRiskModel::load(&path)?;
    let features = encode(&reference_patient());
    let probability = model.predict_probability(&features)?;

    println!("Model artifact: {}", path.display());
    println!("- id: {}", model.version());
    println!("- features: {}", FEATURE_NAMES.join(", "));
    println!(
        "- reference patient: {:.1}% ({} risk tier)",
        probability * 100.0,
        RiskTier::from_probability(probability).label()
    );
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        model_path,
        email,
        show_email,
    } = args;

    let model = Arc::new(LazyRiskModel::new(demo_model_path(model_path)));
    model.ensure_present()?;

    let sink = InMemoryRecordSink::default();
    let mailer = OutboxMailer::default();
    let gatekeeper = Gatekeeper::new(Some(Arc::new(InMemoryIdentityProvider::default())));
    let workflow = PredictionWorkflow::new(model)
        .with_recorder(Some(PredictionRecorder::new(Arc::new(sink.clone()))))
        .with_notifier(Some(ResultNotifier::new(Arc::new(mailer.clone()))));

    println!("Heart attack risk demo (offline providers)");

    let rejected = gatekeeper.signup(Session::LoggedOut, &email, "12345").await;
    if let Err(err) = rejected.result {
        println!("- Signup with a 5-character password: {err}");
    }

    let created = gatekeeper
        .signup(Session::LoggedOut, &email, "demo-password")
        .await;
    let session = match created.result {
        Ok(notice) => {
            println!("- {notice}");
            created.session
        }
        Err(err) => {
            println!("  Signup failed: {err}");
            return Ok(());
        }
    };
    let Some(user) = session.user().cloned() else {
        println!("  Signup did not open a session");
        return Ok(());
    };
    println!("- Logged in as {}", user.email);

    let patient = reference_patient();
    let outcome = match workflow.run(&user, &patient).await {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Assessment unavailable: {err}");
            return Ok(());
        }
    };

    let assessment = &outcome.assessment;
    println!("\nAssessment (model {})", assessment.model_version);
    for (name, value) in FEATURE_NAMES.iter().zip(assessment.features.iter()) {
        println!("  {name:>9} = {value}");
    }
    println!("{}", assessment.result_text);

    match &outcome.persistence {
        PersistenceStatus::Saved { record_id } => println!("- Record saved as {record_id}"),
        PersistenceStatus::Failed { reason } => println!("- Record not saved: {reason}"),
        PersistenceStatus::Disabled => println!("- Record storage disabled"),
    }
    for stored in sink.records() {
        match serde_json::to_string_pretty(&stored.record) {
            Ok(json) => println!("  {}/{}:\n{}", stored.collection, stored.id, json),
            Err(err) => println!("  Record payload unavailable: {err}"),
        }
    }

    let outbox = mailer.outbox();
    println!("- Result email: {:?} ({} queued)", outcome.email, outbox.len());
    if show_email {
        for message in outbox {
            println!(
                "  To: {}\n  Subject: {}\n\n{}",
                message.recipient, message.subject, message.body
            );
        }
    }

    let closed = gatekeeper.logout(session);
    if let Ok(notice) = closed.result {
        println!("- {notice}");
    }

    Ok(())
}
