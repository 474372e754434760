//! Static content served to the client: form layout, insight material and
//! the contact form.

pub mod content;
pub mod form;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

pub use content::{ContactForm, GlossaryEntry, InsightContent, MediaKind, MediaRef, PreventionTip};
pub use form::{ChoiceOption, FieldInput, FormField, FormSchema, FormSection};

#[derive(Debug, Clone)]
pub struct Catalog {
    pub form: FormSchema,
    pub insight: InsightContent,
    pub contact: ContactForm,
}

impl Catalog {
    pub fn new(contact_email: &str, require_patient_name: bool) -> Self {
        Self {
            form: FormSchema::heart_risk(require_patient_name),
            insight: InsightContent::heart_health(),
            contact: ContactForm::new(contact_email),
        }
    }
}

pub fn catalog_router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/api/v1/form", get(form_handler))
        .route("/api/v1/insight", get(insight_handler))
        .route("/api/v1/contact", get(contact_handler))
        .with_state(catalog)
}

async fn form_handler(State(catalog): State<Arc<Catalog>>) -> Json<FormSchema> {
    Json(catalog.form.clone())
}

async fn insight_handler(State(catalog): State<Arc<Catalog>>) -> Json<InsightContent> {
    Json(catalog.insight.clone())
}

async fn contact_handler(State(catalog): State<Arc<Catalog>>) -> Json<ContactForm> {
    Json(catalog.contact.clone())
}
