use serde::Serialize;

pub const FORM_SUBMIT_BASE: &str = "https://formsubmit.co";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlossaryEntry {
    pub term: &'static str,
    pub definition: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreventionTip {
    pub title: &'static str,
    pub detail: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub source: &'static str,
}

/// Educational material shown next to the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightContent {
    pub title: &'static str,
    pub glossary: Vec<GlossaryEntry>,
    pub prevention_tips: Vec<PreventionTip>,
    pub media: Vec<MediaRef>,
}

impl InsightContent {
    pub fn heart_health() -> Self {
        Self {
            title: "Heart Health Insights",
            glossary: vec![
                GlossaryEntry {
                    term: "Angina",
                    definition: "Chest pain caused by reduced blood flow to the heart.",
                },
                GlossaryEntry {
                    term: "Oldpeak (ST Depression)",
                    definition: "A technical finding on an ECG trace indicating heart stress \
                                 during exercise.",
                },
                GlossaryEntry {
                    term: "Thallium Test",
                    definition: "A scan that shows how well blood flows into your heart muscle.",
                },
                GlossaryEntry {
                    term: "Major Vessels",
                    definition: "The main blood vessels supplying the heart. Seeing fewer on a \
                                 scan may indicate blockages.",
                },
            ],
            prevention_tips: vec![
                PreventionTip {
                    title: "Stop smoking",
                    detail: "Even 1-2 cigarettes a day increases risk.",
                },
                PreventionTip {
                    title: "Eat Healthy",
                    detail: "More fruits and vegetables.",
                },
                PreventionTip {
                    title: "Move More",
                    detail: "Physical activity is key.",
                },
            ],
            media: vec![
                MediaRef {
                    kind: MediaKind::Image,
                    source: "Media/info1.jpg",
                },
                MediaRef {
                    kind: MediaKind::Video,
                    source: "https://www.youtube.com/watch?v=p6RJvWMgy5w",
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactField {
    pub name: &'static str,
    pub input: &'static str,
    pub placeholder: &'static str,
    pub required: bool,
}

/// Third-party form-submission target that relays messages to the
/// configured contact address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactForm {
    pub heading: &'static str,
    pub action: String,
    pub method: &'static str,
    pub hidden: Vec<(&'static str, &'static str)>,
    pub fields: Vec<ContactField>,
    pub submit_label: &'static str,
}

impl ContactForm {
    pub fn new(contact_email: &str) -> Self {
        Self {
            heading: "Contact Us",
            action: format!("{FORM_SUBMIT_BASE}/{}", contact_email.trim()),
            method: "POST",
            hidden: vec![("_captcha", "false")],
            fields: vec![
                ContactField {
                    name: "name",
                    input: "text",
                    placeholder: "Your name",
                    required: true,
                },
                ContactField {
                    name: "email",
                    input: "email",
                    placeholder: "Your email",
                    required: true,
                },
                ContactField {
                    name: "message",
                    input: "textarea",
                    placeholder: "Your message",
                    required: false,
                },
            ],
            submit_label: "Send Message",
        }
    }
}
