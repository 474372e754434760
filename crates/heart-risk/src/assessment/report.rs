//! Human-readable result text shared by the API response and the email report.

use super::predictor::{RiskLabel, RiskTier};

pub const LOW_RISK_MESSAGE: &str =
    "Congratulation! The probability of having a heart attack is low.";
pub const HIGH_RISK_MESSAGE: &str =
    "Warning! High chance of heart attack detected. Please consult a doctor immediately.";

pub const EMAIL_SENDER_NAME: &str = "Heart Attack App";
pub const EMAIL_SUBJECT: &str = "Your Heart Attack Risk Prediction Result";

pub fn result_message(label: RiskLabel) -> &'static str {
    match label {
        RiskLabel::Low => LOW_RISK_MESSAGE,
        RiskLabel::High => HIGH_RISK_MESSAGE,
    }
}

/// Result line plus the probability estimate, as it appears in the report.
pub fn result_text(label: RiskLabel, probability: f64, tier: RiskTier) -> String {
    format!(
        "{}\nEstimated probability: {:.1}% ({} risk tier)",
        result_message(label),
        probability * 100.0,
        tier.label()
    )
}

pub fn email_body(result_text: &str) -> String {
    format!(
        "Hello,

Thank you for using the Heart Attack Prediction App!

Your prediction result:
{result_text}

DISCLAIMER: This is an AI-powered tool for informational purposes only.
It is not a substitute for professional medical advice.

Stay healthy!

--
Heart Attack Prediction App
"
    )
}
