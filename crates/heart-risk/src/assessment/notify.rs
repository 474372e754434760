use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use super::report::{email_body, EMAIL_SENDER_NAME, EMAIL_SUBJECT};
use crate::config::MailConfig;

/// Outbound mail transport.
#[async_trait]
pub trait ReportMailer: Send + Sync + fmt::Debug {
    async fn deliver(&self, recipient: &str, subject: &str, body: &str)
        -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid email address '{0}'")]
    InvalidAddress(String),
    #[error("unable to compose message: {0}")]
    Compose(String),
    #[error("mail relay error: {0}")]
    Relay(String),
}

/// STARTTLS submission through an authenticated relay.
pub struct SmtpReportMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpReportMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        let address: Address = config
            .gmail_user
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(config.gmail_user.clone()))?;
        let sender = Mailbox::new(Some(EMAIL_SENDER_NAME.to_string()), address);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|err| NotifyError::Relay(err.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.gmail_user.clone(),
                config.gmail_password.clone(),
            ))
            .build();

        Ok(Self { transport, sender })
    }
}

impl fmt::Debug for SmtpReportMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpReportMailer")
            .field("sender", &self.sender.to_string())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReportMailer for SmtpReportMailer {
    async fn deliver(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(recipient.to_string()))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|err| NotifyError::Compose(err.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|err| NotifyError::Relay(err.to_string()))?;
        Ok(())
    }
}

/// Sends the fixed-template result email. Delivery is best-effort: every
/// failure is logged and collapsed into `false`.
#[derive(Debug, Clone)]
pub struct ResultNotifier {
    mailer: Arc<dyn ReportMailer>,
}

impl ResultNotifier {
    pub fn new(mailer: Arc<dyn ReportMailer>) -> Self {
        Self { mailer }
    }

    pub async fn send_report(&self, recipient: &str, message: &str) -> bool {
        let body = email_body(message);
        match self.mailer.deliver(recipient, EMAIL_SUBJECT, &body).await {
            Ok(()) => {
                info!(recipient, "result email sent");
                true
            }
            Err(err) => {
                warn!(recipient, error = %err, "result email failed");
                false
            }
        }
    }
}
