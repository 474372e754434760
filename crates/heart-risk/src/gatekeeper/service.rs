use std::sync::Arc;

use tracing::{info, warn};

use super::identity::{IdentityError, IdentityProvider};
use super::session::{AuthenticatedUser, Session};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const LOGIN_SUCCESS: &str = "Logged in successfully!";
pub const SIGNUP_SUCCESS: &str = "Account created!";
pub const RESET_SENT: &str = "Password reset email has been sent!";
pub const LOGGED_OUT: &str = "Logged out.";

/// User-facing authentication failures. Provider details never leak into
/// these messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Please enter both email and password")]
    MissingCredentials,
    #[error("Please enter your email address")]
    MissingEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Invalid email or password. Try again.")]
    InvalidCredentials,
    #[error("This email is already registered.")]
    EmailExists,
    #[error("Password must be at least 6 characters.")]
    WeakPassword,
    #[error("Signup failed. Check email format.")]
    SignupFailed,
    #[error("Reset failed. Please check the email address.")]
    ResetFailed,
    #[error("Authentication is currently unavailable.")]
    Unavailable,
    #[error("You are already logged in. Log out first.")]
    AlreadyLoggedIn,
    #[error("Please log in to continue.")]
    NotLoggedIn,
}

/// Session after a gatekeeper operation, plus the notice to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub session: Session,
    pub result: Result<&'static str, AuthError>,
}

impl GateOutcome {
    fn accepted(session: Session, notice: &'static str) -> Self {
        Self {
            session,
            result: Ok(notice),
        }
    }

    fn rejected(session: Session, error: AuthError) -> Self {
        Self {
            session,
            result: Err(error),
        }
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Login/signup/reset/logout state machine over [`Session`].
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl Gatekeeper {
    pub fn new(identity: Option<Arc<dyn IdentityProvider>>) -> Self {
        Self { identity }
    }

    pub fn is_available(&self) -> bool {
        self.identity.is_some()
    }

    pub async fn login(&self, session: Session, email: &str, password: &str) -> GateOutcome {
        if session.is_logged_in() {
            return GateOutcome::rejected(session, AuthError::AlreadyLoggedIn);
        }
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return GateOutcome::rejected(session, AuthError::MissingCredentials);
        }
        let Some(identity) = self.identity.as_ref() else {
            return GateOutcome::rejected(session, AuthError::Unavailable);
        };

        match identity.sign_in_with_email_password(&email, password).await {
            Ok(user) => {
                info!(user_id = %user.local_id, "user logged in");
                GateOutcome::accepted(
                    Session::LoggedIn(AuthenticatedUser { user, email }),
                    LOGIN_SUCCESS,
                )
            }
            Err(err) => {
                warn!(error = %err, "login rejected");
                GateOutcome::rejected(session, AuthError::InvalidCredentials)
            }
        }
    }

    pub async fn signup(&self, session: Session, email: &str, password: &str) -> GateOutcome {
        if session.is_logged_in() {
            return GateOutcome::rejected(session, AuthError::AlreadyLoggedIn);
        }
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return GateOutcome::rejected(session, AuthError::MissingCredentials);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return GateOutcome::rejected(session, AuthError::PasswordTooShort);
        }
        let Some(identity) = self.identity.as_ref() else {
            return GateOutcome::rejected(session, AuthError::Unavailable);
        };

        if let Err(err) = identity.create_user_with_email_password(&email, password).await {
            warn!(error = %err, "signup rejected");
            let error = match err {
                IdentityError::EmailExists => AuthError::EmailExists,
                IdentityError::WeakPassword => AuthError::WeakPassword,
                IdentityError::Rejected(_) | IdentityError::Transport(_) => {
                    AuthError::SignupFailed
                }
            };
            return GateOutcome::rejected(session, error);
        }

        match identity.sign_in_with_email_password(&email, password).await {
            Ok(user) => {
                info!(user_id = %user.local_id, "account created");
                GateOutcome::accepted(
                    Session::LoggedIn(AuthenticatedUser { user, email }),
                    SIGNUP_SUCCESS,
                )
            }
            Err(err) => {
                warn!(error = %err, "sign-in after signup failed");
                GateOutcome::rejected(session, AuthError::SignupFailed)
            }
        }
    }

    pub async fn reset_password(&self, session: Session, email: &str) -> GateOutcome {
        if session.is_logged_in() {
            return GateOutcome::rejected(session, AuthError::AlreadyLoggedIn);
        }
        let email = normalize_email(email);
        if email.is_empty() {
            return GateOutcome::rejected(session, AuthError::MissingEmail);
        }
        let Some(identity) = self.identity.as_ref() else {
            return GateOutcome::rejected(session, AuthError::Unavailable);
        };

        match identity.send_password_reset_email(&email).await {
            Ok(()) => GateOutcome::accepted(session, RESET_SENT),
            Err(err) => {
                warn!(error = %err, "password reset failed");
                GateOutcome::rejected(session, AuthError::ResetFailed)
            }
        }
    }

    pub fn logout(&self, session: Session) -> GateOutcome {
        if let Some(user) = session.user() {
            info!(user_id = %user.user.local_id, "user logged out");
        }
        GateOutcome::accepted(Session::LoggedOut, LOGGED_OUT)
    }
}
