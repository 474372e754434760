//! Session-scoped authentication in front of the assessment workflow.

pub mod identity;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use identity::{
    classify_provider_message, FirebaseIdentityClient, IdentityError, IdentityProvider,
    UserHandle,
};
pub use router::{auth_error_response, auth_router, auth_status, SessionGate};
pub use service::{normalize_email, AuthError, GateOutcome, Gatekeeper, MIN_PASSWORD_LEN};
pub use session::{
    AuthenticatedUser, MemorySessionStore, Session, SessionId, SessionStore,
    DEFAULT_SESSION_IDLE_TIMEOUT, SESSION_HEADER,
};
