//! Request context carrying the authenticated principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vault_core::traits::Principal;

/// Context for the current authenticated request.
///
/// Built by the transport layer from a verified [`Principal`] and passed
/// into service methods so that every operation knows who is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: i64,
    /// The username.
    pub username: String,
    /// IP address of the request origin.
    pub ip_address: String,
    /// User-Agent header value.
    pub user_agent: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(
        principal: Principal,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            user_id: principal.user_id,
            username: principal.username,
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
            request_time: Utc::now(),
        }
    }

    /// A context with no transport metadata, for internal callers and tests.
    pub fn for_principal(principal: Principal) -> Self {
        Self::new(principal, "", "")
    }
}
