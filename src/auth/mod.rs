//! Session tokens for authenticated endpoints.
//!
//! An [`AuthClient`] hands out a currently valid bearer token, refreshing it
//! when it is about to expire. Refresh is single-flight per client: callers
//! that find the token stale queue on the same lock, and only the first one
//! talks to the server.

mod legacy;
mod personal;

pub use legacy::LegacyClient;
pub use personal::{PersonalClient, PersonalCredentials};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

/// Tokens are treated as stale this long before the server would reject them.
pub(crate) const EXPIRY_MARGIN_MS: i64 = 30_000;

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// A bearer token valid for at least the next few seconds.
    async fn session_token(&self) -> Result<String>;
}

pub(crate) fn now_ms() -> i64 { chrono::Utc::now().timestamp_millis() }

// Auth endpoints report failures in two shapes: the API's error envelope and
// the identity provider's `{error, error_description}`.
pub(crate) fn auth_failure(status: u16, body: &Value) -> Error {
    if let Some(desc) = body.get("error_description").and_then(Value::as_str) {
        return Error::Auth(desc.to_string());
    }
    if let Some(err) = body.get("error").and_then(Value::as_str) {
        return Error::Auth(err.to_string());
    }
    match crate::network::check_envelope(status.max(400), body.clone()) {
        Err(Error::Api { detail, .. }) => Error::Auth(detail),
        _ => Error::Auth(format!("status {status}")),
    }
}
