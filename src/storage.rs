use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Persisted legacy session: `session; expiration; persistentToken`.
///
/// `expires_at` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub session: String,
    pub expires_at: i64,
    pub refresh: String,
}

impl TokenRecord {
    pub fn is_fresh(&self, now_ms: i64) -> bool { !self.session.is_empty() && self.expires_at > now_ms }
}

impl fmt::Display for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; {}; {}", self.session, self.expires_at, self.refresh)
    }
}

impl FromStr for TokenRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split("; ").collect();
        let [session, expires_at, refresh] = parts.as_slice() else {
            return Err(Error::Auth(format!("malformed token record with {} fields", parts.len())));
        };
        let expires_at = expires_at.parse().map_err(|_| Error::Auth(format!("bad token expiration '{expires_at}'")))?;
        Ok(Self { session: session.to_string(), expires_at, refresh: refresh.to_string() })
    }
}

/// Where legacy sessions are kept between runs, one record per username.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self, username: &str) -> Result<Option<TokenRecord>>;
    async fn save(&self, username: &str, record: &TokenRecord) -> Result<()>;
    async fn remove(&self, username: &str) -> Result<()>;
}
