use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{auth_failure, now_ms, AuthClient, EXPIRY_MARGIN_MS};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Credentials of a MangaDex personal API client.
#[derive(Debug, Clone)]
pub struct PersonalCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 { 900 }

// `expires_in` is server-supplied seconds.
fn expiry_from(now_ms: i64, expires_in: i64) -> i64 { now_ms.saturating_add(expires_in.saturating_mul(1000)) }

#[derive(Debug, Clone)]
struct Session {
    access: String,
    refresh: String,
    expires_at: i64,
}

/// OAuth2 password-grant client against the MangaDex identity provider.
pub struct PersonalClient {
    http: reqwest::Client,
    token_url: String,
    credentials: PersonalCredentials,
    session: Mutex<Option<Session>>,
}

impl PersonalClient {
    /// Log in immediately; fails with [`Error::Auth`] on rejected credentials.
    pub async fn login(config: &ClientConfig, credentials: PersonalCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let client = Self { http, token_url: config.auth_url.clone(), credentials, session: Mutex::new(None) };
        let session = client.password_grant().await?;
        *client.session.lock().await = Some(session);
        tracing::info!(username = %client.credentials.username, "logged in with personal client");
        Ok(client)
    }

    pub fn username(&self) -> &str { &self.credentials.username }

    async fn password_grant(&self) -> Result<Session> {
        let c = &self.credentials;
        self.token_request(&[
            ("grant_type", "password"),
            ("username", c.username.as_str()),
            ("password", c.password.as_str()),
            ("client_id", c.client_id.as_str()),
            ("client_secret", c.client_secret.as_str()),
        ])
        .await
    }

    async fn refresh_grant(&self, refresh: &str) -> Result<Session> {
        let c = &self.credentials;
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", c.client_id.as_str()),
            ("client_secret", c.client_secret.as_str()),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<Session> {
        let response = self.http.post(&self.token_url).form(form).send().await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status >= 400 {
            return Err(auth_failure(status, &body));
        }
        let token: TokenResponse = serde_json::from_value(body).map_err(|e| Error::Auth(format!("unexpected token response: {e}")))?;
        Ok(Session { access: token.access_token, refresh: token.refresh_token, expires_at: expiry_from(now_ms(), token.expires_in) })
    }
}

#[async_trait]
impl AuthClient for PersonalClient {
    async fn session_token(&self) -> Result<String> {
        let mut guard = self.session.lock().await;
        if let Some(s) = guard.as_ref() {
            if s.expires_at.saturating_sub(EXPIRY_MARGIN_MS) > now_ms() {
                return Ok(s.access.clone());
            }
        }
        let next = match guard.take() {
            Some(stale) => match self.refresh_grant(&stale.refresh).await {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(%err, "token refresh failed; logging in again");
                    self.password_grant().await?
                }
            },
            None => self.password_grant().await?,
        };
        tracing::info!(username = %self.credentials.username, "refreshed session token");
        let access = next.access.clone();
        *guard = Some(next);
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_saturates_on_huge_lifetimes() {
        assert_eq!(expiry_from(1_000, 900), 901_000);
        assert_eq!(expiry_from(1_000, i64::MAX), i64::MAX);
        assert_eq!(expiry_from(i64::MAX - 5, 10), i64::MAX);
    }
}
