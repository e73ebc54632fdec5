use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{auth_failure, now_ms, AuthClient, EXPIRY_MARGIN_MS};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::storage::{TokenRecord, TokenStore};

// Sessions issued by /auth/login live for fifteen minutes.
const SESSION_LIFETIME_MS: i64 = 15 * 60 * 1000;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: TokenPair,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    session: String,
    refresh: String,
}

/// Username/password session against `/auth/login`, with an optional persistent token cache.
pub struct LegacyClient {
    http: reqwest::Client,
    api_url: String,
    username: String,
    password: Option<String>,
    store: Option<Arc<dyn TokenStore>>,
    record: Mutex<TokenRecord>,
}

impl LegacyClient {
    /// Reuse a cached session when possible, otherwise refresh or log in.
    pub async fn login(config: &ClientConfig, username: &str, password: Option<&str>, store: Option<Arc<dyn TokenStore>>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        let client = Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.map(str::to_string),
            store,
            record: Mutex::new(TokenRecord { session: String::new(), expires_at: 0, refresh: String::new() }),
        };

        let cached = match &client.store {
            Some(store) => match store.load(username).await {
                Ok(rec) => rec,
                Err(err) => {
                    tracing::warn!(%username, %err, "discarding unreadable cached session");
                    store.remove(username).await?;
                    None
                }
            },
            None => None,
        };
        let record = match cached {
            Some(rec) if rec.is_fresh(now_ms() + EXPIRY_MARGIN_MS) => {
                tracing::debug!(%username, "using cached session");
                rec
            }
            Some(rec) if !rec.refresh.is_empty() => match client.refresh(&rec.refresh).await {
                Ok(rec) => rec,
                Err(err) => {
                    tracing::warn!(%err, "cached refresh token rejected");
                    client.password_login().await?
                }
            },
            _ => client.password_login().await?,
        };
        client.persist(&record).await?;
        *client.record.lock().await = record;
        tracing::info!(%username, "logged in with legacy session");
        Ok(client)
    }

    pub fn username(&self) -> &str { &self.username }

    /// End the session server-side and forget the cached record.
    pub async fn logout(&self) -> Result<()> {
        let session = self.record.lock().await.session.clone();
        let response = self.http.post(format!("{}/auth/logout", self.api_url)).bearer_auth(session).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(auth_failure(status, &body));
        }
        if let Some(store) = &self.store {
            store.remove(&self.username).await?;
        }
        Ok(())
    }

    async fn password_login(&self) -> Result<TokenRecord> {
        let password = self.password.as_deref().ok_or(Error::AuthRequired)?;
        let body = json!({ "username": self.username, "password": password });
        self.token_call("/auth/login", &body).await
    }

    async fn refresh(&self, refresh: &str) -> Result<TokenRecord> {
        self.token_call("/auth/refresh", &json!({ "token": refresh })).await
    }

    async fn token_call(&self, path: &str, body: &Value) -> Result<TokenRecord> {
        let response = self.http.post(format!("{}{}", self.api_url, path)).json(body).send().await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status >= 400 || body.get("result").and_then(Value::as_str) == Some("error") {
            return Err(auth_failure(status, &body));
        }
        let parsed: LoginResponse = serde_json::from_value(body).map_err(|e| Error::Auth(format!("unexpected token response: {e}")))?;
        Ok(TokenRecord { session: parsed.token.session, expires_at: now_ms() + SESSION_LIFETIME_MS, refresh: parsed.token.refresh })
    }

    async fn persist(&self, record: &TokenRecord) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.username, record).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthClient for LegacyClient {
    async fn session_token(&self) -> Result<String> {
        let mut record = self.record.lock().await;
        if record.is_fresh(now_ms() + EXPIRY_MARGIN_MS) {
            return Ok(record.session.clone());
        }
        let next = match self.refresh(&record.refresh).await {
            Ok(next) => next,
            Err(err) if self.password.is_some() => {
                tracing::warn!(%err, "session refresh failed; logging in again");
                self.password_login().await?
            }
            Err(err) => return Err(err),
        };
        self.persist(&next).await?;
        *record = next;
        Ok(record.session.clone())
    }
}
