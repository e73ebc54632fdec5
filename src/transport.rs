use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::network::{check_envelope, ApiRequest, RequestBody, Transport};

/// [`Transport`] over HTTPS with reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    rate_limit: Duration,
    slow_warn: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url).map_err(|e| Error::Config(format!("api_url '{}': {e}", config.api_url)))?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            slow_warn: Duration::from_millis(config.slow_warn_ms),
            last_call: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    pub(crate) fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), request.path);
        let mut url = Url::parse(&joined).map_err(|e| Error::Config(format!("bad request path '{}': {e}", request.path)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.pairs().iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    // Keep at least `rate_limit` between consecutive requests.
    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.rate_limit {
                tokio::time::sleep(self.rate_limit - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn warn_if_slow(&self, start: Instant, request: &ApiRequest) {
        let elapsed = start.elapsed();
        if elapsed > self.slow_warn {
            tracing::warn!(method = %request.method, path = %request.path, ?elapsed, "slow MangaDex request");
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request)?;
        let mut builder = self.client.request(request.method.clone(), url).header(ACCEPT, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(v) => builder.json(v),
            RequestBody::Multipart { fields, files } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                for (name, file) in files {
                    let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
                    if let Some(mime) = &file.mime {
                        part = part.mime_str(mime)?;
                    }
                    form = form.part(name.clone(), part);
                }
                builder.multipart(form)
            }
        };

        self.throttle().await;
        let start = Instant::now();
        let response = builder.send().await?;
        self.warn_if_slow(start, &request);

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("json") {
            if status >= 400 {
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Api { status, detail: text.trim().chars().take(300).collect() });
            }
            return Err(Error::ContentType(content_type));
        }
        let body: Value = response.json().await?;
        check_envelope(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Query;
    use reqwest::Method;

    #[test]
    fn url_joins_base_path_and_array_params() {
        let transport = HttpTransport::new(&ClientConfig { api_url: "http://localhost:9000/".into(), ..Default::default() }).unwrap();
        let request = ApiRequest::new(Method::GET, "/manga").with_query(Query::new().param("title", "a b").array("ids", ["1", "2"]));
        let url = transport.url_for(&request).unwrap();
        assert_eq!(url.path(), "/manga");
        let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert_eq!(pairs[0], ("title".to_string(), "a b".to_string()));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "ids[]").count(), 2);
    }

    #[test]
    fn bad_base_url_is_a_config_error() {
        let err = HttpTransport::new(&ClientConfig { api_url: "::".into(), ..Default::default() }).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
