//! Request model, the [`Transport`] seam and the fetch helpers entities build on.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{ApiErrorDetail, CollectionEnvelope, EntityEnvelope, EntitySchema};
use crate::MangaDex;

/// Sort direction for `order[field]` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self { Order::Asc => "asc", Order::Desc => "desc" }
    }
}

/// Query string builder that understands the API's `key[]` and `order[key]` conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self { Self::default() }

    /// Scalar parameter; replaces any previous value for `key`.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Array parameter, sent as repeated `key[]=value`.
    pub fn array<I, S>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let key = format!("{key}[]");
        for v in values {
            self.params.push((key.clone(), v.to_string()));
        }
        self
    }

    pub fn order(self, field: &str, order: Order) -> Self {
        self.param(&format!("order[{field}]"), order.as_str())
    }

    /// Ask the server to expand these relationship types inline.
    pub fn includes<I, S>(self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.array("includes", types)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.params.iter().position(|(k, _)| k == key)?;
        Some(self.params.remove(pos).1)
    }

    pub fn pairs(&self) -> &[(String, String)] { &self.params }
    pub fn is_empty(&self) -> bool { self.params.is_empty() }
}

/// A file part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes, mime: None }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self { self.mime = Some(mime.into()); self }

    /// Read a file from disk, naming the part after the file.
    pub async fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("file").to_string();
        Ok(Self::new(file_name, bytes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    Json(Value),
    /// Named text fields followed by file parts.
    Multipart { fields: Vec<(String, String)>, files: Vec<(String, UploadFile)> },
}

/// One API call, independent of how it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Query,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Query::new(), body: RequestBody::None, bearer: None }
    }

    pub fn with_query(mut self, query: Query) -> Self { self.query = query; self }
    pub fn with_body(mut self, body: RequestBody) -> Self { self.body = body; self }
}

/// Sends an [`ApiRequest`] and returns the decoded JSON body.
///
/// Implementations report remote error envelopes as [`Error::Api`], wrong
/// content types as [`Error::ContentType`] and network failures as
/// [`Error::Http`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Turn an error envelope (or an error status) into [`Error::Api`]; pass success through.
pub fn check_envelope(status: u16, body: Value) -> Result<Value> {
    let is_error = status >= 400 || body.get("result").and_then(Value::as_str) == Some("error");
    if !is_error {
        return Ok(body);
    }
    let details: Vec<ApiErrorDetail> = body
        .get("errors")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let status = if status >= 400 { status } else { details.iter().find_map(|d| d.status).unwrap_or(400) };
    let mut messages: Vec<String> = details.iter().filter_map(ApiErrorDetail::message).collect();
    if messages.is_empty() {
        messages.push(format!("request failed with status {status}"));
    }
    Err(Error::Api { status, detail: messages.join("; ") })
}

impl MangaDex {
    /// Send a request, attaching the active session token.
    pub async fn send(&self, mut request: ApiRequest, require_auth: bool) -> Result<Value> {
        request.bearer = self.bearer_token(require_auth).await?;
        tracing::debug!(method = %request.method, path = %request.path, "api request");
        let body = self.transport().send(request).await?;
        check_envelope(200, body)
    }

    /// Send a request and decode the whole body as `T`.
    pub async fn fetch_raw<T: DeserializeOwned>(&self, request: ApiRequest, require_auth: bool) -> Result<T> {
        let body = self.send(request, require_auth).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// GET a single entity schema.
    pub async fn fetch_entity(&self, path: &str, query: Query) -> Result<EntitySchema> {
        self.entity_request(ApiRequest::new(Method::GET, path).with_query(query), false).await
    }

    /// GET a single entity schema that requires an authenticated session.
    pub async fn fetch_entity_auth(&self, path: &str, query: Query) -> Result<EntitySchema> {
        self.entity_request(ApiRequest::new(Method::GET, path).with_query(query), true).await
    }

    /// Send a JSON body and decode the returned entity schema.
    pub async fn fetch_with_body<B: Serialize + ?Sized>(&self, path: &str, body: &B, method: Method) -> Result<EntitySchema> {
        let request = ApiRequest::new(method, path).with_body(RequestBody::Json(serde_json::to_value(body)?));
        self.entity_request(request, true).await
    }

    /// Upload files as `multipart/form-data` and return the raw response body.
    pub async fn fetch_multipart(&self, path: &str, fields: Vec<(String, String)>, files: Vec<(String, UploadFile)>) -> Result<Value> {
        let request = ApiRequest::new(Method::POST, path).with_body(RequestBody::Multipart { fields, files });
        self.send(request, true).await
    }

    /// Authenticated call whose response carries no entity (follow, delete, ...).
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        let body = body.map(RequestBody::Json).unwrap_or(RequestBody::None);
        self.send(ApiRequest::new(method, path).with_body(body), true).await.map(|_| ())
    }

    /// GET a collection, paging in ascending offset order.
    ///
    /// `limit` is the total number of results wanted; `None` uses the
    /// configured default. An `offset` in `query` sets the starting point.
    /// Paging stops at `limit`, at the server's `total`, on a short page, or
    /// when offset + page would pass the configured result cap.
    pub async fn fetch_list(&self, path: &str, query: Query, limit: Option<usize>) -> Result<Vec<EntitySchema>> {
        self.list_request(path, query, limit, false).await
    }

    /// Like [`fetch_list`](Self::fetch_list) for endpoints that require a session.
    pub async fn fetch_list_auth(&self, path: &str, query: Query, limit: Option<usize>) -> Result<Vec<EntitySchema>> {
        self.list_request(path, query, limit, true).await
    }

    async fn entity_request(&self, request: ApiRequest, require_auth: bool) -> Result<EntitySchema> {
        let envelope: EntityEnvelope = self.fetch_raw(request, require_auth).await?;
        Ok(envelope.data)
    }

    async fn list_request(&self, path: &str, mut query: Query, limit: Option<usize>, require_auth: bool) -> Result<Vec<EntitySchema>> {
        let config = self.config();
        let wanted = limit.unwrap_or(config.default_limit);
        let page_size = config.page_size.clamp(1, 100);
        query.remove("limit");
        let mut offset: usize = query.remove("offset").and_then(|s| s.parse().ok()).unwrap_or(0);
        let mut out: Vec<EntitySchema> = Vec::with_capacity(wanted.min(page_size * 4));

        while out.len() < wanted {
            let remaining_cap = config.max_results.saturating_sub(offset);
            let page = page_size.min(wanted - out.len()).min(remaining_cap);
            if page == 0 {
                break;
            }
            let page_query = query.clone().param("limit", page).param("offset", offset);
            let request = ApiRequest::new(Method::GET, path).with_query(page_query);
            let envelope: CollectionEnvelope = self.fetch_raw(request, require_auth).await?;
            let received = envelope.data.len();
            out.extend(envelope.data);
            offset += received;
            if received < page || offset >= envelope.total {
                break;
            }
        }
        out.truncate(wanted);
        Ok(out)
    }
}
