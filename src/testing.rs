//! In-crate doubles: a recording transport and a stub resolver.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::entities::{Manga, Tag};
use crate::entity::{Entity, Resource};
use crate::error::{Error, Result};
use crate::network::{ApiRequest, Transport};
use crate::registry::{Resolver, TypeRegistry};
use crate::schema::EntitySchema;
use crate::{ClientConfig, MangaDex};

/// Canned responses keyed by `path` or `path?k=v&k=v` (query pairs in insertion order, unencoded).
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn respond(&self, key: &str, body: Value) {
        self.responses.lock().unwrap().insert(key.to_string(), body);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> { self.requests.lock().unwrap().clone() }
    pub(crate) fn call_count(&self) -> usize { self.requests.lock().unwrap().len() }

    fn key_for(request: &ApiRequest) -> String {
        if request.query.is_empty() {
            return request.path.clone();
        }
        let pairs: Vec<String> = request.query.pairs().iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", request.path, pairs.join("&"))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let key = Self::key_for(&request);
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Api { status: 404, detail: format!("no canned response for {key}") })
    }
}

#[derive(Clone, Copy)]
enum StubKind {
    Tag,
    Manga,
}

/// Resolver that builds entities locally and records what it was asked for.
pub(crate) struct StubResolver {
    kind: StubKind,
    batch: bool,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
    batch_calls: Mutex<Vec<Vec<String>>>,
}

impl StubResolver {
    fn of(kind: StubKind) -> Self {
        Self { kind, batch: false, failing: HashSet::new(), calls: Mutex::default(), batch_calls: Mutex::default() }
    }

    pub(crate) fn tags() -> Self { Self::of(StubKind::Tag) }
    pub(crate) fn manga() -> Self { Self::of(StubKind::Manga) }

    pub(crate) fn with_batch(mut self) -> Self { self.batch = true; self }

    /// `get` reports 404 for `id`; batch fetches silently omit it.
    pub(crate) fn failing_on(mut self, id: &str) -> Self { self.failing.insert(id.to_string()); self }

    pub(crate) fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }
    pub(crate) fn batch_calls(&self) -> Vec<Vec<String>> { self.batch_calls.lock().unwrap().clone() }

    fn build(&self, id: &str) -> Entity {
        let registry = TypeRegistry::new();
        match self.kind {
            StubKind::Tag => Tag::from_schema(&schema("tag", id, tag_attributes(id)), &registry).unwrap().into_entity(),
            StubKind::Manga => Manga::from_schema(&schema("manga", id, manga_attributes(id)), &registry).unwrap().into_entity(),
        }
    }
}

#[async_trait]
impl Resolver for StubResolver {
    async fn get(&self, _client: &MangaDex, id: &str) -> Result<Entity> {
        self.calls.lock().unwrap().push(id.to_string());
        if self.failing.contains(id) {
            return Err(Error::Api { status: 404, detail: format!("{id} not found") });
        }
        Ok(self.build(id))
    }

    fn supports_batch(&self) -> bool { self.batch }

    async fn get_multiple(&self, _client: &MangaDex, ids: &[String]) -> Result<Vec<Entity>> {
        self.batch_calls.lock().unwrap().push(ids.to_vec());
        // Reverse order so callers must reorder.
        Ok(ids.iter().rev().filter(|id| !self.failing.contains(*id)).map(|id| self.build(id)).collect())
    }
}

pub(crate) fn client(transport: Arc<MockTransport>, registry: Arc<TypeRegistry>) -> MangaDex {
    MangaDex::builder().transport(transport).registry(registry).build().unwrap()
}

pub(crate) fn client_with_config(transport: Arc<MockTransport>, config: ClientConfig) -> MangaDex {
    MangaDex::builder().transport(transport).config(config).build().unwrap()
}

pub(crate) fn schema(kind: &str, id: &str, attributes: Value) -> EntitySchema {
    EntitySchema { id: id.to_string(), kind: kind.to_string(), attributes, relationships: Vec::new() }
}

pub(crate) fn tag_attributes(name: &str) -> Value {
    json!({"name": {"en": name}, "description": {}, "group": "genre", "version": 1})
}

pub(crate) fn cover_attributes(file_name: &str) -> Value {
    json!({
        "description": "",
        "volume": "1",
        "fileName": file_name,
        "locale": "ja",
        "createdAt": "2021-05-24T17:04:25+00:00",
        "updatedAt": "2021-05-24T17:04:25+00:00",
        "version": 1
    })
}

pub(crate) fn manga_attributes(title: &str) -> Value {
    json!({
        "title": {"en": title},
        "altTitles": [{"ja": "タイトル"}],
        "description": {"en": "A story."},
        "originalLanguage": "ja",
        "lastVolume": "",
        "lastChapter": "",
        "publicationDemographic": "seinen",
        "status": "ongoing",
        "year": 2020,
        "contentRating": "safe",
        "tags": [],
        "state": "published",
        "createdAt": "2020-01-01T00:00:00+00:00",
        "updatedAt": "2021-01-01T00:00:00+00:00",
        "version": 3,
        "availableTranslatedLanguages": ["en", null, "fr"]
    })
}

fn attributes_for(kind: &str, id: &str) -> Value {
    match kind {
        "tag" => tag_attributes(id),
        "manga" => manga_attributes(id),
        "cover_art" => cover_attributes(&format!("{id}.jpg")),
        _ => json!({}),
    }
}

/// Collection envelope holding one minimal entity of `kind` per id.
pub(crate) fn collection(kind: &str, ids: &[&str], offset: usize, total: usize) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "type": kind, "attributes": attributes_for(kind, id), "relationships": []}))
        .collect();
    json!({"result": "ok", "response": "collection", "data": data, "limit": ids.len(), "offset": offset, "total": total})
}

/// Entity envelope around `data`.
pub(crate) fn entity(data: Value) -> Value {
    json!({"result": "ok", "response": "entity", "data": data})
}
