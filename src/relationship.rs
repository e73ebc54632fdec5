//! Typed edges between entities.
//!
//! A [`Relationship`] names another entity by id and type tag. When the API
//! expanded the edge (`includes[]=...`), the target's attributes arrive
//! inline and the relationship carries a parsed copy that resolves without a
//! request. Otherwise [`Relationship::resolve`] goes through the registered
//! resolver for the tag.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::entity::Resource;
use crate::error::{Error, Result};
use crate::registry::TypeRegistry;
use crate::schema::{EntitySchema, MangaRelated, RawRelationship};
use crate::MangaDex;

/// Why a relationship holds no cached entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The edge arrived without attributes.
    NotExpanded,
    /// The edge had attributes but they did not parse as the target type.
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct Relationship<T> {
    id: String,
    kind: String,
    related: Option<MangaRelated>,
    cached: std::result::Result<Arc<T>, Unavailable>,
}

impl<T: Resource> Relationship<T> {
    /// Build from a raw edge. Fails if the edge's type is not registered.
    pub fn new(raw: &RawRelationship, registry: &TypeRegistry) -> Result<Self> {
        Self::with_parent(raw, None, registry)
    }

    /// Like [`new`](Self::new); an expanded target also gets `parent` as its only relationship.
    pub fn with_parent(raw: &RawRelationship, parent: Option<&RawRelationship>, registry: &TypeRegistry) -> Result<Self> {
        if !registry.contains(&raw.kind) {
            return Err(Error::UnregisteredType(raw.kind.clone()));
        }
        let cached = match &raw.attributes {
            None => Err(Unavailable::NotExpanded),
            Some(attributes) => {
                let schema = EntitySchema {
                    id: raw.id.clone(),
                    kind: raw.kind.clone(),
                    attributes: attributes.clone(),
                    relationships: parent.cloned().into_iter().collect(),
                };
                match T::from_schema(&schema, registry) {
                    Ok(entity) => Ok(Arc::new(entity)),
                    Err(err) => {
                        tracing::debug!(id = %raw.id, kind = %raw.kind, %err, "ignoring malformed reference expansion");
                        Err(Unavailable::Malformed(err.to_string()))
                    }
                }
            }
        };
        Ok(Self { id: raw.id.clone(), kind: raw.kind.clone(), related: raw.related, cached })
    }

    /// Edge pointing at an entity's own id. Fails if that id is not set yet.
    pub fn self_reference(kind: &str, id: &str, registry: &TypeRegistry) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::MissingId);
        }
        Self::new(&RawRelationship::new(id, kind), registry)
    }

    /// Every edge of type `kind` in `raw`, in input order.
    pub fn convert_type(kind: &str, raw: &[RawRelationship], parent: Option<&RawRelationship>, registry: &TypeRegistry) -> Result<Vec<Self>> {
        raw.iter()
            .filter(|r| r.kind == kind)
            .map(|r| Self::with_parent(r, parent, registry))
            .collect()
    }

    /// First edge of type `kind`, if any.
    pub fn convert_first(kind: &str, raw: &[RawRelationship], parent: Option<&RawRelationship>, registry: &TypeRegistry) -> Result<Option<Self>> {
        raw.iter()
            .find(|r| r.kind == kind)
            .map(|r| Self::with_parent(r, parent, registry))
            .transpose()
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn kind(&self) -> &str { &self.kind }
    pub fn related(&self) -> Option<MangaRelated> { self.related }
    pub fn is_cached(&self) -> bool { self.cached.is_ok() }

    /// Cached target, if the edge was expanded. Never performs I/O.
    pub fn peek(&self) -> Option<&T> { self.cached.as_deref().ok() }

    /// Cached target or the reason there is none.
    pub fn cache_status(&self) -> std::result::Result<&T, &Unavailable> {
        self.cached.as_deref()
    }

    /// The target entity: the cached copy if present, otherwise one fetch through the registry.
    pub async fn resolve(&self, client: &MangaDex) -> Result<Arc<T>> {
        if let Ok(cached) = &self.cached {
            return Ok(cached.clone());
        }
        let resolver = client.registry().resolver(&self.kind)?;
        let entity = resolver.get(client, &self.id).await?;
        Ok(Arc::new(T::narrow(entity)?))
    }

    /// Resolve many edges, returning targets in input order.
    ///
    /// Expanded edges are answered from their cache. The rest go out as one
    /// batch request when the first edge's resolver supports it, otherwise
    /// each is resolved concurrently.
    pub async fn resolve_all(relationships: &[Self], client: &MangaDex) -> Result<Vec<Arc<T>>> {
        let Some(first) = relationships.first() else { return Ok(Vec::new()) };
        let resolver = client.registry().resolver(&first.kind)?;
        if !resolver.supports_batch() {
            return try_join_all(relationships.iter().map(|r| r.resolve(client))).await;
        }

        let mut by_id: HashMap<String, Arc<T>> = HashMap::with_capacity(relationships.len());
        let mut missing: Vec<String> = Vec::new();
        for rel in relationships {
            match &rel.cached {
                Ok(cached) => {
                    by_id.insert(rel.id.clone(), cached.clone());
                }
                Err(_) if !missing.contains(&rel.id) => missing.push(rel.id.clone()),
                Err(_) => {}
            }
        }
        missing.retain(|id| !by_id.contains_key(id));
        if !missing.is_empty() {
            for entity in resolver.get_multiple(client, &missing).await? {
                let entity = T::narrow(entity)?;
                by_id.entry(entity.id().to_string()).or_insert_with(|| Arc::new(entity));
            }
        }
        relationships
            .iter()
            .map(|r| by_id.get(&r.id).cloned().ok_or_else(|| Error::NotFound(format!("{} {}", first.kind, r.id))))
            .collect()
    }

    /// Raw form of this edge without attributes, e.g. to inject as a parent.
    pub fn to_raw(&self) -> RawRelationship {
        RawRelationship { id: self.id.clone(), kind: self.kind.clone(), related: self.related, attributes: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Cover, Manga, Tag};
    use crate::testing::{self, MockTransport, StubResolver};
    use serde_json::json;

    fn registry_with(tags: &[&str], resolver: Arc<StubResolver>) -> Arc<TypeRegistry> {
        let registry = TypeRegistry::new();
        registry.register_types(tags, resolver).unwrap();
        registry.lock();
        Arc::new(registry)
    }

    #[test]
    fn unregistered_type_fails_construction() {
        let registry = TypeRegistry::new();
        let err = Relationship::<Tag>::new(&RawRelationship::new("t1", "widget"), &registry).unwrap_err();
        assert!(matches!(err, Error::UnregisteredType(ref t) if t == "widget"));
    }

    #[tokio::test]
    async fn registered_type_dispatches_to_its_resolver() {
        let stub = Arc::new(StubResolver::tags());
        let registry = TypeRegistry::new();
        registry.register_types(&["widget"], stub.clone()).unwrap();
        let rel = Relationship::<Tag>::new(&RawRelationship::new("t1", "widget"), &registry).unwrap();
        registry.lock();

        let client = testing::client(Arc::new(MockTransport::new()), Arc::new(registry));
        let tag = rel.resolve(&client).await.unwrap();
        assert_eq!(tag.id(), "t1");
        assert_eq!(stub.calls(), vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn cached_resolve_performs_no_io() {
        let transport = Arc::new(MockTransport::new());
        let stub = Arc::new(StubResolver::tags());
        let registry = registry_with(&["tag"], stub.clone());
        let raw = RawRelationship::new("t1", "tag").with_attributes(testing::tag_attributes("Action"));
        let rel = Relationship::<Tag>::new(&raw, &registry).unwrap();
        assert!(rel.is_cached());

        let client = testing::client(transport.clone(), registry);
        let resolved = rel.resolve(&client).await.unwrap();
        assert!(std::ptr::eq(resolved.as_ref(), rel.peek().unwrap()));
        assert_eq!(transport.call_count(), 0);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn uncached_manga_resolve_calls_get_exactly_once() {
        let stub = Arc::new(StubResolver::manga());
        let registry = registry_with(&["manga"], stub.clone());
        let rel = Relationship::<Manga>::new(&RawRelationship::new("m-42", "manga"), &registry).unwrap();
        assert_eq!(rel.peek().map(|m| m.id()), None);

        let client = testing::client(Arc::new(MockTransport::new()), registry);
        let manga = rel.resolve(&client).await.unwrap();
        assert_eq!(manga.id(), "m-42");
        assert_eq!(stub.calls(), vec!["m-42".to_string()]);
    }

    #[tokio::test]
    async fn resolve_propagates_resolver_errors_verbatim() {
        let stub = Arc::new(StubResolver::tags().failing_on("missing"));
        let registry = registry_with(&["tag"], stub);
        let rel = Relationship::<Tag>::new(&RawRelationship::new("missing", "tag"), &registry).unwrap();
        let client = testing::client(Arc::new(MockTransport::new()), registry);
        let err = rel.resolve(&client).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn resolve_reports_kind_mismatch() {
        let registry = registry_with(&["tag"], Arc::new(StubResolver::manga()));
        let rel = Relationship::<Tag>::new(&RawRelationship::new("x", "tag"), &registry).unwrap();
        let client = testing::client(Arc::new(MockTransport::new()), registry);
        let err = rel.resolve(&client).await.unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "tag", found: "manga" }));
    }

    async fn check_resolve_all_order(batch: bool) {
        let stub = Arc::new(if batch { StubResolver::tags().with_batch() } else { StubResolver::tags() });
        let registry = registry_with(&["tag"], stub.clone());
        let ids = ["c", "a", "d", "b"];
        let rels: Vec<Relationship<Tag>> = ids
            .iter()
            .map(|id| Relationship::new(&RawRelationship::new(*id, "tag"), &registry).unwrap())
            .collect();
        let client = testing::client(Arc::new(MockTransport::new()), registry);

        let resolved = Relationship::resolve_all(&rels, &client).await.unwrap();
        let got: Vec<&str> = resolved.iter().map(|t| t.id()).collect();
        assert_eq!(got, ids.to_vec());
        if batch {
            assert_eq!(stub.batch_calls().len(), 1);
            assert!(stub.calls().is_empty());
        } else {
            assert!(stub.batch_calls().is_empty());
            assert_eq!(stub.calls().len(), ids.len());
        }
    }

    #[tokio::test]
    async fn resolve_all_preserves_order_with_batch() { check_resolve_all_order(true).await }

    #[tokio::test]
    async fn resolve_all_preserves_order_without_batch() { check_resolve_all_order(false).await }

    #[tokio::test]
    async fn resolve_all_with_every_edge_expanded_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let stub = Arc::new(StubResolver::tags().with_batch());
        let registry = registry_with(&["tag"], stub.clone());
        let rels: Vec<Relationship<Tag>> = [("t2", "Comedy"), ("t1", "Action")]
            .iter()
            .map(|(id, name)| {
                let raw = RawRelationship::new(*id, "tag").with_attributes(testing::tag_attributes(name));
                Relationship::new(&raw, &registry).unwrap()
            })
            .collect();
        let client = testing::client(transport.clone(), registry);

        let resolved = Relationship::resolve_all(&rels, &client).await.unwrap();
        let names: Vec<&str> = resolved.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["Comedy", "Action"]);
        assert!(std::ptr::eq(resolved[0].as_ref(), rels[0].peek().unwrap()));
        assert!(stub.batch_calls().is_empty());
        assert!(stub.calls().is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn resolve_all_batches_only_the_unexpanded_edges() {
        let stub = Arc::new(StubResolver::tags().with_batch());
        let registry = registry_with(&["tag"], stub.clone());
        let expanded = RawRelationship::new("b", "tag").with_attributes(testing::tag_attributes("Drama"));
        let rels = vec![
            Relationship::<Tag>::new(&RawRelationship::new("a", "tag"), &registry).unwrap(),
            Relationship::new(&expanded, &registry).unwrap(),
            Relationship::new(&RawRelationship::new("c", "tag"), &registry).unwrap(),
        ];
        let client = testing::client(Arc::new(MockTransport::new()), registry);

        let resolved = Relationship::resolve_all(&rels, &client).await.unwrap();
        let ids: Vec<&str> = resolved.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(resolved[1].name(), "Drama");
        assert_eq!(stub.batch_calls(), vec![vec!["a".to_string(), "c".to_string()]]);
    }

    #[tokio::test]
    async fn resolve_all_of_nothing_is_empty() {
        let client = testing::client(Arc::new(MockTransport::new()), registry_with(&["tag"], Arc::new(StubResolver::tags())));
        let out = Relationship::<Tag>::resolve_all(&[], &client).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn resolve_all_batch_reports_missing_ids() {
        let stub = Arc::new(StubResolver::tags().with_batch().failing_on("gone"));
        let registry = registry_with(&["tag"], stub);
        let rels: Vec<Relationship<Tag>> = ["a", "gone"]
            .iter()
            .map(|id| Relationship::new(&RawRelationship::new(*id, "tag"), &registry).unwrap())
            .collect();
        let client = testing::client(Arc::new(MockTransport::new()), registry);
        let err = Relationship::resolve_all(&rels, &client).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn convert_type_filters_and_keeps_order() {
        let registry = TypeRegistry::standard();
        let raw = vec![
            RawRelationship::new("m1", "manga"),
            RawRelationship::new("a1", "author"),
            RawRelationship::new("c1", "cover_art"),
            RawRelationship::new("a2", "author"),
        ];
        let authors = Relationship::<crate::entities::Author>::convert_type("author", &raw, None, &registry).unwrap();
        let ids: Vec<&str> = authors.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert!(authors.iter().all(|r| r.kind() == "author" && !r.is_cached()));
    }

    #[test]
    fn convert_type_injects_parent_into_expanded_targets() {
        let registry = TypeRegistry::standard();
        let parent = RawRelationship::new("m1", "manga");
        let raw = vec![RawRelationship::new("c1", "cover_art").with_attributes(testing::cover_attributes("cover.jpg"))];
        let covers = Relationship::<Cover>::convert_type("cover_art", &raw, Some(&parent), &registry).unwrap();
        let cover = covers[0].peek().expect("expanded cover");
        assert_eq!(cover.manga.as_ref().map(|m| m.id()), Some("m1"));
        assert!(!cover.manga.as_ref().unwrap().is_cached());
    }

    #[test]
    fn expanded_targets_have_no_relationships_of_their_own() {
        let registry = TypeRegistry::standard();
        let raw = RawRelationship::new("c1", "cover_art").with_attributes(testing::cover_attributes("cover.jpg"));
        let rel = Relationship::<Cover>::new(&raw, &registry).unwrap();
        let cover = rel.peek().unwrap();
        assert!(cover.manga.is_none() && cover.uploader.is_none());
    }

    #[test]
    fn malformed_expansion_falls_back_to_uncached() {
        let registry = TypeRegistry::standard();
        let raw = RawRelationship::new("t1", "tag").with_attributes(json!({"name": 5}));
        let rel = Relationship::<Tag>::new(&raw, &registry).unwrap();
        assert!(!rel.is_cached());
        assert!(matches!(rel.cache_status(), Err(Unavailable::Malformed(_))));

        let plain = Relationship::<Tag>::new(&RawRelationship::new("t1", "tag"), &registry).unwrap();
        assert_eq!(plain.cache_status().err(), Some(&Unavailable::NotExpanded));
    }

    #[test]
    fn self_reference_requires_an_id() {
        let registry = TypeRegistry::standard();
        assert!(matches!(Relationship::<Manga>::self_reference("manga", "", &registry), Err(Error::MissingId)));
        let rel = Relationship::<Manga>::self_reference("manga", "m1", &registry).unwrap();
        assert_eq!(rel.id(), "m1");
        assert_eq!(rel.kind(), "manga");
    }

    #[test]
    fn peek_is_reference_stable() {
        let registry = TypeRegistry::standard();
        let raw = RawRelationship::new("t1", "tag").with_attributes(testing::tag_attributes("Drama"));
        let rel = Relationship::<Tag>::new(&raw, &registry).unwrap();
        let first = rel.peek().unwrap() as *const Tag;
        for _ in 0..3 {
            assert!(std::ptr::eq(first, rel.peek().unwrap()));
        }
    }

    #[test]
    fn related_kind_is_carried() {
        let registry = TypeRegistry::standard();
        let raw = RawRelationship::new("m2", "manga").with_related(MangaRelated::Sequel);
        let rel = Relationship::<Manga>::new(&raw, &registry).unwrap();
        assert_eq!(rel.related(), Some(MangaRelated::Sequel));
        assert_eq!(rel.to_raw(), raw);
    }
}
