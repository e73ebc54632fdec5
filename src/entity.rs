//! The closed set of entity kinds and the traits every entity implements.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::entities::{Author, Chapter, Cover, Group, List, Manga, Tag, UploadSession, User};
use crate::error::{Error, Result};
use crate::registry::{Resolver, TypeRegistry};
use crate::schema::EntitySchema;
use crate::MangaDex;

/// Any fetched resource. Resolvers return this; relationships narrow it.
#[derive(Debug, Clone)]
pub enum Entity {
    Manga(Manga),
    Chapter(Chapter),
    Author(Author),
    Cover(Cover),
    Group(Group),
    User(User),
    List(List),
    Tag(Tag),
    UploadSession(UploadSession),
}

impl Entity {
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Manga(_) => Manga::KIND,
            Entity::Chapter(_) => Chapter::KIND,
            Entity::Author(_) => Author::KIND,
            Entity::Cover(_) => Cover::KIND,
            Entity::Group(_) => Group::KIND,
            Entity::User(_) => User::KIND,
            Entity::List(_) => List::KIND,
            Entity::Tag(_) => Tag::KIND,
            Entity::UploadSession(_) => UploadSession::KIND,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Manga(e) => e.id(),
            Entity::Chapter(e) => e.id(),
            Entity::Author(e) => e.id(),
            Entity::Cover(e) => e.id(),
            Entity::Group(e) => e.id(),
            Entity::User(e) => e.id(),
            Entity::List(e) => e.id(),
            Entity::Tag(e) => e.id(),
            Entity::UploadSession(e) => e.id(),
        }
    }
}

/// A typed resource built from a raw schema, without I/O.
pub trait Resource: Sized + Send + Sync + 'static {
    /// Primary type tag for this kind.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self>;
    fn into_entity(self) -> Entity;
    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity>;

    /// Narrow an [`Entity`] or report which kind came back instead.
    fn narrow(entity: Entity) -> Result<Self> {
        Self::from_entity(entity).map_err(|other| Error::TypeMismatch { expected: Self::KIND, found: other.kind() })
    }
}

/// Network factories the registry dispatches to.
#[async_trait]
pub trait Fetch: Resource {
    /// Whether [`fetch_many`](Self::fetch_many) is backed by a batch endpoint.
    const BATCH: bool = false;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self>;

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> {
        let _ = (client, ids);
        Err(Error::Unsupported("batch fetch"))
    }
}

/// Adapts a [`Fetch`] type into a type-erased [`Resolver`].
pub struct EntityResolver<T>(PhantomData<fn() -> T>);

impl<T> EntityResolver<T> {
    pub fn new() -> Self { Self(PhantomData) }
}

impl<T> Default for EntityResolver<T> {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl<T: Fetch> Resolver for EntityResolver<T> {
    async fn get(&self, client: &MangaDex, id: &str) -> Result<Entity> {
        Ok(T::fetch(client, id).await?.into_entity())
    }

    fn supports_batch(&self) -> bool { T::BATCH }

    async fn get_multiple(&self, client: &MangaDex, ids: &[String]) -> Result<Vec<Entity>> {
        Ok(T::fetch_many(client, ids).await?.into_iter().map(Resource::into_entity).collect())
    }
}

/// Parse a schema's `attributes` into `A`, tagging failures with the entity kind.
pub(crate) fn parse_attributes<A: DeserializeOwned>(schema: &EntitySchema) -> Result<A> {
    serde_json::from_value(schema.attributes.clone()).map_err(|e| Error::schema(schema.kind.clone(), e))
}

/// Ids are UUIDs; reject anything else before touching the network.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    uuid::Uuid::parse_str(id).map(|_| ()).map_err(|_| Error::InvalidId(id.to_string()))
}
