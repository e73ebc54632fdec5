use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Chapter, Manga, User};
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::Result;
use crate::network::Query;
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::EntitySchema;
use crate::MangaDex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAttributes {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub version: u32,
}

/// User-curated list of manga.
#[derive(Debug, Clone)]
pub struct List {
    id: String,
    pub attributes: ListAttributes,
    pub manga: Vec<Relationship<Manga>>,
    pub creator: Option<Relationship<User>>,
}

impl List {
    pub fn name(&self) -> &str { &self.attributes.name }

    pub async fn get(client: &MangaDex, id: &str) -> Result<List> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/list/{id}"), Query::new()).await
    }

    pub async fn create(client: &MangaDex, name: &str, visibility: Visibility, manga_ids: &[String]) -> Result<List> {
        let body = json!({ "name": name, "visibility": visibility, "manga": manga_ids, "version": 1 });
        let schema = client.fetch_with_body("/list", &body, Method::POST).await?;
        tracing::info!(list = %schema.id, %name, "created custom list");
        List::from_schema(&schema, client.registry())
    }

    pub async fn update(&self, client: &MangaDex, changes: Value) -> Result<List> {
        let body = super::with_version(changes, self.attributes.version);
        let schema = client.fetch_with_body(&format!("/list/{}", self.id), &body, Method::PUT).await?;
        List::from_schema(&schema, client.registry())
    }

    pub async fn delete(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::DELETE, &format!("/list/{}", self.id), None).await
    }

    pub async fn add_manga(&self, client: &MangaDex, manga_id: &str) -> Result<()> {
        validate_id(manga_id)?;
        client.execute(Method::POST, &format!("/manga/{manga_id}/list/{}", self.id), None).await
    }

    pub async fn remove_manga(&self, client: &MangaDex, manga_id: &str) -> Result<()> {
        validate_id(manga_id)?;
        client.execute(Method::DELETE, &format!("/manga/{manga_id}/list/{}", self.id), None).await
    }

    /// Chapters of every manga on the list.
    pub async fn feed(&self, client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Chapter>> {
        super::fetch_many(client, &format!("/list/{}/feed", self.id), query, limit).await
    }

    /// Public lists of another user.
    pub async fn for_user(client: &MangaDex, user_id: &str, limit: Option<usize>) -> Result<Vec<List>> {
        validate_id(user_id)?;
        super::fetch_many(client, &format!("/user/{user_id}/list"), Query::new(), limit).await
    }

    /// All lists of the logged-in user, private ones included.
    pub async fn mine(client: &MangaDex, limit: Option<usize>) -> Result<Vec<List>> {
        let schemas = client.fetch_list_auth("/user/list", Query::new(), limit).await?;
        super::parse_all(&schemas, client.registry())
    }
}

impl Resource for List {
    const KIND: &'static str = "custom_list";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        let rels = &schema.relationships;
        Ok(Self {
            id: schema.id.clone(),
            attributes: parse_attributes(schema)?,
            manga: Relationship::convert_type("manga", rels, None, registry)?,
            creator: Relationship::convert_first("user", rels, None, registry)?,
        })
    }

    fn into_entity(self) -> Entity { Entity::List(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::List(l) => Ok(l),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for List {
    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { List::get(client, id).await }
}
