use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Manga;
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::Result;
use crate::locale::LocalizedString;
use crate::network::Query;
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::EntitySchema;
use crate::MangaDex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorAttributes {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub biography: LocalizedString,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub pixiv: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

/// Author or artist; both relationship tags resolve here.
#[derive(Debug, Clone)]
pub struct Author {
    id: String,
    pub attributes: AuthorAttributes,
    pub works: Vec<Relationship<Manga>>,
}

impl Author {
    pub fn name(&self) -> &str { &self.attributes.name }

    pub async fn get(client: &MangaDex, id: &str) -> Result<Author> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/author/{id}"), Query::new()).await
    }

    /// Authors whose name contains `name`.
    pub async fn search(client: &MangaDex, name: &str, limit: Option<usize>) -> Result<Vec<Author>> {
        Self::get_by_query(client, Query::new().param("name", name), limit).await
    }

    pub async fn get_by_query(client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Author>> {
        super::fetch_many(client, "/author", query, limit).await
    }

    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<Author>> {
        super::fetch_by_ids(client, "/author", ids, &[]).await
    }

    pub async fn update(&self, client: &MangaDex, changes: Value) -> Result<Author> {
        let body = super::with_version(changes, self.attributes.version);
        let schema = client.fetch_with_body(&format!("/author/{}", self.id), &body, Method::PUT).await?;
        Author::from_schema(&schema, client.registry())
    }
}

impl Resource for Author {
    const KIND: &'static str = "author";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        Ok(Self {
            id: schema.id.clone(),
            attributes: parse_attributes(schema)?,
            works: Relationship::convert_type("manga", &schema.relationships, None, registry)?,
        })
    }

    fn into_entity(self) -> Entity { Entity::Author(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::Author(a) => Ok(a),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for Author {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { Author::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { Author::get_multiple(client, ids).await }
}
