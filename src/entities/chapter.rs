use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Group, Manga, User};
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::Result;
use crate::network::{ApiRequest, Query};
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::EntitySchema;
use crate::MangaDex;

const DEFAULT_INCLUDES: [&str; 3] = ["manga", "scanlation_group", "user"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub translated_language: String,
    /// Set for chapters hosted off-site; those have no readable pages here.
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub publish_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub readable_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtHomeServer {
    base_url: String,
    chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtHomeChapter {
    hash: String,
    #[serde(default)]
    data: Vec<String>,
    #[serde(default)]
    data_saver: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Chapter {
    id: String,
    pub attributes: ChapterAttributes,
    pub manga: Option<Relationship<Manga>>,
    pub groups: Vec<Relationship<Group>>,
    pub uploader: Option<Relationship<User>>,
}

impl Chapter {
    pub async fn get(client: &MangaDex, id: &str) -> Result<Chapter> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/chapter/{id}"), Query::new().includes(DEFAULT_INCLUDES)).await
    }

    pub async fn search(client: &MangaDex, title: &str, limit: Option<usize>) -> Result<Vec<Chapter>> {
        Self::get_by_query(client, Query::new().param("title", title), limit).await
    }

    pub async fn get_by_query(client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Chapter>> {
        super::fetch_many(client, "/chapter", query, limit).await
    }

    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<Chapter>> {
        super::fetch_by_ids(client, "/chapter", ids, &DEFAULT_INCLUDES).await
    }

    /// Page image URLs from the at-home delivery network, in reading order.
    pub async fn pages(&self, client: &MangaDex, data_saver: bool) -> Result<Vec<String>> {
        let server: AtHomeServer = client.fetch_raw(ApiRequest::new(Method::GET, format!("/at-home/server/{}", self.id)), false).await?;
        Ok(page_urls(&server, data_saver))
    }

    pub async fn update(&self, client: &MangaDex, changes: Value) -> Result<Chapter> {
        let body = super::with_version(changes, self.attributes.version);
        let schema = client.fetch_with_body(&format!("/chapter/{}", self.id), &body, Method::PUT).await?;
        Chapter::from_schema(&schema, client.registry())
    }

    pub async fn delete(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::DELETE, &format!("/chapter/{}", self.id), None).await
    }
}

fn page_urls(server: &AtHomeServer, data_saver: bool) -> Vec<String> {
    let (dir, files) = if data_saver { ("data-saver", &server.chapter.data_saver) } else { ("data", &server.chapter.data) };
    let base = server.base_url.trim_end_matches('/');
    files.iter().map(|f| format!("{base}/{dir}/{}/{f}", server.chapter.hash)).collect()
}

impl Resource for Chapter {
    const KIND: &'static str = "chapter";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        let rels = &schema.relationships;
        Ok(Self {
            id: schema.id.clone(),
            attributes: parse_attributes(schema)?,
            manga: Relationship::convert_first("manga", rels, None, registry)?,
            groups: Relationship::convert_type("scanlation_group", rels, None, registry)?,
            uploader: Relationship::convert_first("user", rels, None, registry)?,
        })
    }

    fn into_entity(self) -> Entity { Entity::Chapter(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::Chapter(c) => Ok(c),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for Chapter {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { Chapter::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { Chapter::get_multiple(client, ids).await }
}
