use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Manga, User};
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::{Error, Result};
use crate::network::{Query, UploadFile};
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::{EntityEnvelope, EntitySchema};
use crate::MangaDex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverAttributes {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    pub file_name: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

/// Image variants served by the uploads host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverSize {
    #[default]
    Original,
    Medium,
    Small,
}

impl CoverSize {
    fn suffix(self) -> &'static str {
        match self { CoverSize::Original => "", CoverSize::Medium => ".512.jpg", CoverSize::Small => ".256.jpg" }
    }
}

#[derive(Debug, Clone)]
pub struct Cover {
    id: String,
    pub attributes: CoverAttributes,
    pub manga: Option<Relationship<Manga>>,
    pub uploader: Option<Relationship<User>>,
}

impl Cover {
    pub async fn get(client: &MangaDex, id: &str) -> Result<Cover> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/cover/{id}"), Query::new().includes(["manga", "user"])).await
    }

    pub async fn search(client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Cover>> {
        super::fetch_many(client, "/cover", query, limit).await
    }

    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<Cover>> {
        super::fetch_by_ids(client, "/cover", ids, &["manga"]).await
    }

    /// Every cover of one manga, oldest volume first.
    pub async fn for_manga(client: &MangaDex, manga_id: &str) -> Result<Vec<Cover>> {
        validate_id(manga_id)?;
        let query = Query::new().array("manga", [manga_id]).order("volume", crate::network::Order::Asc);
        super::fetch_many(client, "/cover", query, Some(client.config().max_results)).await
    }

    /// Image URL on the uploads host; needs the manga edge to build the path.
    pub fn url(&self, client: &MangaDex, size: CoverSize) -> Result<String> {
        let manga = self.manga.as_ref().ok_or(Error::MissingId)?;
        let base = client.config().uploads_url.trim_end_matches('/');
        Ok(format!("{base}/covers/{}/{}{}", manga.id(), self.attributes.file_name, size.suffix()))
    }

    /// Upload a new cover for `manga_id`.
    pub async fn upload(client: &MangaDex, manga_id: &str, file: UploadFile, volume: Option<&str>, locale: &str, description: Option<&str>) -> Result<Cover> {
        validate_id(manga_id)?;
        let mut fields = vec![("locale".to_string(), locale.to_string())];
        if let Some(v) = volume {
            fields.push(("volume".into(), v.to_string()));
        }
        if let Some(d) = description {
            fields.push(("description".into(), d.to_string()));
        }
        let body = client.fetch_multipart(&format!("/cover/{manga_id}"), fields, vec![("file".into(), file)]).await?;
        let envelope: EntityEnvelope = serde_json::from_value(body)?;
        tracing::info!(cover = %envelope.data.id, manga = %manga_id, "uploaded cover");
        Cover::from_schema(&envelope.data, client.registry())
    }

    /// Change volume, description or locale; returns the updated cover.
    pub async fn update(&self, client: &MangaDex, changes: Value) -> Result<Cover> {
        let body = super::with_version(changes, self.attributes.version);
        let schema = client.fetch_with_body(&format!("/cover/{}", self.id), &body, Method::PUT).await?;
        Cover::from_schema(&schema, client.registry())
    }
}

impl Resource for Cover {
    const KIND: &'static str = "cover_art";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        let rels = &schema.relationships;
        Ok(Self {
            id: schema.id.clone(),
            attributes: parse_attributes(schema)?,
            manga: Relationship::convert_first("manga", rels, None, registry)?,
            uploader: Relationship::convert_first("user", rels, None, registry)?,
        })
    }

    fn into_entity(self) -> Entity { Entity::Cover(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::Cover(c) => Ok(c),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for Cover {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { Cover::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { Cover::get_multiple(client, ids).await }
}
