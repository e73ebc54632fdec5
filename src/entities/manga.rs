use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Author, Chapter, Cover, Tag};
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::{Error, Result};
use crate::locale::LocalizedString;
use crate::network::{ApiRequest, Query};
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::{EntitySchema, RawRelationship};
use crate::MangaDex;

/// Expanded on every single-manga fetch.
const DEFAULT_INCLUDES: [&str; 3] = ["author", "artist", "cover_art"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MangaStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Demographic {
    Shounen,
    Shoujo,
    Josei,
    Seinen,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    Safe,
    Suggestive,
    Erotica,
    Pornographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MangaState {
    Draft,
    Submitted,
    Published,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Reading,
    OnHold,
    PlanToRead,
    Dropped,
    ReReading,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaAttributes {
    pub title: LocalizedString,
    #[serde(default)]
    pub alt_titles: Vec<LocalizedString>,
    #[serde(default)]
    pub description: LocalizedString,
    #[serde(default)]
    pub is_locked: bool,
    /// Tracker and store links keyed by site code (`al`, `mal`, `amz`, ...).
    #[serde(default)]
    pub links: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub last_volume: Option<String>,
    #[serde(default)]
    pub last_chapter: Option<String>,
    #[serde(default)]
    pub publication_demographic: Option<Demographic>,
    #[serde(default)]
    pub status: Option<MangaStatus>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub content_rating: Option<ContentRating>,
    #[serde(default)]
    pub state: Option<MangaState>,
    #[serde(default)]
    pub chapter_numbers_reset_on_new_volume: bool,
    #[serde(default, deserialize_with = "super::strings_skipping_nulls")]
    pub available_translated_languages: Vec<String>,
    #[serde(default)]
    pub latest_uploaded_chapter: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct Manga {
    id: String,
    pub attributes: MangaAttributes,
    pub tags: Vec<Tag>,
    pub authors: Vec<Relationship<Author>>,
    pub artists: Vec<Relationship<Author>>,
    /// Expanded covers point back at this manga.
    pub main_cover: Option<Relationship<Cover>>,
    /// Other manga with the relation kind on each edge.
    pub related: Vec<Relationship<Manga>>,
    pub latest_chapter: Option<Relationship<Chapter>>,
}

impl Manga {
    pub fn title(&self) -> &str { self.attributes.title.local_string() }

    pub async fn get(client: &MangaDex, id: &str) -> Result<Manga> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/manga/{id}"), Query::new().includes(DEFAULT_INCLUDES)).await
    }

    /// Title search with covers and authors expanded.
    pub async fn search(client: &MangaDex, title: &str, limit: Option<usize>) -> Result<Vec<Manga>> {
        Self::get_by_query(client, Query::new().param("title", title), limit).await
    }

    /// Arbitrary `/manga` filters; adds the default expansions unless the query sets its own.
    pub async fn get_by_query(client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Manga>> {
        let query = if query.get("includes[]").is_none() { query.includes(DEFAULT_INCLUDES) } else { query };
        super::fetch_many(client, "/manga", query, limit).await
    }

    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<Manga>> {
        super::fetch_by_ids(client, "/manga", ids, &DEFAULT_INCLUDES).await
    }

    pub async fn random(client: &MangaDex) -> Result<Manga> {
        super::fetch_one(client, "/manga/random", Query::new().includes(DEFAULT_INCLUDES)).await
    }

    /// Manga followed by the logged-in user.
    pub async fn followed(client: &MangaDex, limit: Option<usize>) -> Result<Vec<Manga>> {
        let schemas = client.fetch_list_auth("/user/follows/manga", Query::new().includes(DEFAULT_INCLUDES), limit).await?;
        super::parse_all(&schemas, client.registry())
    }

    /// Chapters of this manga, filtered and ordered by `query`.
    pub async fn feed(&self, client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Chapter>> {
        super::fetch_many(client, &format!("/manga/{}/feed", self.id), query, limit).await
    }

    /// Volume name to chapter ids (including duplicate uploads), for the given languages.
    pub async fn aggregate(&self, client: &MangaDex, languages: &[&str]) -> Result<BTreeMap<String, Vec<String>>> {
        let query = Query::new().array("translatedLanguage", languages.iter().copied());
        let request = ApiRequest::new(Method::GET, format!("/manga/{}/aggregate", self.id)).with_query(query);
        let body = client.send(request, false).await?;
        Ok(volumes_from_aggregate(&body))
    }

    pub async fn covers(&self, client: &MangaDex) -> Result<Vec<Cover>> { Cover::for_manga(client, &self.id).await }

    pub async fn update(&self, client: &MangaDex, changes: Value) -> Result<Manga> {
        let body = super::with_version(changes, self.attributes.version);
        let schema = client.fetch_with_body(&format!("/manga/{}", self.id), &body, Method::PUT).await?;
        Manga::from_schema(&schema, client.registry())
    }

    pub async fn follow(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::POST, &format!("/manga/{}/follow", self.id), None).await
    }

    pub async fn unfollow(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::DELETE, &format!("/manga/{}/follow", self.id), None).await
    }

    pub async fn reading_status(&self, client: &MangaDex) -> Result<Option<ReadingStatus>> {
        let body = client.send(ApiRequest::new(Method::GET, format!("/manga/{}/status", self.id)), true).await?;
        match body.get("status") {
            None | Some(Value::Null) => Ok(None),
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
        }
    }

    /// `None` clears the status.
    pub async fn set_reading_status(&self, client: &MangaDex, status: Option<ReadingStatus>) -> Result<()> {
        client.execute(Method::POST, &format!("/manga/{}/status", self.id), Some(json!({ "status": status }))).await
    }
}

// `volumes` is an object keyed by volume name, or `[]` when there are none.
fn volumes_from_aggregate(body: &Value) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    let Some(volumes) = body.get("volumes").and_then(Value::as_object) else { return out };
    for (name, volume) in volumes {
        let mut ids = Vec::new();
        let chapters: Vec<&Value> = match volume.get("chapters") {
            Some(Value::Object(map)) => map.values().collect(),
            Some(Value::Array(list)) => list.iter().collect(),
            _ => Vec::new(),
        };
        for chapter in chapters {
            ids.extend(chapter.get("id").and_then(Value::as_str).map(str::to_string));
            if let Some(others) = chapter.get("others").and_then(Value::as_array) {
                ids.extend(others.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
        out.insert(name.clone(), ids);
    }
    out
}

impl Resource for Manga {
    const KIND: &'static str = "manga";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        let attributes: MangaAttributes = parse_attributes(schema)?;
        let tag_schemas: Vec<EntitySchema> = match schema.attributes.get("tags") {
            Some(v) => serde_json::from_value(v.clone()).map_err(|e| Error::schema("tag", e))?,
            None => Vec::new(),
        };
        let rels = &schema.relationships;
        let this = RawRelationship::new(schema.id.clone(), Self::KIND);
        // Expanded targets arrive without relationships and must not grow any.
        let latest_chapter = match &attributes.latest_uploaded_chapter {
            Some(id) if !rels.is_empty() => Some(Relationship::new(&RawRelationship::new(id.clone(), Chapter::KIND), registry)?),
            _ => None,
        };
        Ok(Self {
            id: schema.id.clone(),
            tags: super::parse_all(&tag_schemas, registry)?,
            authors: Relationship::convert_type("author", rels, None, registry)?,
            artists: Relationship::convert_type("artist", rels, None, registry)?,
            main_cover: Relationship::convert_first("cover_art", rels, Some(&this), registry)?,
            related: Relationship::convert_type("manga", rels, None, registry)?,
            latest_chapter,
            attributes,
        })
    }

    fn into_entity(self) -> Entity { Entity::Manga(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::Manga(m) => Ok(m),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for Manga {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { Manga::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { Manga::get_multiple(client, ids).await }
}
