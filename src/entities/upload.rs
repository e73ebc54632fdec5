use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Chapter, Group, Manga, User};
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::{Error, Result};
use crate::network::{Query, UploadFile};
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::EntitySchema;
use crate::MangaDex;

/// The API accepts at most this many files per upload request.
const MAX_FILES_PER_REQUEST: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionAttributes {
    #[serde(default)]
    pub is_committed: bool,
    #[serde(default)]
    pub is_processed: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

/// Metadata for the chapter created on commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDraft {
    pub volume: Option<String>,
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub translated_language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<DateTime<Utc>>,
}

/// A page accepted into an upload session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    #[serde(skip)]
    pub id: String,
    pub original_file_name: String,
    #[serde(default)]
    pub file_hash: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub mime_type: String,
}

/// Chapter upload in progress. One open session per user.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: String,
    pub attributes: UploadSessionAttributes,
    pub manga: Option<Relationship<Manga>>,
    pub groups: Vec<Relationship<Group>>,
    pub uploader: Option<Relationship<User>>,
}

impl UploadSession {
    pub async fn begin(client: &MangaDex, manga_id: &str, group_ids: &[String]) -> Result<UploadSession> {
        validate_id(manga_id)?;
        let body = json!({ "manga": manga_id, "groups": group_ids });
        let schema = client.fetch_with_body("/upload/begin", &body, Method::POST).await?;
        tracing::info!(session = %schema.id, manga = %manga_id, "began upload session");
        UploadSession::from_schema(&schema, client.registry())
    }

    /// The logged-in user's open session.
    pub async fn current(client: &MangaDex) -> Result<UploadSession> {
        let schema = client.fetch_entity_auth("/upload", Query::new()).await?;
        UploadSession::from_schema(&schema, client.registry())
    }

    /// Upload page images, batching requests as the API requires.
    pub async fn upload_pages(&self, client: &MangaDex, files: Vec<UploadFile>) -> Result<Vec<UploadedFile>> {
        let mut uploaded = Vec::with_capacity(files.len());
        let mut files = files.into_iter().peekable();
        while files.peek().is_some() {
            let batch: Vec<(String, UploadFile)> = files
                .by_ref()
                .take(MAX_FILES_PER_REQUEST)
                .enumerate()
                .map(|(i, f)| (format!("file{}", i + 1), f))
                .collect();
            let body = client.fetch_multipart(&format!("/upload/{}", self.id), Vec::new(), batch).await?;
            let data: Vec<EntitySchema> = match body.get("data") {
                Some(v) => serde_json::from_value(v.clone())?,
                None => Vec::new(),
            };
            for schema in data {
                let mut file: UploadedFile = parse_attributes(&schema)?;
                file.id = schema.id;
                uploaded.push(file);
            }
        }
        tracing::debug!(session = %self.id, count = uploaded.len(), "uploaded pages");
        Ok(uploaded)
    }

    pub async fn delete_file(&self, client: &MangaDex, file_id: &str) -> Result<()> {
        validate_id(file_id)?;
        client.execute(Method::DELETE, &format!("/upload/{}/{file_id}", self.id), None).await
    }

    /// Finish the session; `page_order` lists uploaded file ids in reading order.
    pub async fn commit(&self, client: &MangaDex, draft: &ChapterDraft, page_order: &[String]) -> Result<Chapter> {
        if page_order.is_empty() {
            return Err(Error::Unsupported("committing an upload session without pages"));
        }
        let body = json!({ "chapterDraft": draft, "pageOrder": page_order });
        let schema = client.fetch_with_body(&format!("/upload/{}/commit", self.id), &body, Method::POST).await?;
        tracing::info!(session = %self.id, chapter = %schema.id, "committed upload session");
        Chapter::from_schema(&schema, client.registry())
    }

    pub async fn abandon(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::DELETE, &format!("/upload/{}", self.id), None).await
    }
}

impl Resource for UploadSession {
    const KIND: &'static str = "upload_session";

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

    fn into_entity(self) -> Entity { Entity::UploadSession(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::UploadSession(s) => Ok(s),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for UploadSession {
    /// Sessions are only readable through `/upload`; any other id is not found.
    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> {
        let current = UploadSession::current(client).await?;
        if current.id == id { Ok(current) } else { Err(Error::NotFound(format!("upload_session {id}"))) }
    }
}
