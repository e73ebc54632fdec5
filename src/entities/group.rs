use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::User;
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
pub struct GroupAttributes {
    pub name: String,
    #[serde(default)]
    pub alt_names: Vec<LocalizedString>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub irc_server: Option<String>,
    #[serde(default)]
    pub irc_channel: Option<String>,
    #[serde(default)]
    pub discord: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "super::strings_skipping_nulls")]
    pub focused_languages: Vec<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub official: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub inactive: bool,
    /// ISO 8601 duration, e.g. `P6WT5M`.
    #[serde(default)]
    pub publish_delay: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u32,
}

/// Scanlation group.
#[derive(Debug, Clone)]
pub struct Group {
    id: String,
    pub attributes: GroupAttributes,
    pub leader: Option<Relationship<User>>,
    pub members: Vec<Relationship<User>>,
}

impl Group {
    pub fn name(&self) -> &str { &self.attributes.name }

    pub async fn get(client: &MangaDex, id: &str) -> Result<Group> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/group/{id}"), Query::new().includes(["leader", "member"])).await
    }

    pub async fn search(client: &MangaDex, name: &str, limit: Option<usize>) -> Result<Vec<Group>> {
        Self::get_by_query(client, Query::new().param("name", name), limit).await
    }

    pub async fn get_by_query(client: &MangaDex, query: Query, limit: Option<usize>) -> Result<Vec<Group>> {
        super::fetch_many(client, "/group", query, limit).await
    }

    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<Group>> {
        super::fetch_by_ids(client, "/group", ids, &[]).await
    }

    pub async fn update(&self, client: &MangaDex, changes: Value) -> Result<Group> {
        let body = super::with_version(changes, self.attributes.version);
        let schema = client.fetch_with_body(&format!("/group/{}", self.id), &body, Method::PUT).await?;
        Group::from_schema(&schema, client.registry())
    }

    pub async fn follow(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::POST, &format!("/group/{}/follow", self.id), None).await
    }

    pub async fn unfollow(&self, client: &MangaDex) -> Result<()> {
        client.execute(Method::DELETE, &format!("/group/{}/follow", self.id), None).await
    }
}

impl Resource for Group {
    const KIND: &'static str = "scanlation_group";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        let rels = &schema.relationships;
        Ok(Self {
            id: schema.id.clone(),
            attributes: parse_attributes(schema)?,
            leader: Relationship::convert_first("leader", rels, None, registry)?,
            members: Relationship::convert_type("member", rels, None, registry)?,
        })
    }

    fn into_entity(self) -> Entity { Entity::Group(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::Group(g) => Ok(g),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for Group {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { Group::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { Group::get_multiple(client, ids).await }
}
