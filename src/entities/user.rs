use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Group;
use crate::entity::{parse_attributes, validate_id, Entity, Fetch, Resource};
use crate::error::Result;
use crate::network::Query;
use crate::registry::TypeRegistry;
use crate::relationship::Relationship;
use crate::schema::EntitySchema;
use crate::MangaDex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub version: u32,
}

/// A MangaDex account. Leaders, members, uploaders and list creators all resolve here.
#[derive(Debug, Clone)]
pub struct User {
    id: String,
    pub attributes: UserAttributes,
    pub groups: Vec<Relationship<Group>>,
}

impl User {
    pub fn username(&self) -> &str { &self.attributes.username }

    pub async fn get(client: &MangaDex, id: &str) -> Result<User> {
        validate_id(id)?;
        super::fetch_one(client, &format!("/user/{id}"), Query::new()).await
    }

    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<User>> {
        super::fetch_by_ids(client, "/user", ids, &[]).await
    }

    /// Username search; the endpoint requires a session.
    pub async fn search(client: &MangaDex, username: &str, limit: Option<usize>) -> Result<Vec<User>> {
        let schemas = client.fetch_list_auth("/user", Query::new().param("username", username), limit).await?;
        super::parse_all(&schemas, client.registry())
    }

    /// The account behind the active session.
    pub async fn me(client: &MangaDex) -> Result<User> {
        let schema = client.fetch_entity_auth("/user/me", Query::new()).await?;
        User::from_schema(&schema, client.registry())
    }

    /// Groups the logged-in user follows.
    pub async fn followed_groups(client: &MangaDex, limit: Option<usize>) -> Result<Vec<Group>> {
        let schemas = client.fetch_list_auth("/user/follows/group", Query::new(), limit).await?;
        super::parse_all(&schemas, client.registry())
    }
}

impl Resource for User {
    const KIND: &'static str = "user";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, registry: &TypeRegistry) -> Result<Self> {
        Ok(Self {
            id: schema.id.clone(),
            attributes: parse_attributes(schema)?,
            groups: Relationship::convert_type("scanlation_group", &schema.relationships, None, registry)?,
        })
    }

    fn into_entity(self) -> Entity { Entity::User(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::User(u) => Ok(u),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for User {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { User::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { User::get_multiple(client, ids).await }
}
