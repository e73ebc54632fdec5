use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::{parse_attributes, Entity, Fetch, Resource};
use crate::error::{Error, Result};
use crate::locale::LocalizedString;
use crate::network::ApiRequest;
use crate::registry::TypeRegistry;
use crate::schema::{CollectionEnvelope, EntitySchema};
use crate::MangaDex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagGroup {
    Content,
    Format,
    Genre,
    Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagAttributes {
    pub name: LocalizedString,
    #[serde(default)]
    pub description: LocalizedString,
    pub group: TagGroup,
    #[serde(default)]
    pub version: u32,
}

/// Genre, theme, format or content tag. The full set is fetched once per client.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    id: String,
    pub attributes: TagAttributes,
}

impl Tag {
    pub fn name(&self) -> &str { self.attributes.name.local_string() }
    pub fn group(&self) -> TagGroup { self.attributes.group }

    /// Every tag, fetched on first use and shared by clones of `client`.
    pub async fn all(client: &MangaDex) -> Result<Arc<Vec<Tag>>> {
        let loader = client.clone();
        client
            .cached_tags(move || async move {
                let envelope: CollectionEnvelope = loader.fetch_raw(ApiRequest::new(reqwest::Method::GET, "/manga/tag"), false).await?;
                tracing::debug!(count = envelope.data.len(), "loaded tag list");
                super::parse_all(&envelope.data, loader.registry())
            })
            .await
    }

    pub async fn get(client: &MangaDex, id: &str) -> Result<Tag> {
        Self::all(client)
            .await?
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("tag {id}")))
    }

    /// Tags for `ids`, in the order given.
    pub async fn get_multiple(client: &MangaDex, ids: &[String]) -> Result<Vec<Tag>> {
        let all = Self::all(client).await?;
        ids.iter()
            .map(|id| all.iter().find(|t| &t.id == id).cloned().ok_or_else(|| Error::NotFound(format!("tag {id}"))))
            .collect()
    }

    /// Case-insensitive match against the tag name in any locale.
    pub async fn by_name(client: &MangaDex, name: &str) -> Result<Option<Tag>> {
        Ok(Self::all(client).await?.iter().find(|t| t.attributes.name.matches_any(name)).cloned())
    }
}

impl Resource for Tag {
    const KIND: &'static str = "tag";

    fn id(&self) -> &str { &self.id }

    fn from_schema(schema: &EntitySchema, _registry: &TypeRegistry) -> Result<Self> {
        Ok(Self { id: schema.id.clone(), attributes: parse_attributes(schema)? })
    }

    fn into_entity(self) -> Entity { Entity::Tag(self) }

    fn from_entity(entity: Entity) -> std::result::Result<Self, Entity> {
        match entity {
            Entity::Tag(t) => Ok(t),
            other => Err(other),
        }
    }
}

#[async_trait]
impl Fetch for Tag {
    const BATCH: bool = true;

    async fn fetch(client: &MangaDex, id: &str) -> Result<Self> { Tag::get(client, id).await }

    async fn fetch_many(client: &MangaDex, ids: &[String]) -> Result<Vec<Self>> { Tag::get_multiple(client, ids).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockTransport};

    fn transport_with_tags() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        let mut body = testing::collection("tag", &["Action", "Romance"], 0, 2);
        body["data"][1]["attributes"]["name"] = serde_json::json!({"en": "Romance", "ja": "恋愛"});
        transport.respond("/manga/tag", body);
        transport
    }

    #[tokio::test]
    async fn tag_list_is_fetched_once() {
        let transport = transport_with_tags();
        let client = testing::client(transport.clone(), TypeRegistry::standard());
        let first = Tag::all(&client).await.unwrap();
        let again = Tag::all(&client.clone()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn lookup_by_name_and_id() {
        let client = testing::client(transport_with_tags(), TypeRegistry::standard());
        let romance = Tag::by_name(&client, "恋愛").await.unwrap().unwrap();
        assert_eq!(romance.id(), "Romance");
        assert_eq!(romance.group(), TagGroup::Genre);
        assert!(Tag::by_name(&client, "ACTION").await.unwrap().is_some());
        assert!(Tag::by_name(&client, "Horror").await.unwrap().is_none());

        let ids = vec!["Romance".to_string(), "Action".to_string()];
        let got: Vec<String> = Tag::get_multiple(&client, &ids).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(got, ids);
        assert!(Tag::get(&client, "Horror").await.unwrap_err().is_not_found());
    }
}
