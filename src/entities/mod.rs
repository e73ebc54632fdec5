//! Typed MangaDex resources.
//!
//! Every entity is an immutable snapshot built from an [`EntitySchema`]
//! without I/O. Static factories (`get`, `search`, `get_multiple`, ...) fetch
//! first and construct afterwards; `update` returns a fresh instance.

mod author;
mod chapter;
mod cover;
mod group;
mod list;
mod manga;
mod tag;
mod upload;
mod user;

pub use author::{Author, AuthorAttributes};
pub use chapter::{Chapter, ChapterAttributes};
pub use cover::{Cover, CoverAttributes, CoverSize};
pub use group::{Group, GroupAttributes};
pub use list::{List, ListAttributes, Visibility};
pub use manga::{ContentRating, Demographic, Manga, MangaAttributes, MangaState, MangaStatus, ReadingStatus};
pub use tag::{Tag, TagAttributes, TagGroup};
pub use upload::{ChapterDraft, UploadSession, UploadSessionAttributes, UploadedFile};
pub use user::{User, UserAttributes};

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::entity::{EntityResolver, Resource};
use crate::error::Result;
use crate::network::Query;
use crate::registry::TypeRegistry;
use crate::schema::EntitySchema;
use crate::MangaDex;

/// Most `ids[]` the API accepts in one list request.
pub(crate) const MAX_IDS_PER_REQUEST: usize = 100;

/// Relationship tags that resolve to each entity kind.
pub(crate) fn register_standard_types(registry: &TypeRegistry) -> Result<()> {
    registry.register_types(&["manga"], Arc::new(EntityResolver::<Manga>::new()))?;
    registry.register_types(&["chapter"], Arc::new(EntityResolver::<Chapter>::new()))?;
    registry.register_types(&["author", "artist"], Arc::new(EntityResolver::<Author>::new()))?;
    registry.register_types(&["cover_art"], Arc::new(EntityResolver::<Cover>::new()))?;
    registry.register_types(&["scanlation_group"], Arc::new(EntityResolver::<Group>::new()))?;
    registry.register_types(&["user", "leader", "member", "creator"], Arc::new(EntityResolver::<User>::new()))?;
    registry.register_types(&["custom_list"], Arc::new(EntityResolver::<List>::new()))?;
    registry.register_types(&["tag"], Arc::new(EntityResolver::<Tag>::new()))?;
    registry.register_types(&["upload_session"], Arc::new(EntityResolver::<UploadSession>::new()))?;
    Ok(())
}

pub(crate) fn parse_all<T: Resource>(schemas: &[EntitySchema], registry: &TypeRegistry) -> Result<Vec<T>> {
    schemas.iter().map(|s| T::from_schema(s, registry)).collect()
}

pub(crate) async fn fetch_one<T: Resource>(client: &MangaDex, path: &str, query: Query) -> Result<T> {
    let schema = client.fetch_entity(path, query).await?;
    T::from_schema(&schema, client.registry())
}

pub(crate) async fn fetch_many<T: Resource>(client: &MangaDex, path: &str, query: Query, limit: Option<usize>) -> Result<Vec<T>> {
    let schemas = client.fetch_list(path, query, limit).await?;
    parse_all(&schemas, client.registry())
}

/// `GET path?ids[]=...` in chunks of [`MAX_IDS_PER_REQUEST`]; results come back in server order.
pub(crate) async fn fetch_by_ids<T: Resource>(client: &MangaDex, path: &str, ids: &[String], includes: &[&str]) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
        for id in chunk {
            crate::entity::validate_id(id)?;
        }
        let query = Query::new().array("ids", chunk).includes(includes.iter().copied());
        out.extend(fetch_many::<T>(client, path, query, Some(chunk.len())).await?);
    }
    Ok(out)
}

/// Update bodies must echo the entity version the change was based on.
pub(crate) fn with_version(changes: Value, version: u32) -> Value {
    match changes {
        Value::Object(mut map) => {
            map.insert("version".into(), version.into());
            Value::Object(map)
        }
        other => other,
    }
}

/// Language lists occasionally contain `null` entries; drop them.
pub(crate) fn strings_skipping_nulls<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<String>, D::Error> {
    let raw: Option<Vec<Option<String>>> = Option::deserialize(de)?;
    Ok(raw.unwrap_or_default().into_iter().flatten().collect())
}
