use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw resource object as the API returns it under `data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySchema {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

/// Edge descriptor inside a schema's `relationships` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRelationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<MangaRelated>,
    // Present only when the request asked for reference expansion of this edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
}

impl RawRelationship {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { id: id.into(), kind: kind.into(), related: None, attributes: None }
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self { self.attributes = Some(attributes); self }
    pub fn with_related(mut self, related: MangaRelated) -> Self { self.related = Some(related); self }
}

/// Relation kind on manga-to-manga edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MangaRelated {
    Monochrome,
    MainStory,
    AdaptedFrom,
    BasedOn,
    Prequel,
    SideStory,
    Doujinshi,
    SameFranchise,
    SharedUniverse,
    Sequel,
    SpinOff,
    AlternateStory,
    AlternateVersion,
    Preserialization,
    Colored,
    Serialization,
    #[serde(other)]
    Unknown,
}

/// One entry of an error envelope.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiErrorDetail {
    pub(crate) fn message(&self) -> Option<String> {
        match (&self.title, &self.detail) {
            (Some(t), Some(d)) if !d.is_empty() => Some(format!("{t}: {d}")),
            (_, Some(d)) if !d.is_empty() => Some(d.clone()),
            (Some(t), _) => Some(t.clone()),
            _ => None,
        }
    }
}

/// `{"result": "ok", "data": [...], "limit", "offset", "total"}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CollectionEnvelope {
    #[serde(default)]
    pub data: Vec<EntitySchema>,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub total: usize,
}

/// `{"result": "ok", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EntityEnvelope {
    pub data: EntitySchema,
}
