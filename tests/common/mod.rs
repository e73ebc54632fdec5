#![allow(dead_code)]

use mangadex_client::{ClientConfig, MangaDex};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const MANGA_ID: &str = "a96676e5-8ae2-425e-b549-7f15dd34a6d8";
pub const AUTHOR_ID: &str = "f8cc4f8a-e596-4618-ab05-ef6572980bbf";
pub const ARTIST_ID: &str = "2e2c5d4f-4b41-4b04-8d1e-7a1c4a7c9d10";
pub const COVER_ID: &str = "b6c1c4a4-3c40-4b0a-9c1f-0c7b0b7a2f11";
pub const CHAPTER_ID: &str = "5e8bc984-5f3b-4bb9-8a2b-1e6c9c8d2a3f";

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_url: server.uri(),
        auth_url: format!("{}/token", server.uri()),
        uploads_url: format!("{}/uploads", server.uri()),
        rate_limit_ms: 0,
        ..Default::default()
    }
}

pub fn client_for(server: &MockServer) -> MangaDex {
    MangaDex::builder().config(config_for(server)).build().expect("client")
}

pub fn manga_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "type": "manga",
        "attributes": {
            "title": {"en": title},
            "altTitles": [{"ja": "葬送のフリーレン"}],
            "description": {"en": "After the party defeats the Demon King."},
            "originalLanguage": "ja",
            "status": "ongoing",
            "year": 2020,
            "contentRating": "safe",
            "tags": [],
            "version": 7
        },
        "relationships": [
            {"id": AUTHOR_ID, "type": "author", "attributes": {"name": "Yamada Kanehito"}},
            {"id": ARTIST_ID, "type": "artist"},
            {"id": COVER_ID, "type": "cover_art", "attributes": {"fileName": "cover.jpg", "volume": "1", "version": 1}}
        ]
    })
}

pub fn author_json(id: &str, name: &str) -> Value {
    json!({"id": id, "type": "author", "attributes": {"name": name, "biography": {}, "version": 1}, "relationships": []})
}

pub fn ok_entity(data: Value) -> Value { json!({"result": "ok", "response": "entity", "data": data}) }

pub fn ok_collection(data: Vec<Value>, offset: usize, total: usize) -> Value {
    json!({"result": "ok", "response": "collection", "limit": data.len(), "offset": offset, "total": total, "data": data})
}
