mod common;

use std::sync::Arc;

use common::*;
use futures::future::join_all;
use mangadex_client::auth::{AuthClient, LegacyClient, PersonalClient, PersonalCredentials};
use mangadex_client::file_store::FileTokenStore;
use mangadex_client::prelude::*;
use mangadex_client::storage::{TokenRecord, TokenStore};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> PersonalCredentials {
    PersonalCredentials {
        client_id: "personal-client-abc".into(),
        client_secret: "s3cret".into(),
        username: "reader".into(),
        password: "hunter2".into(),
    }
}

fn now_ms() -> i64 { chrono::Utc::now().timestamp_millis() }

#[tokio::test]
async fn personal_client_refreshes_once_for_concurrent_callers() {
    let server = MockServer::start().await;
    // Expires inside the safety margin, so the first use must refresh.
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "a1", "refresh_token": "r1", "expires_in": 5})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "a2", "refresh_token": "r2", "expires_in": 900})))
        .expect(1)
        .mount(&server)
        .await;

    let auth = Arc::new(PersonalClient::login(&config_for(&server), credentials()).await.unwrap());
    let tokens = join_all((0..5).map(|_| {
        let auth = auth.clone();
        async move { auth.session_token().await }
    }))
    .await;
    for token in tokens {
        assert_eq!(token.unwrap(), "a2");
    }
}

#[tokio::test]
async fn personal_client_rejects_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant", "error_description": "Invalid user credentials"})))
        .mount(&server)
        .await;

    let err = PersonalClient::login(&config_for(&server), credentials()).await.err().unwrap();
    assert!(matches!(err, Error::Auth(ref m) if m == "Invalid user credentials"));
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn legacy_client_reuses_a_fresh_cached_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).and(path("/auth/login")).respond_with(ResponseTemplate::new(500)).expect(0).mount(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/manga/{MANGA_ID}/follow")))
        .and(header("authorization", "Bearer cached-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path()));
    let record = TokenRecord { session: "cached-session".into(), expires_at: now_ms() + 10 * 60 * 1000, refresh: "cached-refresh".into() };
    store.save("reader", &record).await.unwrap();

    let config = config_for(&server);
    let auth = LegacyClient::login(&config, "reader", None, Some(store as Arc<dyn TokenStore>)).await.unwrap();
    let client = MangaDex::builder().config(config).auth(Arc::new(auth)).build().unwrap();

    let manga = Manga::from_schema(&serde_json::from_value(manga_json(MANGA_ID, "Frieren")).unwrap(), client.registry()).unwrap();
    manga.follow(&client).await.unwrap();
}

#[tokio::test]
async fn legacy_client_refreshes_a_stale_cached_session_and_persists_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_string_contains("old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok", "token": {"session": "s2", "refresh": "r2"}})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path()));
    store.save("reader", &TokenRecord { session: "old".into(), expires_at: now_ms() - 1, refresh: "old-refresh".into() }).await.unwrap();

    let auth = LegacyClient::login(&config_for(&server), "reader", None, Some(store.clone() as Arc<dyn TokenStore>)).await.unwrap();
    assert_eq!(auth.session_token().await.unwrap(), "s2");

    let saved = store.load("reader").await.unwrap().unwrap();
    assert_eq!((saved.session.as_str(), saved.refresh.as_str()), ("s2", "r2"));
    assert!(saved.is_fresh(now_ms()));
}

#[tokio::test]
async fn legacy_login_replaces_an_unreadable_cached_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_string_contains("reader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok", "token": {"session": "fresh", "refresh": "fresh-refresh"}})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("reader.token"), "garbage").unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path()));
    assert!(store.load("reader").await.is_err());

    let auth = LegacyClient::login(&config_for(&server), "reader", Some("pw"), Some(store.clone() as Arc<dyn TokenStore>)).await.unwrap();
    assert_eq!(auth.session_token().await.unwrap(), "fresh");

    let saved = store.load("reader").await.unwrap().unwrap();
    assert_eq!(saved.session, "fresh");
}

#[tokio::test]
async fn legacy_login_failure_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "result": "error",
            "errors": [{"status": 401, "title": "Unauthorized", "detail": "User / Password does not match"}]
        })))
        .mount(&server)
        .await;

    let err = LegacyClient::login(&config_for(&server), "reader", Some("wrong"), None).await.err().unwrap();
    assert!(matches!(err, Error::Auth(ref m) if m.contains("does not match")));
}

#[tokio::test]
async fn legacy_login_without_password_or_cache_requires_auth() {
    let server = MockServer::start().await;
    let err = LegacyClient::login(&config_for(&server), "reader", None, None).await.err().unwrap();
    assert!(matches!(err, Error::AuthRequired));
}
