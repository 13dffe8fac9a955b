//! Document API routes driven through the router without a socket.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use blockpress_core::{Block, Document, DocumentPatch, DocumentSummary, Seed};
use blockpress_server::{
    config::ServerConfig,
    ratelimit::RateLimitConfig,
    server::{router, AppState},
};
use blockpress_sync::{MemoryStore, Page, USER_HEADER};
use blockpress_types::UserId;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

fn app_with(store: &MemoryStore, rate_limit: RateLimitConfig) -> Router {
    let config = ServerConfig {
        rate_limit,
        ..ServerConfig::default()
    };
    router(AppState::new(config, store.clone()))
}

fn app(store: &MemoryStore) -> Router {
    app_with(
        store,
        RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
    )
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn alice() -> UserId {
    UserId::new("alice")
}

#[tokio::test]
async fn healthz_answers_ok() {
    let app = app(&MemoryStore::new());
    let response = send(&app, request(Method::GET, "/healthz", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_seeds_a_document_for_the_caller() {
    let store = MemoryStore::new();
    let app = app(&store);

    let response = send(
        &app,
        request(Method::POST, "/api/documents/createEmptyDoc", Some("alice"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let doc: Document = json(response).await;
    assert_eq!(doc.owner_id, alice());
    assert_eq!(doc.title, "Untitled");
    assert_eq!(doc.blocks.len(), 2);
    assert_eq!(store.get(&doc.id), Some(doc));
}

#[tokio::test]
async fn missing_header_acts_as_default_user() {
    let store = MemoryStore::new();
    let app = app(&store);

    let response = send(&app, request(Method::POST, "/api/documents/createEmptyDoc", None, None)).await;
    let doc: Document = json(response).await;
    assert_eq!(doc.owner_id, UserId::new("local"));
}

#[tokio::test]
async fn documents_are_private_to_their_owner() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::BlockEditor);
    let app = app(&store);
    let uri = format!("/api/documents/{}", doc.id);

    let own = send(&app, request(Method::GET, &uri, Some("alice"), None)).await;
    assert_eq!(own.status(), StatusCode::OK);
    assert_eq!(json::<Document>(own).await, doc);

    let other = send(&app, request(Method::GET, &uri, Some("bob"), None)).await;
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    let find = format!("/api/documents/findDoc/{}", doc.id);
    let found = send(&app, request(Method::GET, &find, Some("alice"), None)).await;
    assert!(json::<bool>(found).await);
    let hidden = send(&app, request(Method::GET, &find, Some("bob"), None)).await;
    assert!(!json::<bool>(hidden).await);
}

#[tokio::test]
async fn list_returns_summaries_most_recent_first() {
    let store = MemoryStore::new();
    let older = store.create(alice(), Seed::Plain);
    let newer = store.create(alice(), Seed::Plain);
    store.create(UserId::new("bob"), Seed::Plain);
    store
        .update(&alice(), &older.id, DocumentPatch::title("Touched"))
        .unwrap();
    let app = app(&store);

    let response = send(&app, request(Method::GET, "/api/documents/user", Some("alice"), None)).await;
    let list: Vec<DocumentSummary> = json(response).await;

    let ids: Vec<_> = list.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
    assert_eq!(list[0].title, "Touched");
}

#[tokio::test]
async fn patch_updates_title_and_blocks() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::BlockEditor);
    let app = app(&store);

    let patch = DocumentPatch {
        title: Some("Renamed".into()),
        blocks: Some(vec![Block::paragraph("hello")]),
        ..DocumentPatch::default()
    };
    let response = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/documents/{}", doc.id),
            Some("alice"),
            Some(serde_json::to_string(&patch).unwrap()),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated: Document = json(response).await;
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.blocks[0].plain_text(), "hello");
    assert!(updated.updated_at >= doc.updated_at);
}

#[tokio::test]
async fn invalid_patch_is_unprocessable() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::BlockEditor);
    let app = app(&store);

    let block = Block::paragraph("twice");
    let patch = DocumentPatch::blocks(vec![block.clone(), block]);
    let response = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/documents/{}", doc.id),
            Some("alice"),
            Some(serde_json::to_string(&patch).unwrap()),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.get(&doc.id), Some(doc));
}

#[tokio::test]
async fn patching_someone_elses_document_is_not_found() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::BlockEditor);
    let app = app(&store);

    let response = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/documents/{}", doc.id),
            Some("mallory"),
            Some(r#"{"title":"mine now"}"#.into()),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_once() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::Plain);
    let app = app(&store);
    let uri = format!("/api/documents/{}", doc.id);

    let first = send(&app, request(Method::DELETE, &uri, Some("alice"), None)).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert!(json::<bool>(first).await);

    let second = send(&app, request(Method::DELETE, &uri, Some("alice"), None)).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert!(store.is_empty());
}

#[tokio::test]
async fn public_routes_follow_visibility() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::BlockEditor);
    store
        .update(
            &alice(),
            &doc.id,
            DocumentPatch {
                title: Some("Shared".into()),
                blocks: Some(vec![Block::heading(1, "Shared"), Block::paragraph("Body text")]),
                ..DocumentPatch::default()
            },
        )
        .unwrap();
    let app = app(&store);
    let public = format!("/api/public/{}", doc.id);

    let hidden = send(&app, request(Method::GET, &public, None, None)).await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let published = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/documents/{}/publish", doc.id),
            Some("alice"),
            None,
        ),
    )
    .await;
    assert!(json::<bool>(published).await);

    let visible = send(&app, request(Method::GET, &public, Some("bob"), None)).await;
    assert_eq!(visible.status(), StatusCode::OK);
    assert!(json::<Document>(visible).await.is_public);

    let markdown = send(&app, request(Method::GET, &format!("{public}/markdown"), None, None)).await;
    assert_eq!(
        markdown.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );
    let body = text(markdown).await;
    assert!(body.starts_with("# Shared"));
    assert!(body.contains("Body text"));

    send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/documents/{}/unpublish", doc.id),
            Some("alice"),
            None,
        ),
    )
    .await;
    let again = send(&app, request(Method::GET, &public, None, None)).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn writes_are_rate_limited_per_user() {
    let store = MemoryStore::new();
    let app = app_with(
        &store,
        RateLimitConfig {
            burst: 2,
            refill_rate: 0.01,
            enabled: true,
        },
    );
    let create = || request(Method::POST, "/api/documents/createEmptyDoc", Some("alice"), None);

    assert_eq!(send(&app, create()).await.status(), StatusCode::CREATED);
    assert_eq!(send(&app, create()).await.status(), StatusCode::CREATED);

    let limited = send(&app, create()).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));

    // Reads and other users are unaffected.
    let list = send(&app, request(Method::GET, "/api/documents/user", Some("alice"), None)).await;
    assert_eq!(list.status(), StatusCode::OK);
    let bob = send(
        &app,
        request(Method::POST, "/api/documents/createEmptyDoc", Some("bob"), None),
    )
    .await;
    assert_eq!(bob.status(), StatusCode::CREATED);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn public_listing_pages_published_documents() {
    let store = MemoryStore::new();
    store.create(alice(), Seed::Plain);
    for i in 0..3 {
        let owner = UserId::new(format!("writer{i}"));
        let doc = store.create(owner.clone(), Seed::Plain);
        assert!(store.set_public(&owner, &doc.id, true));
    }
    let app = app(&store);

    let response = send(&app, request(Method::GET, "/api/public/documents", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let all: Page<DocumentSummary> = json(response).await;
    assert_eq!((all.meta.page, all.meta.limit, all.meta.total), (1, 20, 3));
    assert_eq!(all.data.len(), 3);
    assert!(all.data.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));

    let last = send(
        &app,
        request(Method::GET, "/api/public/documents?page=2&limit=2", None, None),
    )
    .await;
    let last: Page<DocumentSummary> = json(last).await;
    assert_eq!(last.data.len(), 1);
    assert_eq!(last.meta.total, 3);

    let past = send(
        &app,
        request(Method::GET, "/api/public/documents?page=3&limit=2", None, None),
    )
    .await;
    let past: Page<DocumentSummary> = json(past).await;
    assert!(past.data.is_empty());
    assert_eq!(past.meta.page, 3);
}

#[tokio::test]
async fn public_listing_raw_json_shape() {
    let store = MemoryStore::new();
    let doc = store.create(alice(), Seed::BlockEditor);
    store.set_public(&alice(), &doc.id, true);
    let app = app(&store);

    let response = send(
        &app,
        request(Method::GET, "/api/public/documents?limit=5", None, None),
    )
    .await;
    let body: serde_json::Value = json(response).await;

    assert_eq!(body["meta"], serde_json::json!({ "page": 1, "limit": 5, "total": 1 }));
    assert_eq!(body["data"][0]["id"], doc.id.as_str());
    assert_eq!(body["data"][0]["title"], "Untitled");
}
