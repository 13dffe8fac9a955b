//! `HttpStore` and `EditorSession` talking to a live server.

use std::net::SocketAddr;
use std::sync::Arc;

use blockpress_core::{Block, BlockKind, DocumentPatch, EditorEvent};
use blockpress_server::{
    config::ServerConfig,
    ratelimit::RateLimitConfig,
    server::{router, AppState},
};
use blockpress_sync::{DocumentStore, EditorSession, HttpStore, MemoryStore, StoreError, SyncConfig};
use blockpress_types::{DocId, UserId};

async fn spawn_server(store: MemoryStore) -> SocketAddr {
    let config = ServerConfig {
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        ..ServerConfig::default()
    };
    let app = router(AppState::new(config, store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, user: &str) -> HttpStore {
    HttpStore::new(format!("http://{addr}/"), Some(UserId::new(user))).unwrap()
}

#[tokio::test]
async fn store_operations_round_trip_over_http() {
    let shared = MemoryStore::new();
    let addr = spawn_server(shared.clone()).await;
    let alice = client(addr, "alice");

    let doc = alice.create_empty_document().await.unwrap();
    assert_eq!(alice.get_document(&doc.id).await.unwrap(), Some(doc.clone()));

    let updated = alice
        .update_document(&doc.id, DocumentPatch::title("Over the wire"))
        .await
        .unwrap();
    assert_eq!(updated.title, "Over the wire");
    assert_eq!(shared.get(&doc.id).unwrap().title, "Over the wire");

    let list = alice.list_user_documents().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "Over the wire");

    assert!(alice.publish_document(&doc.id).await.unwrap());
    assert!(shared.get_public(&doc.id).is_some());
    assert!(alice.unpublish_document(&doc.id).await.unwrap());

    assert!(alice.delete_document(&doc.id).await.unwrap());
    assert!(!alice.delete_document(&doc.id).await.unwrap());
    assert_eq!(alice.get_document(&doc.id).await.unwrap(), None);
}

#[tokio::test]
async fn server_errors_map_to_store_errors() {
    let shared = MemoryStore::new();
    let addr = spawn_server(shared.clone()).await;
    let alice = client(addr, "alice");
    let doc = alice.create_empty_document().await.unwrap();

    let block = Block::paragraph("dup");
    let err = alice
        .update_document(&doc.id, DocumentPatch::blocks(vec![block.clone(), block]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let ghost = DocId::new("ghost");
    let err = alice
        .update_document(&ghost, DocumentPatch::title("x"))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::NotFound(ghost));

    // Another user sees nothing.
    let bob = client(addr, "bob");
    assert_eq!(bob.get_document(&doc.id).await.unwrap(), None);
}

#[tokio::test]
async fn unreachable_server_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, "alice").list_user_documents().await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn editor_session_saves_through_the_api() {
    let shared = MemoryStore::new();
    let addr = spawn_server(shared.clone()).await;
    let store = Arc::new(client(addr, "alice"));
    let config = SyncConfig {
        debounce_ms: 20,
        ..SyncConfig::default()
    };
    let mut session = EditorSession::new(store, config);

    let id = session.create_document().await.unwrap();
    let heading = session.editor().blocks()[0].id.clone();
    session.set_title("Typed remotely");
    session.editor_mut().select(&heading, 0);
    session
        .editor_mut()
        .create_block(BlockKind::Blockquote, Some(&heading))
        .unwrap();
    session.handle(EditorEvent::Paste("pasted".into()));
    session.idle().await;

    let saved = shared.get(&id).unwrap();
    assert_eq!(saved.title, "Typed remotely");
    assert_eq!(saved.blocks.len(), 3);
    assert_eq!(saved.blocks[1].kind, BlockKind::Blockquote);
    assert_eq!(saved.owner_id, UserId::new("alice"));
}
