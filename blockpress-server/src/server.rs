use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use blockpress_core::{document_to_markdown, DocumentPatch, Seed};
use blockpress_sync::MemoryStore;
use serde::Deserialize;
use blockpress_types::{DocId, UserId};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{
    auth::{ApiError, Caller, IdentityConfig},
    config::ServerConfig,
    persist,
    ratelimit::RateLimiter,
};

/// Rate limit buckets idle this long are dropped.
const BUCKET_IDLE: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: MemoryStore,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: MemoryStore) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            config: Arc::new(config),
            store,
            rate_limiter,
        }
    }
}

/// All routes, ready to serve or to drive in tests.
pub fn router(state: AppState) -> Router {
    let identity = IdentityConfig {
        default_user: state.config.default_user.clone(),
    };

    Router::new()
        .route("/healthz", get(healthz))
        // Owner-scoped document API
        .route("/api/documents/createEmptyDoc", post(create_empty_doc))
        .route("/api/documents/user", get(list_user_docs))
        .route("/api/documents/findDoc/{id}", get(find_doc))
        .route(
            "/api/documents/{id}",
            get(get_doc).patch(update_doc).delete(delete_doc),
        )
        .route("/api/documents/{id}/publish", patch(publish_doc))
        .route("/api/documents/{id}/unpublish", patch(unpublish_doc))
        // Published documents, readable by anyone
        .route("/api/public/documents", get(list_public_docs))
        .route("/api/public/{id}", get(public_doc))
        .route("/api/public/{id}/markdown", get(public_markdown))
        .layer(Extension(identity))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let store = match &config.data_file {
        Some(path) => persist::load(path).await?,
        None => {
            warn!("no data file configured; documents will not survive a restart");
            MemoryStore::new()
        }
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    let flusher = config.data_file.clone().map(|path| {
        persist::spawn_flusher(store.clone(), path, config.flush_interval, stop_rx.clone())
    });

    let state = AppState::new(config, store);
    let sweeper = spawn_bucket_sweeper(state.rate_limiter.clone(), stop_rx);
    let listen_addr = state.config.listen_addr.clone();
    let app = router(state);

    info!(addr = %listen_addr, "blockpress-server listening");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    let _ = stop_tx.send(true);
    if let Some(flusher) = flusher {
        flusher.await?;
    }
    sweeper.await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn spawn_bucket_sweeper(
    limiter: Arc<RateLimiter>,
    mut stop: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(BUCKET_IDLE);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dropped = limiter.sweep(BUCKET_IDLE);
                    if dropped > 0 {
                        debug!(dropped, "idle rate limit buckets dropped");
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

fn check_rate_limit(state: &AppState, user: &UserId) -> Result<(), ApiError> {
    state.rate_limiter.check(user).map_err(|retry_after| {
        debug!(%user, "write rate limited");
        ApiError::RateLimited {
            retry_after_secs: retry_after.as_secs().max(1),
        }
    })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// ─────────────────────────────────────────────────────────────────────────────
// Owner-scoped documents
// ─────────────────────────────────────────────────────────────────────────────

async fn create_empty_doc(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, ApiError> {
    check_rate_limit(&state, &user)?;
    let doc = state.store.create(user, Seed::BlockEditor);
    info!(id = %doc.id, owner = %doc.owner_id, "document created");
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn list_user_docs(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> impl IntoResponse {
    Json(state.store.list(&user))
}

async fn get_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .get_owned(&user, &id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn find_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
    Caller(user): Caller,
) -> impl IntoResponse {
    Json(state.store.get_owned(&user, &id).is_some())
}

async fn update_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(patch): Json<DocumentPatch>,
) -> Result<impl IntoResponse, ApiError> {
    check_rate_limit(&state, &user)?;
    let doc = state.store.update(&user, &id, patch)?;
    debug!(%id, "document updated");
    Ok(Json(doc))
}

async fn delete_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, ApiError> {
    check_rate_limit(&state, &user)?;
    if !state.store.delete(&user, &id) {
        return Err(ApiError::NotFound);
    }
    info!(%id, "document deleted");
    Ok(Json(true))
}

async fn publish_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, ApiError> {
    set_visibility(&state, &user, &id, true)
}

async fn unpublish_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, ApiError> {
    set_visibility(&state, &user, &id, false)
}

fn set_visibility(
    state: &AppState,
    user: &UserId,
    id: &DocId,
    is_public: bool,
) -> Result<Json<bool>, ApiError> {
    check_rate_limit(state, user)?;
    let changed = state.store.set_public(user, id, is_public);
    if changed {
        info!(%id, is_public, "visibility changed");
    }
    Ok(Json(changed))
}

// ─────────────────────────────────────────────────────────────────────────────
// Published documents
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

async fn list_public_docs(
    Query(query): Query<PageQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    Json(state.store.list_public(query.page, query.limit))
}

async fn public_doc(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.get_public(&id).map(Json).ok_or(ApiError::NotFound)
}

async fn public_markdown(
    Path(id): Path<DocId>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.store.get_public(&id).ok_or(ApiError::NotFound)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        document_to_markdown(&doc),
    ))
}
