//! [`DocumentStore`] backed by the blockpress HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use blockpress_core::{Document, DocumentPatch, DocumentSummary};
use blockpress_types::{DocId, UserId};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::DocumentStore;

/// Header carrying the caller's identity
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    user: Option<UserId>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, user: Option<UserId>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Transient(format!("failed to create HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            user,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/documents{}", self.base_url, path);
        let mut request = self.client.request(method, url);
        if let Some(ref user) = self.user {
            request = request.header(USER_HEADER, user.as_str());
        }
        request
    }

    async fn send(&self, request: RequestBuilder, id: Option<&DocId>) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(%status, body = %body, "document request failed");
        Err(match status {
            StatusCode::NOT_FOUND => match id {
                Some(id) => StoreError::NotFound(id.clone()),
                None => StoreError::Transient(format!("{status}: {body}")),
            },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::Validation(body)
            }
            _ => StoreError::Transient(format!("{status}: {body}")),
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, id: Option<&DocId>) -> Result<T> {
        let response = self.send(request, id).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn get_document(&self, id: &DocId) -> Result<Option<Document>> {
        let request = self.request(Method::GET, &format!("/{id}"));
        match self.json(request, Some(id)).await {
            Ok(doc) => Ok(Some(doc)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_empty_document(&self) -> Result<Document> {
        let request = self.request(Method::POST, "/createEmptyDoc");
        self.json(request, None).await
    }

    async fn update_document(&self, id: &DocId, patch: DocumentPatch) -> Result<Document> {
        let request = self.request(Method::PATCH, &format!("/{id}")).json(&patch);
        self.json(request, Some(id)).await
    }

    async fn delete_document(&self, id: &DocId) -> Result<bool> {
        let request = self.request(Method::DELETE, &format!("/{id}"));
        match self.json(request, Some(id)).await {
            Err(StoreError::NotFound(_)) => Ok(false),
            other => other,
        }
    }

    async fn publish_document(&self, id: &DocId) -> Result<bool> {
        let request = self.request(Method::PATCH, &format!("/{id}/publish"));
        self.json(request, Some(id)).await
    }

    async fn unpublish_document(&self, id: &DocId) -> Result<bool> {
        let request = self.request(Method::PATCH, &format!("/{id}/unpublish"));
        self.json(request, Some(id)).await
    }

    async fn list_user_documents(&self) -> Result<Vec<DocumentSummary>> {
        let request = self.request(Method::GET, "/user");
        self.json(request, None).await
    }
}
