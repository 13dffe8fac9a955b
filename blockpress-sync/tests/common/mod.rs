//! Store double shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blockpress_core::{Document, DocumentPatch, DocumentSummary};
use blockpress_sync::{DocumentStore, MemoryStore, Result, StoreError, UserStore};
use blockpress_types::{DocId, UserId};
use parking_lot::Mutex;

/// Wraps a [`UserStore`], records every save and can delay or fail them.
pub struct RecordingStore {
    pub shared: MemoryStore,
    inner: UserStore,
    pub saves: Mutex<Vec<(DocId, DocumentPatch)>>,
    latency: Duration,
    failures: Mutex<VecDeque<StoreError>>,
    pub fail_gets: AtomicBool,
    gets: AtomicUsize,
}

impl RecordingStore {
    pub fn new(latency: Duration) -> Arc<Self> {
        let shared = MemoryStore::new();
        Arc::new(Self {
            inner: shared.for_user(UserId::new("alice")),
            shared,
            saves: Mutex::new(Vec::new()),
            latency,
            failures: Mutex::new(VecDeque::new()),
            fail_gets: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
        })
    }

    pub fn user(&self) -> UserId {
        self.inner.user().clone()
    }

    pub fn fail_next_save(&self, err: StoreError) {
        self.failures.lock().push_back(err);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    /// Number of `get_document` calls that reached the store.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn saves_for(&self, id: &DocId) -> Vec<DocumentPatch> {
        self.saves
            .lock()
            .iter()
            .filter(|(doc, _)| doc == id)
            .map(|(_, patch)| patch.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn get_document(&self, id: &DocId) -> Result<Option<Document>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("connection reset".into()));
        }
        self.inner.get_document(id).await
    }

    async fn create_empty_document(&self) -> Result<Document> {
        self.inner.create_empty_document().await
    }

    async fn update_document(&self, id: &DocId, patch: DocumentPatch) -> Result<Document> {
        self.saves.lock().push((id.clone(), patch.clone()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let failure = self.failures.lock().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.inner.update_document(id, patch).await
    }

    async fn delete_document(&self, id: &DocId) -> Result<bool> {
        self.inner.delete_document(id).await
    }

    async fn publish_document(&self, id: &DocId) -> Result<bool> {
        self.inner.publish_document(id).await
    }

    async fn unpublish_document(&self, id: &DocId) -> Result<bool> {
        self.inner.unpublish_document(id).await
    }

    async fn list_user_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.inner.list_user_documents().await
    }
}
