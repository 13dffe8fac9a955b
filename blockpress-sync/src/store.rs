//! The document store seam and its in-memory implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use blockpress_core::{Document, DocumentPatch, DocumentSummary, Seed};
use blockpress_types::{DocId, UserId};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Persistence for one user's documents.
///
/// Implementations are shared behind `Arc<dyn DocumentStore>` between the
/// session and the save pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document does not exist.
    async fn get_document(&self, id: &DocId) -> Result<Option<Document>>;

    /// A new document seeded with a level-1 "Untitled" heading and an empty paragraph.
    async fn create_empty_document(&self) -> Result<Document>;

    async fn update_document(&self, id: &DocId, patch: DocumentPatch) -> Result<Document>;

    async fn delete_document(&self, id: &DocId) -> Result<bool>;

    async fn publish_document(&self, id: &DocId) -> Result<bool>;

    async fn unpublish_document(&self, id: &DocId) -> Result<bool>;

    /// Summaries of the caller's documents, most recently updated first.
    async fn list_user_documents(&self) -> Result<Vec<DocumentSummary>>;
}

/// Largest page [`MemoryStore::list_public`] will return
pub const MAX_PAGE_SIZE: usize = 100;

/// Position of a page within a listing; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Serialized form of a [`MemoryStore`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

/// Thread-safe in-memory document table shared by all users.
///
/// Every write sets a dirty flag so a background task can persist
/// snapshots only when something changed.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: RwLock<HashMap<DocId, Document>>,
    dirty: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let docs = snapshot
            .documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(docs),
                dirty: AtomicBool::new(false),
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut documents: Vec<Document> = self.inner.docs.read().values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Snapshot { documents }
    }

    pub fn len(&self) -> usize {
        self.inner.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.inner.dirty.swap(false, Ordering::AcqRel)
    }

    /// Flag unsaved state, e.g. after a failed snapshot write.
    pub fn mark_dirty(&self) {
        self.inner.dirty.store(true, Ordering::Release);
    }

    /// View of this store acting for `user`.
    pub fn for_user(&self, user: UserId) -> UserStore {
        UserStore {
            store: self.clone(),
            user,
        }
    }

    pub fn get(&self, id: &DocId) -> Option<Document> {
        self.inner.docs.read().get(id).cloned()
    }

    /// A document visible to `user`: owned documents only.
    pub fn get_owned(&self, user: &UserId, id: &DocId) -> Option<Document> {
        self.get(id).filter(|doc| &doc.owner_id == user)
    }

    /// A published document, regardless of owner.
    pub fn get_public(&self, id: &DocId) -> Option<Document> {
        self.get(id).filter(|doc| doc.is_public)
    }

    pub fn create(&self, owner: UserId, seed: Seed) -> Document {
        let doc = Document::new_empty(owner, seed, Utc::now());
        self.inner.docs.write().insert(doc.id.clone(), doc.clone());
        self.mark_dirty();
        debug!(id = %doc.id, owner = %doc.owner_id, "document created");
        doc
    }

    pub fn update(&self, user: &UserId, id: &DocId, patch: DocumentPatch) -> Result<Document> {
        patch.validate()?;
        let mut docs = self.inner.docs.write();
        let doc = docs
            .get_mut(id)
            .filter(|doc| &doc.owner_id == user)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        doc.apply_patch(patch, Utc::now());
        let updated = doc.clone();
        drop(docs);
        self.mark_dirty();
        Ok(updated)
    }

    pub fn delete(&self, user: &UserId, id: &DocId) -> bool {
        let mut docs = self.inner.docs.write();
        let owned = docs.get(id).is_some_and(|doc| &doc.owner_id == user);
        if !owned {
            return false;
        }
        docs.remove(id);
        drop(docs);
        self.mark_dirty();
        true
    }

    pub fn set_public(&self, user: &UserId, id: &DocId, is_public: bool) -> bool {
        self.update(user, id, DocumentPatch::visibility(is_public))
            .is_ok()
    }

    /// Published documents of every owner, most recently updated first.
    ///
    /// `page` 0 is read as 1 and `limit` is clamped to `1..=MAX_PAGE_SIZE`;
    /// a page past the end is empty.
    pub fn list_public(&self, page: usize, limit: usize) -> Page<DocumentSummary> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);

        let docs = self.inner.docs.read();
        let mut public: Vec<&Document> = docs.values().filter(|doc| doc.is_public).collect();
        public.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

        let total = public.len();
        let data = public
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(Document::summary)
            .collect();
        Page {
            data,
            meta: PageMeta { page, limit, total },
        }
    }

    pub fn list(&self, user: &UserId) -> Vec<DocumentSummary> {
        let docs = self.inner.docs.read();
        let mut owned: Vec<&Document> = docs.values().filter(|doc| &doc.owner_id == user).collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        owned.into_iter().map(Document::summary).collect()
    }
}

/// [`MemoryStore`] scoped to one user, usable as a [`DocumentStore`]
#[derive(Debug, Clone)]
pub struct UserStore {
    store: MemoryStore,
    user: UserId,
}

impl UserStore {
    pub fn user(&self) -> &UserId {
        &self.user
    }
}

#[async_trait]
impl DocumentStore for UserStore {
    async fn get_document(&self, id: &DocId) -> Result<Option<Document>> {
        Ok(self.store.get_owned(&self.user, id))
    }

    async fn create_empty_document(&self) -> Result<Document> {
        Ok(self.store.create(self.user.clone(), Seed::BlockEditor))
    }

    async fn update_document(&self, id: &DocId, patch: DocumentPatch) -> Result<Document> {
        self.store.update(&self.user, id, patch)
    }

    async fn delete_document(&self, id: &DocId) -> Result<bool> {
        Ok(self.store.delete(&self.user, id))
    }

    async fn publish_document(&self, id: &DocId) -> Result<bool> {
        Ok(self.store.set_public(&self.user, id, true))
    }

    async fn unpublish_document(&self, id: &DocId) -> Result<bool> {
        Ok(self.store.set_public(&self.user, id, false))
    }

    async fn list_user_documents(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self.store.list(&self.user))
    }
}
