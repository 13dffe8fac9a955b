//! One user's editing session: the open document, its editor, and the
//! plumbing that turns edits into debounced saves.

use std::sync::Arc;

use blockpress_core::{Block, Document, DocumentPatch, DocumentSummary, Editor, EditorEvent, EventResult};
use blockpress_types::DocId;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::DocumentCache;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::notify::SaveNotice;
use crate::pipeline::SavePipeline;
use crate::store::DocumentStore;

/// What the editor's change listener needs to route an edit.
#[derive(Debug, Default)]
struct EditTracker {
    doc_id: Option<DocId>,
    last_edit: Option<Instant>,
}

pub struct EditorSession {
    store: Arc<dyn DocumentStore>,
    cache: DocumentCache,
    pipeline: SavePipeline,
    editor: Editor,
    config: SyncConfig,
    /// Metadata of the open document; its `blocks` are not kept current,
    /// the editor owns those.
    active: Option<Document>,
    hydrated: bool,
    tracker: Arc<Mutex<EditTracker>>,
}

impl EditorSession {
    pub fn new(store: Arc<dyn DocumentStore>, config: SyncConfig) -> Self {
        let cache = DocumentCache::new(config.cache_ttl());
        let pipeline = SavePipeline::spawn(store.clone(), cache.clone(), &config);
        let tracker = Arc::new(Mutex::new(EditTracker::default()));

        let mut editor = Editor::default();
        let listener_pipeline = pipeline.clone();
        let listener_tracker = tracker.clone();
        editor.on_blocks_change(move |blocks: &[Block]| {
            let mut tracker = listener_tracker.lock();
            let Some(doc_id) = tracker.doc_id.clone() else {
                debug!("edit before hydration ignored");
                return;
            };
            tracker.last_edit = Some(Instant::now());
            listener_pipeline.edit(doc_id, DocumentPatch::blocks(blocks.to_vec()));
        });

        Self {
            store,
            cache,
            pipeline,
            editor,
            config,
            active: None,
            hydrated: false,
            tracker,
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    /// Mutable access for direct block operations; changes are saved.
    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn document(&self) -> Option<&Document> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<&DocId> {
        self.active.as_ref().map(|doc| &doc.id)
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn is_saving(&self) -> bool {
        self.pipeline.is_saving()
    }

    pub fn notices(&self) -> broadcast::Receiver<SaveNotice> {
        self.pipeline.subscribe()
    }

    pub fn pipeline(&self) -> &SavePipeline {
        &self.pipeline
    }

    /// Feed an input event to the editor.
    pub fn handle(&mut self, event: EditorEvent) -> EventResult {
        let result = self.editor.handle(event);
        if result == EventResult::SaveRequested {
            self.pipeline.save_now();
        }
        result
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if self.editor.is_read_only() {
            return;
        }
        let Some(doc) = self.active.as_mut() else {
            return;
        };
        let title = title.into();
        if doc.title == title {
            return;
        }
        doc.title = title.clone();
        self.tracker.lock().last_edit = Some(Instant::now());
        self.pipeline.edit(doc.id.clone(), DocumentPatch::title(title));
    }

    pub fn save_now(&self) {
        self.pipeline.save_now();
    }

    pub async fn idle(&self) {
        self.pipeline.idle().await;
    }

    /// Flush the pending save and stop the pipeline.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
    }

    /// Make `id` the active document.
    ///
    /// Pending edits of the previous document are dropped. When `id` cannot
    /// be fetched a fresh document is created and opened instead; the id
    /// actually opened is returned.
    pub async fn open(&mut self, id: &DocId) -> Result<DocId> {
        if self.active_id() == Some(id) && self.hydrated {
            return Ok(id.clone());
        }
        self.detach();

        if let Some(doc) = self.cache.get(id) {
            debug!(%id, "opening cached document");
            self.hydrate(doc);
            return Ok(id.clone());
        }

        match self.store.get_document(id).await {
            Ok(Some(doc)) => {
                self.cache.insert(doc.clone());
                self.hydrate(doc);
                Ok(id.clone())
            }
            Ok(None) => {
                info!(%id, "document not found; creating a new one");
                self.create_document().await
            }
            Err(err) => {
                warn!(%id, error = %err, "failed to fetch document; creating a new one");
                self.create_document().await
            }
        }
    }

    /// Create an empty document and open it.
    pub async fn create_document(&mut self) -> Result<DocId> {
        self.detach();
        let doc = self.store.create_empty_document().await?;
        let id = doc.id.clone();
        self.cache.insert(doc.clone());
        self.hydrate(doc);
        Ok(id)
    }

    /// Delete the active document and open the next one.
    ///
    /// The most recently updated remaining document is opened; when there
    /// is none, a new empty document is created.
    pub async fn delete_active(&mut self) -> Result<DocId> {
        let Some(id) = self.active_id().cloned() else {
            return self.create_document().await;
        };
        self.detach();
        if !self.store.delete_document(&id).await? {
            debug!(%id, "document was already gone");
        }
        self.cache.invalidate(&id);

        let next = self
            .list_documents()
            .await
            .into_iter()
            .find(|summary| summary.id != id);
        match next {
            Some(summary) => self.open(&summary.id).await,
            None => self.create_document().await,
        }
    }

    /// Publish or unpublish the active document.
    pub async fn set_published(&mut self, is_public: bool) -> Result<bool> {
        let Some(id) = self.active_id().cloned() else {
            return Ok(false);
        };
        let changed = if is_public {
            self.store.publish_document(&id).await?
        } else {
            self.store.unpublish_document(&id).await?
        };
        self.cache.invalidate(&id);
        if changed {
            if let Some(doc) = self.active.as_mut() {
                doc.is_public = is_public;
            }
        }
        Ok(changed)
    }

    /// The user's documents; empty when the store is unreachable.
    pub async fn list_documents(&self) -> Vec<DocumentSummary> {
        match self.store.list_user_documents().await {
            Ok(list) => list,
            Err(err) => {
                warn!(error = %err, "failed to list documents");
                Vec::new()
            }
        }
    }

    /// Apply a newer server copy of the active document.
    ///
    /// Ignored for other documents and while the user edited within the
    /// grace window, so a refresh never clobbers fresh typing.
    pub fn apply_remote(&mut self, doc: Document) -> bool {
        if self.active_id() != Some(&doc.id) {
            return false;
        }
        let recent = self
            .tracker
            .lock()
            .last_edit
            .is_some_and(|at| at.elapsed() < self.config.edit_grace());
        if recent {
            debug!(id = %doc.id, "remote update skipped during local editing");
            return false;
        }
        self.cache.insert(doc.clone());
        self.editor.load(doc.blocks.clone());
        self.active = Some(doc);
        true
    }

    /// Re-fetch the active document from the store and apply it.
    pub async fn refresh(&mut self) -> Result<bool> {
        let Some(id) = self.active_id().cloned() else {
            return Ok(false);
        };
        match self.store.get_document(&id).await? {
            Some(doc) => Ok(self.apply_remote(doc)),
            None => Ok(false),
        }
    }

    /// Stop routing edits to the current document.
    ///
    /// An untouched document stays cached. Once edited, a save may still be
    /// in flight whose completion is discarded after the switch, so the
    /// cached copy can no longer be trusted.
    fn detach(&mut self) {
        let edited = {
            let mut tracker = self.tracker.lock();
            tracker.doc_id = None;
            tracker.last_edit.take().is_some()
        };
        if let Some(doc) = &self.active {
            if edited {
                self.cache.invalidate(&doc.id);
            }
        }
        self.pipeline.set_active(None);
        self.hydrated = false;
        self.active = None;
    }

    fn hydrate(&mut self, doc: Document) {
        if self.hydrated {
            return;
        }
        self.editor.load(doc.blocks.clone());
        self.pipeline.set_active(Some(doc.id.clone()));
        self.tracker.lock().doc_id = Some(doc.id.clone());
        self.active = Some(doc);
        self.hydrated = true;
        debug!(id = ?self.active_id(), "document hydrated");
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("active", &self.active_id())
            .field("hydrated", &self.hydrated)
            .field("editor", &self.editor)
            .finish()
    }
}
