//! Short-lived cache of fetched documents.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use blockpress_core::Document;
use blockpress_types::DocId;
use parking_lot::Mutex;
use tokio::time::Instant;

/// TTL cache keyed by document id, shared between the session and the
/// save pipeline (which invalidates entries after a successful save).
#[derive(Debug, Clone)]
pub struct DocumentCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<DocId, Entry>>>,
}

#[derive(Debug)]
struct Entry {
    fetched_at: Instant,
    doc: Document,
}

impl DocumentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fresh entry for `id`; expired entries are evicted on the way.
    pub fn get(&self, id: &DocId) -> Option<Document> {
        let mut entries = self.entries.lock();
        let fresh = entries.get(id)?.fetched_at.elapsed() < self.ttl;
        if fresh {
            entries.get(id).map(|entry| entry.doc.clone())
        } else {
            entries.remove(id);
            None
        }
    }

    pub fn insert(&self, doc: Document) {
        self.entries.lock().insert(
            doc.id.clone(),
            Entry {
                fetched_at: Instant::now(),
                doc,
            },
        );
    }

    pub fn invalidate(&self, id: &DocId) {
        self.entries.lock().remove(id);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpress_core::Seed;
    use blockpress_types::UserId;
    use chrono::Utc;

    fn doc() -> Document {
        Document::new_empty(UserId::new("u"), Seed::Plain, Utc::now())
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = DocumentCache::new(Duration::from_secs(60));
        let doc = doc();
        cache.insert(doc.clone());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&doc.id), Some(doc.clone()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&doc.id), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = DocumentCache::new(Duration::from_secs(60));
        let doc = doc();
        cache.insert(doc.clone());
        cache.invalidate(&doc.id);
        assert_eq!(cache.get(&doc.id), None);
    }
}
