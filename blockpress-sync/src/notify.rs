//! User-facing notices about failed saves.

use blockpress_types::DocId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Validation,
    Transient,
    NotFound,
}

impl From<&StoreError> for NoticeKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => NoticeKind::NotFound,
            StoreError::Transient(_) => NoticeKind::Transient,
            StoreError::Validation(_) | StoreError::Serialization(_) => NoticeKind::Validation,
        }
    }
}

/// A save problem the user should hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveNotice {
    pub doc_id: DocId,
    pub kind: NoticeKind,
    pub message: String,
}

impl SaveNotice {
    pub fn from_error(doc_id: DocId, err: &StoreError) -> Self {
        let kind = NoticeKind::from(err);
        let message = match kind {
            NoticeKind::Validation => format!("Could not save: {err}"),
            NoticeKind::Transient => "Saving failed; your changes are kept and will be retried on the next edit".to_string(),
            NoticeKind::NotFound => "This document no longer exists".to_string(),
        };
        Self {
            doc_id,
            kind,
            message,
        }
    }
}

/// Fan-out of notices to every subscriber
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<SaveNotice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveNotice> {
        self.tx.subscribe()
    }

    pub fn send(&self, notice: SaveNotice) {
        if self.tx.send(notice).is_err() {
            debug!("save notice dropped: no subscribers");
        }
    }
}
