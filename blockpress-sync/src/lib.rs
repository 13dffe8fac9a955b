//! # blockpress-sync
//!
//! Everything between the editor and persistence: the [`DocumentStore`]
//! seam with in-memory and HTTP implementations, a TTL document cache, the
//! debounced [`SavePipeline`] actor, and [`EditorSession`], which ties an
//! [`blockpress_core::Editor`] to a store.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod pipeline;
pub mod session;
pub mod store;

pub use cache::DocumentCache;
pub use config::{ConfigError, SyncConfig};
pub use error::{Result, StoreError};
pub use http::{HttpStore, USER_HEADER};
pub use notify::{NoticeKind, Notifier, SaveNotice};
pub use pipeline::SavePipeline;
pub use session::EditorSession;
pub use store::{DocumentStore, MemoryStore, Page, PageMeta, Snapshot, UserStore, MAX_PAGE_SIZE};
