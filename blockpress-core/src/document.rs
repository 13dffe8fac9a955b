//! Document entity, partial updates and list summaries.

use std::collections::HashSet;

use blockpress_types::{BlockId, DocId, MediaRef, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::block::{Block, BlockKind};

/// Title given to freshly created documents.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Reasons a document update is rejected as malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Document must contain at least one block")]
    NoBlocks,

    #[error("Block id must not be empty")]
    EmptyBlockId,

    #[error("Duplicate block id: {0}")]
    DuplicateBlockId(BlockId),

    #[error("Heading level {level} out of range on block {block}")]
    HeadingLevel { block: BlockId, level: u8 },

    #[error("Title longer than {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
}

/// Initial block layout of a new document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seed {
    /// `heading(level 1, "Untitled")` followed by an empty paragraph
    #[default]
    BlockEditor,
    /// A single empty paragraph
    Plain,
}

impl Seed {
    pub fn blocks(&self) -> Vec<Block> {
        match self {
            Seed::BlockEditor => vec![Block::heading(1, DEFAULT_TITLE), Block::paragraph("")],
            Seed::Plain => vec![Block::paragraph("")],
        }
    }
}

/// A document owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocId,
    pub owner_id: UserId,
    pub title: String,

    #[serde(default, alias = "editorJson")]
    pub blocks: Vec<Block>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<MediaRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_image: Option<MediaRef>,
}

impl Document {
    /// A new empty document for `owner`.
    pub fn new_empty(owner: UserId, seed: Seed, now: DateTime<Utc>) -> Self {
        Self {
            id: DocId::generate(),
            owner_id: owner,
            title: DEFAULT_TITLE.to_string(),
            blocks: seed.blocks(),
            created_at: now,
            updated_at: now,
            is_public: false,
            tags: Vec::new(),
            cover_image: None,
            icon_image: None,
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            icon_image: self.icon_image.clone(),
            updated_at: self.updated_at,
        }
    }

    /// Apply the fields present in `patch` and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: DocumentPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(blocks) = patch.blocks {
            self.blocks = blocks;
        }
        if let Some(cover) = patch.cover_image {
            self.cover_image = cover;
        }
        if let Some(icon) = patch.icon_image {
            self.icon_image = icon;
        }
        if let Some(is_public) = patch.is_public {
            self.is_public = is_public;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        self.updated_at = now;
    }
}

/// Entry of a user's document list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: DocId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_image: Option<MediaRef>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update: only the fields that are `Some` are written.
///
/// `cover_image`/`icon_image` use a nested option so a patch can clear the
/// image (`Some(None)`, sent as JSON `null`) as well as leave it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, alias = "editorJson", skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,

    #[serde(
        default,
        deserialize_with = "nested_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_image: Option<Option<MediaRef>>,

    #[serde(
        default,
        deserialize_with = "nested_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon_image: Option<Option<MediaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn nested_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl DocumentPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Some(blocks),
            ..Self::default()
        }
    }

    pub fn visibility(is_public: bool) -> Self {
        Self {
            is_public: Some(is_public),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold a newer patch into this one; fields set in `newer` win.
    pub fn merge(&mut self, newer: DocumentPatch) {
        if newer.title.is_some() {
            self.title = newer.title;
        }
        if newer.blocks.is_some() {
            self.blocks = newer.blocks;
        }
        if newer.cover_image.is_some() {
            self.cover_image = newer.cover_image;
        }
        if newer.icon_image.is_some() {
            self.icon_image = newer.icon_image;
        }
        if newer.is_public.is_some() {
            self.is_public = newer.is_public;
        }
        if newer.tags.is_some() {
            self.tags = newer.tags;
        }
    }

    /// Reject patches a store must not persist.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.chars().count() > MAX_TITLE_CHARS {
                return Err(ValidationError::TitleTooLong);
            }
        }
        if let Some(blocks) = &self.blocks {
            validate_blocks(blocks)?;
        }
        Ok(())
    }
}

fn validate_blocks(blocks: &[Block]) -> Result<(), ValidationError> {
    if blocks.is_empty() {
        return Err(ValidationError::NoBlocks);
    }
    let mut seen = HashSet::new();
    for block in blocks {
        if block.id.as_str().is_empty() {
            return Err(ValidationError::EmptyBlockId);
        }
        if !seen.insert(&block.id) {
            return Err(ValidationError::DuplicateBlockId(block.id.clone()));
        }
        if block.kind == BlockKind::Heading {
            if let Some(level) = block.attrs.level {
                if !(1..=3).contains(&level) {
                    return Err(ValidationError::HeadingLevel {
                        block: block.id.clone(),
                        level,
                    });
                }
            }
        }
    }
    Ok(())
}
