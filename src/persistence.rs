// src/persistence.rs

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content kind carried by every attachment record.
pub const ATTACHMENT_KIND: &str = "attachment";

/// Size name that always resolves to the original upload.
pub const FULL_SIZE: &str = "full";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored item as the attachment store knows it. Only items of kind
/// [`ATTACHMENT_KIND`] can be regenerated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub kind: String,
    /// Path of the original upload, relative to the uploads directory.
    pub file: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn is_attachment(&self) -> bool {
        self.kind == ATTACHMENT_KIND
    }
}

/// One registered thumbnail size.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SizeDefinition {
    pub name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub crop: bool,
}

impl SizeDefinition {
    pub fn new(name: &str, width: Option<u32>, height: Option<u32>, crop: bool) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            crop,
        }
    }

    /// Target width, with `Some(0)` treated as unbounded.
    pub fn target_width(&self) -> Option<u32> {
        self.width.filter(|w| *w > 0)
    }

    pub fn target_height(&self) -> Option<u32> {
        self.height.filter(|h| *h > 0)
    }

    /// A definition without any bound never produces a file.
    pub fn is_active(&self) -> bool {
        self.target_width().is_some() || self.target_height().is_some()
    }
}

/// A materialized thumbnail. `width`/`height` are what the editor actually
/// produced, which may differ from the size definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRecord {
    /// File name, relative to the directory of the original upload.
    pub file: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, rename = "mime-type")]
    pub mime_type: Option<String>,
}

/// Full-size dimensions plus every known thumbnail, keyed by size name.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub width: u32,
    pub height: u32,
    pub file: String,
    #[serde(default)]
    pub sizes: BTreeMap<String, ThumbnailRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RegenerationPolicy {
    pub only_missing: bool,
    pub prune_unregistered: bool,
}

impl Default for RegenerationPolicy {
    fn default() -> Self {
        Self {
            only_missing: true,
            prune_unregistered: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub kind: String,
    pub content: String,
}

/// On-disk shape of the JSON attachment store.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct AttachmentManifest {
    #[serde(default)]
    pub attachments: BTreeMap<AttachmentId, AttachmentEntry>,
    #[serde(default)]
    pub last_saved: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AttachmentEntry {
    pub attachment: Attachment,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}
