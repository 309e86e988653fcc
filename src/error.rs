// src/error.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::persistence::{AttachmentId, DocumentId};

/// Stable machine-readable code for each failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AttachmentNotFound,
    NotAnAttachment,
    ExcludedByPolicy,
    SourceFileMissing,
    SourceUnreadable,
    MetadataUpdateFailure,
    PerSizeGenerationFailure,
    DocumentQueryFailure,
    DocumentUpdateFailure,
    InvalidEmbedPattern,
}

// image::ImageError and io::Error are neither Clone nor Serialize, so
// per-size failures keep a flattened copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableImageError {
    pub message: String,
}

impl From<&image::ImageError> for SerializableImageError {
    fn from(err: &image::ImageError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SerializableImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableIoError {
    #[serde(with = "io_kind")]
    pub kind: std::io::ErrorKind,
    pub message: String,
}

impl From<std::io::Error> for SerializableIoError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SerializableIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

mod io_kind {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::io::ErrorKind;

    pub fn serialize<S: Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{:?}", kind))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ErrorKind, D::Error> {
        let name = String::deserialize(d)?;
        Ok(match name.as_str() {
            "NotFound" => ErrorKind::NotFound,
            "PermissionDenied" => ErrorKind::PermissionDenied,
            "AlreadyExists" => ErrorKind::AlreadyExists,
            "InvalidData" => ErrorKind::InvalidData,
            "InvalidInput" => ErrorKind::InvalidInput,
            _ => ErrorKind::Other,
        })
    }
}

/// A single size could not be produced. Never fatal to a regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ThumbnailError {
    #[error("failed to open image {}: {}", .0.display(), .1)]
    ImageOpen(PathBuf, SerializableImageError),
    #[error("failed to save thumbnail {}: {}", .0.display(), .1)]
    ImageSave(PathBuf, SerializableImageError),
    #[error("failed to create directory {}: {}", .0.display(), .1)]
    DirectoryCreation(PathBuf, SerializableIoError),
    #[error("could not calculate resized dimensions for size '{0}'")]
    Dimensions(String),
}

impl ThumbnailError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::PerSizeGenerationFailure
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no record with id {0}")]
    NotFound(u64),
    #[error("update rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("invalid embed pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("document query failed at offset {offset}: {source}")]
    Query {
        offset: usize,
        #[source]
        source: StoreError,
    },
    #[error("failed to update document {id}: {source}")]
    Update {
        id: DocumentId,
        #[source]
        source: StoreError,
    },
}

impl UsageError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UsageError::Pattern(_) => ErrorCode::InvalidEmbedPattern,
            UsageError::Query { .. } => ErrorCode::DocumentQueryFailure,
            UsageError::Update { .. } => ErrorCode::DocumentUpdateFailure,
        }
    }
}

/// Errors that abort a regeneration before any metadata is produced.
#[derive(Debug, Error)]
pub enum RegenerateError {
    #[error("attachment {0} does not exist")]
    AttachmentNotFound(AttachmentId),
    #[error("item {id} is a '{kind}', not an attachment")]
    NotAnAttachment { id: AttachmentId, kind: String },
    #[error("attachment {0} is excluded from regeneration")]
    ExcludedByPolicy(AttachmentId),
    #[error("the original image file cannot be found at {relative_path}")]
    SourceFileMissing { relative_path: String },
    #[error("the original image {} could not be read: {}", .path.display(), .source)]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: ThumbnailError,
    },
    #[error("failed to store metadata: {0}")]
    MetadataUpdate(#[source] StoreError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl RegenerateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RegenerateError::AttachmentNotFound(_) => ErrorCode::AttachmentNotFound,
            RegenerateError::NotAnAttachment { .. } => ErrorCode::NotAnAttachment,
            RegenerateError::ExcludedByPolicy(_) => ErrorCode::ExcludedByPolicy,
            RegenerateError::SourceFileMissing { .. } => ErrorCode::SourceFileMissing,
            RegenerateError::SourceUnreadable { .. } => ErrorCode::SourceUnreadable,
            RegenerateError::MetadataUpdate(_) => ErrorCode::MetadataUpdateFailure,
            RegenerateError::Usage(err) => err.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),
}
