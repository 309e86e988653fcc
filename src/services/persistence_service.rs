// src/services/persistence_service.rs

use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;

use crate::config::RegenConfig;
use crate::error::StoreError;
use crate::persistence::{Attachment, AttachmentEntry, AttachmentId, AttachmentManifest, Metadata};

/// Storage of attachment records and their thumbnail metadata.
pub trait AttachmentStore {
    fn get_by_id(&self, id: AttachmentId) -> Option<Attachment>;

    /// Absolute path of the original upload, if the attachment has one.
    fn get_file_path(&self, id: AttachmentId) -> Option<PathBuf>;

    fn get_metadata(&self, id: AttachmentId) -> Option<Metadata>;

    fn set_metadata(&self, id: AttachmentId, metadata: &Metadata) -> Result<(), StoreError>;
}

/// Attachment store persisted as `manifest.json` inside the uploads
/// directory. Every call re-reads the manifest so external edits are seen.
#[derive(Debug)]
pub struct JsonAttachmentStore {
    uploads_dir: PathBuf,
}

impl JsonAttachmentStore {
    pub fn new(uploads_dir: PathBuf) -> io::Result<Self> {
        if !uploads_dir.exists() {
            fs::create_dir_all(&uploads_dir)?;
        }
        Ok(Self { uploads_dir })
    }

    /// Store rooted at the configured uploads directory.
    pub fn from_config(config: &RegenConfig) -> io::Result<Self> {
        Self::new(config.uploads_dir.clone())
    }

    fn manifest_path(&self) -> PathBuf {
        self.uploads_dir.join("manifest.json")
    }

    pub fn load_manifest(&self) -> AttachmentManifest {
        let manifest_path = self.manifest_path();
        if !manifest_path.exists() {
            return AttachmentManifest::default();
        }
        match fs::read_to_string(&manifest_path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::error!(
                    "PersistenceService: Failed to parse {}: {}. Using an empty manifest.",
                    manifest_path.display(),
                    e
                );
                AttachmentManifest::default()
            }),
            Err(e) => {
                log::error!(
                    "PersistenceService: Failed to read {}: {}. Using an empty manifest.",
                    manifest_path.display(),
                    e
                );
                AttachmentManifest::default()
            }
        }
    }

    pub fn save_manifest(&self, manifest: &mut AttachmentManifest) -> Result<(), StoreError> {
        manifest.last_saved = Some(Utc::now());
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.manifest_path(), json)?;
        Ok(())
    }

    /// Adds or replaces an attachment record, keeping any metadata it had.
    pub fn insert_attachment(&self, attachment: Attachment) -> Result<(), StoreError> {
        let mut manifest = self.load_manifest();
        manifest
            .attachments
            .entry(attachment.id)
            .and_modify(|entry| entry.attachment = attachment.clone())
            .or_insert(AttachmentEntry {
                attachment,
                metadata: None,
            });
        self.save_manifest(&mut manifest)
    }
}

impl AttachmentStore for JsonAttachmentStore {
    fn get_by_id(&self, id: AttachmentId) -> Option<Attachment> {
        self.load_manifest()
            .attachments
            .get(&id)
            .map(|entry| entry.attachment.clone())
    }

    fn get_file_path(&self, id: AttachmentId) -> Option<PathBuf> {
        self.get_by_id(id)
            .filter(|a| !a.file.is_empty())
            .map(|a| self.uploads_dir.join(a.file))
    }

    fn get_metadata(&self, id: AttachmentId) -> Option<Metadata> {
        self.load_manifest()
            .attachments
            .get(&id)
            .and_then(|entry| entry.metadata.clone())
    }

    fn set_metadata(&self, id: AttachmentId, metadata: &Metadata) -> Result<(), StoreError> {
        let mut manifest = self.load_manifest();
        let entry = manifest
            .attachments
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id.0))?;
        entry.metadata = Some(metadata.clone());
        self.save_manifest(&mut manifest)?;
        log::info!(
            "PersistenceService: Stored metadata for attachment {} ({} sizes)",
            id,
            metadata.sizes.len()
        );
        Ok(())
    }
}
