// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::persistence::{AttachmentId, DocumentId, RegenerationPolicy, SizeDefinition};
use crate::services::size_registry::default_sizes;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Per-call options for a full regeneration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegenerateArgs {
    pub policy: RegenerationPolicy,
    pub update_usages: bool,
    /// Document kinds to rewrite. Empty means every public, non-attachment kind.
    pub document_kinds: Vec<String>,
    /// Restrict rewriting to these documents. Empty means no restriction.
    pub document_ids: Vec<DocumentId>,
    pub page_size: Option<usize>,
}

impl Default for RegenerateArgs {
    fn default() -> Self {
        Self {
            policy: RegenerationPolicy::default(),
            update_usages: true,
            document_kinds: Vec::new(),
            document_ids: Vec::new(),
            page_size: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RegenConfig {
    pub uploads_dir: PathBuf,
    pub uploads_url: String,
    pub page_size: usize,
    /// Reserved images (site icon and the like) that must never be touched.
    pub excluded_attachments: Vec<AttachmentId>,
    pub sizes: Vec<SizeDefinition>,
    pub defaults: RegenerateArgs,
}

impl Default for RegenConfig {
    fn default() -> Self {
        let mut uploads_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        uploads_dir.push("thumbnail-regen");
        uploads_dir.push("uploads");
        Self {
            uploads_dir,
            uploads_url: "/uploads".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            excluded_attachments: Vec::new(),
            sizes: default_sizes(),
            defaults: RegenerateArgs::default(),
        }
    }
}

impl RegenConfig {
    /// Reads a JSON config. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("Config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let json =
            fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Self =
            serde_json::from_str(&json).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        log::debug!(
            "Config: loaded {} ({} sizes, page size {})",
            path.display(),
            config.sizes.len(),
            config.page_size
        );
        Ok(config)
    }

    pub fn is_excluded(&self, id: AttachmentId) -> bool {
        self.excluded_attachments.contains(&id)
    }

    /// Page size for document pagination, never zero.
    pub fn effective_page_size(&self, args: &RegenerateArgs) -> usize {
        args.page_size.unwrap_or(self.page_size).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = RegenConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.defaults.policy.only_missing);
        assert!(config.defaults.update_usages);
        assert!(config.uploads_dir.ends_with("thumbnail-regen/uploads"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regen.json");
        fs::write(
            &path,
            r#"{ "uploads_url": "https://cdn.example.com/uploads", "excluded_attachments": [7],
                 "sizes": [{ "name": "thumbnail", "width": 100, "height": 100, "crop": true }] }"#,
        )
        .unwrap();

        let config = RegenConfig::load(&path).unwrap();
        assert_eq!(config.uploads_url, "https://cdn.example.com/uploads");
        assert!(config.is_excluded(AttachmentId(7)));
        assert_eq!(config.sizes.len(), 1);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regen.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(RegenConfig::load(&path), Err(ConfigError::Parse(..))));
    }

    #[test]
    fn test_page_size_never_zero() {
        let config = RegenConfig::default();
        let args = RegenerateArgs {
            page_size: Some(0),
            ..RegenerateArgs::default()
        };
        assert_eq!(config.effective_page_size(&args), 1);
        assert_eq!(config.effective_page_size(&RegenerateArgs::default()), DEFAULT_PAGE_SIZE);
    }
}
