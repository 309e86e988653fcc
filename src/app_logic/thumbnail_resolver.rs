// src/app_logic/thumbnail_resolver.rs

use crate::app_logic::embed_rewriter::ResolvedThumbnail;
use crate::persistence::{FULL_SIZE, Metadata};

/// Resolves size names to URLs against freshly regenerated metadata.
#[derive(Debug, Clone)]
pub struct MetadataResolver<'a> {
    metadata: &'a Metadata,
    base_url: String,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(metadata: &'a Metadata, uploads_url: &str) -> Self {
        Self {
            metadata,
            base_url: uploads_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative.trim_start_matches('/'))
    }

    /// Directory of the original, relative to the uploads root, with a
    /// trailing slash unless it is the root itself.
    fn original_dir(&self) -> &str {
        match self.metadata.file.rfind('/') {
            Some(idx) => &self.metadata.file[..=idx],
            None => "",
        }
    }

    pub fn resolve(&self, size: &str) -> Option<ResolvedThumbnail> {
        if size == FULL_SIZE {
            return Some(ResolvedThumbnail {
                url: self.url_for(&self.metadata.file),
                width: self.metadata.width,
                height: self.metadata.height,
            });
        }
        let record = self.metadata.sizes.get(size)?;
        Some(ResolvedThumbnail {
            url: self.url_for(&format!("{}{}", self.original_dir(), record.file)),
            width: record.width,
            height: record.height,
        })
    }
}
