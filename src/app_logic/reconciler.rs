// src/app_logic/reconciler.rs

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use serde::Serialize;
use strum_macros::Display;

use crate::error::{RegenerateError, SerializableIoError, ThumbnailError};
use crate::persistence::{Metadata, RegenerationPolicy, SizeDefinition, ThumbnailRecord};
use crate::services::size_registry::SizeRegistry;
use crate::services::thumbnail_service::ImageEditor;
use crate::thumbnail::{ResizeDimensions, resize_dimensions};

/// The original upload being reprocessed.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    /// Path relative to the uploads directory, as stored in metadata.
    pub relative_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither width nor height is set.
    Inactive,
    /// No resize can be derived from the source dimensions.
    Unsatisfiable,
    /// The file the editor would write already exists.
    AlreadyPresent,
}

/// What reconciliation will do with one registered size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizePlan {
    Skip(SkipReason),
    Present { path: PathBuf, dims: ResizeDimensions },
    Generate(ResizeDimensions),
}

/// Decides the fate of `size` for a source of `source_dims`.
///
/// `existing_file` is asked for the file a resize would produce and returns
/// it only if it is already on disk. It is consulted in only-missing mode.
pub fn plan_size<F>(
    size: &SizeDefinition,
    source_dims: (u32, u32),
    only_missing: bool,
    existing_file: F,
) -> SizePlan
where
    F: Fn(&ResizeDimensions) -> Option<PathBuf>,
{
    if !size.is_active() {
        return SizePlan::Skip(SkipReason::Inactive);
    }
    let Some(dims) = resize_dimensions(source_dims.0, source_dims.1, size) else {
        return SizePlan::Skip(SkipReason::Unsatisfiable);
    };
    if only_missing {
        if let Some(path) = existing_file(&dims) {
            return SizePlan::Present { path, dims };
        }
    }
    SizePlan::Generate(dims)
}

/// Result of one reconciliation. Nothing here has been persisted yet.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub metadata: Metadata,
    pub generated: Vec<String>,
    pub skipped: BTreeMap<String, SkipReason>,
    pub failures: BTreeMap<String, ThumbnailError>,
    pub pruned: Vec<String>,
    /// Pruned sizes whose file could not be removed.
    pub prune_errors: BTreeMap<String, SerializableIoError>,
}

pub struct Reconciler<'a> {
    editor: &'a dyn ImageEditor,
    registry: &'a dyn SizeRegistry,
}

impl<'a> Reconciler<'a> {
    pub fn new(editor: &'a dyn ImageEditor, registry: &'a dyn SizeRegistry) -> Self {
        Self { editor, registry }
    }

    pub fn reconcile(
        &self,
        source: &SourceImage,
        prior: Option<&Metadata>,
        policy: RegenerationPolicy,
    ) -> Result<Reconciliation, RegenerateError> {
        if !source.path.is_file() {
            log::warn!(
                "Reconciler: Original image not found at {}",
                source.path.display()
            );
            return Err(RegenerateError::SourceFileMissing {
                relative_path: source.relative_path.clone(),
            });
        }

        let (full_w, full_h) = self
            .editor
            .source_dimensions(&source.path)
            .map_err(|e| RegenerateError::SourceUnreadable {
                path: source.path.clone(),
                source: e,
            })?;

        let registered = self.registry.current_sizes();
        let prior_sizes = prior.map(|m| m.sizes.clone()).unwrap_or_default();

        let mut skipped = BTreeMap::new();
        let mut recovered = BTreeMap::new();
        let mut to_generate = Vec::new();

        for size in &registered {
            let plan = plan_size(size, (full_w, full_h), policy.only_missing, |dims| {
                let path = self.editor.resulting_filename(&source.path, &dims.suffix(), None);
                path.is_file().then_some(path)
            });
            match plan {
                SizePlan::Skip(reason) => {
                    log::debug!("Reconciler: Skipping size '{}' ({})", size.name, reason);
                    skipped.insert(size.name.clone(), reason);
                }
                SizePlan::Present { path, dims } => {
                    skipped.insert(size.name.clone(), SkipReason::AlreadyPresent);
                    if !prior_sizes.contains_key(&size.name) {
                        log::debug!(
                            "Reconciler: Recovering record for '{}' from {}",
                            size.name,
                            path.display()
                        );
                        recovered.insert(size.name.clone(), record_for_existing(&path, &dims));
                    }
                }
                SizePlan::Generate(_) => to_generate.push(size.clone()),
            }
        }

        let mut generated = Vec::new();
        let mut failures = BTreeMap::new();
        let mut fresh = BTreeMap::new();
        if !to_generate.is_empty() {
            for (name, result) in self.editor.generate_missing(&source.path, &to_generate) {
                match result {
                    Ok(record) => {
                        generated.push(name.clone());
                        fresh.insert(name, record);
                    }
                    Err(e) => {
                        log::warn!("Reconciler: Size '{}' failed ({}): {}", name, e.code(), e);
                        failures.insert(name, e);
                    }
                }
            }
        }

        // Prior records survive unless a fresh one replaces them.
        let mut sizes = prior_sizes.clone();
        for (name, record) in recovered {
            sizes.entry(name).or_insert(record);
        }
        sizes.extend(fresh);

        let mut pruned = Vec::new();
        let mut prune_errors = BTreeMap::new();
        if policy.prune_unregistered {
            let registered_names: HashSet<&str> =
                registered.iter().map(|s| s.name.as_str()).collect();
            let dir = source.path.parent().unwrap_or_else(|| Path::new(""));

            for name in prior_sizes.keys() {
                if registered_names.contains(name.as_str()) {
                    continue;
                }
                let Some(record) = sizes.remove(name) else {
                    continue;
                };
                // Another surviving size may point at the very same file.
                if !sizes.values().any(|r| r.file == record.file) {
                    if let Err(e) = delete_thumbnail(dir, &record.file) {
                        log::warn!(
                            "Reconciler: Could not delete '{}' file {}: {}",
                            name,
                            record.file,
                            e
                        );
                        prune_errors.insert(name.clone(), SerializableIoError::from(e));
                    }
                }
                pruned.push(name.clone());
            }
        }

        log::info!(
            "Reconciler: {} generated, {} skipped, {} failed, {} pruned for {}",
            generated.len(),
            skipped.len(),
            failures.len(),
            pruned.len(),
            source.relative_path
        );

        Ok(Reconciliation {
            metadata: Metadata {
                width: full_w,
                height: full_h,
                file: source.relative_path.clone(),
                sizes,
            },
            generated,
            skipped,
            failures,
            pruned,
            prune_errors,
        })
    }
}

fn record_for_existing(path: &Path, dims: &ResizeDimensions) -> ThumbnailRecord {
    ThumbnailRecord {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        width: dims.dst_w,
        height: dims.dst_h,
        mime_type: ImageFormat::from_path(path)
            .ok()
            .map(|f| f.to_mime_type().to_string()),
    }
}

/// Removes a thumbnail next to the original. A file that is already gone
/// counts as deleted.
fn delete_thumbnail(dir: &Path, file: &str) -> io::Result<()> {
    let Some(name) = Path::new(file).file_name() else {
        return Ok(());
    };
    let path = dir.join(name);
    match fs::remove_file(&path) {
        Ok(()) => {
            log::info!("Reconciler: Deleted {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Reconciler: {} was already gone", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}
