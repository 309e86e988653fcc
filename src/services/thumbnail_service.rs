// src/services/thumbnail_service.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::{SerializableImageError, SerializableIoError, ThumbnailError};
use crate::persistence::{SizeDefinition, ThumbnailRecord};
use crate::thumbnail::{resize_dimensions, thumbnail_filename};

/// Per-size outcome of a batch generation.
pub type GenerationResults = BTreeMap<String, Result<ThumbnailRecord, ThumbnailError>>;

/// The pixel side of thumbnail generation. Implementations decide how
/// images are decoded, resampled and encoded.
pub trait ImageEditor {
    /// Dimensions of the original, used to plan resizes.
    fn source_dimensions(&self, source: &Path) -> Result<(u32, u32), ThumbnailError>;

    /// The file the editor would write for `suffix`, without writing it.
    fn resulting_filename(&self, source: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
        thumbnail_filename(source, suffix, extension)
    }

    /// Produces one file per size. A failing size must not prevent the
    /// others from being attempted.
    fn generate_missing(&self, source: &Path, sizes: &[SizeDefinition]) -> GenerationResults;
}

/// [`ImageEditor`] backed by the `image` crate. Thumbnails are written next
/// to the source in the source's own format.
#[derive(Debug, Default)]
pub struct ImageCrateEditor;

const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

impl ImageCrateEditor {
    pub fn new() -> Self {
        Self
    }

    fn resize_one(
        &self,
        img: &DynamicImage,
        source: &Path,
        size: &SizeDefinition,
    ) -> Result<ThumbnailRecord, ThumbnailError> {
        let dims = resize_dimensions(img.width(), img.height(), size)
            .ok_or_else(|| ThumbnailError::Dimensions(size.name.clone()))?;

        let resized = if size.crop {
            img.crop_imm(dims.src_x, dims.src_y, dims.src_w, dims.src_h)
                .resize_exact(dims.dst_w, dims.dst_h, RESAMPLE_FILTER)
        } else {
            img.resize_exact(dims.dst_w, dims.dst_h, RESAMPLE_FILTER)
        };

        let thumb_path = self.resulting_filename(source, &dims.suffix(), None);
        if let Some(dir) = thumb_path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                ThumbnailError::DirectoryCreation(dir.to_path_buf(), SerializableIoError::from(e))
            })?;
        }
        resized.save(&thumb_path).map_err(|e| {
            log::error!(
                "ThumbnailService: Failed to write thumbnail {}: {}",
                thumb_path.display(),
                e
            );
            ThumbnailError::ImageSave(thumb_path.clone(), SerializableImageError::from(&e))
        })?;

        let file = thumb_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = ImageFormat::from_path(&thumb_path)
            .ok()
            .map(|f| f.to_mime_type().to_string());

        log::debug!(
            "ThumbnailService: Wrote '{}' thumbnail {} ({}x{})",
            size.name,
            thumb_path.display(),
            resized.width(),
            resized.height()
        );

        Ok(ThumbnailRecord {
            file,
            width: resized.width(),
            height: resized.height(),
            mime_type,
        })
    }
}

impl ImageEditor for ImageCrateEditor {
    fn source_dimensions(&self, source: &Path) -> Result<(u32, u32), ThumbnailError> {
        image::image_dimensions(source).map_err(|e| {
            ThumbnailError::ImageOpen(source.to_path_buf(), SerializableImageError::from(&e))
        })
    }

    fn generate_missing(&self, source: &Path, sizes: &[SizeDefinition]) -> GenerationResults {
        let mut results = GenerationResults::new();
        if sizes.is_empty() {
            return results;
        }

        let img = match image::open(source) {
            Ok(img) => img,
            Err(e) => {
                log::error!(
                    "ThumbnailService: Failed to open image {} for thumbnail generation: {}",
                    source.display(),
                    e
                );
                let err = ThumbnailError::ImageOpen(source.to_path_buf(), SerializableImageError::from(&e));
                for size in sizes {
                    results.insert(size.name.clone(), Err(err.clone()));
                }
                return results;
            }
        };

        for size in sizes {
            results.insert(size.name.clone(), self.resize_one(&img, source, size));
        }
        results
    }
}
