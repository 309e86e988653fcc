// src/thumbnail.rs

use std::path::{Path, PathBuf};

use crate::persistence::SizeDefinition;

/// Where to read from the source and how big the result will be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDimensions {
    pub src_x: u32,
    pub src_y: u32,
    pub src_w: u32,
    pub src_h: u32,
    pub dst_w: u32,
    pub dst_h: u32,
}

impl ResizeDimensions {
    /// Filename suffix the editor uses for this result, e.g. `150x150`.
    pub fn suffix(&self) -> String {
        format!("{}x{}", self.dst_w, self.dst_h)
    }
}

fn round(v: f64) -> u32 {
    v.round().max(0.0) as u32
}

/// Scales `width`x`height` down to fit inside `max_width`x`max_height`,
/// keeping the aspect ratio. A bound of zero leaves that axis unconstrained.
pub fn constrain_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if max_width == 0 && max_height == 0 {
        return (width, height);
    }

    let mut width_ratio = 1.0_f64;
    let mut height_ratio = 1.0_f64;
    let mut did_width = false;
    let mut did_height = false;

    if max_width > 0 && width > 0 && width > max_width {
        width_ratio = max_width as f64 / width as f64;
        did_width = true;
    }
    if max_height > 0 && height > 0 && height > max_height {
        height_ratio = max_height as f64 / height as f64;
        did_height = true;
    }

    let smaller_ratio = width_ratio.min(height_ratio);
    let larger_ratio = width_ratio.max(height_ratio);

    let ratio = if round(width as f64 * larger_ratio) > max_width
        || round(height as f64 * larger_ratio) > max_height
    {
        smaller_ratio
    } else {
        larger_ratio
    };

    let mut w = round(width as f64 * ratio).max(1);
    let mut h = round(height as f64 * ratio).max(1);

    // Float rounding can land one pixel short of the bound we scaled to.
    if did_width && max_width > 0 && w == max_width - 1 {
        w = max_width;
    }
    if did_height && max_height > 0 && h == max_height - 1 {
        h = max_height;
    }

    (w, h)
}

fn fuzzy_eq(a: u32, b: u32) -> bool {
    a.abs_diff(b) <= 1
}

/// Computes the resize for `size` applied to an `orig_w`x`orig_h` source.
///
/// Returns `None` when nothing sensible can be produced: an empty source, a
/// size without bounds, or a result that would be the source itself.
pub fn resize_dimensions(orig_w: u32, orig_h: u32, size: &SizeDefinition) -> Option<ResizeDimensions> {
    if orig_w == 0 || orig_h == 0 || !size.is_active() {
        return None;
    }
    let dest_w = size.target_width().unwrap_or(0);
    let dest_h = size.target_height().unwrap_or(0);

    let dims = if size.crop {
        let aspect_ratio = orig_w as f64 / orig_h as f64;
        let mut new_w = dest_w.min(orig_w);
        let mut new_h = dest_h.min(orig_h);
        if new_w == 0 {
            new_w = round(new_h as f64 * aspect_ratio);
        }
        if new_h == 0 {
            new_h = round(new_w as f64 / aspect_ratio);
        }
        if new_w == 0 || new_h == 0 {
            return None;
        }

        let size_ratio = (new_w as f64 / orig_w as f64).max(new_h as f64 / orig_h as f64);
        let crop_w = round(new_w as f64 / size_ratio).min(orig_w);
        let crop_h = round(new_h as f64 / size_ratio).min(orig_h);

        ResizeDimensions {
            src_x: (orig_w - crop_w) / 2,
            src_y: (orig_h - crop_h) / 2,
            src_w: crop_w,
            src_h: crop_h,
            dst_w: new_w,
            dst_h: new_h,
        }
    } else {
        let (new_w, new_h) = constrain_dimensions(orig_w, orig_h, dest_w, dest_h);
        ResizeDimensions {
            src_x: 0,
            src_y: 0,
            src_w: orig_w,
            src_h: orig_h,
            dst_w: new_w,
            dst_h: new_h,
        }
    };

    if fuzzy_eq(dims.dst_w, orig_w) && fuzzy_eq(dims.dst_h, orig_h) {
        return None;
    }
    Some(dims)
}

/// Deterministic path of a derived file: `<dir>/<stem>-<suffix>.<ext>`.
/// The extension defaults to the source's own.
pub fn thumbnail_filename(source: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    let ext = extension
        .map(str::to_string)
        .or_else(|| source.extension().map(|e| e.to_string_lossy().into_owned()));
    let name = match ext {
        Some(ext) if !ext.is_empty() => format!("{}-{}.{}", stem, suffix, ext),
        _ => format!("{}-{}", stem, suffix),
    };
    match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: Option<u32>, h: Option<u32>, crop: bool) -> SizeDefinition {
        SizeDefinition::new("test", w, h, crop)
    }

    #[test]
    fn test_constrain_keeps_aspect_ratio() {
        assert_eq!(constrain_dimensions(1200, 800, 300, 300), (300, 200));
        assert_eq!(constrain_dimensions(800, 1200, 300, 300), (200, 300));
        assert_eq!(constrain_dimensions(1200, 800, 768, 0), (768, 512));
        assert_eq!(constrain_dimensions(1200, 800, 0, 0), (1200, 800));
    }

    #[test]
    fn test_constrain_never_upscales() {
        assert_eq!(constrain_dimensions(100, 50, 300, 300), (100, 50));
    }

    #[test]
    fn test_crop_fills_target_box() {
        let dims = resize_dimensions(1200, 800, &size(Some(150), Some(150), true)).unwrap();
        assert_eq!((dims.dst_w, dims.dst_h), (150, 150));
        assert_eq!((dims.src_w, dims.src_h), (800, 800));
        assert_eq!((dims.src_x, dims.src_y), (200, 0));
        assert_eq!(dims.suffix(), "150x150");
    }

    #[test]
    fn test_crop_with_single_bound_derives_other_axis() {
        let dims = resize_dimensions(1200, 800, &size(Some(600), None, true)).unwrap();
        assert_eq!((dims.dst_w, dims.dst_h), (600, 400));
    }

    #[test]
    fn test_fit_mode_uses_whole_source() {
        let dims = resize_dimensions(1200, 800, &size(Some(300), Some(300), false)).unwrap();
        assert_eq!((dims.dst_w, dims.dst_h), (300, 200));
        assert_eq!((dims.src_x, dims.src_y, dims.src_w, dims.src_h), (0, 0, 1200, 800));
    }

    #[test]
    fn test_unscalable_sizes_yield_none() {
        // Target larger than the source in both modes.
        assert!(resize_dimensions(100, 80, &size(Some(1024), Some(1024), false)).is_none());
        assert!(resize_dimensions(100, 80, &size(Some(1024), Some(1024), true)).is_none());
        // No bounds at all.
        assert!(resize_dimensions(1200, 800, &size(None, None, false)).is_none());
        // Empty source.
        assert!(resize_dimensions(0, 800, &size(Some(150), Some(150), true)).is_none());
    }

    #[test]
    fn test_thumbnail_filename_layout() {
        let source = Path::new("/uploads/2024/05/beach.jpg");
        assert_eq!(
            thumbnail_filename(source, "150x150", None),
            PathBuf::from("/uploads/2024/05/beach-150x150.jpg")
        );
        assert_eq!(
            thumbnail_filename(source, "300x200", Some("webp")),
            PathBuf::from("/uploads/2024/05/beach-300x200.webp")
        );
    }
}
