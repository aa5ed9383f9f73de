use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::preprocessor::HeadCropper;
use crate::domain::annotation::GazeAnnotation;

/// One training sample, ready for the batcher.
/// `head_image` is channel-major [3, size, size].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeItem {
    pub head_image:     Vec<f32>,
    pub head_position:  [f32; 2],
    pub gaze_direction: [f32; 2],
}

/// An annotation that survived validation, with its label precomputed.
#[derive(Debug, Clone)]
struct Entry {
    image_path: PathBuf,
    annotation: GazeAnnotation,
    direction:  [f32; 2],
}

/// Head-crop dataset over an annotation list. Images are decoded
/// lazily in `get`, so memory stays flat regardless of dataset size.
///
/// burn's DataLoader treats `None` from `get` as the end of the data,
/// so every entry is checked up front and `get` never returns `None`
/// for an index below `len()` while at least one image still loads.
pub struct GazeDataset {
    entries: Vec<Entry>,
    cropper: HeadCropper,
}

impl GazeDataset {
    /// Keep annotations whose image header is readable, whose head box
    /// covers at least one pixel of that image and whose gaze direction
    /// is defined; everything else is skipped with a warning.
    pub fn new(root_dir: impl Into<PathBuf>, anns: Vec<GazeAnnotation>, cropper: HeadCropper) -> Self {
        let root_dir = root_dir.into();
        let total    = anns.len();

        let entries: Vec<Entry> = anns
            .into_iter()
            .filter_map(|annotation| {
                let image_path = root_dir.join(&annotation.path);
                let (width, height) = match image::image_dimensions(&image_path) {
                    Ok(dims) => dims,
                    Err(e) => {
                        tracing::warn!("Skipping '{}': {e}", image_path.display());
                        return None;
                    }
                };
                if let Err(e) = annotation.head_box().pixel_bounds(width, height) {
                    tracing::warn!("Skipping '{}': {e:#}", image_path.display());
                    return None;
                }
                let Some(direction) = annotation.gaze_direction() else {
                    tracing::warn!("Skipping '{}': gaze point equals head position", annotation.path);
                    return None;
                };
                Some(Entry { image_path, direction: direction.as_array(), annotation })
            })
            .collect();

        if entries.len() < total {
            tracing::warn!("Kept {} of {} annotations", entries.len(), total);
        }
        Self { entries, cropper }
    }

    pub fn sample_count(&self) -> usize { self.entries.len() }
}

impl GazeDataset {
    fn load(&self, index: usize) -> Option<GazeItem> {
        let entry = self.entries.get(index)?;

        let head_image = match self.cropper.load_head(&entry.image_path, entry.annotation.head_box()) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("{e:#}");
                return None;
            }
        };

        Some(GazeItem {
            head_image,
            head_position:  entry.annotation.head_position,
            gaze_direction: entry.direction,
        })
    }
}

impl Dataset<GazeItem> for GazeDataset {
    /// An image that fails to decode after construction is logged and
    /// replaced by the next entry that loads.
    fn get(&self, index: usize) -> Option<GazeItem> {
        let len = self.entries.len();
        if index >= len {
            return None;
        }
        (0..len).find_map(|offset| self.load((index + offset) % len))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    /// Write `n` small solid images plus matching annotations into `dir`.
    pub(crate) fn write_fixture(dir: &Path, n: usize) -> Vec<GazeAnnotation> {
        (0..n)
            .map(|i| {
                let name = format!("img_{i}.png");
                let shade = (i * 40 % 256) as u8;
                RgbImage::from_pixel(32, 24, Rgb([shade, 100, 255 - shade]))
                    .save(dir.join(&name))
                    .unwrap();
                let hx = 0.2 + 0.1 * i as f32;
                GazeAnnotation {
                    path: name,
                    x_init: 0.1, y_init: 0.1, w: 0.5, h: 0.5,
                    head_position: [hx, 0.3],
                    gaze_point:    [0.9, 0.9 - 0.05 * i as f32],
                }
            })
            .collect()
    }

    #[test]
    fn test_get_builds_item() {
        let dir  = tempfile::tempdir().unwrap();
        let anns = write_fixture(dir.path(), 3);
        let ds   = GazeDataset::new(dir.path(), anns, HeadCropper::new(8));

        assert_eq!(ds.len(), 3);
        let item = ds.get(1).unwrap();
        assert_eq!(item.head_image.len(), 3 * 8 * 8);
        assert!((item.head_position[0] - 0.3).abs() < 1e-6);
        assert!((item.head_position[1] - 0.3).abs() < 1e-6);
        let [dx, dy] = item.gaze_direction;
        assert!(((dx * dx + dy * dy).sqrt() - 1.0).abs() < 1e-5);
        assert!(ds.get(3).is_none());
    }

    #[test]
    fn test_skips_missing_images_and_undefined_directions() {
        let dir      = tempfile::tempdir().unwrap();
        let mut anns = write_fixture(dir.path(), 2);

        let mut missing = anns[0].clone();
        missing.path = "does_not_exist.png".to_string();
        anns.push(missing);

        let mut degenerate = anns[1].clone();
        degenerate.gaze_point = degenerate.head_position;
        anns.push(degenerate);

        let ds = GazeDataset::new(dir.path(), anns, HeadCropper::new(8));
        assert_eq!(ds.sample_count(), 2);
    }

    #[test]
    fn test_skips_empty_boxes_and_undecodable_files() {
        let dir      = tempfile::tempdir().unwrap();
        let mut anns = write_fixture(dir.path(), 4);

        anns[1].w = 0.0;
        std::fs::write(dir.path().join("img_2.png"), b"not an image").unwrap();

        let ds = GazeDataset::new(dir.path(), anns, HeadCropper::new(8));
        assert_eq!(ds.len(), 2);
        assert!(ds.get(0).is_some());
        assert!(ds.get(1).is_some());
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_get_falls_back_when_image_breaks_later() {
        let dir  = tempfile::tempdir().unwrap();
        let anns = write_fixture(dir.path(), 3);
        let ds   = GazeDataset::new(dir.path(), anns, HeadCropper::new(8));

        std::fs::write(dir.path().join("img_1.png"), b"truncated").unwrap();

        // index 1 is served by entry 2 instead of ending the epoch
        let item = ds.get(1).unwrap();
        assert!((item.head_position[0] - 0.4).abs() < 1e-6);
        assert!(ds.get(2).is_some());
    }
}
