// ============================================================
// Layer 4 — Head Crop Preprocessor
// ============================================================
// Turns a source image and a head box into the network input:
//
//   1. crop the head box out of the RGB image
//   2. resize to size × size (bilinear)
//   3. scale bytes to [0, 1]
//   4. normalise per channel with the ImageNet mean / std
//   5. lay out channel-major: [R plane][G plane][B plane]
//
// The channel-major Vec<f32> reshapes directly into a
// [3, size, size] tensor in the batcher.

use anyhow::{Context, Result};
use image::{imageops::FilterType, RgbImage};
use std::path::Path;

use crate::domain::annotation::HeadBox;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD:  [f32; 3] = [0.229, 0.224, 0.225];

/// Default side length of the head crop fed to the backbone
pub const DEFAULT_INPUT_SIZE: u32 = 224;

#[derive(Debug, Clone, Copy)]
pub struct HeadCropper {
    size: u32,
}

impl Default for HeadCropper {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl HeadCropper {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Decode an image file as 8-bit RGB.
    pub fn open(path: &Path) -> Result<RgbImage> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(img.to_rgb8())
    }

    /// Load `path`, crop the head and return the normalised tensor data.
    pub fn load_head(&self, path: &Path, head_box: HeadBox) -> Result<Vec<f32>> {
        let image = Self::open(path)?;
        self.head_tensor(&image, head_box)
            .with_context(|| format!("Cannot crop head from '{}'", path.display()))
    }

    /// Crop + resize + normalise an already-decoded image.
    pub fn head_tensor(&self, image: &RgbImage, head_box: HeadBox) -> Result<Vec<f32>> {
        let (x0, y0, x1, y1) = head_box.pixel_bounds(image.width(), image.height())?;

        let crop    = image::imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
        let resized = image::imageops::resize(&crop, self.size, self.size, FilterType::Triangle);

        Ok(self.normalise(&resized))
    }

    fn normalise(&self, img: &RgbImage) -> Vec<f32> {
        let plane    = (self.size as usize) * (self.size as usize);
        let mut data = vec![0.0f32; 3 * plane];

        for (i, pixel) in img.pixels().enumerate() {
            for c in 0..3 {
                let v = pixel[c] as f32 / 255.0;
                data[c * plane + i] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
        data
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_output_shape() {
        let img  = RgbImage::from_pixel(40, 30, Rgb([10, 20, 30]));
        let crop = HeadCropper::new(16);
        let data = crop.head_tensor(&img, HeadBox::new(0.25, 0.25, 0.5, 0.5)).unwrap();
        assert_eq!(data.len(), 3 * 16 * 16);
    }

    #[test]
    fn test_normalisation_per_channel() {
        // Solid colour survives resizing unchanged
        let img  = RgbImage::from_pixel(20, 20, Rgb([255, 0, 128]));
        let crop = HeadCropper::new(8);
        let data = crop.head_tensor(&img, HeadBox::new(0.0, 0.0, 1.0, 1.0)).unwrap();

        let plane = 64;
        let r = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let g = (0.0 - IMAGENET_MEAN[1]) / IMAGENET_STD[1];
        let b = (128.0 / 255.0 - IMAGENET_MEAN[2]) / IMAGENET_STD[2];
        assert!((data[0]         - r).abs() < 1e-5);
        assert!((data[plane]     - g).abs() < 1e-5);
        assert!((data[2 * plane] - b).abs() < 1e-5);
    }

    #[test]
    fn test_crop_selects_head_region() {
        // Left half black, right half white; crop the right half only
        let img = RgbImage::from_fn(20, 10, |x, _| {
            if x < 10 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let crop = HeadCropper::new(4);
        let data = crop.head_tensor(&img, HeadBox::new(0.5, 0.0, 0.5, 1.0)).unwrap();
        let white_r = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        assert!(data[..16].iter().all(|v| (v - white_r).abs() < 1e-5));
    }

    #[test]
    fn test_empty_head_box_is_error() {
        let img  = RgbImage::new(10, 10);
        let crop = HeadCropper::new(4);
        assert!(crop.head_tensor(&img, HeadBox::new(0.5, 0.5, 0.01, 0.5)).is_err());
    }

    #[test]
    fn test_load_head_from_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.png");
        RgbImage::from_pixel(12, 12, Rgb([1, 2, 3])).save(&path).unwrap();

        let crop = HeadCropper::new(6);
        let data = crop.load_head(&path, HeadBox::new(0.0, 0.0, 0.5, 0.5)).unwrap();
        assert_eq!(data.len(), 3 * 36);
        assert!(crop.load_head(&dir.path().join("missing.png"), HeadBox::new(0.0, 0.0, 0.5, 0.5)).is_err());
    }
}
