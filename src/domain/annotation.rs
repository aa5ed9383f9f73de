// ============================================================
// Layer 3 — Gaze Annotation Domain Type
// ============================================================
// One entry of the annotation file. Every coordinate is a
// fraction of the source image size, so the same annotation
// works for any resolution:
//
//   {
//     "path":          "images/000123.jpg",
//     "x_init": 0.41, "y_init": 0.12,   ← head box top-left
//     "w":      0.08, "h":      0.15,   ← head box size
//     "head_position": [0.45, 0.19],
//     "gaze_point":    [0.62, 0.55]
//   }
//
// The gaze direction label is derived, not stored: it is the
// unit vector pointing from the head to the gaze point.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::gaze::GazeDirection;

/// Head bounding box as fractions of the image width / height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadBox {
    pub x_init: f32,
    pub y_init: f32,
    pub w:      f32,
    pub h:      f32,
}

impl HeadBox {
    pub fn new(x_init: f32, y_init: f32, w: f32, h: f32) -> Self {
        Self { x_init, y_init, w, h }
    }

    /// Pixel rectangle `(x0, y0, x1, y1)` (end-exclusive) inside a
    /// `width × height` image. Fractions are truncated toward zero and
    /// then clamped to the image.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Result<(u32, u32, u32, u32)> {
        let to_px = |frac: f32, extent: u32| -> u32 {
            let px = (extent as f32 * frac).trunc();
            px.clamp(0.0, extent as f32) as u32
        };

        let x0 = to_px(self.x_init,          width);
        let x1 = to_px(self.x_init + self.w, width);
        let y0 = to_px(self.y_init,          height);
        let y1 = to_px(self.y_init + self.h, height);

        if x1 <= x0 || y1 <= y0 {
            bail!(
                "Head box {:?} is empty inside a {}x{} image",
                self, width, height
            );
        }
        Ok((x0, y0, x1, y1))
    }
}

/// A single labelled head: where the image is, where the head is,
/// and where the person is looking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeAnnotation {
    /// Image path relative to the dataset root
    pub path: String,

    pub x_init: f32,
    pub y_init: f32,
    pub w:      f32,
    pub h:      f32,

    /// Normalised head point (x, y)
    pub head_position: [f32; 2],

    /// Normalised gaze target (x, y)
    pub gaze_point: [f32; 2],
}

impl GazeAnnotation {
    pub fn head_box(&self) -> HeadBox {
        HeadBox::new(self.x_init, self.y_init, self.w, self.h)
    }

    /// Ground-truth label: unit vector from head to gaze point.
    /// `None` when the person looks at their own head position.
    pub fn gaze_direction(&self) -> Option<GazeDirection> {
        GazeDirection::between(self.head_position, self.gaze_point)
    }
}
