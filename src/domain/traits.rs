// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so a new
// annotation format or a different model runner can be plugged
// in without touching the workflow code.

use anyhow::Result;

use crate::domain::annotation::{GazeAnnotation, HeadBox};
use crate::domain::gaze::GazeDirection;

// ─── AnnotationSource ─────────────────────────────────────────────────────────
/// Any component that can produce gaze annotations.
///
/// Implementations:
///   - AnnotationLoader → a JSON array on disk
pub trait AnnotationSource {
    /// Load every annotation from this source.
    fn load_all(&self) -> Result<Vec<GazeAnnotation>>;
}

// ─── GazeEstimator ────────────────────────────────────────────────────────────
/// Any component that can estimate where a person is looking
/// from a head crop and the head position.
///
/// Implementations:
///   - GazePredictor → the trained GazeDirectionNet
pub trait GazeEstimator {
    fn estimate(
        &self,
        image:         &image::RgbImage,
        head_box:      HeadBox,
        head_position: [f32; 2],
    ) -> Result<GazeDirection>;
}
