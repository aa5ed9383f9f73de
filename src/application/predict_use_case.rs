// ============================================================
// Layer 2 — Predict / Evaluate Use Cases
// ============================================================
// Both load a finished run directory:
//
//   PredictUseCase  — one image + head box → gaze direction
//   EvaluateUseCase — annotation file → mean loss / angle

use anyhow::Result;
use burn::prelude::Backend;
use std::path::{Path, PathBuf};

use crate::data::{dataset::GazeDataset, loader::AnnotationLoader, preprocessor::HeadCropper};
use crate::domain::annotation::HeadBox;
use crate::domain::gaze::GazeDirection;
use crate::domain::traits::{AnnotationSource, GazeEstimator};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::predictor::{GazePredictor, InferBackend};
use crate::ml::trainer::Validation;

fn load_predictor<B: Backend>(run_dir: &Path, device: B::Device) -> Result<GazePredictor<B>> {
    let ckpt = CheckpointManager::open(run_dir)?;
    GazePredictor::from_checkpoint(&ckpt, device)
}

// ─── PredictUseCase ───────────────────────────────────────────────────────────
pub struct PredictUseCase<B: Backend = InferBackend> {
    predictor: GazePredictor<B>,
}

impl PredictUseCase {
    /// Load `run_dir` onto the default WGPU device.
    pub fn new(run_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_device(run_dir, Default::default())
    }
}

impl<B: Backend> PredictUseCase<B> {
    pub fn with_device(run_dir: impl Into<PathBuf>, device: B::Device) -> Result<Self> {
        Ok(Self { predictor: load_predictor(&run_dir.into(), device)? })
    }

    pub fn predict(
        &self,
        image_path:    &Path,
        head_box:      HeadBox,
        head_position: [f32; 2],
    ) -> Result<GazeDirection> {
        let image = HeadCropper::open(image_path)?;
        self.predictor.estimate(&image, head_box, head_position)
    }
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase<B: Backend = InferBackend> {
    predictor: GazePredictor<B>,
}

impl EvaluateUseCase {
    /// Load `run_dir` onto the default WGPU device.
    pub fn new(run_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_device(run_dir, Default::default())
    }
}

impl<B: Backend> EvaluateUseCase<B> {
    pub fn with_device(run_dir: impl Into<PathBuf>, device: B::Device) -> Result<Self> {
        Ok(Self { predictor: load_predictor(&run_dir.into(), device)? })
    }

    /// Returns the number of usable samples and the aggregate metrics.
    pub fn evaluate(&self, root_dir: &str, ann_file: &str) -> Result<(usize, Validation)> {
        let loader  = AnnotationLoader::new(root_dir, ann_file);
        let anns    = loader.load_all()?;
        let cropper = self.predictor.config().cropper();
        let dataset = GazeDataset::new(loader.root_dir(), anns, cropper);

        if dataset.sample_count() == 0 {
            anyhow::bail!("No usable samples in '{}'", loader.annotation_path().display());
        }

        let report = self.predictor.evaluate(&dataset)?;
        Ok((dataset.sample_count(), report))
    }
}
