// ============================================================
// Layer 5 — Predictor
// ============================================================
// Rebuilds the trained network from a run directory and runs it
// on single heads or whole annotation sets.
use anyhow::{Context, Result};
use burn::{data::dataloader::batcher::Batcher, data::dataset::Dataset, prelude::*, tensor::TensorData};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::GazeBatcher,
    dataset::GazeDataset,
    preprocessor::HeadCropper,
};
use crate::domain::annotation::HeadBox;
use crate::domain::gaze::GazeDirection;
use crate::domain::traits::GazeEstimator;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::GazeDirectionNet;
use crate::ml::trainer::{validate, Validation};

pub type InferBackend = burn::backend::Wgpu;

const EVAL_BATCH_SIZE: usize = 16;

pub struct GazePredictor<B: Backend> {
    model:   GazeDirectionNet<B>,
    cropper: HeadCropper,
    config:  TrainConfig,
    device:  B::Device,
}

impl<B: Backend> GazePredictor<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let config = ckpt_manager.load_config()?;
        let model  = config.init_model::<B>(&device)?;
        let model  = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt_manager.dir().display());
        Ok(Self::new(model, config, device))
    }

    pub fn new(model: GazeDirectionNet<B>, config: TrainConfig, device: B::Device) -> Self {
        let cropper = config.cropper();
        Self { model, cropper, config, device }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Predicted unit direction for one head.
    pub fn predict(
        &self,
        image:         &image::RgbImage,
        head_box:      HeadBox,
        head_position: [f32; 2],
    ) -> Result<GazeDirection> {
        let side = self.cropper.size() as usize;
        let head = self.cropper.head_tensor(image, head_box)?;

        let head_images = Tensor::<B, 4>::from_data(TensorData::new(head, [1, 3, side, side]), &self.device);
        let head_pos    = Tensor::<B, 2>::from_data(TensorData::new(head_position.to_vec(), [1, 2]), &self.device);

        let output: Vec<f32> = self
            .model
            .forward(head_images, head_pos)
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read prediction: {e:?}"))?;

        GazeDirection::from_vector(output[0], output[1])
            .context("Network produced a zero-length direction")
    }

    /// Mean loss and angular error over every sample of `dataset`.
    pub fn evaluate(&self, dataset: &GazeDataset) -> Result<Validation> {
        let batcher = GazeBatcher::<B>::new();
        let indices: Vec<usize> = (0..dataset.len()).collect();

        let batches = indices.chunks(EVAL_BATCH_SIZE).filter_map(|chunk| {
            let items: Vec<_> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
            (!items.is_empty()).then(|| batcher.batch(items, &self.device))
        });

        validate(&self.model, batches)
    }
}

impl<B: Backend> GazeEstimator for GazePredictor<B> {
    fn estimate(
        &self,
        image:         &image::RgbImage,
        head_box:      HeadBox,
        head_position: [f32; 2],
    ) -> Result<GazeDirection> {
        self.predict(image, head_box, head_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    use crate::data::dataset::tests::write_fixture;
    use crate::ml::model::tests::small_model;

    type TestBackend = NdArray;

    fn predictor() -> GazePredictor<TestBackend> {
        let device = Default::default();
        let model  = small_model::<TestBackend>(&device);
        let config = TrainConfig { image_size: 32, ..TrainConfig::default() };
        GazePredictor::new(model, config, device)
    }

    #[test]
    fn test_predict_returns_unit_vector() {
        let p     = predictor();
        let image = RgbImage::from_pixel(64, 48, Rgb([120, 80, 40]));
        let dir   = p.predict(&image, HeadBox::new(0.2, 0.2, 0.4, 0.4), [0.4, 0.4]).unwrap();
        assert!(((dir.x * dir.x + dir.y * dir.y).sqrt() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_predict_rejects_empty_head_box() {
        let p     = predictor();
        let image = RgbImage::new(10, 10);
        assert!(p.estimate(&image, HeadBox::new(0.5, 0.5, 0.0, 0.0), [0.5, 0.5]).is_err());
    }

    #[test]
    fn test_evaluate_reports_finite_metrics() {
        let dir     = tempfile::tempdir().unwrap();
        let anns    = write_fixture(dir.path(), 3);
        let dataset = GazeDataset::new(dir.path(), anns, HeadCropper::new(32));

        let report = predictor().evaluate(&dataset).unwrap();
        assert!(report.mean_loss.is_finite());
        assert!((0.0..=2.0).contains(&report.mean_loss));
        assert!((0.0..=180.0).contains(&report.mean_angle_deg));
    }

    #[test]
    fn test_from_checkpoint_requires_training() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(GazePredictor::<TestBackend>::from_checkpoint(&ckpt, Default::default()).is_err());
    }
}
