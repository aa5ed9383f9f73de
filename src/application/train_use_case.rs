// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load annotations            (Layer 4 - data)
//   Step 2: Optional train/val split    (Layer 4 - data)
//   Step 3: Build head-crop datasets    (Layer 4 - data)
//   Step 4: Create the run directory    (Layer 6 - infra)
//   Step 5: Save config                 (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)
//   Step 7: Write loss history          (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{prelude::Backend, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::GazeDataset,
    loader::AnnotationLoader,
    preprocessor::HeadCropper,
    splitter::split_train_val,
};
use crate::domain::traits::AnnotationSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{GazeDirectionConfig, GazeDirectionNet};
use crate::ml::resnet::ResNetDepth;
use crate::ml::schedule::StepLr;
use crate::ml::trainer::{run_training, TrainBackend};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the
// weights so the predictor can rebuild the same network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub root_dir:     String,
    pub ann_file:     String,
    pub output_dir:   String,
    pub batch_size:   usize,
    pub epochs:       usize,
    pub lr:           f64,
    pub weight_decay: f64,
    pub step_size:    usize,
    pub gamma:        f64,
    pub depth:        usize,
    pub image_size:   u32,
    pub val_fraction: f64,
    pub split_seed:   u64,
    pub shuffle_seed: Option<u64>,
    pub num_workers:  usize,
    pub pretrained:   Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            root_dir:     "data/SVIP/".to_string(),
            ann_file:     "SVIP_annotation.json".to_string(),
            output_dir:   ".".to_string(),
            batch_size:   5,
            epochs:       5,
            lr:           1e-4,
            weight_decay: 1e-4,
            step_size:    5,
            gamma:        0.1,
            depth:        50,
            image_size:   224,
            val_fraction: 0.0,
            split_seed:   42,
            shuffle_seed: None,
            num_workers:  1,
            pretrained:   None,
        }
    }
}

impl TrainConfig {
    /// Directory name encoding the main hyper-parameters, e.g.
    /// `batchsize_5_lr_0.0001_5_epoch_pretrained`
    pub fn run_name(&self) -> String {
        let init = if self.pretrained.is_some() { "pretrained" } else { "scratch" };
        format!("batchsize_{}_lr_{}_{}_epoch_{}", self.batch_size, self.lr, self.epochs, init)
    }

    pub fn run_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(self.run_name())
    }

    pub fn backbone_depth(&self) -> Result<ResNetDepth> {
        ResNetDepth::try_from(self.depth)
    }

    pub fn model_config(&self) -> Result<GazeDirectionConfig> {
        Ok(GazeDirectionConfig::new(self.backbone_depth()?.config()))
    }

    /// Fresh network: the named ResNet for `depth` plus the gaze head.
    pub fn init_model<B: Backend>(&self, device: &B::Device) -> Result<GazeDirectionNet<B>> {
        let backbone = self.backbone_depth()?.init(device);
        Ok(self.model_config()?.init_with(backbone, device))
    }

    pub fn schedule(&self) -> StepLr {
        StepLr::new(self.lr, self.step_size, self.gamma)
    }

    pub fn cropper(&self) -> HeadCropper {
        HeadCropper::new(self.image_size)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline on the default WGPU device;
    /// returns the run directory.
    pub fn execute(&self) -> Result<PathBuf> {
        self.execute_on::<TrainBackend>(Default::default())
    }

    /// Same pipeline on any autodiff backend.
    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<PathBuf> {
        let cfg = &self.config;

        // Fail on a bad depth before touching any data
        let depth = cfg.backbone_depth()?;

        // ── Step 1: Load annotations ──────────────────────────────────────────
        let loader = AnnotationLoader::new(&cfg.root_dir, cfg.ann_file.clone());
        let anns   = loader.load_all()?;

        // ── Step 2: Optional validation split ─────────────────────────────────
        let (train_anns, val_anns) = split_train_val(anns, 1.0 - cfg.val_fraction, cfg.split_seed);
        tracing::info!("Split: {} train, {} validation", train_anns.len(), val_anns.len());

        // ── Step 3: Datasets ──────────────────────────────────────────────────
        let train_dataset = GazeDataset::new(loader.root_dir(), train_anns, cfg.cropper());
        let val_dataset   = (!val_anns.is_empty())
            .then(|| GazeDataset::new(loader.root_dir(), val_anns, cfg.cropper()));

        if train_dataset.sample_count() == 0 {
            anyhow::bail!("No usable training samples in '{}'", loader.annotation_path().display());
        }

        // ── Step 4-5: Run directory + config ──────────────────────────────────
        let run_dir = cfg.run_dir();
        let ckpt    = CheckpointManager::new(&run_dir)?;
        ckpt.save_config(cfg)?;
        tracing::info!("Training {} gaze network into '{}'", depth, run_dir.display());

        // ── Step 6: Training loop ─────────────────────────────────────────────
        let history = run_training::<B>(cfg, train_dataset, val_dataset, &ckpt, device)?;

        // ── Step 7: Loss history ──────────────────────────────────────────────
        history.write_json(&run_dir)?;

        Ok(run_dir)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::dataset::tests::write_fixture;

    /// Fixture images plus `ann.json` in `root`; a resnet18 config
    /// small enough for a CPU test.
    pub(crate) fn fixture_config(root: &std::path::Path, samples: usize) -> TrainConfig {
        let anns = write_fixture(root, samples);
        std::fs::write(root.join("ann.json"), serde_json::to_string(&anns).unwrap()).unwrap();
        TrainConfig {
            root_dir:   root.to_string_lossy().into_owned(),
            ann_file:   "ann.json".to_string(),
            output_dir: root.join("out").to_string_lossy().into_owned(),
            batch_size: 3,
            epochs:     1,
            depth:      18,
            image_size: 32,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_run_name() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.run_name(), "batchsize_5_lr_0.0001_5_epoch_scratch");

        let cfg = TrainConfig { pretrained: Some("backbone.mpk".into()), ..cfg };
        assert_eq!(cfg.run_name(), "batchsize_5_lr_0.0001_5_epoch_pretrained");
    }

    #[test]
    fn test_model_config_follows_depth() {
        let cfg = TrainConfig { depth: 18, ..TrainConfig::default() };
        assert_eq!(cfg.model_config().unwrap().backbone.out_features(), 512);

        let cfg = TrainConfig { depth: 19, ..TrainConfig::default() };
        assert!(cfg.model_config().is_err());
    }

    #[test]
    fn test_init_model_uses_named_backbone() {
        let device = Default::default();
        let cfg    = TrainConfig { depth: 18, ..TrainConfig::default() };
        let model  = cfg.init_model::<NdArray>(&device).unwrap();

        let images    = burn::tensor::Tensor::<NdArray, 4>::zeros([1, 3, 32, 32], &device);
        let positions = burn::tensor::Tensor::<NdArray, 2>::from_floats([[0.5, 0.5]], &device);
        assert_eq!(model.forward(images, positions).dims(), [1, 2]);

        let cfg = TrainConfig { depth: 20, ..cfg };
        assert!(cfg.init_model::<NdArray>(&device).is_err());
    }

    #[test]
    fn test_execute_writes_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture_config(dir.path(), 3);

        let run_dir = TrainUseCase::new(cfg.clone())
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap();
        assert_eq!(run_dir, cfg.run_dir());

        for file in [
            "train_config.json",
            "latest_epoch.json",
            "metrics.csv",
            "loss.json",
            "meanloss.json",
            "model_epoch_1.mpk",
            "backbone.mpk",
        ] {
            assert!(run_dir.join(file).exists(), "missing {file}");
        }

        // 3 samples in one batch of 3
        let loss: Vec<Vec<f64>> =
            serde_json::from_str(&std::fs::read_to_string(run_dir.join("loss.json")).unwrap()).unwrap();
        assert_eq!(loss.len(), 1);
        assert_eq!(loss[0].len(), 1);
        assert!(loss[0][0].is_finite());

        let saved = CheckpointManager::open(&run_dir).unwrap().load_config().unwrap();
        assert_eq!(saved.depth, 18);
        assert_eq!(saved.image_size, 32);
    }

    #[test]
    fn test_missing_annotations_fail() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            root_dir:   dir.path().to_string_lossy().into_owned(),
            output_dir: dir.path().to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
