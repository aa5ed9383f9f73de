// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores network weights using Burn's CompactRecorder.
//
// What gets saved in a run directory:
//   1. Model weights (.mpk file)   — all learned parameters
//   2. latest_epoch.json            — which epoch was last saved
//   3. train_config.json            — hyper-parameters + backbone depth
//
// The config is needed to rebuild the exact architecture
// (backbone depth, head widths) before weights can be loaded
// into it.
//
// File naming convention:
//   batchsize_5_lr_0.0001_5_epoch_scratch/
//     model_epoch_1.mpk      ← weights after epoch 1
//     ...
//     model_epoch_5.mpk      ← final weights
//     latest_epoch.json
//     train_config.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::GazeDirectionNet;
use crate::ml::resnet::ResNet;

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

/// Extension CompactRecorder appends to every record it writes
pub const RECORD_EXTENSION: &str = "mpk";

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory without creating it.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            anyhow::bail!(
                "Checkpoint dir '{}' does not exist. Have you run 'train' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        // no extension: the recorder adds .mpk
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Save network weights for a given epoch and point
    /// latest_epoch.json at it.
    pub fn save_model<B: Backend>(&self, model: &GazeDirectionNet<B>, epoch: usize) -> Result<()> {
        let path = self.model_path(epoch);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_EPOCH_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load weights from the latest saved epoch into `model`.
    /// `model` must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend>(
        &self,
        model:  GazeDirectionNet<B>,
        device: &B::Device,
    ) -> Result<GazeDirectionNet<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.model_path(epoch);

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    /// Save only the backbone, in the format `load_backbone` reads.
    /// Returns the written file (`{dir}/{name}.mpk`), which can seed a
    /// later run through `--pretrained`.
    pub fn save_backbone<B: Backend>(&self, backbone: &ResNet<B>, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        CompactRecorder::new()
            .record(backbone.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save backbone to '{}'", path.display()))?;
        Ok(self.dir.join(format!("{name}.{RECORD_EXTENSION}")))
    }

    /// Load backbone weights from a record file written by `save_backbone`
    /// (path given with or without the .mpk extension).
    pub fn load_backbone<B: Backend>(
        backbone: ResNet<B>,
        path:     &Path,
        device:   &B::Device,
    ) -> Result<ResNet<B>> {
        let path = strip_record_extension(path);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load pretrained backbone '{}'", path.display()))?;
        Ok(backbone.load_record(record))
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration saved by `save_config`.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    /// Epoch number recorded in latest_epoch.json
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH_FILE);

        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{LATEST_EPOCH_FILE}'. Have you run 'train' first?")
        })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

/// `foo.mpk` → `foo`; the recorder appends its own extension.
fn strip_record_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == RECORD_EXTENSION => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}
