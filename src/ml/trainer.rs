// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop over Burn's DataLoader with Adam + step decay.
//
// Per epoch:
//   1. learning rate from the StepLr schedule
//   2. for every batch: forward → loss → backward → Adam step
//   3. optional validation on the inner backend (no autodiff)
//   4. metrics CSV row + checkpoint
//
// Key Burn insight:
//   - Training uses Autodiff<Wgpu> for gradients
//   - model.valid() returns the model on the inner backend (Wgpu)
//   - Validation batcher must also use the inner backend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::GazeBatcher, dataset::GazeDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, LossHistory, MetricsLogger},
};
use crate::ml::loss::{angular_errors_degrees, gaze_direction_loss};
use crate::ml::model::GazeDirectionNet;

/// Backend used by the `train` command
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backbone records written into the run directory; either can seed
/// a later run through `--pretrained`.
pub const FINAL_BACKBONE: &str = "backbone";
pub const BEST_BACKBONE:  &str = "backbone_best";

/// Validation summary for one pass over the held-out set
#[derive(Debug, Clone, Copy)]
pub struct Validation {
    pub mean_loss:      f64,
    pub mean_angle_deg: f64,
}

/// Build the network (optionally seeding the backbone) and train it on `device`.
pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: GazeDataset,
    val_dataset:   Option<GazeDataset>,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<LossHistory> {
    tracing::info!("Using device: {:?}", device);

    let mut model: GazeDirectionNet<B> = cfg.init_model(&device)?;
    if let Some(path) = &cfg.pretrained {
        tracing::info!("Seeding backbone from '{}'", path);
        model.head_feature_net =
            CheckpointManager::load_backbone(model.head_feature_net, std::path::Path::new(path), &device)?;
    }

    let metrics = MetricsLogger::new(ckpt_manager.dir())?;
    let (_, history) = train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, &metrics, device)?;
    Ok(history)
}

/// Backend-generic epoch loop; returns the trained model and every batch loss.
pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    mut model:     GazeDirectionNet<B>,
    train_dataset: GazeDataset,
    val_dataset:   Option<GazeDataset>,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<(GazeDirectionNet<B>, LossHistory)> {
    // ── Adam optimiser with L2 weight decay ───────────────────────────────────
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(Some(WeightDecayConfig::new(cfg.weight_decay as f32)));
    let mut optim = optim_cfg.init();
    let schedule  = cfg.schedule();

    let batch_size  = cfg.batch_size.max(1);
    let num_batches = train_dataset.len().div_ceil(batch_size) as u64;

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let mut train_builder = DataLoaderBuilder::new(GazeBatcher::<B>::new())
        .batch_size(batch_size)
        .num_workers(cfg.num_workers.max(1))
        .set_device(device.clone());
    if let Some(seed) = cfg.shuffle_seed {
        train_builder = train_builder.shuffle(seed);
    }
    let train_loader = train_builder.build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = val_dataset.map(|ds| {
        DataLoaderBuilder::new(GazeBatcher::<B::InnerBackend>::new())
            .batch_size(batch_size)
            .num_workers(cfg.num_workers.max(1))
            .set_device(device.clone())
            .build(ds)
    });

    let mut history       = LossHistory::new();
    let mut best_val_loss = f64::INFINITY;

    for epoch in 0..cfg.epochs {
        let lr = schedule.lr_for_epoch(epoch);

        let progress = ProgressBar::new(num_batches);
        progress.set_style(
            ProgressStyle::with_template("epoch {prefix} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        progress.set_prefix(format!("{}/{}", epoch + 1, cfg.epochs));

        // ── Training phase ────────────────────────────────────────────────────
        let mut batch_losses = Vec::with_capacity(num_batches as usize);

        for batch in train_loader.iter() {
            let (loss, output) = model.forward_loss(
                batch.head_images,
                batch.head_positions,
                batch.gaze_directions.clone(),
            );

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            tracing::debug!(
                "output={} groundtruth={} lr={lr:e} loss={loss_val:.6}",
                output,
                batch.gaze_directions,
            );

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);

            batch_losses.push(loss_val);
            progress.set_message(format!("loss={loss_val:.4}"));
            progress.inc(1);
        }
        progress.finish_and_clear();

        let train_loss = if batch_losses.is_empty() {
            f64::NAN
        } else {
            batch_losses.iter().sum::<f64>() / batch_losses.len() as f64
        };
        history.push_epoch(batch_losses);

        // ── Validation phase ──────────────────────────────────────────────────
        let validation = val_loader
            .as_ref()
            .map(|loader| validate(&model.valid(), loader.iter()))
            .transpose()?;

        let row = EpochMetrics {
            epoch:         epoch + 1,
            lr,
            train_loss,
            val_loss:      validation.map(|v| v.mean_loss),
            val_angle_deg: validation.map(|v| v.mean_angle_deg),
        };

        match validation {
            Some(v) => tracing::info!(
                "Epoch {:>3}/{} | lr={:e} | train_loss={:.4} | val_loss={:.4} | val_angle={:.1}°",
                epoch + 1, cfg.epochs, lr, train_loss, v.mean_loss, v.mean_angle_deg,
            ),
            None => tracing::info!(
                "Epoch {:>3}/{} | lr={:e} | train_loss={:.4}",
                epoch + 1, cfg.epochs, lr, train_loss,
            ),
        }

        if row.is_improvement(best_val_loss) {
            best_val_loss = row.val_loss.unwrap_or(best_val_loss);
            ckpt_manager.save_backbone(&model.head_feature_net, BEST_BACKBONE)?;
            tracing::info!("New best val_loss={:.4}, backbone saved", best_val_loss);
        }

        metrics.log(&row)?;
        ckpt_manager.save_model(&model, epoch + 1)?;
    }

    let backbone = ckpt_manager.save_backbone(&model.head_feature_net, FINAL_BACKBONE)?;
    tracing::info!(
        "Training complete! {} epochs, backbone '{}', metrics '{}'",
        history.epochs().len(),
        backbone.display(),
        metrics.csv_path().display(),
    );
    Ok((model, history))
}

/// Mean loss and mean angular error of `model` over `batches`.
pub fn validate<B: Backend>(
    model:   &GazeDirectionNet<B>,
    batches: impl Iterator<Item = crate::data::batcher::GazeBatch<B>>,
) -> Result<Validation> {
    let mut loss_sum    = 0.0f64;
    let mut loss_count  = 0usize;
    let mut angle_sum   = 0.0f64;
    let mut angle_count = 0usize;

    for batch in batches {
        let output = model.forward(batch.head_images, batch.head_positions);

        let loss = gaze_direction_loss(output.clone(), batch.gaze_directions.clone());
        loss_sum   += loss.into_scalar().elem::<f64>();
        loss_count += 1;

        for angle in angular_errors_degrees(output, batch.gaze_directions)? {
            angle_sum   += angle as f64;
            angle_count += 1;
        }
    }

    Ok(Validation {
        mean_loss:      if loss_count  > 0 { loss_sum  / loss_count  as f64 } else { f64::NAN },
        mean_angle_deg: if angle_count > 0 { angle_sum / angle_count as f64 } else { f64::NAN },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    use crate::data::{dataset::tests::write_fixture, preprocessor::HeadCropper};
    use crate::infra::checkpoint::RECORD_EXTENSION;
    use crate::ml::model::tests::small_model;

    type TestBackend = Autodiff<NdArray>;

    fn test_config(epochs: usize) -> TrainConfig {
        TrainConfig {
            batch_size: 4,
            epochs,
            lr:         5e-3,
            step_size:  1000,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_loss_decreases_on_fixed_set() {
        let dir     = tempfile::tempdir().unwrap();
        let anns    = write_fixture(dir.path(), 4);
        let dataset = GazeDataset::new(dir.path(), anns, HeadCropper::new(32));

        let run     = dir.path().join("run");
        let ckpt    = CheckpointManager::new(&run).unwrap();
        let metrics = MetricsLogger::new(&run).unwrap();
        let device  = Default::default();
        let model   = small_model::<TestBackend>(&device);

        let cfg = test_config(12);
        let (_, history) = train_loop(&cfg, model, dataset, None, &ckpt, &metrics, device).unwrap();

        let means = history.mean_losses();
        assert_eq!(means.len(), 12);
        assert!(means.iter().all(|m| m.is_finite()));
        assert!(means[11] < means[0], "loss did not decrease: {means:?}");

        assert_eq!(ckpt.latest_epoch().unwrap(), 12);
        assert!(run.join(format!("{FINAL_BACKBONE}.{RECORD_EXTENSION}")).exists());
        assert!(!run.join(format!("{BEST_BACKBONE}.{RECORD_EXTENSION}")).exists());
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 13);
    }

    #[test]
    fn test_bad_sample_does_not_shorten_epoch() {
        let dir      = tempfile::tempdir().unwrap();
        let mut anns = write_fixture(dir.path(), 6);
        anns[1].w = 0.0;
        let dataset = GazeDataset::new(dir.path(), anns, HeadCropper::new(32));

        let run     = dir.path().join("run");
        let ckpt    = CheckpointManager::new(&run).unwrap();
        let metrics = MetricsLogger::new(&run).unwrap();
        let device  = Default::default();
        let model   = small_model::<TestBackend>(&device);

        let cfg = TrainConfig { batch_size: 1, ..test_config(1) };
        let (_, history) = train_loop(&cfg, model, dataset, None, &ckpt, &metrics, device).unwrap();

        // every one of the 5 usable samples is trained on
        assert_eq!(history.epochs()[0].len(), 5);
        assert!(history.mean_losses()[0].is_finite());
    }

    #[test]
    fn test_batches_per_epoch_and_validation() {
        let dir      = tempfile::tempdir().unwrap();
        let anns     = write_fixture(dir.path(), 5);
        let val_anns = anns[3..].to_vec();
        let train    = GazeDataset::new(dir.path(), anns, HeadCropper::new(32));
        let val      = GazeDataset::new(dir.path(), val_anns, HeadCropper::new(32));

        let run     = dir.path().join("run");
        let ckpt    = CheckpointManager::new(&run).unwrap();
        let metrics = MetricsLogger::new(&run).unwrap();
        let device  = Default::default();
        let model   = small_model::<TestBackend>(&device);

        let cfg = TrainConfig { batch_size: 2, ..test_config(1) };
        let (_, history) = train_loop(&cfg, model, train, Some(val), &ckpt, &metrics, device).unwrap();

        // 5 samples in batches of 2 → 3 batches
        assert_eq!(history.epochs()[0].len(), 3);

        let csv  = std::fs::read_to_string(metrics.csv_path()).unwrap();
        let row  = csv.lines().nth(1).unwrap();
        let cols: Vec<&str> = row.split(',').collect();
        assert_eq!(cols.len(), 5);
        assert!(!cols[3].is_empty());
        let angle: f64 = cols[4].parse().unwrap();
        assert!((0.0..=180.0).contains(&angle));

        // the first validated epoch is always an improvement
        assert!(run.join(format!("{BEST_BACKBONE}.{RECORD_EXTENSION}")).exists());
    }
}
