// ============================================================
// Layer 6 — Metrics and Loss History
// ============================================================
// Two records of a training run:
//
//   metrics.csv    — one row per epoch, appended as training goes
//                    epoch,lr,train_loss,val_loss,val_angle_deg
//   loss.json      — every batch loss, grouped per epoch
//                    [[0.93, 0.88, ...], [0.61, ...], ...]
//   meanloss.json  — mean batch loss per epoch
//                    [0.87, 0.54, ...]
//
// Validation columns are empty when no validation set is used.
//
// How to read the metrics:
//   - train_loss is mean(1 - cos); 0 is perfect, 1 is chance level
//   - val_angle_deg is the mean angle between predicted and true
//     gaze directions on held-out heads

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Learning rate used for this epoch
    pub lr: f64,

    /// Mean gaze-direction loss over all training batches
    pub train_loss: f64,

    /// Mean gaze-direction loss on the validation set
    pub val_loss: Option<f64>,

    /// Mean angular error on the validation set, in degrees
    pub val_angle_deg: Option<f64>,
}

impl EpochMetrics {
    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss.is_some_and(|v| v < best_val_loss)
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,lr,train_loss,val_loss,val_angle_deg")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        let opt = |v: Option<f64>| v.map(|v| format!("{v:.6}")).unwrap_or_default();
        writeln!(
            f,
            "{},{:e},{:.6},{},{}",
            m.epoch,
            m.lr,
            m.train_loss,
            opt(m.val_loss),
            opt(m.val_angle_deg),
        )?;

        tracing::debug!("Logged epoch {} metrics: train_loss={:.4}", m.epoch, m.train_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── LossHistory ──────────────────────────────────────────────────────────────
/// Every batch loss of a run, grouped by epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    epochs: Vec<Vec<f64>>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_epoch(&mut self, batch_losses: Vec<f64>) {
        self.epochs.push(batch_losses);
    }

    pub fn epochs(&self) -> &[Vec<f64>] {
        &self.epochs
    }

    /// Mean loss per epoch; NaN for an epoch without batches.
    pub fn mean_losses(&self) -> Vec<f64> {
        self.epochs
            .iter()
            .map(|losses| {
                if losses.is_empty() {
                    f64::NAN
                } else {
                    losses.iter().sum::<f64>() / losses.len() as f64
                }
            })
            .collect()
    }

    /// Write `loss.json` and `meanloss.json` into `dir`.
    pub fn write_json(&self, dir: &Path) -> Result<()> {
        let loss_path = dir.join("loss.json");
        fs::write(&loss_path, serde_json::to_string(&self.epochs)?)
            .with_context(|| format!("Cannot write '{}'", loss_path.display()))?;

        // serde_json refuses NaN, so empty epochs are written as null
        let means: Vec<Option<f64>> = self
            .mean_losses()
            .into_iter()
            .map(|m| m.is_finite().then_some(m))
            .collect();
        let mean_path = dir.join("meanloss.json");
        fs::write(&mean_path, serde_json::to_string(&means)?)
            .with_context(|| format!("Cannot write '{}'", mean_path.display()))?;

        tracing::info!("Wrote loss history to '{}'", dir.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(val_loss: Option<f64>) -> EpochMetrics {
        EpochMetrics { epoch: 2, lr: 1e-4, train_loss: 0.5, val_loss, val_angle_deg: None }
    }

    #[test]
    fn test_is_improvement() {
        assert!(metrics(Some(0.3)).is_improvement(0.4));
        assert!(!metrics(Some(0.3)).is_improvement(0.2));
        assert!(!metrics(None).is_improvement(1.0));
    }

    #[test]
    fn test_csv_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(None)).unwrap();
        logger.log(&EpochMetrics { val_angle_deg: Some(12.5), ..metrics(Some(0.25)) }).unwrap();

        let csv   = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "epoch,lr,train_loss,val_loss,val_angle_deg");
        assert_eq!(lines[1], "2,1e-4,0.500000,,");
        assert_eq!(lines[2], "2,1e-4,0.500000,0.250000,12.500000");
    }

    #[test]
    fn test_mean_losses() {
        let mut h = LossHistory::new();
        h.push_epoch(vec![1.0, 0.5]);
        h.push_epoch(vec![0.25]);
        assert_eq!(h.mean_losses(), vec![0.75, 0.25]);
    }

    #[test]
    fn test_write_json() {
        let dir   = tempfile::tempdir().unwrap();
        let mut h = LossHistory::new();
        h.push_epoch(vec![1.0, 0.5]);
        h.push_epoch(vec![]);
        h.write_json(dir.path()).unwrap();

        let loss: Vec<Vec<f64>> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("loss.json")).unwrap()).unwrap();
        assert_eq!(loss, vec![vec![1.0, 0.5], vec![]]);

        let mean: Vec<Option<f64>> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("meanloss.json")).unwrap()).unwrap();
        assert_eq!(mean, vec![Some(0.75), None]);
    }
}
