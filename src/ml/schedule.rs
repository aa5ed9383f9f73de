// ============================================================
// Layer 5 — Step Learning-Rate Schedule
// ============================================================
// Decays the learning rate by `gamma` every `step_size` epochs.
//
// The schedule is advanced once at the START of every epoch,
// so epoch j (0-based) trains with
//
//   lr_j = initial_lr * gamma ^ floor((j + 1) / step_size)
//
// e.g. initial 1e-4, step 5, gamma 0.1, 10 epochs:
//   epochs 0..=3 → 1e-4, epochs 4..=8 → 1e-5, epoch 9 → 1e-6

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepLr {
    pub initial_lr: f64,
    pub step_size:  usize,
    pub gamma:      f64,
}

impl StepLr {
    pub fn new(initial_lr: f64, step_size: usize, gamma: f64) -> Self {
        Self { initial_lr, step_size: step_size.max(1), gamma }
    }

    /// Learning rate used while training epoch `epoch` (0-based).
    pub fn lr_for_epoch(&self, epoch: usize) -> f64 {
        let decays = (epoch + 1) / self.step_size;
        self.initial_lr * self.gamma.powi(decays as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn test_decays_from_the_step_before_the_boundary() {
        let s = StepLr::new(1e-4, 5, 0.1);
        for epoch in 0..4 {
            assert!(close(s.lr_for_epoch(epoch), 1e-4), "epoch {epoch}");
        }
        assert!(close(s.lr_for_epoch(4), 1e-5));
        assert!(close(s.lr_for_epoch(8), 1e-5));
        assert!(close(s.lr_for_epoch(9), 1e-6));
    }

    #[test]
    fn test_step_size_one_decays_every_epoch() {
        let s = StepLr::new(1.0, 1, 0.5);
        assert!(close(s.lr_for_epoch(0), 0.5));
        assert!(close(s.lr_for_epoch(2), 0.125));
    }

    #[test]
    fn test_zero_step_size_is_clamped() {
        let s = StepLr::new(1.0, 0, 0.5);
        assert_eq!(s.step_size, 1);
    }
}
