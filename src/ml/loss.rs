// ============================================================
// Layer 5 — Gaze Direction Loss
// ============================================================
// The network is judged only on where its output vector points:
//
//   cos(a, b) = a·b / max(‖a‖ ‖b‖, ε)
//   loss      = mean over batch of (1 - cos(pred, gt))
//
// 0 means every prediction points exactly along the label,
// 1 means orthogonal on average, 2 means exactly opposite.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::domain::gaze::GazeDirection;

/// Denominator floor, matching the usual cosine-similarity epsilon
pub const COSINE_EPS: f64 = 1e-8;

/// Row-wise cosine similarity of two [batch, dim] tensors → [batch]
pub fn cosine_similarity<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, _] = a.dims();

    let dot    = (a.clone() * b.clone()).sum_dim(1);
    let norm_a = a.powf_scalar(2.0).sum_dim(1).sqrt();
    let norm_b = b.powf_scalar(2.0).sum_dim(1).sqrt();
    let denom  = (norm_a * norm_b).clamp_min(COSINE_EPS);

    (dot / denom).reshape([batch])
}

/// mean(1 - cos(pred, gt)) → scalar tensor of shape [1]
pub fn gaze_direction_loss<B: Backend>(pred: Tensor<B, 2>, gt: Tensor<B, 2>) -> Tensor<B, 1> {
    cosine_similarity(pred, gt).neg().add_scalar(1.0).mean()
}

/// Per-sample angle between prediction and label, in degrees.
/// Computed on the host; only used for reporting. A zero-length
/// vector counts as orthogonal, matching its cosine of 0.
pub fn angular_errors_degrees<B: Backend>(pred: Tensor<B, 2>, gt: Tensor<B, 2>) -> Result<Vec<f32>> {
    let pred = host_rows(pred)?;
    let gt   = host_rows(gt)?;

    Ok(pred
        .chunks_exact(2)
        .zip(gt.chunks_exact(2))
        .map(|(p, g)| {
            match (GazeDirection::from_vector(p[0], p[1]), GazeDirection::from_vector(g[0], g[1])) {
                (Some(p), Some(g)) => p.angle_between(&g),
                _ => 90.0,
            }
        })
        .collect())
}

fn host_rows<B: Backend>(t: Tensor<B, 2>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor data: {e:?}"))
}
