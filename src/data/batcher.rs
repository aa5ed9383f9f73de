// ============================================================
// Layer 4 — Gaze Batcher
// ============================================================
// Implements Burn's Batcher trait to stack Vec<GazeItem>
// into device tensors.
//
//   Input:  N GazeItems, each head image [3, S, S]
//   Output: GazeBatch
//             head_images     [N, 3, S, S]
//             head_positions  [N, 2]
//             gaze_directions [N, 2]
//
// Every head crop has the same side length (the cropper
// resizes), so stacking is a flat concatenation + reshape.
//
// Reference: Burn Book §4 (Batcher)

use std::marker::PhantomData;

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::GazeItem;

// ─── GazeBatch ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct GazeBatch<B: Backend> {
    /// Normalised head crops — shape: [batch_size, 3, size, size]
    pub head_images: Tensor<B, 4>,

    /// Normalised head points — shape: [batch_size, 2]
    pub head_positions: Tensor<B, 2>,

    /// Unit ground-truth directions — shape: [batch_size, 2]
    pub gaze_directions: Tensor<B, 2>,
}

// ─── GazeBatcher ──────────────────────────────────────────────────────────────
/// Typed by backend so the training loader (autodiff) and the
/// validation loader (inner backend) cannot be mixed up.
#[derive(Clone, Debug, Default)]
pub struct GazeBatcher<B: Backend> {
    _backend: PhantomData<B>,
}

impl<B: Backend> GazeBatcher<B> {
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<B: Backend> Batcher<B, GazeItem, GazeBatch<B>> for GazeBatcher<B> {
    fn batch(&self, items: Vec<GazeItem>, device: &B::Device) -> GazeBatch<B> {
        let batch_size = items.len();

        // Recover the side length from [3, S, S]; an empty batch has S = 0
        let plane = items.first().map_or(0, |item| item.head_image.len() / 3);
        let side  = (plane as f64).sqrt().round() as usize;

        let images_flat: Vec<f32> = items
            .iter()
            .flat_map(|item| item.head_image.iter().copied())
            .collect();

        let positions: Vec<f32> = items
            .iter()
            .flat_map(|item| item.head_position)
            .collect();

        let directions: Vec<f32> = items
            .iter()
            .flat_map(|item| item.gaze_direction)
            .collect();

        let head_images = Tensor::<B, 4>::from_data(
            TensorData::new(images_flat, [batch_size, 3, side, side]),
            device,
        );
        let head_positions = Tensor::<B, 2>::from_data(
            TensorData::new(positions, [batch_size, 2]),
            device,
        );
        let gaze_directions = Tensor::<B, 2>::from_data(
            TensorData::new(directions, [batch_size, 2]),
            device,
        );

        GazeBatch { head_images, head_positions, gaze_directions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn item(fill: f32, side: usize) -> GazeItem {
        GazeItem {
            head_image:     vec![fill; 3 * side * side],
            head_position:  [fill, 0.5],
            gaze_direction: [0.6, 0.8],
        }
    }

    #[test]
    fn test_batch_shapes() {
        let device  = Default::default();
        let batcher = GazeBatcher::<TestBackend>::new();
        let batch   = batcher.batch(vec![item(0.1, 6), item(0.2, 6), item(0.3, 6)], &device);

        assert_eq!(batch.head_images.dims(),     [3, 3, 6, 6]);
        assert_eq!(batch.head_positions.dims(),  [3, 2]);
        assert_eq!(batch.gaze_directions.dims(), [3, 2]);
    }

    #[test]
    fn test_empty_batch() {
        let device  = Default::default();
        let batcher = GazeBatcher::<TestBackend>::new();
        let batch   = batcher.batch(Vec::new(), &device);

        assert_eq!(batch.head_images.dims(),    [0, 3, 0, 0]);
        assert_eq!(batch.head_positions.dims(), [0, 2]);
    }

    #[test]
    fn test_batch_keeps_sample_order() {
        let device  = Default::default();
        let batcher = GazeBatcher::<TestBackend>::new();
        let batch   = batcher.batch(vec![item(0.1, 2), item(0.9, 2)], &device);

        let pos: Vec<f32> = batch.head_positions.into_data().to_vec().unwrap();
        assert_eq!(pos, vec![0.1, 0.5, 0.9, 0.5]);
    }
}
