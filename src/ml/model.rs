use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::loss::gaze_direction_loss;
use crate::ml::resnet::{ResNet, ResNetConfig};

/// Floor on the output norm before normalising to a unit vector
const OUTPUT_NORM_EPS: f64 = 1e-8;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct GazeDirectionConfig {
    pub backbone: ResNetConfig,
    #[config(default = 512)]
    pub head_feature_dim: usize,
    #[config(default = 256)]
    pub position_dim: usize,
    #[config(default = 256)]
    pub hidden_dim: usize,
}

impl GazeDirectionConfig {
    /// Attach the gaze head to `head_feature_net`, which must have been
    /// built from `self.backbone`.
    pub fn init_with<B: Backend>(&self, head_feature_net: ResNet<B>, device: &B::Device) -> GazeDirectionNet<B> {
        let head_feature_process = Mlp::new(&[self.backbone.out_features(), self.head_feature_dim], device);
        let head_pos_net         = Mlp::new(
            &[2, self.position_dim, self.position_dim, self.position_dim],
            device,
        );
        let concatenate_net = Mlp::new(
            &[self.head_feature_dim + self.position_dim, self.hidden_dim, 2],
            device,
        );
        GazeDirectionNet { head_feature_net, head_feature_process, head_pos_net, concatenate_net }
    }
}

/// Stack of linear layers with ReLU between them.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl<B: Backend> Mlp<B> {
    /// `widths` = [in, hidden..., out]
    fn new(widths: &[usize], device: &B::Device) -> Self {
        let layers = widths
            .windows(2)
            .map(|w| LinearConfig::new(w[0], w[1]).init(device))
            .collect();
        Self { layers }
    }

    /// ReLU after every layer except the last.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);
        self.layers.iter().enumerate().fold(x, |x, (i, layer)| {
            let y = layer.forward(x);
            if i < last { relu(y) } else { y }
        })
    }

    /// ReLU after every layer, including the last.
    pub fn forward_activated(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        relu(self.forward(x))
    }
}

/// Head image + head position → 2D gaze direction.
///
///   head image ─ ResNet ─ head_feature_process ─┐
///                                               ├─ concat ─ concatenate_net ─ normalise
///   head pos ──────────── head_pos_net ─────────┘
#[derive(Module, Debug)]
pub struct GazeDirectionNet<B: Backend> {
    pub head_feature_net:     ResNet<B>,
    pub head_feature_process: Mlp<B>,
    pub head_pos_net:         Mlp<B>,
    pub concatenate_net:      Mlp<B>,
}

impl<B: Backend> GazeDirectionNet<B> {
    /// head_images: [batch, 3, S, S], head_positions: [batch, 2]
    /// → unit directions: [batch, 2]
    pub fn forward(&self, head_images: Tensor<B, 4>, head_positions: Tensor<B, 2>) -> Tensor<B, 2> {
        let head_features = self.head_feature_net.forward(head_images);
        let head_features = self.head_feature_process.forward_activated(head_features);
        let pos_features  = self.head_pos_net.forward_activated(head_positions);

        let joint     = Tensor::cat(vec![head_features, pos_features], 1);
        let direction = self.concatenate_net.forward(joint);

        let norm = direction
            .clone()
            .powf_scalar(2.0)
            .sum_dim(1)
            .sqrt()
            .clamp_min(OUTPUT_NORM_EPS);
        direction / norm
    }

    /// Forward pass plus mean(1 - cos) against the labels.
    pub fn forward_loss(
        &self,
        head_images:     Tensor<B, 4>,
        head_positions:  Tensor<B, 2>,
        gaze_directions: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let output = self.forward(head_images, head_positions);
        let loss   = gaze_direction_loss(output.clone(), gaze_directions);
        (loss, output)
    }
}
