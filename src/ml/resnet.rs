// ============================================================
// Layer 5 — ResNet Backbone
// ============================================================
// The residual network family from He et al. (2016), built from
// Burn's conv / batch-norm / pooling modules.
//
//   input [N, 3, 224, 224]
//     conv 7x7 /2 → BN → ReLU → maxpool 3x3 /2     [N,   64, 56, 56]
//     layer1  depth  64, stride 1                  [N, 64e, 56, 56]
//     layer2  depth 128, stride 2                  [N,128e, 28, 28]
//     layer3  depth 256, stride 2                  [N,256e, 14, 14]
//     layer4  depth 512, stride 2                  [N,512e,  7,  7]
//     global average pool + flatten                [N,512e]
//
// e = block expansion: 1 for BasicBlock, 4 for Bottleneck.
// Only the first block of a stage strides; it also gets a
// 1x1 projection shortcut when the shape changes.
//
// The network ends at the pooled features: the gaze head in
// model.rs consumes them, so there is no classifier layer.
//
// Reference: Burn Book §3 (Building Blocks)
//            He et al. (2016) Deep Residual Learning

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Initializer, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

const STAGE_DEPTHS: [usize; 4] = [64, 128, 256, 512];
const STAGE_STRIDES: [usize; 4] = [1, 2, 2, 2];
const STEM_DEPTH: usize = 64;

// ─── Depth selection ──────────────────────────────────────────────────────────
/// The five standard ResNet depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResNetDepth {
    R18,
    R34,
    R50,
    R101,
    R152,
}

impl ResNetDepth {
    pub fn layers(&self) -> usize {
        match self {
            Self::R18  => 18,
            Self::R34  => 34,
            Self::R50  => 50,
            Self::R101 => 101,
            Self::R152 => 152,
        }
    }

    /// Block counts per stage and whether the stages use bottlenecks
    pub fn config(&self) -> ResNetConfig {
        match self {
            Self::R18  => ResNetConfig::new([2, 2, 2, 2], false),
            Self::R34  => ResNetConfig::new([3, 4, 6, 3], false),
            Self::R50  => ResNetConfig::new([3, 4, 6, 3], true),
            Self::R101 => ResNetConfig::new([3, 4, 23, 3], true),
            Self::R152 => ResNetConfig::new([3, 8, 36, 3], true),
        }
    }

    /// Build the backbone through its named constructor.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        match self {
            Self::R18  => resnet18(device),
            Self::R34  => resnet34(device),
            Self::R50  => resnet50(device),
            Self::R101 => resnet101(device),
            Self::R152 => resnet152(device),
        }
    }
}

impl TryFrom<usize> for ResNetDepth {
    type Error = anyhow::Error;

    fn try_from(layers: usize) -> Result<Self> {
        Ok(match layers {
            18  => Self::R18,
            34  => Self::R34,
            50  => Self::R50,
            101 => Self::R101,
            152 => Self::R152,
            other => bail!("Unsupported ResNet depth {other}; expected 18, 34, 50, 101 or 152"),
        })
    }
}

impl FromStr for ResNetDepth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let layers: usize = s
            .trim()
            .trim_start_matches("resnet")
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid ResNet depth '{s}'"))?;
        Self::try_from(layers)
    }
}

impl fmt::Display for ResNetDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resnet{}", self.layers())
    }
}

// ─── Building blocks ──────────────────────────────────────────────────────────
/// Bias-free convolution with He-normal init over fan-out:
/// std = sqrt(2 / (k * k * out_channels)).
fn conv<B: Backend>(
    in_depth: usize,
    depth:    usize,
    kernel:   usize,
    stride:   usize,
    padding:  usize,
    device:   &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_depth, depth], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .with_initializer(Initializer::KaimingNormal {
            gain:         std::f64::consts::SQRT_2,
            fan_out_only: true,
        })
        .init(device)
}

pub fn conv3x3<B: Backend>(in_depth: usize, depth: usize, stride: usize, device: &B::Device) -> Conv2d<B> {
    conv(in_depth, depth, 3, stride, 1, device)
}

pub fn conv1x1<B: Backend>(in_depth: usize, depth: usize, stride: usize, device: &B::Device) -> Conv2d<B> {
    conv(in_depth, depth, 1, stride, 0, device)
}

/// BN weight starts at 1, bias at 0 (Burn's defaults).
fn batch_norm<B: Backend>(depth: usize, device: &B::Device) -> BatchNorm<B> {
    BatchNormConfig::new(depth).init(device)
}

/// 1x1 projection shortcut used when a block changes shape.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    bn:   BatchNorm<B>,
}

impl<B: Backend> Downsample<B> {
    fn new(in_depth: usize, depth: usize, stride: usize, device: &B::Device) -> Self {
        Self {
            conv: conv1x1(in_depth, depth, stride, device),
            bn:   batch_norm(depth, device),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

/// Two 3x3 convolutions; expansion 1.
#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    conv1:      Conv2d<B>,
    bn1:        BatchNorm<B>,
    conv2:      Conv2d<B>,
    bn2:        BatchNorm<B>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    pub const EXPANSION: usize = 1;

    fn new(in_depth: usize, depth: usize, stride: usize, device: &B::Device) -> Self {
        let out_depth  = depth * Self::EXPANSION;
        let downsample = (stride != 1 || in_depth != out_depth)
            .then(|| Downsample::new(in_depth, out_depth, stride, device));
        Self {
            conv1: conv3x3(in_depth, depth, stride, device),
            bn1:   batch_norm(depth, device),
            conv2: conv3x3(depth, depth, 1, device),
            bn2:   batch_norm(depth, device),
            downsample,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(down) => down.forward(x.clone()),
            None       => x.clone(),
        };

        let y = relu(self.bn1.forward(self.conv1.forward(x)));
        let y = self.bn2.forward(self.conv2.forward(y));

        relu(y + identity)
    }
}

/// 1x1 reduce → 3x3 → 1x1 expand; expansion 4.
/// The stride sits on the 3x3 convolution.
#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    conv1:      Conv2d<B>,
    bn1:        BatchNorm<B>,
    conv2:      Conv2d<B>,
    bn2:        BatchNorm<B>,
    conv3:      Conv2d<B>,
    bn3:        BatchNorm<B>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> Bottleneck<B> {
    pub const EXPANSION: usize = 4;

    fn new(in_depth: usize, depth: usize, stride: usize, device: &B::Device) -> Self {
        let out_depth  = depth * Self::EXPANSION;
        let downsample = (stride != 1 || in_depth != out_depth)
            .then(|| Downsample::new(in_depth, out_depth, stride, device));
        Self {
            conv1: conv1x1(in_depth, depth, 1, device),
            bn1:   batch_norm(depth, device),
            conv2: conv3x3(depth, depth, stride, device),
            bn2:   batch_norm(depth, device),
            conv3: conv1x1(depth, out_depth, 1, device),
            bn3:   batch_norm(out_depth, device),
            downsample,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(down) => down.forward(x.clone()),
            None       => x.clone(),
        };

        let y = relu(self.bn1.forward(self.conv1.forward(x)));
        let y = relu(self.bn2.forward(self.conv2.forward(y)));
        let y = self.bn3.forward(self.conv3.forward(y));

        relu(y + identity)
    }
}

#[derive(Module, Debug)]
pub enum ResidualBlock<B: Backend> {
    Basic(BasicBlock<B>),
    Bottleneck(Bottleneck<B>),
}

impl<B: Backend> ResidualBlock<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Basic(block)      => block.forward(x),
            Self::Bottleneck(block) => block.forward(x),
        }
    }
}

// ─── Network ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ResNetConfig {
    /// Number of residual blocks in each of the four stages
    pub blocks: [usize; 4],
    /// Bottleneck blocks (ResNet-50 and deeper) instead of basic blocks
    pub bottleneck: bool,
}

impl ResNetConfig {
    pub fn expansion(&self) -> usize {
        if self.bottleneck { 4 } else { 1 }
    }

    /// Width of the pooled feature vector
    pub fn out_features(&self) -> usize {
        STAGE_DEPTHS[3] * self.expansion()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let mut in_depth = STEM_DEPTH;
        let mut stages: Vec<Vec<ResidualBlock<B>>> = STAGE_DEPTHS
            .iter()
            .zip(STAGE_STRIDES)
            .zip(self.blocks)
            .map(|((&depth, stride), count)| self.make_stage(&mut in_depth, depth, count, stride, device))
            .collect();

        let layer4 = stages.pop().unwrap_or_default();
        let layer3 = stages.pop().unwrap_or_default();
        let layer2 = stages.pop().unwrap_or_default();
        let layer1 = stages.pop().unwrap_or_default();

        ResNet {
            conv1:   conv(3, STEM_DEPTH, 7, 2, 3, device),
            bn1:     batch_norm(STEM_DEPTH, device),
            maxpool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    /// One stage: the first block carries the stride (and the projection
    /// shortcut when needed), the rest keep the shape.
    fn make_stage<B: Backend>(
        &self,
        in_depth: &mut usize,
        depth:    usize,
        count:    usize,
        stride:   usize,
        device:   &B::Device,
    ) -> Vec<ResidualBlock<B>> {
        let mut blocks = Vec::with_capacity(count);
        for i in 0..count {
            let stride = if i == 0 { stride } else { 1 };
            let block = if self.bottleneck {
                ResidualBlock::Bottleneck(Bottleneck::new(*in_depth, depth, stride, device))
            } else {
                ResidualBlock::Basic(BasicBlock::new(*in_depth, depth, stride, device))
            };
            blocks.push(block);
            *in_depth = depth * self.expansion();
        }
        blocks
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    conv1:   Conv2d<B>,
    bn1:     BatchNorm<B>,
    maxpool: MaxPool2d,
    layer1:  Vec<ResidualBlock<B>>,
    layer2:  Vec<ResidualBlock<B>>,
    layer3:  Vec<ResidualBlock<B>>,
    layer4:  Vec<ResidualBlock<B>>,
    avgpool: AdaptiveAvgPool2d,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, 3, H, W] → features: [batch, 512 * expansion]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.bn1.forward(self.conv1.forward(images)));
        let mut x = self.maxpool.forward(x);

        for block in self
            .layer1
            .iter()
            .chain(&self.layer2)
            .chain(&self.layer3)
            .chain(&self.layer4)
        {
            x = block.forward(x);
        }

        let x = self.avgpool.forward(x); // [batch, C, 1, 1]
        let [batch, channels, _, _] = x.dims();
        x.reshape([batch, channels])
    }
}

pub fn resnet18<B: Backend>(device: &B::Device) -> ResNet<B> {
    ResNetDepth::R18.config().init(device)
}

pub fn resnet34<B: Backend>(device: &B::Device) -> ResNet<B> {
    ResNetDepth::R34.config().init(device)
}

pub fn resnet50<B: Backend>(device: &B::Device) -> ResNet<B> {
    ResNetDepth::R50.config().init(device)
}

pub fn resnet101<B: Backend>(device: &B::Device) -> ResNet<B> {
    ResNetDepth::R101.config().init(device)
}

pub fn resnet152<B: Backend>(device: &B::Device) -> ResNet<B> {
    ResNetDepth::R152.config().init(device)
}
