// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `predict` and `evaluate`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;
use crate::ml::resnet::ResNetDepth;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the gaze direction network on an annotated dataset
    Train(TrainArgs),

    /// Predict the gaze direction of one head with a trained run
    Predict(PredictArgs),

    /// Report mean loss and angular error of a trained run on a dataset
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root; annotation image paths are relative to it
    #[arg(long, default_value = "data/SVIP/")]
    pub root_dir: String,

    /// JSON annotation array inside the dataset root
    #[arg(long, default_value = "SVIP_annotation.json")]
    pub ann_file: String,

    /// Where the run directory (weights, loss history, metrics) is created
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// L2 penalty applied by Adam
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Decay the learning rate every N epochs
    #[arg(long, default_value_t = 5)]
    pub step_size: usize,

    /// Multiplicative learning-rate decay
    #[arg(long, default_value_t = 0.1)]
    pub gamma: f64,

    /// ResNet backbone depth: 18, 34, 50, 101 or 152 (`resnet50` also works)
    #[arg(long, default_value_t = ResNetDepth::R50)]
    pub depth: ResNetDepth,

    /// Side length of the square head crop
    #[arg(long, default_value_t = 224)]
    pub image_size: u32,

    /// Fraction of annotations held out for validation (0 = none)
    #[arg(long, default_value_t = 0.0)]
    pub val_fraction: f64,

    /// Seed for the validation split
    #[arg(long, default_value_t = 42)]
    pub split_seed: u64,

    /// Shuffle training batches with this seed (default: file order)
    #[arg(long)]
    pub shuffle_seed: Option<u64>,

    /// Data loading worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Backbone record (.mpk, e.g. a run's backbone.mpk) to start from instead of random init
    #[arg(long)]
    pub pretrained: Option<String>,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            root_dir:     a.root_dir,
            ann_file:     a.ann_file,
            output_dir:   a.output_dir,
            batch_size:   a.batch_size,
            epochs:       a.epochs,
            lr:           a.lr,
            weight_decay: a.weight_decay,
            step_size:    a.step_size,
            gamma:        a.gamma,
            depth:        a.depth.layers(),
            image_size:   a.image_size,
            val_fraction: a.val_fraction,
            split_seed:   a.split_seed,
            shuffle_seed: a.shuffle_seed,
            num_workers:  a.num_workers,
            pretrained:   a.pretrained,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Run directory written by `train`
    #[arg(long)]
    pub run_dir: String,

    /// Source image containing the head
    #[arg(long)]
    pub image: String,

    /// Head box left edge, fraction of image width
    #[arg(long)]
    pub x_init: f32,

    /// Head box top edge, fraction of image height
    #[arg(long)]
    pub y_init: f32,

    /// Head box width, fraction of image width
    #[arg(long)]
    pub w: f32,

    /// Head box height, fraction of image height
    #[arg(long)]
    pub h: f32,

    /// Normalised head x position
    #[arg(long)]
    pub head_x: f32,

    /// Normalised head y position
    #[arg(long)]
    pub head_y: f32,
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Run directory written by `train`
    #[arg(long)]
    pub run_dir: String,

    #[arg(long, default_value = "data/SVIP/")]
    pub root_dir: String,

    #[arg(long, default_value = "SVIP_annotation.json")]
    pub ann_file: String,
}
