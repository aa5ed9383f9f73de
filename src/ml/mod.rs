// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model, loss and training code.
//
// What's in this layer:
//
//   resnet.rs    — ResNet-18/34/50/101/152 backbone builder
//                  (basic and bottleneck residual blocks)
//
//   model.rs     — GazeDirectionNet: backbone features + head
//                  position MLP → unit 2D gaze direction
//
//   loss.rs      — mean(1 - cosine similarity) and angular error
//
//   schedule.rs  — step learning-rate decay
//
//   trainer.rs   — forward, loss, backward, Adam step,
//                  validation and checkpointing per epoch
//
//   predictor.rs — loads a run and predicts / evaluates
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            He et al. (2016) Deep Residual Learning

/// Residual network backbone
pub mod resnet;

/// Gaze direction network
pub mod model;

/// Cosine gaze-direction loss
pub mod loss;

/// Step learning-rate schedule
pub mod schedule;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference: loads a checkpoint and predicts directions
pub mod predictor;
