// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence that doesn't belong to any one
// business layer:
//
//   checkpoint.rs — Saving and loading network weights
//                   (Burn's CompactRecorder) plus the
//                   TrainConfig JSON needed to rebuild the
//                   architecture at inference time.
//
//   metrics.rs    — Per-epoch metrics CSV and the per-batch
//                   loss history (loss.json / meanloss.json).
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV and loss history files
pub mod metrics;
