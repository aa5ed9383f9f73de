// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the annotation file to device tensors.
//
//   annotation JSON
//       │
//       ▼
//   AnnotationLoader  → parses Vec<GazeAnnotation>
//       │
//       ▼
//   split_train_val   → optional held-out set
//       │
//       ▼
//   GazeDataset       → implements Burn's Dataset trait,
//       │               decodes + crops heads lazily
//       ▼
//   HeadCropper       → crop, resize, ImageNet-normalise
//       │
//       ▼
//   GazeBatcher       → stacks items into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the JSON annotation array
pub mod loader;

/// Head crop, resize and normalisation
pub mod preprocessor;

/// Implements Burn's Dataset trait for head crops
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
