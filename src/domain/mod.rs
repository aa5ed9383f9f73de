// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the gaze problem.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain data, geometry and traits
//
// Everything here is testable without a GPU or a dataset.

// An annotated head: image path, head box, head and gaze points
pub mod annotation;

// Gaze direction vectors and the angle between them
pub mod gaze;

// Core abstractions (traits) that other layers implement
pub mod traits;
