// ============================================================
// Layer 4 — Annotation Loader
// ============================================================
// Reads the dataset's annotation file: a single JSON array of
// GazeAnnotation objects living inside the dataset root.
//
//   data/SVIP/
//     SVIP_annotation.json   ← [ {path, x_init, ...}, ... ]
//     images/...             ← paths are relative to the root
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::annotation::GazeAnnotation;
use crate::domain::traits::AnnotationSource;

/// Loads gaze annotations from `{root_dir}/{ann_file}`.
/// Implements the AnnotationSource trait from Layer 3.
#[derive(Debug, Clone)]
pub struct AnnotationLoader {
    /// Dataset root; image paths in the annotations are relative to it
    root_dir: PathBuf,

    /// File name of the JSON annotation array inside `root_dir`
    ann_file: String,
}

impl AnnotationLoader {
    pub fn new(root_dir: impl AsRef<Path>, ann_file: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            ann_file: ann_file.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn annotation_path(&self) -> PathBuf {
        self.root_dir.join(&self.ann_file)
    }
}

impl AnnotationSource for AnnotationLoader {
    fn load_all(&self) -> Result<Vec<GazeAnnotation>> {
        let path = self.annotation_path();

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read annotation file '{}'", path.display()))?;

        let anns: Vec<GazeAnnotation> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed annotation file '{}'", path.display()))?;

        tracing::info!("Loaded {} annotations from '{}'", anns.len(), path.display());
        Ok(anns)
    }
}
