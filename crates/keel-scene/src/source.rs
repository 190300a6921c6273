//! The boundary between the import pipeline and external scene parsers.

use std::path::{Path, PathBuf};

use crate::flags::ImportFlags;
use crate::graph::Scene;

/// Errors a scene source surfaces when it cannot produce a scene at all.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse scene file '{0}': {1}")]
    Parse(PathBuf, String),
}

/// A parser that turns a file on disk into an in-memory [`Scene`].
///
/// Implementations own every format-specific detail. The pipeline only sees
/// the scene graph model, so sources for new formats slot in without loader
/// changes.
pub trait SceneSource {
    /// Read and post-process the scene stored at `path`.
    fn read_scene(&self, path: &Path, flags: &ImportFlags) -> Result<Scene, SceneError>;
}
