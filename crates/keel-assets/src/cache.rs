//! Path-keyed texture cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::AssetError;
use crate::texture::{self, TextureAsset};

/// Caches decoded textures by resolved path, so repeated references to the
/// same file share one texture allocation across meshes and loads.
#[derive(Debug, Default)]
pub struct TextureCache {
    by_path: HashMap<PathBuf, Arc<TextureAsset>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the texture at `path`, reusing the cached copy when present.
    pub fn load(&mut self, path: &Path) -> Result<Arc<TextureAsset>, AssetError> {
        if let Some(texture) = self.by_path.get(path) {
            return Ok(texture.clone());
        }

        let texture = Arc::new(texture::load_texture(path)?);
        debug!("Loaded texture: {}", path.display());
        self.by_path.insert(path.to_path_buf(), texture.clone());
        Ok(texture)
    }

    /// Number of distinct cached textures.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
