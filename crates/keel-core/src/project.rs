//! Project paths with persistence
//!
//! A project is a directory tree; asset paths handed to the pipeline resolve
//! against its root, and `keel.toml` at the root persists the settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// File name of the project settings file.
pub const PROJECT_FILE: &str = "keel.toml";

/// Project root and fallback-asset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPaths {
    /// Directory all project-relative asset paths resolve against.
    pub root: PathBuf,
    /// Texture substituted for missing texture files, relative to `root`.
    pub default_texture: PathBuf,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_texture: PathBuf::from("resources/textures/default.png"),
        }
    }
}

impl ProjectPaths {
    /// Create paths rooted at the given directory with default fallbacks.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Load settings from `keel.toml` in the given directory, or fall back to
    /// defaults rooted there if the file is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(PROJECT_FILE);

        if !path.exists() {
            info!("No project file at {:?}, using defaults", path);
            return Self::from_root(dir);
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ProjectPaths>(&content) {
                Ok(mut paths) => {
                    // A relative root in the file is taken relative to the
                    // directory the file lives in.
                    if paths.root.is_relative() {
                        paths.root = dir.join(&paths.root);
                    }
                    info!("Loaded project settings from {:?}", path);
                    paths
                }
                Err(e) => {
                    warn!("Failed to parse {:?}: {}, using defaults", path, e);
                    Self::from_root(dir)
                }
            },
            Err(e) => {
                warn!("Failed to read {:?}: {}, using defaults", path, e);
                Self::from_root(dir)
            }
        }
    }

    /// Save settings to `keel.toml` under the project root.
    pub fn save(&self) -> anyhow::Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }

        let path = self.root.join(PROJECT_FILE);
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved project settings to {:?}", path);
        Ok(())
    }

    /// Resolve an asset path: absolute paths pass through unchanged, relative
    /// paths resolve against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute location of the default fallback texture.
    pub fn default_texture_path(&self) -> PathBuf {
        self.resolve(&self.default_texture)
    }
}
