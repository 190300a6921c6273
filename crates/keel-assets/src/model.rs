//! Loaded model object graphs.

use std::path::PathBuf;

use crate::mesh::{Mesh, SkinnedMesh};
use crate::skeleton::{Bone, SkeletonNode};

/// Animation clip header. Keyframe payloads are not captured yet.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Clip length in source ticks.
    pub duration: f32,
    pub ticks_per_second: f32,
}

/// A loaded static model.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Path the model was requested under, as given by the caller.
    pub source: PathBuf,
    pub meshes: Vec<Mesh>,
}

impl Model {
    /// An empty model for the given source path.
    pub fn empty(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            meshes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.indices.len()).sum()
    }
}

/// A loaded skinned model with its bone set, skeleton and clip headers.
#[derive(Debug, Clone, Default)]
pub struct SkinnedModel {
    pub source: PathBuf,
    pub meshes: Vec<SkinnedMesh>,
    /// Bones referenced by this load, ordered by id. Vertex bone ids index
    /// into this list.
    pub bones: Vec<Bone>,
    /// Mirrored node hierarchy; `None` only when the load failed.
    pub skeleton_root: Option<SkeletonNode>,
    pub animations: Vec<AnimationClip>,
}

impl SkinnedModel {
    /// An empty skinned model for the given source path.
    pub fn empty(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.indices.len()).sum()
    }
}
