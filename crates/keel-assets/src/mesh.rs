//! Runtime mesh containers.

use crate::material::Material;
use crate::vertex::{SkinnedVertex, Vertex};

/// A static mesh: vertex and index buffers plus the resolved material.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// Triangle-list indices into `vertices`.
    pub indices: Vec<u32>,
    /// `None` when the source mesh carried no usable material index.
    pub material: Option<Material>,
}

/// A skinned mesh: like [`Mesh`], with per-vertex bone influences.
#[derive(Debug, Clone, Default)]
pub struct SkinnedMesh {
    pub vertices: Vec<SkinnedVertex>,
    /// Triangle-list indices into `vertices`.
    pub indices: Vec<u32>,
    pub material: Option<Material>,
}
