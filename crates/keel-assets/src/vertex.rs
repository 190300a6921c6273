//! Vertex records produced by the import pipeline.

use glam::{Vec2, Vec3};

/// Largest number of bones that can influence a single vertex.
pub const MAX_BONE_INFLUENCE: usize = 4;

/// Bone-id slot value marking an unused influence.
pub const NO_BONE: i32 = -1;

/// A static mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Zero when the source supplies no tangent data.
    pub tangent: Vec3,
    /// Zero when the source supplies no bitangent data.
    pub bitangent: Vec3,
    pub uv: Vec2,
}

/// A skinned mesh vertex: static attributes plus bounded bone influences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub uv: Vec2,
    /// Influencing bone ids; unused slots hold [`NO_BONE`].
    pub bone_ids: [i32; MAX_BONE_INFLUENCE],
    /// Influence weights, parallel to `bone_ids`. Not normalized.
    pub bone_weights: [f32; MAX_BONE_INFLUENCE],
}

impl Default for SkinnedVertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            uv: Vec2::ZERO,
            bone_ids: [NO_BONE; MAX_BONE_INFLUENCE],
            bone_weights: [0.0; MAX_BONE_INFLUENCE],
        }
    }
}

impl SkinnedVertex {
    /// Record one bone influence in the first free slot. Influences past the
    /// slot capacity are dropped.
    pub fn push_influence(&mut self, bone_id: i32, weight: f32) {
        for slot in 0..MAX_BONE_INFLUENCE {
            if self.bone_ids[slot] == NO_BONE {
                self.bone_ids[slot] = bone_id;
                self.bone_weights[slot] = weight;
                return;
            }
        }
    }

    /// Number of slots holding a live influence.
    pub fn influence_count(&self) -> usize {
        self.bone_ids.iter().filter(|&&id| id != NO_BONE).count()
    }
}
