//! Processing flags handed to scene sources.

use serde::{Deserialize, Serialize};

/// Post-processing the pipeline requests from a scene source.
///
/// Sources apply the subset they support; data that already satisfies a flag
/// passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportFlags {
    /// Split polygons into triangles.
    pub triangulate: bool,
    /// Generate smooth vertex normals for meshes that ship without them.
    pub gen_smooth_normals: bool,
    /// Flip normals that point into the surface.
    pub fix_infacing_normals: bool,
    /// Compute tangents and bitangents alongside normals.
    pub calc_tangent_space: bool,
    /// Largest angle, in degrees, across which generated normals are smoothed.
    pub max_smoothing_angle: f32,
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self {
            triangulate: true,
            gen_smooth_normals: true,
            fix_infacing_normals: true,
            calc_tangent_space: true,
            max_smoothing_angle: 90.0,
        }
    }
}
