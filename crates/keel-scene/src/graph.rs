//! In-memory scene graph produced by scene sources.
//!
//! The shapes here are deliberately loose: attribute streams may be shorter
//! than the vertex count, indices may point outside their target arrays, and
//! whole sections may be absent. Sources hand the data over as parsed; the
//! import pipeline is the layer that validates and substitutes.

use glam::Mat4;

/// A parsed scene: the node hierarchy plus flat mesh, material, embedded
/// texture and animation arrays that nodes and meshes index into.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Set when the parser could only produce partial data. The pipeline
    /// treats such scenes as failed loads.
    pub incomplete: bool,
    pub root: Option<SceneNode>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
    pub animations: Vec<SceneAnimation>,
}

/// One node of the source hierarchy.
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: Mat4,
    /// Indices into [`Scene::meshes`].
    pub mesh_indices: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// A leaf node with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            mesh_indices: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Raw vertex, face and bone streams for one source mesh.
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    /// First texture-coordinate channel, when the mesh carries one.
    pub uvs: Option<Vec<[f32; 2]>>,
    pub faces: Vec<Face>,
    pub bones: Vec<SceneBone>,
    /// Index into [`Scene::materials`], when the mesh references one.
    pub material_index: Option<usize>,
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }
}

/// Vertex index list of a single face. Triangles after triangulation, but
/// sources may still emit other arities.
#[derive(Debug, Clone, Default)]
pub struct Face {
    pub indices: Vec<u32>,
}

/// A bone as the source reports it: a bind-pose offset matrix plus the list
/// of vertices it influences.
#[derive(Debug, Clone)]
pub struct SceneBone {
    pub name: String,
    /// Inverse bind-pose (offset) matrix.
    pub offset: Mat4,
    pub weights: Vec<VertexWeight>,
}

/// One vertex influence entry of a bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

/// Texture channels a material can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureChannel {
    Albedo,
    Normal,
    Metalness,
    AmbientOcclusion,
    Roughness,
    Displacement,
}

impl TextureChannel {
    /// Every channel, in resolution order.
    pub const ALL: [TextureChannel; 6] = [
        TextureChannel::Albedo,
        TextureChannel::Normal,
        TextureChannel::Metalness,
        TextureChannel::AmbientOcclusion,
        TextureChannel::Roughness,
        TextureChannel::Displacement,
    ];
}

/// Texture references of one source material, one optional slot per channel.
///
/// A reference is either a file path relative to the model's directory or an
/// embedded marker of the form `*N` (see [`parse_embedded_ref`]).
#[derive(Debug, Clone, Default)]
pub struct SceneMaterial {
    pub name: String,
    pub albedo: Option<String>,
    pub normal: Option<String>,
    pub metalness: Option<String>,
    pub ambient_occlusion: Option<String>,
    pub roughness: Option<String>,
    pub displacement: Option<String>,
}

impl SceneMaterial {
    /// The reference string for `channel`, if the material carries one.
    pub fn texture_ref(&self, channel: TextureChannel) -> Option<&str> {
        match channel {
            TextureChannel::Albedo => self.albedo.as_deref(),
            TextureChannel::Normal => self.normal.as_deref(),
            TextureChannel::Metalness => self.metalness.as_deref(),
            TextureChannel::AmbientOcclusion => self.ambient_occlusion.as_deref(),
            TextureChannel::Roughness => self.roughness.as_deref(),
            TextureChannel::Displacement => self.displacement.as_deref(),
        }
    }

    pub fn set_texture_ref(&mut self, channel: TextureChannel, reference: impl Into<String>) {
        let slot = match channel {
            TextureChannel::Albedo => &mut self.albedo,
            TextureChannel::Normal => &mut self.normal,
            TextureChannel::Metalness => &mut self.metalness,
            TextureChannel::AmbientOcclusion => &mut self.ambient_occlusion,
            TextureChannel::Roughness => &mut self.roughness,
            TextureChannel::Displacement => &mut self.displacement,
        };
        *slot = Some(reference.into());
    }
}

/// Marker prefix of embedded texture references.
pub const EMBEDDED_MARKER: char = '*';

/// Parse an embedded texture reference of the form `*N` into the index `N`.
///
/// Returns `None` for anything else, including a bare `*`.
pub fn parse_embedded_ref(reference: &str) -> Option<usize> {
    reference.strip_prefix(EMBEDDED_MARKER)?.parse().ok()
}

/// Image data stored inside the scene file.
///
/// `height == 0` means `data` holds a compressed image (PNG, JPEG) to decode
/// from memory; `height > 0` means `data` holds raw RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct EmbeddedTexture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Animation clip header. Keyframe payloads stay with the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneAnimation {
    pub name: String,
    /// Clip length in ticks.
    pub duration: f32,
    pub ticks_per_second: f32,
}
