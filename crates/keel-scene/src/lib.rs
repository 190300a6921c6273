//! Keel Scene - the boundary to external scene parsers.
//!
//! Defines the loosely-shaped scene graph model that parsers produce, the
//! processing flags the import pipeline hands them, and a glTF 2.0 backed
//! source implementation.

pub mod flags;
pub mod gltf_source;
pub mod graph;
pub mod source;

pub use flags::ImportFlags;
pub use gltf_source::GltfSource;
pub use graph::{
    parse_embedded_ref, EmbeddedTexture, Face, Scene, SceneAnimation, SceneBone, SceneMaterial,
    SceneMesh, SceneNode, TextureChannel, VertexWeight, EMBEDDED_MARKER,
};
pub use source::{SceneError, SceneSource};
