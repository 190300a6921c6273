//! Keel Assets - model import and skinning resolution.
//!
//! Converts parsed scene graphs into the engine's runtime representations:
//! static [`Model`]s and skeleton-bound [`SkinnedModel`]s, with resolved
//! materials and cached textures. The entry point is [`ModelLoader`].

pub mod cache;
pub mod error;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod model;
pub mod skeleton;
pub mod texture;
pub mod vertex;

pub use cache::TextureCache;
pub use error::{AssetError, InternalError};
pub use loader::ModelLoader;
pub use material::Material;
pub use mesh::{Mesh, SkinnedMesh};
pub use model::{AnimationClip, Model, SkinnedModel};
pub use skeleton::{build_skeleton, Bone, BoneRegistry, SkeletonNode};
pub use texture::{decode_embedded, default_texture, load_texture, TextureAsset, TextureFormat};
pub use vertex::{SkinnedVertex, Vertex, MAX_BONE_INFLUENCE, NO_BONE};
