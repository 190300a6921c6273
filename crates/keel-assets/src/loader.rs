//! The model import pipeline.
//!
//! Turns parsed scenes into runtime models: walks the node hierarchy for
//! mesh references, extracts vertex streams, resolves bones into a
//! load-scoped registry, resolves material textures, and assembles the
//! result. Bad input never fails a load; it is logged and answered with an
//! empty or partial model. The only error channel is [`InternalError`],
//! raised when source data violates an invariant the pipeline depends on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Vec2, Vec3};
use tracing::{debug, error, warn};

use keel_core::ProjectPaths;
use keel_scene::{
    parse_embedded_ref, GltfSource, ImportFlags, Scene, SceneMesh, SceneNode, SceneSource,
    TextureChannel, EMBEDDED_MARKER,
};

use crate::cache::TextureCache;
use crate::error::{AssetError, InternalError};
use crate::material::Material;
use crate::mesh::{Mesh, SkinnedMesh};
use crate::model::{AnimationClip, Model, SkinnedModel};
use crate::skeleton::{self, BoneRegistry};
use crate::texture::{self, TextureAsset};
use crate::vertex::{SkinnedVertex, Vertex};

/// Imports models through a [`SceneSource`].
///
/// A loader can be reused for sequential loads and keeps its texture cache
/// across them. It is not meant to be shared between threads; concurrent
/// imports get one loader each.
pub struct ModelLoader<S = GltfSource> {
    source: S,
    paths: ProjectPaths,
    flags: ImportFlags,
    textures: TextureCache,
}

impl ModelLoader<GltfSource> {
    /// A glTF-backed loader for the given project.
    pub fn new(paths: ProjectPaths) -> Self {
        Self::with_source(GltfSource, paths)
    }
}

impl<S: SceneSource> ModelLoader<S> {
    /// A loader reading scenes through `source`.
    pub fn with_source(source: S, paths: ProjectPaths) -> Self {
        Self {
            source,
            paths,
            flags: ImportFlags::default(),
            textures: TextureCache::new(),
        }
    }

    /// Replace the processing flags handed to the scene source.
    pub fn with_flags(mut self, flags: ImportFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Load a static model.
    ///
    /// Input problems are logged and produce an empty or partial model,
    /// never an error.
    pub fn load_model(&mut self, path: &Path) -> Result<Model, InternalError> {
        let file = self.paths.resolve(path);
        let Some(scene) = self.read_scene(&file) else {
            return Ok(Model::empty(path));
        };
        let model_dir = parent_dir(&file);

        let mut embedded = HashMap::new();
        let mut meshes = Vec::new();
        for index in collect_mesh_indices(scene.root.as_ref(), scene.meshes.len()) {
            meshes.push(self.process_mesh(&scene.meshes[index], &scene, &model_dir, &mut embedded));
        }

        debug!("Loaded model '{}': {} meshes", file.display(), meshes.len());
        Ok(Model {
            source: path.to_path_buf(),
            meshes,
        })
    }

    /// Load a skinned model with its bone set, skeleton and clip headers.
    pub fn load_skinned_model(&mut self, path: &Path) -> Result<SkinnedModel, InternalError> {
        let file = self.paths.resolve(path);
        let Some(scene) = self.read_scene(&file) else {
            return Ok(SkinnedModel::empty(path));
        };
        let model_dir = parent_dir(&file);

        let mut embedded = HashMap::new();
        let mut registry = BoneRegistry::new();
        let mut meshes = Vec::new();
        for index in collect_mesh_indices(scene.root.as_ref(), scene.meshes.len()) {
            meshes.push(self.process_skinned_mesh(
                &scene.meshes[index],
                &scene,
                &model_dir,
                &mut embedded,
                &mut registry,
            )?);
        }

        let skeleton_root = scene.root.as_ref().map(skeleton::build_skeleton);
        let animations = scene
            .animations
            .iter()
            .map(|clip| AnimationClip {
                name: clip.name.clone(),
                duration: clip.duration,
                ticks_per_second: clip.ticks_per_second,
            })
            .collect();

        debug!(
            "Loaded skinned model '{}': {} meshes, {} bones",
            file.display(),
            meshes.len(),
            registry.len()
        );
        Ok(SkinnedModel {
            source: path.to_path_buf(),
            meshes,
            bones: registry.into_bones(),
            skeleton_root,
            animations,
        })
    }

    /// Read and validate the scene. A failure logs exactly once and yields
    /// `None`.
    fn read_scene(&self, file: &Path) -> Option<Scene> {
        match self.source.read_scene(file, &self.flags) {
            Ok(scene) if scene.incomplete || scene.root.is_none() => {
                error!(
                    "Failed to load model '{}': scene is incomplete or has no root",
                    file.display()
                );
                None
            }
            Ok(scene) => Some(scene),
            Err(e) => {
                error!("Failed to load model '{}': {}", file.display(), e);
                None
            }
        }
    }

    fn process_mesh(
        &mut self,
        mesh: &SceneMesh,
        scene: &Scene,
        model_dir: &Path,
        embedded: &mut HashMap<usize, Arc<TextureAsset>>,
    ) -> Mesh {
        Mesh {
            vertices: extract_vertices(mesh),
            indices: flatten_indices(mesh),
            material: self.resolve_material(mesh, scene, model_dir, embedded),
        }
    }

    fn process_skinned_mesh(
        &mut self,
        mesh: &SceneMesh,
        scene: &Scene,
        model_dir: &Path,
        embedded: &mut HashMap<usize, Arc<TextureAsset>>,
        registry: &mut BoneRegistry,
    ) -> Result<SkinnedMesh, InternalError> {
        let mut vertices = extract_skinned_vertices(mesh);
        assign_bone_weights(mesh, &mut vertices, registry)?;
        Ok(SkinnedMesh {
            vertices,
            indices: flatten_indices(mesh),
            material: self.resolve_material(mesh, scene, model_dir, embedded),
        })
    }

    /// Resolve the mesh's material, or `None` when its index is unusable.
    fn resolve_material(
        &mut self,
        mesh: &SceneMesh,
        scene: &Scene,
        model_dir: &Path,
        embedded: &mut HashMap<usize, Arc<TextureAsset>>,
    ) -> Option<Material> {
        let index = mesh.material_index?;
        let Some(source) = scene.materials.get(index) else {
            warn!(
                "Mesh '{}' references material {} but the scene has {}",
                mesh.name,
                index,
                scene.materials.len()
            );
            return None;
        };

        let mut material = Material {
            name: source.name.clone(),
            ..Default::default()
        };
        for channel in TextureChannel::ALL {
            if let Some(reference) = source.texture_ref(channel) {
                let resolved = self.resolve_texture(scene, model_dir, embedded, reference);
                material.set_channel(channel, resolved);
            }
        }
        Some(material)
    }

    /// Resolve one texture reference: embedded (`*N`) from memory, anything
    /// else as a file relative to the model's directory. Unresolvable
    /// references warn and fall back to the default texture.
    fn resolve_texture(
        &mut self,
        scene: &Scene,
        model_dir: &Path,
        embedded: &mut HashMap<usize, Arc<TextureAsset>>,
        reference: &str,
    ) -> Arc<TextureAsset> {
        if reference.starts_with(EMBEDDED_MARKER) {
            return match decode_embedded_ref(scene, embedded, reference) {
                Ok(texture) => texture,
                Err(e) => {
                    warn!("{}, using default texture", e);
                    self.default_texture()
                }
            };
        }

        let texture_path = model_dir.join(reference);
        if !texture_path.exists() {
            warn!(
                "Texture file couldn't be found: {}, using default texture",
                texture_path.display()
            );
            return self.default_texture();
        }

        match self.textures.load(&texture_path) {
            Ok(texture) => texture,
            Err(e) => {
                warn!("{}, using default texture", e);
                self.default_texture()
            }
        }
    }

    fn default_texture(&self) -> Arc<TextureAsset> {
        texture::default_texture(&self.paths.default_texture_path())
    }
}

/// Decode the embedded texture named by a `*N` reference. Each embedded
/// texture is decoded at most once per load; repeated references share it.
fn decode_embedded_ref(
    scene: &Scene,
    decoded: &mut HashMap<usize, Arc<TextureAsset>>,
    reference: &str,
) -> Result<Arc<TextureAsset>, AssetError> {
    let index = parse_embedded_ref(reference)
        .ok_or_else(|| AssetError::BadEmbeddedReference(reference.to_string()))?;
    if let Some(texture) = decoded.get(&index) {
        return Ok(texture.clone());
    }
    let source = scene
        .embedded_textures
        .get(index)
        .ok_or_else(|| AssetError::BadEmbeddedReference(reference.to_string()))?;
    let texture = Arc::new(texture::decode_embedded(index, source)?);
    decoded.insert(index, texture.clone());
    Ok(texture)
}

/// Depth-first pre-order mesh collection over the node hierarchy.
///
/// A node's own meshes come before its children's, and children keep their
/// listed order. Walks with an explicit stack, so hierarchy depth cannot
/// exhaust the call stack. Out-of-range mesh indices are skipped.
fn collect_mesh_indices(root: Option<&SceneNode>, mesh_count: usize) -> Vec<usize> {
    let mut ordered = Vec::new();
    let mut stack: Vec<&SceneNode> = Vec::new();
    if let Some(root) = root {
        stack.push(root);
    }

    while let Some(node) = stack.pop() {
        for &index in &node.mesh_indices {
            if index < mesh_count {
                ordered.push(index);
            } else {
                warn!(
                    "Node '{}' references mesh {} but the scene has {}",
                    node.name, index, mesh_count
                );
            }
        }
        for child in node.children.iter().rev() {
            stack.push(child);
        }
    }

    ordered
}

/// Static vertex extraction.
///
/// The source's up axis differs from the engine's; positions and frame
/// vectors swap Y and Z. The skinned path copies axes unchanged, see
/// [`extract_skinned_vertices`].
fn extract_vertices(mesh: &SceneMesh) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(mesh.vertex_count());
    for index in 0..mesh.vertex_count() {
        let mut vertex = Vertex {
            position: swizzle_yz(mesh.positions[index]),
            normal: swizzle_yz(attr3(&mesh.normals, index)),
            ..Default::default()
        };
        if let Some(tangents) = &mesh.tangents {
            vertex.tangent = swizzle_yz(attr3(tangents, index));
        }
        if let Some(bitangents) = &mesh.bitangents {
            vertex.bitangent = swizzle_yz(attr3(bitangents, index));
        }
        if let Some(uvs) = &mesh.uvs {
            if let Some(&[u, v]) = uvs.get(index) {
                vertex.uv = Vec2::new(u, v);
            }
        }
        vertices.push(vertex);
    }
    vertices
}

/// Skinned vertex extraction. Axes are copied through unchanged here.
fn extract_skinned_vertices(mesh: &SceneMesh) -> Vec<SkinnedVertex> {
    let mut vertices = Vec::with_capacity(mesh.vertex_count());
    for index in 0..mesh.vertex_count() {
        let mut vertex = SkinnedVertex {
            position: Vec3::from_array(mesh.positions[index]),
            normal: Vec3::from_array(attr3(&mesh.normals, index)),
            ..Default::default()
        };
        if let Some(tangents) = &mesh.tangents {
            vertex.tangent = Vec3::from_array(attr3(tangents, index));
        }
        if let Some(bitangents) = &mesh.bitangents {
            vertex.bitangent = Vec3::from_array(attr3(bitangents, index));
        }
        if let Some(uvs) = &mesh.uvs {
            if let Some(&[u, v]) = uvs.get(index) {
                vertex.uv = Vec2::new(u, v);
            }
        }
        vertices.push(vertex);
    }
    vertices
}

fn swizzle_yz(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[2], v[1])
}

/// Attribute lookup tolerating streams shorter than the vertex count.
fn attr3(stream: &[[f32; 3]], index: usize) -> [f32; 3] {
    stream.get(index).copied().unwrap_or_default()
}

/// Flatten per-face index lists into one triangle-list buffer. Faces that
/// reference vertices outside the mesh are dropped, so the result always
/// indexes into the paired vertex buffer.
fn flatten_indices(mesh: &SceneMesh) -> Vec<u32> {
    let vertex_count = mesh.vertex_count() as u32;
    let mut indices = Vec::new();
    for face in &mesh.faces {
        if face.indices.iter().any(|&index| index >= vertex_count) {
            warn!(
                "Mesh '{}' has a face referencing vertices outside the mesh, face dropped",
                mesh.name
            );
            continue;
        }
        indices.extend_from_slice(&face.indices);
    }
    indices
}

/// Register this mesh's bones and write bounded per-vertex influences.
///
/// Weights land in the first free slot of their target vertex, in bone
/// declaration order; influences past the slot capacity are dropped, and
/// weights are stored without normalization. A weight whose vertex index
/// falls outside the mesh is an [`InternalError`].
fn assign_bone_weights(
    mesh: &SceneMesh,
    vertices: &mut [SkinnedVertex],
    registry: &mut BoneRegistry,
) -> Result<(), InternalError> {
    if mesh.bones.is_empty() {
        warn!("Skinned mesh '{}' has no bones", mesh.name);
        return Ok(());
    }

    let vertex_count = vertices.len();
    for bone in &mesh.bones {
        let bone_id = registry.get_or_insert(&bone.name, bone.offset);
        for entry in &bone.weights {
            let vertex = vertices.get_mut(entry.vertex as usize).ok_or(
                InternalError::WeightOutOfRange {
                    vertex: entry.vertex,
                    vertex_count,
                },
            )?;
            vertex.push_influence(bone_id, entry.weight);
        }
    }
    Ok(())
}

/// Directory the model file sits in; relative texture references resolve
/// against it.
fn parent_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use glam::Mat4;
    use tracing::Level;
    use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
    use tracing_subscriber::Layer;

    use keel_scene::{
        EmbeddedTexture, Face, SceneAnimation, SceneBone, SceneError, SceneMaterial, VertexWeight,
    };
    use crate::vertex::{MAX_BONE_INFLUENCE, NO_BONE};

    /// Scene source returning a prebuilt scene regardless of path.
    struct StaticSource(Scene);

    impl SceneSource for StaticSource {
        fn read_scene(&self, _path: &Path, _flags: &ImportFlags) -> Result<Scene, SceneError> {
            Ok(self.0.clone())
        }
    }

    /// Scene source that always fails to parse.
    struct FailingSource;

    impl SceneSource for FailingSource {
        fn read_scene(&self, path: &Path, _flags: &ImportFlags) -> Result<Scene, SceneError> {
            Err(SceneError::Parse(
                path.to_path_buf(),
                "simulated parser failure".into(),
            ))
        }
    }

    struct LogCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for LogCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            if *event.metadata().level() <= Level::WARN {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Warnings and errors emitted on this thread while `f` runs.
    fn count_warnings(f: impl FnOnce()) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(LogCounter(count.clone()));
        tracing::subscriber::with_default(subscriber, f);
        count.load(Ordering::Relaxed)
    }

    fn loader_for(scene: Scene) -> ModelLoader<StaticSource> {
        ModelLoader::with_source(StaticSource(scene), ProjectPaths::from_root("/nonexistent"))
    }

    fn triangle_mesh() -> SceneMesh {
        SceneMesh {
            name: "tri".into(),
            positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            faces: vec![Face {
                indices: vec![0, 1, 2],
            }],
            ..Default::default()
        }
    }

    fn mesh_with_vertices(count: usize) -> SceneMesh {
        SceneMesh {
            name: format!("mesh_{count}"),
            positions: vec![[0.0; 3]; count],
            normals: vec![[0.0, 1.0, 0.0]; count],
            ..Default::default()
        }
    }

    fn scene_with(meshes: Vec<SceneMesh>) -> Scene {
        let mut root = SceneNode::new("root");
        root.mesh_indices = (0..meshes.len()).collect();
        Scene {
            root: Some(root),
            meshes,
            ..Default::default()
        }
    }

    fn bone(name: &str, weights: &[(u32, f32)]) -> SceneBone {
        SceneBone {
            name: name.into(),
            offset: Mat4::IDENTITY,
            weights: weights
                .iter()
                .map(|&(vertex, weight)| VertexWeight { vertex, weight })
                .collect(),
        }
    }

    #[test]
    fn static_extraction_swaps_y_and_z() {
        let mut mesh = triangle_mesh();
        mesh.tangents = Some(vec![[0.0, 0.5, 1.0]; 3]);
        mesh.bitangents = Some(vec![[1.0, 0.5, 0.0]; 3]);
        let mut loader = loader_for(scene_with(vec![mesh]));

        let model = loader.load_model(Path::new("model.gltf")).unwrap();
        let vertex = model.meshes[0].vertices[0];
        assert_eq!(vertex.position, Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(vertex.normal, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(vertex.tangent, Vec3::new(0.0, 1.0, 0.5));
        assert_eq!(vertex.bitangent, Vec3::new(1.0, 0.0, 0.5));
        assert_eq!(vertex.uv, Vec2::ZERO);
    }

    #[test]
    fn skinned_extraction_keeps_axes() {
        let mut mesh = triangle_mesh();
        mesh.tangents = Some(vec![[0.0, 0.5, 1.0]; 3]);
        mesh.bones = vec![bone("hip", &[(0, 1.0)])];
        let mut loader = loader_for(scene_with(vec![mesh]));

        let model = loader.load_skinned_model(Path::new("model.gltf")).unwrap();
        let vertex = model.meshes[0].vertices[0];
        assert_eq!(vertex.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(vertex.normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(vertex.tangent, Vec3::new(0.0, 0.5, 1.0));
    }

    #[test]
    fn uvs_copy_through_both_paths() {
        let mut mesh = triangle_mesh();
        mesh.uvs = Some(vec![[0.25, 0.75]; 3]);
        let mut loader = loader_for(scene_with(vec![mesh.clone()]));
        let model = loader.load_model(Path::new("m.gltf")).unwrap();
        assert_eq!(model.meshes[0].vertices[1].uv, Vec2::new(0.25, 0.75));

        let mut loader = loader_for(scene_with(vec![mesh]));
        let skinned = loader.load_skinned_model(Path::new("m.gltf")).unwrap();
        assert_eq!(skinned.meshes[0].vertices[1].uv, Vec2::new(0.25, 0.75));
    }

    #[test]
    fn indices_flatten_and_stay_in_range() {
        let mut mesh = triangle_mesh();
        mesh.faces = vec![
            Face {
                indices: vec![0, 1, 2],
            },
            Face {
                indices: vec![2, 1, 0],
            },
        ];
        let mut loader = loader_for(scene_with(vec![mesh]));

        let model = loader.load_model(Path::new("m.gltf")).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 0]);
        assert!(mesh
            .indices
            .iter()
            .all(|&index| (index as usize) < mesh.vertices.len()));
    }

    #[test]
    fn face_outside_the_mesh_is_dropped_with_a_warning() {
        let mut mesh = triangle_mesh();
        mesh.faces.push(Face {
            indices: vec![0, 1, 99],
        });
        let mut loader = loader_for(scene_with(vec![mesh]));

        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(Path::new("m.gltf")).unwrap();
        });
        assert_eq!(warnings, 1);
        assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn traversal_is_depth_first_preorder() {
        let mut root = SceneNode::new("root");
        root.mesh_indices = vec![0];
        let mut first = SceneNode::new("first");
        first.mesh_indices = vec![1, 2];
        let mut nested = SceneNode::new("nested");
        nested.mesh_indices = vec![4];
        first.children.push(nested);
        let mut second = SceneNode::new("second");
        second.mesh_indices = vec![3];
        root.children = vec![first, second];

        let order = collect_mesh_indices(Some(&root), 5);
        assert_eq!(order, vec![0, 1, 2, 4, 3]);
    }

    #[test]
    fn out_of_range_mesh_reference_is_skipped_with_a_warning() {
        let mut root = SceneNode::new("root");
        root.mesh_indices = vec![0, 9];

        let mut order = Vec::new();
        let warnings = count_warnings(|| {
            order = collect_mesh_indices(Some(&root), 1);
        });
        assert_eq!(warnings, 1);
        assert_eq!(order, vec![0]);
    }

    #[test]
    fn empty_scene_tree_loads_an_empty_model_without_warnings() {
        let mut loader = loader_for(scene_with(Vec::new()));

        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(Path::new("empty.gltf")).unwrap();
        });
        assert_eq!(warnings, 0);
        assert!(model.is_empty());
    }

    #[test]
    fn parse_failure_yields_an_empty_model_and_one_log_line() {
        let mut loader =
            ModelLoader::with_source(FailingSource, ProjectPaths::from_root("/nonexistent"));

        let mut model = Model::empty("");
        let events = count_warnings(|| {
            model = loader.load_model(Path::new("broken.gltf")).unwrap();
        });
        assert_eq!(events, 1);
        assert!(model.is_empty());
        assert_eq!(model.source, PathBuf::from("broken.gltf"));
    }

    #[test]
    fn incomplete_scene_is_a_failed_load() {
        let mut scene = scene_with(vec![triangle_mesh()]);
        scene.incomplete = true;
        let mut loader = loader_for(scene);

        let mut model = Model::empty("");
        let events = count_warnings(|| {
            model = loader.load_model(Path::new("partial.gltf")).unwrap();
        });
        assert_eq!(events, 1);
        assert!(model.is_empty());
    }

    #[test]
    fn scene_without_root_is_a_failed_load() {
        let scene = Scene {
            meshes: vec![triangle_mesh()],
            ..Default::default()
        };
        let mut loader = loader_for(scene);

        let model = loader.load_skinned_model(Path::new("rootless.gltf")).unwrap();
        assert!(model.is_empty());
        assert!(model.skeleton_root.is_none());
        assert!(model.bones.is_empty());
    }

    #[test]
    fn bone_ids_are_contiguous_and_shared_across_meshes() {
        let mut first = triangle_mesh();
        first.bones = vec![bone("left", &[(0, 0.5)]), bone("right", &[(1, 0.5)])];
        let mut second = triangle_mesh();
        second.bones = vec![bone("right", &[(0, 1.0)]), bone("tail", &[(2, 0.25)])];
        let mut loader = loader_for(scene_with(vec![first, second]));

        let model = loader.load_skinned_model(Path::new("m.gltf")).unwrap();

        let names: Vec<&str> = model.bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["left", "right", "tail"]);
        for (index, bone) in model.bones.iter().enumerate() {
            assert_eq!(bone.id, index as i32);
        }

        // The second mesh reuses "right"'s id instead of minting a new one.
        assert_eq!(model.meshes[1].vertices[0].bone_ids[0], 1);
        assert_eq!(model.meshes[1].vertices[2].bone_ids[0], 2);
        assert_eq!(model.meshes[0].vertices[0].bone_ids, [0, NO_BONE, NO_BONE, NO_BONE]);
    }

    #[test]
    fn sequential_loads_from_one_loader_are_deterministic() {
        let mut mesh = triangle_mesh();
        mesh.bones = vec![
            bone("a", &[(0, 0.4), (1, 0.6)]),
            bone("b", &[(0, 0.3)]),
            bone("c", &[(2, 1.0)]),
        ];
        let mut loader = loader_for(scene_with(vec![mesh]));

        let first = loader.load_skinned_model(Path::new("m.gltf")).unwrap();
        let second = loader.load_skinned_model(Path::new("m.gltf")).unwrap();

        assert_eq!(first.bones, second.bones);
        assert_eq!(first.meshes[0].vertices, second.meshes[0].vertices);
        assert_eq!(first.bones.len(), 3);
    }

    #[test]
    fn influences_past_four_are_dropped() {
        let mut mesh = triangle_mesh();
        mesh.bones = (0..6)
            .map(|i| bone(&format!("bone_{i}"), &[(0, 0.5)]))
            .collect();
        let mut loader = loader_for(scene_with(vec![mesh]));

        let model = loader.load_skinned_model(Path::new("m.gltf")).unwrap();
        let vertex = model.meshes[0].vertices[0];
        assert_eq!(vertex.influence_count(), MAX_BONE_INFLUENCE);
        assert_eq!(vertex.bone_ids, [0, 1, 2, 3]);
        // All six bones still register.
        assert_eq!(model.bones.len(), 6);
    }

    #[test]
    fn weights_are_stored_without_normalization() {
        let mut mesh = triangle_mesh();
        mesh.bones = vec![bone("a", &[(0, 0.2)]), bone("b", &[(0, 0.2)])];
        let mut loader = loader_for(scene_with(vec![mesh]));

        let model = loader.load_skinned_model(Path::new("m.gltf")).unwrap();
        let vertex = model.meshes[0].vertices[0];
        assert_eq!(vertex.bone_weights, [0.2, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn weight_outside_the_mesh_is_an_internal_error() {
        let mut mesh = triangle_mesh();
        mesh.bones = vec![bone("a", &[(99, 0.5)])];
        let mut loader = loader_for(scene_with(vec![mesh]));

        let result = loader.load_skinned_model(Path::new("m.gltf"));
        assert!(matches!(
            result,
            Err(InternalError::WeightOutOfRange {
                vertex: 99,
                vertex_count: 3
            })
        ));
    }

    #[test]
    fn skinned_mesh_without_bones_warns_and_keeps_sentinels() {
        let mut loader = loader_for(scene_with(vec![triangle_mesh()]));

        let mut model = SkinnedModel::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_skinned_model(Path::new("m.gltf")).unwrap();
        });
        assert_eq!(warnings, 1);
        assert!(model.bones.is_empty());
        for vertex in &model.meshes[0].vertices {
            assert_eq!(vertex.bone_ids, [NO_BONE; MAX_BONE_INFLUENCE]);
            assert_eq!(vertex.bone_weights, [0.0; MAX_BONE_INFLUENCE]);
        }
    }

    #[test]
    fn material_index_out_of_range_resolves_to_no_material() {
        let mut mesh = triangle_mesh();
        mesh.material_index = Some(7);
        let mut loader = loader_for(scene_with(vec![mesh]));

        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(Path::new("m.gltf")).unwrap();
        });
        assert_eq!(warnings, 1);
        assert!(model.meshes[0].material.is_none());
    }

    #[test]
    fn missing_texture_file_warns_once_and_uses_the_default() {
        // Default texture init may warn once; trigger it outside the
        // counted span.
        let _ = texture::default_texture(Path::new("/nonexistent/default.png"));

        let mut mesh = triangle_mesh();
        mesh.material_index = Some(0);
        let mut scene = scene_with(vec![mesh]);
        scene.materials = vec![SceneMaterial {
            name: "wood".into(),
            albedo: Some("textures/wood_albedo.png".into()),
            ..Default::default()
        }];
        let mut loader = loader_for(scene);

        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(Path::new("m.gltf")).unwrap();
        });
        assert_eq!(warnings, 1);

        let material = model.meshes[0].material.as_ref().unwrap();
        let default = texture::default_texture(Path::new("/nonexistent/default.png"));
        assert!(Arc::ptr_eq(material.albedo.as_ref().unwrap(), &default));
        assert_eq!(material.texture_count(), 1);
    }

    #[test]
    fn gltf_file_with_missing_texture_still_loads() {
        let _ = texture::default_texture(Path::new("/nonexistent/default.png"));

        // One triangle whose material references an image file that does
        // not exist next to the model.
        let dir = std::env::temp_dir().join(format!("keel-import-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("missing-texture.gltf");
        std::fs::write(
            &file,
            r#"{
                "asset": {"version": "2.0"},
                "scene": 0,
                "scenes": [{"nodes": [0]}],
                "nodes": [{"name": "tri", "mesh": 0}],
                "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}],
                "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}],
                "bufferViews": [{"buffer": 0, "byteLength": 36}],
                "buffers": [{"uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA", "byteLength": 36}],
                "images": [{"uri": "missing_texture.png"}],
                "textures": [{"source": 0}],
                "materials": [{"name": "wood", "pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}}]
            }"#,
        )
        .unwrap();

        let mut loader = ModelLoader::new(ProjectPaths::default());
        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(&file).unwrap();
        });

        assert_eq!(warnings, 1);
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].vertices.len(), 3);
        let material = model.meshes[0].material.as_ref().unwrap();
        let default = texture::default_texture(Path::new("/nonexistent/default.png"));
        assert!(Arc::ptr_eq(material.albedo.as_ref().unwrap(), &default));

        std::fs::remove_file(&file).ok();
    }

    #[test]
    fn embedded_references_resolve_without_touching_the_filesystem() {
        let mut mesh = triangle_mesh();
        mesh.material_index = Some(0);
        let mut scene = scene_with(vec![mesh]);
        scene.embedded_textures = vec![
            EmbeddedTexture {
                width: 1,
                height: 1,
                data: vec![0, 0, 0, 255],
            },
            EmbeddedTexture {
                width: 2,
                height: 2,
                data: vec![9; 16],
            },
        ];
        scene.materials = vec![SceneMaterial {
            name: "embedded".into(),
            albedo: Some("*1".into()),
            ..Default::default()
        }];
        let mut loader = loader_for(scene);

        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(Path::new("m.gltf")).unwrap();
        });
        assert_eq!(warnings, 0);

        let material = model.meshes[0].material.as_ref().unwrap();
        let albedo = material.albedo.as_ref().unwrap();
        assert_eq!((albedo.width, albedo.height), (2, 2));
        assert_eq!(albedo.data, vec![9; 16]);
    }

    #[test]
    fn repeated_embedded_references_share_one_decode() {
        let mut mesh = triangle_mesh();
        mesh.material_index = Some(0);
        let mut scene = scene_with(vec![mesh]);
        scene.embedded_textures = vec![EmbeddedTexture {
            width: 1,
            height: 1,
            data: vec![7, 7, 7, 255],
        }];
        // One packed image feeding two channels, as glTF metallic-roughness
        // materials do.
        scene.materials = vec![SceneMaterial {
            name: "packed".into(),
            metalness: Some("*0".into()),
            roughness: Some("*0".into()),
            ..Default::default()
        }];
        let mut loader = loader_for(scene);

        let model = loader.load_model(Path::new("m.gltf")).unwrap();

        let material = model.meshes[0].material.as_ref().unwrap();
        let metalness = material.metalness.as_ref().unwrap();
        let roughness = material.roughness.as_ref().unwrap();
        assert!(Arc::ptr_eq(metalness, roughness));
        assert_eq!(metalness.data, vec![7, 7, 7, 255]);
    }

    #[test]
    fn bad_embedded_references_fall_back_to_the_default() {
        let _ = texture::default_texture(Path::new("/nonexistent/default.png"));

        let mut mesh = triangle_mesh();
        mesh.material_index = Some(0);
        let mut scene = scene_with(vec![mesh]);
        scene.materials = vec![SceneMaterial {
            name: "broken".into(),
            albedo: Some("*notanumber".into()),
            normal: Some("*9".into()),
            ..Default::default()
        }];
        let mut loader = loader_for(scene);

        let mut model = Model::empty("");
        let warnings = count_warnings(|| {
            model = loader.load_model(Path::new("m.gltf")).unwrap();
        });
        assert_eq!(warnings, 2);

        let material = model.meshes[0].material.as_ref().unwrap();
        let default = texture::default_texture(Path::new("/nonexistent/default.png"));
        assert!(Arc::ptr_eq(material.albedo.as_ref().unwrap(), &default));
        assert!(Arc::ptr_eq(material.normal.as_ref().unwrap(), &default));
    }

    #[test]
    fn skeleton_and_clip_headers_are_captured() {
        let mut mesh = triangle_mesh();
        mesh.bones = vec![bone("hip", &[(0, 1.0)])];
        let mut scene = scene_with(vec![mesh]);
        if let Some(root) = &mut scene.root {
            root.children.push(SceneNode::new("armature"));
        }
        scene.animations = vec![SceneAnimation {
            name: "walk".into(),
            duration: 1200.0,
            ticks_per_second: 1000.0,
        }];
        let mut loader = loader_for(scene);

        let model = loader.load_skinned_model(Path::new("m.gltf")).unwrap();

        let skeleton = model.skeleton_root.as_ref().unwrap();
        assert_eq!(skeleton.name, "root");
        assert_eq!(skeleton.children[0].name, "armature");

        assert_eq!(
            model.animations,
            vec![AnimationClip {
                name: "walk".into(),
                duration: 1200.0,
                ticks_per_second: 1000.0,
            }]
        );
    }

    #[test]
    fn deep_hierarchies_load_without_recursion() {
        let mut current = SceneNode::new("leaf");
        current.mesh_indices = vec![0];
        for depth in 0..2_000 {
            let mut parent = SceneNode::new(format!("node_{depth}"));
            parent.children.push(current);
            current = parent;
        }
        let scene = Scene {
            root: Some(current),
            meshes: vec![triangle_mesh()],
            ..Default::default()
        };
        let mut loader = loader_for(scene);

        let model = loader.load_skinned_model(Path::new("deep.gltf")).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.skeleton_root.as_ref().unwrap().depth(), 2_001);
    }

    #[test]
    fn traversal_state_does_not_leak_between_loads() {
        let mut loader = loader_for(scene_with(vec![triangle_mesh(), mesh_with_vertices(4)]));

        let first = loader.load_model(Path::new("m.gltf")).unwrap();
        let second = loader.load_model(Path::new("m.gltf")).unwrap();
        assert_eq!(first.meshes.len(), 2);
        assert_eq!(second.meshes.len(), 2);
        assert_eq!(first.vertex_count(), second.vertex_count());
    }
}
