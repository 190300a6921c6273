//! glTF 2.0 scene source.
//!
//! Adapts `.gltf` and `.glb` files into the scene graph model. Each glTF
//! primitive becomes one [`SceneMesh`]; skins attach to nodes in glTF, so
//! their joints are folded into the bone lists of the meshes the skinned
//! node carries. Image files referenced by URI are never opened here; their
//! paths pass through as texture references for the asset pipeline to
//! resolve. Buffer-backed and data-URI images keep their encoded payloads
//! as embedded textures.

use std::collections::HashMap;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use glam::{Mat4, Vec3};
use tracing::{debug, warn};

use crate::flags::ImportFlags;
use crate::graph::{
    EmbeddedTexture, Face, Scene, SceneAnimation, SceneBone, SceneMaterial, SceneMesh, SceneNode,
    TextureChannel, VertexWeight, EMBEDDED_MARKER,
};
use crate::source::{SceneError, SceneSource};

/// Clip timestamps are seconds in glTF; headers report milliseconds as ticks.
const TICKS_PER_SECOND: f32 = 1000.0;

/// Scene source backed by the `gltf` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfSource;

impl SceneSource for GltfSource {
    fn read_scene(&self, path: &Path, flags: &ImportFlags) -> Result<Scene, SceneError> {
        if !path.exists() {
            return Err(SceneError::NotFound(path.to_path_buf()));
        }

        // Only the document and its geometry buffers are loaded here. Image
        // files stay untouched, so a missing texture cannot fail the scene.
        let mut gltf = gltf::Gltf::open(path)
            .map_err(|e| SceneError::Parse(path.to_path_buf(), e.to_string()))?;
        let blob = gltf.blob.take();
        let document = gltf.document;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .map_err(|e| SceneError::Parse(path.to_path_buf(), e.to_string()))?;

        // Nodes reference primitives through this (mesh, primitive) -> flat
        // mesh index map.
        let mut primitive_index = HashMap::new();
        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                primitive_index.insert((mesh.index(), primitive.index()), meshes.len());
                meshes.push(read_mesh(&mesh, &primitive, &buffers, flags));
            }
        }

        for node in document.nodes() {
            apply_skin(&node, &buffers, &primitive_index, &mut meshes);
        }

        let root = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| read_node_tree(&scene, &primitive_index));

        let (embedded_textures, image_refs) = collect_images(&document, &buffers);
        let scene = Scene {
            incomplete: false,
            root,
            meshes,
            materials: document
                .materials()
                .map(|m| read_material(&m, &image_refs))
                .collect(),
            embedded_textures,
            animations: document
                .animations()
                .map(|a| read_animation(&a, &buffers))
                .collect(),
        };

        debug!(
            "Parsed glTF '{}': {} meshes, {} materials, {} animations",
            path.display(),
            scene.meshes.len(),
            scene.materials.len(),
            scene.animations.len()
        );
        Ok(scene)
    }
}

fn read_mesh(
    mesh: &gltf::Mesh<'_>,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    flags: &ImportFlags,
) -> SceneMesh {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .unwrap_or_default();

    let mut normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_default();

    let uvs: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect());

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|idx| idx.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let faces = match faces_for_mode(primitive.mode(), &indices) {
        Some(faces) => faces,
        None => {
            warn!(
                "Primitive {} of mesh {} uses mode {:?}, faces skipped",
                primitive.index(),
                mesh.index(),
                primitive.mode()
            );
            Vec::new()
        }
    };

    if normals.is_empty() && flags.gen_smooth_normals && !positions.is_empty() {
        normals = smooth_normals(&positions, &faces);
    }

    // glTF tangents are vec4 with a handedness sign in w; the bitangent is
    // reconstructed as cross(normal, tangent) * w.
    let mut tangents = None;
    let mut bitangents = None;
    if let Some(raw) = reader
        .read_tangents()
        .map(|iter| iter.collect::<Vec<[f32; 4]>>())
    {
        if !raw.is_empty() {
            tangents = Some(raw.iter().map(|t| [t[0], t[1], t[2]]).collect());
            bitangents = Some(
                raw.iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let normal = Vec3::from_array(normals.get(i).copied().unwrap_or_default());
                        let tangent = Vec3::new(t[0], t[1], t[2]);
                        (normal.cross(tangent) * t[3]).to_array()
                    })
                    .collect(),
            );
        }
    }

    SceneMesh {
        name: mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index())),
        positions,
        normals,
        tangents,
        bitangents,
        uvs,
        faces,
        bones: Vec::new(),
        material_index: primitive.material().index(),
    }
}

/// Triangle faces for the primitive modes that carry surface geometry.
/// Strips and fans are rewound into triangle lists; point and line modes
/// have none to offer.
fn faces_for_mode(mode: gltf::mesh::Mode, indices: &[u32]) -> Option<Vec<Face>> {
    use gltf::mesh::Mode;

    let faces = match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|tri| Face {
                indices: tri.to_vec(),
            })
            .collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, tri)| Face {
                // Every other strip triangle swaps its leading edge to keep
                // the winding consistent.
                indices: if i % 2 == 0 {
                    vec![tri[0], tri[1], tri[2]]
                } else {
                    vec![tri[1], tri[0], tri[2]]
                },
            })
            .collect(),
        Mode::TriangleFan => (1..indices.len().saturating_sub(1))
            .map(|i| Face {
                indices: vec![indices[0], indices[i], indices[i + 1]],
            })
            .collect(),
        _ => return None,
    };
    Some(faces)
}

/// Area-weighted smooth normals for meshes that ship without them.
fn smooth_normals(positions: &[[f32; 3]], faces: &[Face]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    for face in faces {
        if face.indices.len() != 3 {
            continue;
        }
        let [ia, ib, ic] = [
            face.indices[0] as usize,
            face.indices[1] as usize,
            face.indices[2] as usize,
        ];
        let (Some(&pa), Some(&pb), Some(&pc)) =
            (positions.get(ia), positions.get(ib), positions.get(ic))
        else {
            continue;
        };
        let (pa, pb, pc) = (
            Vec3::from_array(pa),
            Vec3::from_array(pb),
            Vec3::from_array(pc),
        );
        // The cross product's length carries the face area, which acts as
        // the smoothing weight.
        let face_normal = (pb - pa).cross(pc - pa);
        accumulated[ia] += face_normal;
        accumulated[ib] += face_normal;
        accumulated[ic] += face_normal;
    }
    accumulated
        .into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}

/// Fold a node's skin into the bone lists of the meshes it carries.
fn apply_skin(
    node: &gltf::Node<'_>,
    buffers: &[gltf::buffer::Data],
    primitive_index: &HashMap<(usize, usize), usize>,
    meshes: &mut [SceneMesh],
) {
    let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) else {
        return;
    };

    let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
    let offsets: Vec<Mat4> = reader
        .read_inverse_bind_matrices()
        .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
        .unwrap_or_else(|| vec![Mat4::IDENTITY; skin.joints().count()]);

    let joint_names: Vec<String> = skin
        .joints()
        .map(|joint| {
            joint
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("joint_{}", joint.index()))
        })
        .collect();

    for primitive in mesh.primitives() {
        let Some(&flat) = primitive_index.get(&(mesh.index(), primitive.index())) else {
            continue;
        };
        if meshes[flat].has_bones() {
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) else {
            continue;
        };

        let mut bones: Vec<SceneBone> = joint_names
            .iter()
            .enumerate()
            .map(|(i, name)| SceneBone {
                name: name.clone(),
                offset: offsets.get(i).copied().unwrap_or(Mat4::IDENTITY),
                weights: Vec::new(),
            })
            .collect();

        for (vertex, (ids, ws)) in joints.into_u16().zip(weights.into_f32()).enumerate() {
            for slot in 0..4 {
                let weight = ws[slot];
                if weight <= 0.0 {
                    continue;
                }
                if let Some(bone) = bones.get_mut(ids[slot] as usize) {
                    bone.weights.push(VertexWeight {
                        vertex: vertex as u32,
                        weight,
                    });
                }
            }
        }

        meshes[flat].bones = bones;
    }
}

/// Build the node tree without language-level recursion so hierarchy depth
/// cannot exhaust the call stack.
fn read_node_tree(
    scene: &gltf::Scene<'_>,
    primitive_index: &HashMap<(usize, usize), usize>,
) -> SceneNode {
    struct Pending<'a> {
        node: gltf::Node<'a>,
        parent: usize,
    }

    // glTF stores top-level nodes as a forest; a synthetic root gathers them.
    let mut arena: Vec<(SceneNode, usize)> = vec![(SceneNode::new("RootNode"), 0)];
    let mut stack: Vec<Pending<'_>> = Vec::new();
    let top: Vec<gltf::Node<'_>> = scene.nodes().collect();
    for node in top.into_iter().rev() {
        stack.push(Pending { node, parent: 0 });
    }

    while let Some(pending) = stack.pop() {
        let slot = arena.len();
        arena.push((node_payload(&pending.node, primitive_index), pending.parent));
        let children: Vec<gltf::Node<'_>> = pending.node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(Pending {
                node: child,
                parent: slot,
            });
        }
    }

    // Children sit after their parents in the arena, so a backwards walk
    // moves every completed subtree into its parent slot. They arrive
    // last-first and get reversed back into source order.
    for index in (1..arena.len()).rev() {
        let (mut node, parent) = std::mem::take(&mut arena[index]);
        node.children.reverse();
        arena[parent].0.children.push(node);
    }
    let (mut root, _) = arena.swap_remove(0);
    root.children.reverse();
    root
}

fn node_payload(
    node: &gltf::Node<'_>,
    primitive_index: &HashMap<(usize, usize), usize>,
) -> SceneNode {
    let mut payload = SceneNode::new(
        node.name()
            .map(String::from)
            .unwrap_or_else(|| format!("node_{}", node.index())),
    );
    payload.transform = Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(&flat) = primitive_index.get(&(mesh.index(), primitive.index())) {
                payload.mesh_indices.push(flat);
            }
        }
    }
    payload
}

fn read_material(material: &gltf::Material<'_>, image_refs: &[String]) -> SceneMaterial {
    let mut out = SceneMaterial {
        name: material
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
        ..Default::default()
    };

    let pbr = material.pbr_metallic_roughness();
    if let Some(info) = pbr.base_color_texture() {
        out.set_texture_ref(
            TextureChannel::Albedo,
            texture_reference(&info.texture(), image_refs),
        );
    }
    if let Some(normal) = material.normal_texture() {
        out.set_texture_ref(
            TextureChannel::Normal,
            texture_reference(&normal.texture(), image_refs),
        );
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        // One combined metallic-roughness image feeds both channels.
        let reference = texture_reference(&info.texture(), image_refs);
        out.set_texture_ref(TextureChannel::Metalness, reference.clone());
        out.set_texture_ref(TextureChannel::Roughness, reference);
    }
    if let Some(occlusion) = material.occlusion_texture() {
        out.set_texture_ref(
            TextureChannel::AmbientOcclusion,
            texture_reference(&occlusion.texture(), image_refs),
        );
    }
    // Core glTF has no displacement channel; that slot stays empty.
    out
}

fn texture_reference(texture: &gltf::Texture<'_>, image_refs: &[String]) -> String {
    image_refs
        .get(texture.source().index())
        .cloned()
        .unwrap_or_default()
}

/// One reference string per document image: plain URIs stay file references
/// and are never read here; buffer-view and data-URI payloads land in the
/// embedded set as `*N` and keep their encoded bytes for the asset pipeline
/// to decode.
fn collect_images(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> (Vec<EmbeddedTexture>, Vec<String>) {
    let mut embedded = Vec::new();
    let mut refs = Vec::new();
    for image in document.images() {
        let reference = match image.source() {
            gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => uri.to_string(),
            source => {
                let data = encoded_image_bytes(&source, buffers).unwrap_or_else(|| {
                    debug!("Image {} has no readable payload", image.index());
                    Vec::new()
                });
                // A zero height marks the payload as encoded; width carries
                // the byte length.
                embedded.push(EmbeddedTexture {
                    width: data.len() as u32,
                    height: 0,
                    data,
                });
                format!("{}{}", EMBEDDED_MARKER, embedded.len() - 1)
            }
        };
        refs.push(reference);
    }
    (embedded, refs)
}

fn encoded_image_bytes(
    source: &gltf::image::Source<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<Vec<u8>> {
    match source {
        gltf::image::Source::View { view, .. } => {
            let buffer = buffers.get(view.buffer().index())?;
            let end = view.offset().checked_add(view.length())?;
            buffer.get(view.offset()..end).map(|bytes| bytes.to_vec())
        }
        gltf::image::Source::Uri { uri, .. } => {
            let (_, payload) = uri.split_once(',')?;
            BASE64.decode(payload).ok()
        }
    }
}

fn read_animation(animation: &gltf::Animation<'_>, buffers: &[gltf::buffer::Data]) -> SceneAnimation {
    let mut end = 0.0f32;
    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
        if let Some(inputs) = reader.read_inputs() {
            for timestamp in inputs {
                end = end.max(timestamp);
            }
        }
    }

    SceneAnimation {
        name: animation
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("anim_{}", animation.index())),
        duration: end * TICKS_PER_SECOND,
        ticks_per_second: TICKS_PER_SECOND,
    }
}
