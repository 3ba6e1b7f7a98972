// scene/model.rs - glTF import into a CPU-side scene graph, plus posing and skinning

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;

use crate::error_handling::{RendererError, Result};
use super::mixer::{AnimationClip, Channel, ChannelValues, Interpolation};

/// Vertex layout shared with the GPU pipeline
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: Option<String>,
    pub transform: Transform,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Per-vertex joint indices into the node's skin; empty when unskinned
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

impl Primitive {
    pub fn is_skinned(&self) -> bool {
        !self.joints.is_empty()
            && self.joints.len() == self.vertices.len()
            && self.weights.len() == self.vertices.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone)]
pub struct Skin {
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Vec<Mat4>,
}

/// One primitive to draw this frame
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub mesh: usize,
    pub primitive: usize,
    pub world: Mat4,
    /// Skinned vertices already in world space; drawn with an identity `world`
    pub skinned: Option<Vec<Vertex>>,
}

/// The imported model: node hierarchy, geometry, skins and baked clips
#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub meshes: Vec<Mesh>,
    pub skins: Vec<Skin>,
    pub animations: Vec<AnimationClip>,
}

impl SceneModel {
    /// Parse a `.glb` or `.gltf` (with embedded buffers) from memory
    pub fn from_gltf_bytes(bytes: &[u8]) -> Result<Self> {
        let (document, buffers, _images) = gltf::import_slice(bytes)?;
        let buffer_data = |buffer: gltf::Buffer<'_>| buffers.get(buffer.index()).map(|data| data.0.as_slice());

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| invalid("file has no scene"))?;

        let nodes = document
            .nodes()
            .map(|node| {
                let (translation, rotation, scale) = node.transform().decomposed();
                Node {
                    name: node.name().map(str::to_string),
                    transform: Transform {
                        translation: Vec3::from(translation),
                        rotation: Quat::from_array(rotation),
                        scale: Vec3::from(scale),
                    },
                    mesh: node.mesh().map(|mesh| mesh.index()),
                    skin: node.skin().map(|skin| skin.index()),
                    children: node.children().map(|child| child.index()).collect(),
                }
            })
            .collect();

        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            let mut primitives = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!("Skipping non-triangle primitive in mesh {}", mesh.index());
                    continue;
                }
                let reader = primitive.reader(buffer_data);

                let positions: Vec<[f32; 3]> = reader
                    .read_positions()
                    .ok_or_else(|| invalid("primitive without POSITION"))?
                    .collect();
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };
                if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                    return Err(invalid(&format!("index {bad} out of range")));
                }
                let normals: Vec<[f32; 3]> = match reader.read_normals() {
                    Some(normals) => normals.collect(),
                    None => vertex_normals(&positions, &indices),
                };

                primitives.push(Primitive {
                    vertices: positions
                        .iter()
                        .zip(normals.iter().chain(std::iter::repeat(&[0.0, 0.0, 1.0])))
                        .map(|(&position, &normal)| Vertex { position, normal })
                        .collect(),
                    indices,
                    joints: reader.read_joints(0).map(|j| j.into_u16().collect()).unwrap_or_default(),
                    weights: reader.read_weights(0).map(|w| w.into_f32().collect()).unwrap_or_default(),
                });
            }
            meshes.push(Mesh { name: mesh.name().map(str::to_string), primitives });
        }

        let skins = document
            .skins()
            .map(|skin| {
                let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
                let inverse_bind_matrices = skin
                    .reader(buffer_data)
                    .read_inverse_bind_matrices()
                    .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect())
                    .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
                Skin { joints, inverse_bind_matrices }
            })
            .collect();

        let mut animations = Vec::new();
        for animation in document.animations() {
            let mut channels = Vec::new();
            for channel in animation.channels() {
                let reader = channel.reader(buffer_data);
                let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
                    continue;
                };
                let values = match outputs {
                    ReadOutputs::Translations(v) => ChannelValues::Translation(v.map(Vec3::from).collect()),
                    ReadOutputs::Rotations(v) => ChannelValues::Rotation(v.into_f32().map(Quat::from_array).collect()),
                    ReadOutputs::Scales(v) => ChannelValues::Scale(v.map(Vec3::from).collect()),
                    ReadOutputs::MorphTargetWeights(_) => {
                        log::debug!("Ignoring morph target channel");
                        continue;
                    }
                };
                let (values, interpolation) = match channel.sampler().interpolation() {
                    gltf::animation::Interpolation::Linear => (values, Interpolation::Linear),
                    gltf::animation::Interpolation::Step => (values, Interpolation::Step),
                    gltf::animation::Interpolation::CubicSpline => (values.spline_keys(), Interpolation::Linear),
                };
                channels.push(Channel::new(
                    channel.target().node().index(),
                    inputs.collect(),
                    values,
                    interpolation,
                ));
            }
            let name = animation.name().map(str::to_string).unwrap_or_else(|| format!("clip{}", animation.index()));
            animations.push(AnimationClip::new(name, channels));
        }

        let model = Self {
            nodes,
            roots: scene.nodes().map(|node| node.index()).collect(),
            meshes,
            skins,
            animations,
        };
        log::info!(
            "Imported model: {} nodes, {} meshes, {} vertices, {} clip(s)",
            model.nodes.len(),
            model.meshes.len(),
            model.vertex_count(),
            model.animations.len()
        );
        Ok(model)
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|mesh| &mesh.primitives)
            .map(|primitive| primitive.vertices.len())
            .sum()
    }

    /// Local transforms as authored
    pub fn rest_pose(&self) -> Vec<Transform> {
        self.nodes.iter().map(|node| node.transform).collect()
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name.as_deref() == Some(name))
    }

    /// World matrix of every node under `root`, using `pose` for local
    /// transforms. Nodes outside the scene keep identity.
    pub fn world_matrices(&self, pose: &[Transform], root: Mat4) -> Vec<Mat4> {
        let mut worlds = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&index| (index, root)).collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else { continue };
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            let local = pose.get(index).unwrap_or(&node.transform).matrix();
            let world = parent * local;
            worlds[index] = world;
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }
        worlds
    }

    pub fn draw_items(&self, worlds: &[Mat4]) -> Vec<DrawItem> {
        let mut items = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let Some((mesh_index, mesh)) = node.mesh.and_then(|m| Some((m, self.meshes.get(m)?))) else {
                continue;
            };
            let skin = node.skin.and_then(|s| self.skins.get(s));
            let world = worlds.get(index).copied().unwrap_or(Mat4::IDENTITY);

            for (p, primitive) in mesh.primitives.iter().enumerate() {
                let skinned = match skin {
                    Some(skin) if primitive.is_skinned() => Some(skin_vertices(primitive, skin, worlds)),
                    _ => None,
                };
                items.push(DrawItem {
                    mesh: mesh_index,
                    primitive: p,
                    world: if skinned.is_some() { Mat4::IDENTITY } else { world },
                    skinned,
                });
            }
        }
        items
    }

    pub fn primitive(&self, mesh: usize, primitive: usize) -> Option<&Primitive> {
        self.meshes.get(mesh)?.primitives.get(primitive)
    }
}

fn invalid(reason: &str) -> RendererError {
    RendererError::InvalidModel { reason: reason.to_string() }
}

/// Area-weighted vertex normals for meshes exported without them
fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (pa, pb, pc) = (Vec3::from(positions[a]), Vec3::from(positions[b]), Vec3::from(positions[c]));
        let face = (pb - pa).cross(pc - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO { [0.0, 0.0, 1.0] } else { n.into() }
        })
        .collect()
}

/// Linear blend skinning on the CPU
fn skin_vertices(primitive: &Primitive, skin: &Skin, worlds: &[Mat4]) -> Vec<Vertex> {
    let joint_matrices: Vec<Mat4> = skin
        .joints
        .iter()
        .enumerate()
        .map(|(i, &node)| {
            let world = worlds.get(node).copied().unwrap_or(Mat4::IDENTITY);
            world * skin.inverse_bind_matrices.get(i).copied().unwrap_or(Mat4::IDENTITY)
        })
        .collect();

    primitive
        .vertices
        .iter()
        .zip(&primitive.joints)
        .zip(&primitive.weights)
        .map(|((vertex, joints), weights)| {
            let mut blended = Mat4::ZERO;
            for (&joint, &weight) in joints.iter().zip(weights) {
                if weight <= 0.0 {
                    continue;
                }
                if let Some(matrix) = joint_matrices.get(joint as usize) {
                    blended = blended + *matrix * weight;
                }
            }
            if blended == Mat4::ZERO {
                blended = Mat4::IDENTITY;
            }
            Vertex {
                position: blended.transform_point3(Vec3::from(vertex.position)).into(),
                normal: blended.transform_vector3(Vec3::from(vertex.normal)).normalize_or_zero().into(),
            }
        })
        .collect()
}

/// A one-triangle glTF with embedded buffers; `animations` is spliced in
/// as a top-level member (with its trailing comma) or left empty
#[cfg(test)]
fn gltf_fixture(animations: &str) -> String {
    r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "skull", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        {animations}
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0], "max": [2] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC4" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 32 }
        ],
        "buffers": [{
            "byteLength": 76,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAEAAAAAAAAAAAAAAAAAAAIA/AAAAAPMENT8AAAAA8wQ1Pw=="
        }]
    }"#
    .replace("{animations}", animations)
}

/// One triangle node with a 2s "spin" rotation clip
#[cfg(test)]
pub(crate) fn test_gltf() -> String {
    gltf_fixture(
        r#""animations": [{
            "name": "spin",
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "rotation" } }],
            "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }]
        }],"#,
    )
}

/// The same triangle without any animation
#[cfg(test)]
pub(crate) fn test_static_gltf() -> String {
    gltf_fixture("")
}
