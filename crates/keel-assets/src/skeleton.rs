//! Bone registry and the runtime skeleton tree.

use std::collections::HashMap;

use glam::Mat4;

use keel_scene::SceneNode;

/// A bone participating in skinning.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Stable id, assigned in first-encounter order within one load.
    pub id: i32,
    /// Inverse bind-pose (offset) matrix.
    pub offset: Mat4,
}

/// Load-scoped bone registry.
///
/// Ids are handed out sequentially from zero, so the finished bone list is
/// contiguous and a vertex's bone id doubles as an index into it.
#[derive(Debug, Default)]
pub struct BoneRegistry {
    bones: Vec<Bone>,
    by_name: HashMap<String, usize>,
}

impl BoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, registering the bone with `offset` on first encounter.
    /// A bone seen again keeps its original id and offset.
    pub fn get_or_insert(&mut self, name: &str, offset: Mat4) -> i32 {
        if let Some(&index) = self.by_name.get(name) {
            return self.bones[index].id;
        }

        let id = self.bones.len() as i32;
        self.by_name.insert(name.to_string(), self.bones.len());
        self.bones.push(Bone {
            name: name.to_string(),
            id,
            offset,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Finished bone list, ordered by id.
    pub fn into_bones(self) -> Vec<Bone> {
        self.bones
    }
}

/// One node of the runtime skeleton tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonNode {
    pub name: String,
    /// Transform relative to the parent skeleton node.
    pub transform: Mat4,
    pub children: Vec<SkeletonNode>,
}

impl SkeletonNode {
    /// Nodes in this subtree, counting this node.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Longest path from this node to a leaf, counting this node as 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for child in &node.children {
                stack.push((child, depth + 1));
            }
        }
        deepest
    }
}

/// Mirror the source hierarchy into an owned skeleton tree.
///
/// Walks with an explicit stack, so hierarchy depth cannot exhaust the call
/// stack.
pub fn build_skeleton(root: &SceneNode) -> SkeletonNode {
    // Pre-order arena pass: every node lands after its parent, siblings in
    // source order.
    let mut arena: Vec<(SkeletonNode, usize)> = Vec::new();
    let mut stack: Vec<(&SceneNode, usize)> = vec![(root, 0)];

    while let Some((source, parent)) = stack.pop() {
        let slot = arena.len();
        arena.push((
            SkeletonNode {
                name: source.name.clone(),
                transform: source.transform,
                children: Vec::new(),
            },
            parent,
        ));
        for child in source.children.iter().rev() {
            stack.push((child, slot));
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
    let (mut mirrored, _) = arena.swap_remove(0);
    mirrored.children.reverse();
    mirrored
}
