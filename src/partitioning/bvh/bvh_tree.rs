use crate::bounding_volume::Aabb;
use crate::math::{Point, Real};
use core::mem::size_of;
use core::ops::Range;
use smallvec::SmallVec;

/// The node (internal or leaf) of a [`BvhTree`].
///
/// Inner nodes store the indices of their two children. Leaves store a contiguous range of the
/// primitive permutation computed during the build (see
/// [`crate::partitioning::BoxSet::permutation`]).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BvhNode {
    /// Mins coordinates of the node’s bounding volume.
    pub(super) mins: Point,
    /// Maxs coordinates of this node’s bounding volume.
    pub(super) maxs: Point,
    /// Index of the left child for inner nodes, first primitive offset for leaves.
    pub(super) left_or_begin: u32,
    /// Index of the right child for inner nodes, primitive count for leaves.
    pub(super) right_or_count: u32,
    /// Depth of this node, the root being at level 0.
    pub(super) level: u32,
    pub(super) is_leaf: bool,
}

impl BvhNode {
    /// Initializes a leaf covering `count` entries of the permutation, starting at `begin`.
    #[inline]
    pub(super) fn leaf(aabb: Aabb, begin: u32, count: u32, level: u32) -> Self {
        Self {
            mins: aabb.mins,
            maxs: aabb.maxs,
            left_or_begin: begin,
            right_or_count: count,
            level,
            is_leaf: true,
        }
    }

    /// Turns this node into an inner node with the given children.
    #[inline]
    pub(super) fn set_inner(&mut self, left: u32, right: u32) {
        self.left_or_begin = left;
        self.right_or_count = right;
        self.is_leaf = false;
    }

    /// Is this node a leaf?
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// The min corner of this node’s AABB.
    #[inline]
    pub fn mins(&self) -> Point {
        self.mins
    }

    /// The max corner of this node’s AABB.
    #[inline]
    pub fn maxs(&self) -> Point {
        self.maxs
    }

    /// This node’s AABB.
    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb {
            mins: self.mins,
            maxs: self.maxs,
        }
    }

    /// The depth of this node, the root being at level 0.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// The indices of the left and right children if this is an inner node.
    #[inline]
    pub fn children(&self) -> Option<[usize; 2]> {
        (!self.is_leaf).then_some([self.left_or_begin as usize, self.right_or_count as usize])
    }

    /// The range of the primitive permutation covered by this node if it is a leaf.
    #[inline]
    pub fn primitive_range(&self) -> Option<Range<usize>> {
        self.is_leaf.then(|| {
            let begin = self.left_or_begin as usize;
            begin..begin + self.right_or_count as usize
        })
    }

    /// The number of primitives of this node if it is a leaf, 0 otherwise.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        if self.is_leaf {
            self.right_or_count as usize
        } else {
            0
        }
    }
}

/// A binary Bounding Volume Hierarchy stored as a flat array of nodes.
///
/// The root is always the node at index 0 (if the tree isn’t empty), and the children of any
/// inner node have greater indices than their parent. A tree is produced by a
/// [`BinnedBuilder`](crate::partitioning::BinnedBuilder) and is read-only afterward.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BvhTree {
    pub(super) nodes: Vec<BvhNode>,
    pub(super) depth: u32,
}

impl BvhTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every node of this tree, keeping the allocated memory.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.depth = 0;
    }

    /// The total number of nodes (inner nodes and leaves) of this tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Does this tree not contain any node?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All the nodes of this tree. The root is at index 0.
    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// The node at index `node`.
    #[inline]
    pub fn node(&self, node: usize) -> &BvhNode {
        &self.nodes[node]
    }

    /// Is the node at index `node` a leaf?
    #[inline]
    pub fn is_outer(&self, node: usize) -> bool {
        self.nodes[node].is_leaf
    }

    /// The number of primitives stored by the leaf at index `node`.
    ///
    /// Returns 0 if the node is an inner node.
    #[inline]
    pub fn nb_primitives(&self, node: usize) -> usize {
        self.nodes[node].primitive_count()
    }

    /// The range of the primitive permutation covered by the leaf at index `node`.
    #[inline]
    pub fn primitive_range(&self, node: usize) -> Option<Range<usize>> {
        self.nodes[node].primitive_range()
    }

    /// The indices of the children of the inner node at index `node`.
    #[inline]
    pub fn children(&self, node: usize) -> Option<[usize; 2]> {
        self.nodes[node].children()
    }

    /// The AABB of the node at index `node`.
    #[inline]
    pub fn aabb(&self, node: usize) -> Aabb {
        self.nodes[node].aabb()
    }

    /// The min corner of the AABB of the node at index `node`.
    #[inline]
    pub fn min_point(&self, node: usize) -> Point {
        self.nodes[node].mins
    }

    /// The max corner of the AABB of the node at index `node`.
    #[inline]
    pub fn max_point(&self, node: usize) -> Point {
        self.nodes[node].maxs
    }

    /// The depth of the node at index `node`, the root being at level 0.
    #[inline]
    pub fn level(&self, node: usize) -> u32 {
        self.nodes[node].level
    }

    /// The AABB bounding everything contained by this tree.
    ///
    /// Returns [`Aabb::new_invalid`] if the tree is empty.
    pub fn root_aabb(&self) -> Aabb {
        self.nodes
            .first()
            .map(BvhNode::aabb)
            .unwrap_or_else(Aabb::new_invalid)
    }

    /// The maximum level of all the leaves of this tree.
    ///
    /// This is 0 for an empty tree as well as for a tree reduced to a single leaf.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The number of leaves of this tree.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf).count()
    }

    /// Iterates through the indices of all the leaves of this tree.
    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.is_leaf.then_some(id))
    }

    /// Estimates the surface-area-heuristic cost of this tree.
    ///
    /// Starting with a probability of 1 at the root, each child is reached with its parent’s
    /// probability scaled by the ratio of their surface areas. Inner nodes cost 2 (one box test
    /// per child) and leaves cost their primitive count. Lower is better.
    ///
    /// Returns 0 for an empty tree.
    pub fn estimate_sah(&self) -> Real {
        if self.nodes.is_empty() {
            return 0.0;
        }

        let mut sah = 0.0;
        let mut stack: SmallVec<[(u32, Real); 32]> = SmallVec::new();
        stack.push((0, 1.0));

        while let Some((id, prob)) = stack.pop() {
            let node = &self.nodes[id as usize];

            if node.is_leaf {
                sah += prob * node.right_or_count as Real;
                continue;
            }

            sah += prob * 2.0;

            let area = node.aabb().surface_area();
            for child in [node.left_or_begin, node.right_or_count] {
                let child_prob = if area > 0.0 {
                    prob * self.nodes[child as usize].aabb().surface_area() / area
                } else {
                    prob
                };
                stack.push((child, child_prob));
            }
        }

        sah
    }

    /// An approximation of the memory usage (in bytes) for this struct plus
    /// the memory it allocates dynamically.
    pub fn total_memory_size(&self) -> usize {
        size_of::<Self>() + self.heap_memory_size()
    }

    /// An approximation of the memory dynamically-allocated by this struct.
    pub fn heap_memory_size(&self) -> usize {
        self.nodes.capacity() * size_of::<BvhNode>()
    }

    /// Appends a leaf and returns its index.
    #[inline]
    pub(super) fn push_leaf(&mut self, aabb: Aabb, begin: usize, count: usize, level: u32) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(BvhNode::leaf(aabb, begin as u32, count as u32, level));
        self.depth = self.depth.max(level);
        id
    }
}
