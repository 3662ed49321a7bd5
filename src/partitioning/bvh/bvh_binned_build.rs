use super::bvh_binned_split::{find_best_split, partition_indices};
use super::{BvhPrimitiveSet, BvhTree};
use crate::bounding_volume::Aabb;
use crate::math::Point;

/// Maximum depth of the trees built with the default settings.
pub const MAX_TREE_DEPTH: usize = 32;
/// Leaf size producing one primitive per leaf.
pub const LEAF_NODE_SIZE_SINGLE: usize = 1;
/// Leaf size suited to primitives with a cheap intersection test.
pub const LEAF_NODE_SIZE_AVERAGE: usize = 4;
/// Default leaf size.
pub const LEAF_NODE_SIZE_DEFAULT: usize = 5;
/// Leaf size producing shallow trees with large leaves.
pub const LEAF_NODE_SIZE_SMALL: usize = 8;
/// Default number of bins of the SAH cost model.
pub const NUM_BINS_OPTIMAL: usize = 32;
/// Number of bins giving the best tree quality at a higher build cost.
pub const NUM_BINS_BEST: usize = 48;

static_assertions::const_assert!(NUM_BINS_OPTIMAL > 1);
static_assertions::const_assert!(NUM_BINS_BEST > 1);

/// Builds a [`BvhTree`] using the binned surface-area heuristic.
///
/// This implements the strategy from "On fast Construction of SAH-based Bounding Volume
/// Hierarchies", Ingo Wald. Each node is split by the plane minimizing the SAH cost among the
/// `BINS - 1` planes separating `BINS` equal-width bins of primitive centroids, along every axis.
///
/// A node becomes a leaf if it contains at most [`Self::leaf_node_size`] primitives, if it is
/// at depth [`Self::max_tree_depth`], or if its primitive centroids are all (almost) equal. The
/// two last cases may produce leaves larger than the configured leaf size.
///
/// The builder holds no state specific to a build: the same instance can be reused, and shared
/// between threads, to build any number of trees. Builds are deterministic: the same primitives
/// added in the same order always result in the same tree.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct BinnedBuilder<const BINS: usize = NUM_BINS_OPTIMAL> {
    leaf_node_size: usize,
    max_tree_depth: usize,
    main_axis_splits: bool,
    parallel: bool,
}

impl Default for BinnedBuilder {
    fn default() -> Self {
        Self::new(LEAF_NODE_SIZE_DEFAULT, MAX_TREE_DEPTH)
    }
}

impl BinnedBuilder {
    /// Creates a builder with [`NUM_BINS_OPTIMAL`] bins.
    ///
    /// Zero values of `leaf_node_size` and `max_tree_depth` are clamped to 1.
    pub fn new(leaf_node_size: usize, max_tree_depth: usize) -> Self {
        Self::with_bins(leaf_node_size, max_tree_depth)
    }
}

impl<const BINS: usize> BinnedBuilder<BINS> {
    const AT_LEAST_TWO_BINS: () = assert!(BINS > 1, "The binned builder needs at least 2 bins.");

    /// Creates a builder with `BINS` bins.
    ///
    /// Zero values of `leaf_node_size` and `max_tree_depth` are clamped to 1.
    pub fn with_bins(leaf_node_size: usize, max_tree_depth: usize) -> Self {
        let () = Self::AT_LEAST_TWO_BINS;

        Self {
            leaf_node_size: leaf_node_size.max(1),
            max_tree_depth: max_tree_depth.max(1),
            main_axis_splits: false,
            parallel: false,
        }
    }

    /// Restricts the split search to the axis along which the primitive centroids are the most
    /// spread out.
    ///
    /// This speeds up builds by a factor close to the dimension, at the cost of tree quality.
    pub fn with_main_axis_splits(mut self, enabled: bool) -> Self {
        self.main_axis_splits = enabled;
        self
    }

    /// Splits the nodes of the same level concurrently.
    ///
    /// This has no effect unless the `parallel` feature is enabled. The resulting tree is
    /// identical to the one of a sequential build.
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// The maximum number of primitives of a leaf, outside of degenerate cases.
    #[inline]
    pub fn leaf_node_size(&self) -> usize {
        self.leaf_node_size
    }

    /// The maximum depth of the built trees.
    #[inline]
    pub fn max_tree_depth(&self) -> usize {
        self.max_tree_depth
    }

    /// The number of bins of the SAH cost model.
    #[inline]
    pub fn num_bins(&self) -> usize {
        BINS
    }

    /// Is the split search restricted to the main axis?
    #[inline]
    pub fn main_axis_splits(&self) -> bool {
        self.main_axis_splits
    }

    /// Are the nodes of a level split concurrently?
    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Builds the tree of all the primitives of `set`.
    ///
    /// The previous content of `tree` and `permutation` is discarded. After the build,
    /// `permutation` is a permutation of `0..set.len()` such that each leaf of `tree` covers a
    /// contiguous range of it: the primitives of a leaf are
    /// `permutation[tree.primitive_range(leaf)]`.
    ///
    /// Nodes are created level by level, children of the same parent being adjacent with the
    /// left child first. Hence the children of a node always have greater indices than their
    /// parent.
    pub fn build<S: BvhPrimitiveSet + ?Sized>(
        &self,
        set: &S,
        tree: &mut BvhTree,
        permutation: &mut Vec<u32>,
    ) {
        tree.clear();
        permutation.clear();

        let len = set.len();
        if len == 0 {
            return;
        }

        let aabbs: Vec<Aabb> = (0..len).map(|i| set.aabb(i)).collect();
        let centers: Vec<Point> = (0..len).map(|i| set.center(i)).collect();
        permutation.extend(0..len as u32);

        let root = tree.push_leaf(Aabb::from_aabbs(&aabbs), 0, len, 0);
        let mut level = vec![BuildTask {
            node: root,
            begin: 0,
            end: len,
            depth: 0,
        }];
        let mut next_level = vec![];

        while !level.is_empty() {
            let steps = self.split_level(&level, &aabbs, &centers, permutation);

            for (task, step) in level.iter().zip(steps) {
                if let BuildStep::Split {
                    mid,
                    left_aabb,
                    right_aabb,
                } = step
                {
                    let depth = task.depth + 1;
                    let left = tree.push_leaf(left_aabb, task.begin, mid - task.begin, depth);
                    let right = tree.push_leaf(right_aabb, mid, task.end - mid, depth);
                    tree.nodes[task.node as usize].set_inner(left, right);

                    next_level.push(BuildTask {
                        node: left,
                        begin: task.begin,
                        end: mid,
                        depth,
                    });
                    next_level.push(BuildTask {
                        node: right,
                        begin: mid,
                        end: task.end,
                        depth,
                    });
                }
            }

            core::mem::swap(&mut level, &mut next_level);
            next_level.clear();
        }

        log::debug!(
            "Built BVH over {} primitives: {} nodes, {} leaves, depth {}.",
            len,
            tree.len(),
            tree.leaf_count(),
            tree.depth()
        );
    }

    /// Decides the fate of every node of a level, partitioning the primitives of the split ones.
    ///
    /// The tasks of a level cover disjoint ranges of `permutation`, sorted in increasing order.
    fn split_level(
        &self,
        level: &[BuildTask],
        aabbs: &[Aabb],
        centers: &[Point],
        permutation: &mut [u32],
    ) -> Vec<BuildStep> {
        let ranges = disjoint_ranges_mut(level, permutation);

        #[cfg(feature = "parallel")]
        if self.parallel && level.len() > 1 {
            use rayon::prelude::*;
            return level
                .par_iter()
                .zip(ranges.into_par_iter())
                .map(|(task, indices)| self.split_node(task, indices, aabbs, centers))
                .collect();
        }

        level
            .iter()
            .zip(ranges)
            .map(|(task, indices)| self.split_node(task, indices, aabbs, centers))
            .collect()
    }

    /// Either keeps the node as a leaf, or partitions its primitives `indices` in place.
    fn split_node(
        &self,
        task: &BuildTask,
        indices: &mut [u32],
        aabbs: &[Aabb],
        centers: &[Point],
    ) -> BuildStep {
        if indices.len() <= self.leaf_node_size {
            return BuildStep::Leaf;
        }

        if task.depth as usize >= self.max_tree_depth {
            log::trace!(
                "Maximum depth {} reached: leaf with {} primitives.",
                self.max_tree_depth,
                indices.len()
            );
            return BuildStep::Leaf;
        }

        let centroid_aabb = Aabb::from_points(indices.iter().map(|i| centers[*i as usize]));
        let Some(split) = find_best_split::<BINS>(
            aabbs,
            centers,
            indices,
            &centroid_aabb,
            self.main_axis_splits,
        ) else {
            return BuildStep::Leaf;
        };

        let mid = partition_indices(indices, centers, &split);
        debug_assert_eq!(mid, split.left_count);

        BuildStep::Split {
            mid: task.begin + mid,
            left_aabb: split.left_aabb,
            right_aabb: split.right_aabb,
        }
    }
}

/// A node waiting to be either split or kept as a leaf.
#[derive(Copy, Clone, Debug)]
struct BuildTask {
    node: u32,
    begin: usize,
    end: usize,
    depth: u32,
}

#[derive(Copy, Clone, Debug)]
enum BuildStep {
    Leaf,
    Split {
        /// Permutation index of the first primitive of the right child.
        mid: usize,
        left_aabb: Aabb,
        right_aabb: Aabb,
    },
}

/// Slices `permutation` into the (sorted, disjoint) ranges covered by `tasks`.
fn disjoint_ranges_mut<'a>(
    tasks: &[BuildTask],
    mut permutation: &'a mut [u32],
) -> Vec<&'a mut [u32]> {
    let mut offset = 0;
    let mut result = Vec::with_capacity(tasks.len());

    for task in tasks {
        let (_, rest) = core::mem::take(&mut permutation).split_at_mut(task.begin - offset);
        let (range, rest) = rest.split_at_mut(task.end - task.begin);
        result.push(range);
        permutation = rest;
        offset = task.end;
    }

    result
}
