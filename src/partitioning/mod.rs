//! Spatial partitioning tools.

pub use self::bvh::{
    BinnedBuilder, BoxSet, BoxSetError, BvhNode, BvhPrimitiveSet, BvhTree, LEAF_NODE_SIZE_AVERAGE,
    LEAF_NODE_SIZE_DEFAULT, LEAF_NODE_SIZE_SINGLE, LEAF_NODE_SIZE_SMALL, MAX_TREE_DEPTH,
    NUM_BINS_BEST, NUM_BINS_OPTIMAL,
};

mod bvh;
