pub use bvh_binned_build::{
    BinnedBuilder, LEAF_NODE_SIZE_AVERAGE, LEAF_NODE_SIZE_DEFAULT, LEAF_NODE_SIZE_SINGLE,
    LEAF_NODE_SIZE_SMALL, MAX_TREE_DEPTH, NUM_BINS_BEST, NUM_BINS_OPTIMAL,
};
pub use bvh_box_set::{BoxSet, BoxSetError, BvhPrimitiveSet};
pub use bvh_tree::{BvhNode, BvhTree};

mod bvh_binned_build;
mod bvh_binned_split;
mod bvh_box_set;
mod bvh_tree;
mod bvh_validation;
