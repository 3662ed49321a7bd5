use super::{BinnedBuilder, BvhTree, NUM_BINS_OPTIMAL};
use crate::bounding_volume::Aabb;
use crate::math::{Point, DIM};

/// A collection of primitives a BVH can be built upon.
///
/// Primitives are identified by their index in `0..self.len()`.
pub trait BvhPrimitiveSet {
    /// The number of primitives of this set.
    fn len(&self) -> usize;

    /// Does this set not contain any primitive?
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The AABB of the `i`-th primitive.
    fn aabb(&self, i: usize) -> Aabb;

    /// The point used to dispatch the `i`-th primitive into the bins of the SAH cost model.
    ///
    /// Defaults to the center of its AABB.
    fn center(&self, i: usize) -> Point {
        self.aabb(i).center()
    }
}

impl BvhPrimitiveSet for [Aabb] {
    #[inline]
    fn len(&self) -> usize {
        <[Aabb]>::len(self)
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb {
        self[i]
    }
}

/// Errors detected when validating the boxes of a [`BoxSet`].
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoxSetError {
    /// One of the coordinates of the box is NaN or infinite.
    #[error("the AABB of primitive {index} has a non-finite coordinate")]
    NonFiniteAabb {
        /// Index of the faulty primitive.
        index: usize,
    },
    /// The box has a min coordinate greater than its max coordinate.
    #[error("the AABB of primitive {index} is inverted along axis {axis}")]
    InvertedAabb {
        /// Index of the faulty primitive.
        index: usize,
        /// The axis along which `mins[axis] > maxs[axis]`.
        axis: usize,
    },
}

impl BoxSetError {
    fn check(index: usize, aabb: &Aabb) -> Result<(), Self> {
        if !aabb.mins.iter().chain(aabb.maxs.iter()).all(|e| e.is_finite()) {
            return Err(Self::NonFiniteAabb { index });
        }

        match (0..DIM).find(|&axis| aabb.mins[axis] > aabb.maxs[axis]) {
            Some(axis) => Err(Self::InvertedAabb { index, axis }),
            None => Ok(()),
        }
    }
}

/// A set of elements with axis-aligned bounding boxes, and the BVH built on top of them.
///
/// Elements are added with [`BoxSet::add`], then [`BoxSet::build`] computes the tree with the
/// builder given at construction. Each leaf of the tree references a contiguous range of
/// [`BoxSet::permutation`], which maps back to the insertion index of the elements.
///
/// # Example
///
/// ```rust
/// # #[cfg(all(feature = "dim3", feature = "f32"))] {
/// use occ_bvh3d::bounding_volume::Aabb;
/// use occ_bvh3d::partitioning::{BinnedBuilder, BoxSet};
/// use occ_bvh3d::na::{Point3, Vector3};
///
/// let mut set = BoxSet::new(BinnedBuilder::new(1, 32));
/// for i in 0..10 {
///     let mins = Point3::new(i as f32 * 2.0, 0.0, 0.0);
///     set.add(i, Aabb::new(mins, mins + Vector3::repeat(1.0)));
/// }
/// set.build();
///
/// let bvh = set.bvh();
/// assert!(bvh.len() > 1);
/// for leaf in bvh.leaves() {
///     assert_eq!(bvh.nb_primitives(leaf), 1);
///     assert_eq!(set.leaf_elements(leaf).count(), 1);
/// }
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BoxSet<E, const BINS: usize = NUM_BINS_OPTIMAL> {
    builder: BinnedBuilder<BINS>,
    elements: Vec<E>,
    aabbs: Vec<Aabb>,
    permutation: Vec<u32>,
    tree: BvhTree,
    dirty: bool,
}

impl<E> Default for BoxSet<E> {
    fn default() -> Self {
        Self::new(BinnedBuilder::default())
    }
}

impl<E, const BINS: usize> BoxSet<E, BINS> {
    /// An empty set, building its BVH with `builder`.
    pub fn new(builder: BinnedBuilder<BINS>) -> Self {
        Self {
            builder,
            elements: Vec::new(),
            aabbs: Vec::new(),
            permutation: Vec::new(),
            tree: BvhTree::new(),
            dirty: false,
        }
    }

    /// The builder used by [`Self::build`].
    pub fn builder(&self) -> &BinnedBuilder<BINS> {
        &self.builder
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.elements.reserve(additional);
        self.aabbs.reserve(additional);
    }

    /// Adds an element with its bounding box.
    ///
    /// The box isn’t validated: it must have finite coordinates with `aabb.mins <= aabb.maxs`
    /// on every axis, otherwise the tree built afterward is meaningless. See [`Self::try_add`]
    /// for a checked version.
    pub fn add(&mut self, element: E, aabb: Aabb) {
        self.elements.push(element);
        self.aabbs.push(aabb);
        self.dirty = true;
    }

    /// Adds an element with its bounding box, unless that box is not well-formed.
    pub fn try_add(&mut self, element: E, aabb: Aabb) -> Result<(), BoxSetError> {
        BoxSetError::check(self.aabbs.len(), &aabb)?;
        self.add(element, aabb);
        Ok(())
    }

    /// Checks that every box of this set is well-formed.
    ///
    /// Returns the error for the first faulty box.
    pub fn validate(&self) -> Result<(), BoxSetError> {
        self.aabbs
            .iter()
            .enumerate()
            .try_for_each(|(index, aabb)| BoxSetError::check(index, aabb))
    }

    /// Removes every element of this set, as well as its BVH.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.aabbs.clear();
        self.permutation.clear();
        self.tree.clear();
        self.dirty = false;
    }

    /// The number of elements of this set.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Does this set not contain any element?
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The `i`-th added element.
    pub fn element(&self, i: usize) -> &E {
        &self.elements[i]
    }

    /// The box of the `i`-th added element.
    pub fn aabb(&self, i: usize) -> &Aabb {
        &self.aabbs[i]
    }

    /// The center of the box of the `i`-th added element.
    pub fn center(&self, i: usize) -> Point {
        self.aabbs[i].center()
    }

    /// All the elements, in insertion order.
    pub fn elements(&self) -> &[E] {
        &self.elements
    }

    /// All the boxes, in insertion order.
    pub fn aabbs(&self) -> &[Aabb] {
        &self.aabbs
    }

    /// The box enclosing all the boxes of this set.
    ///
    /// Returns [`Aabb::new_invalid`] if this set is empty.
    pub fn bounding_aabb(&self) -> Aabb {
        Aabb::from_aabbs(&self.aabbs)
    }

    /// Have elements been added or removed since the last call to [`Self::build`]?
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Builds the BVH of all the elements of this set, replacing the previous one.
    pub fn build(&mut self) {
        self.builder.build(&*self.aabbs, &mut self.tree, &mut self.permutation);
        self.dirty = false;
    }

    /// The BVH computed by the last call to [`Self::build`].
    ///
    /// This is an empty tree if [`Self::build`] was never called.
    pub fn bvh(&self) -> &BvhTree {
        &self.tree
    }

    /// The element indices grouped by leaf, as computed by the last call to [`Self::build`].
    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    /// The insertion indices of the elements of the leaf at index `node` of [`Self::bvh`].
    ///
    /// Returns an empty slice if `node` is an inner node.
    pub fn leaf_primitives(&self, node: usize) -> &[u32] {
        match self.tree.primitive_range(node) {
            Some(range) => &self.permutation[range],
            None => &[],
        }
    }

    /// The elements of the leaf at index `node` of [`Self::bvh`].
    pub fn leaf_elements(&self, node: usize) -> impl Iterator<Item = &E> + '_ {
        self.leaf_primitives(node)
            .iter()
            .map(|i| &self.elements[*i as usize])
    }

    /// Panics if the BVH of this set isn’t well-formed.
    ///
    /// See [`BvhTree::assert_well_formed`].
    pub fn assert_well_formed(&self) {
        self.tree.assert_well_formed(&self.aabbs, &self.permutation);
    }
}

impl<E, const BINS: usize> BvhPrimitiveSet for BoxSet<E, BINS> {
    #[inline]
    fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    fn aabb(&self, i: usize) -> Aabb {
        self.aabbs[i]
    }
}
