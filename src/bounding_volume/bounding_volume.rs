use crate::math::Point;

/// A volume enclosing one or several primitives of a hierarchy.
///
/// Node volumes of a BVH are built bottom-up by merging the volumes of the primitives they
/// contain, so every implementor forms a monoid under [`BoundingVolume::merge`].
pub trait BoundingVolume: Copy {
    /// A point inside of this volume, used to sort primitives.
    fn center(&self) -> Point;

    /// Is `other` fully inside of this volume?
    fn contains(&self, other: &Self) -> bool;

    /// Enlarges this volume in-place so it also encloses `other`.
    fn merge(&mut self, other: &Self);

    /// The smallest volume enclosing both `self` and `other`.
    #[inline]
    fn merged(&self, other: &Self) -> Self {
        let mut result = *self;
        result.merge(other);
        result
    }
}
