//! Axis Aligned Bounding Box.

use crate::bounding_volume::BoundingVolume;
use crate::math::{Point, Real, Vector};

/// An Axis-Aligned Bounding Box (AABB).
///
/// An AABB is defined by its minimum and maximum corners. Its edges are always parallel to the
/// coordinate axes, which makes unions and overlap tests a handful of comparisons.
///
/// # Structure
///
/// - **mins**: The point with the smallest coordinates on each axis.
/// - **maxs**: The point with the largest coordinates on each axis.
/// - **Invariant**: `mins[i] <= maxs[i]` on every axis `i`. A degenerate box with
///   `mins == maxs` is valid, an inverted one is not.
///
/// # Example
///
/// ```rust
/// # #[cfg(all(feature = "dim3", feature = "f32"))] {
/// use occ_bvh3d::bounding_volume::{Aabb, BoundingVolume};
/// use occ_bvh3d::na::Point3;
///
/// let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
/// let b = Aabb::new(Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 1.0, 1.0));
/// let union = a.merged(&b);
///
/// assert_eq!(union.mins, Point3::new(0.0, 0.0, 0.0));
/// assert_eq!(union.maxs, Point3::new(3.0, 1.0, 1.0));
/// assert!(union.contains(&a) && union.contains(&b));
/// # }
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Aabb {
    /// The point with minimum coordinates.
    pub mins: Point,
    /// The point with maximum coordinates.
    pub maxs: Point,
}

impl Aabb {
    /// Creates a new AABB from its minimum and maximum corners.
    #[inline]
    pub fn new(mins: Point, maxs: Point) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid AABB with inverted bounds.
    ///
    /// The resulting AABB has `mins` set to maximum values and `maxs` set to minimum values.
    /// Merging any valid AABB into it yields that valid AABB, so it is the neutral element of
    /// [`BoundingVolume::merge`].
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::MAX).into(),
            Vector::repeat(-Real::MAX).into(),
        )
    }

    /// Creates a new AABB from its center and half-extents.
    #[inline]
    pub fn from_half_extents(center: Point, half_extents: Vector) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Creates a new AABB that tightly encloses a set of points.
    ///
    /// Returns [`Aabb::new_invalid`] if the iterator is empty.
    pub fn from_points<I>(pts: I) -> Self
    where
        I: IntoIterator<Item = Point>,
    {
        let mut result = Self::new_invalid();
        for pt in pts {
            result.take_point(pt);
        }
        result
    }

    /// Creates the smallest AABB enclosing all the AABBs yielded by `aabbs`.
    ///
    /// Returns [`Aabb::new_invalid`] if the iterator is empty.
    pub fn from_aabbs<'a, I>(aabbs: I) -> Self
    where
        I: IntoIterator<Item = &'a Aabb>,
    {
        aabbs
            .into_iter()
            .fold(Self::new_invalid(), |acc, aabb| acc.merged(aabb))
    }

    /// Returns the center point of this AABB.
    #[inline]
    pub fn center(&self) -> Point {
        na::center(&self.mins, &self.maxs)
    }

    /// The extents of this `Aabb`.
    #[inline]
    pub fn extents(&self) -> Vector {
        self.maxs - self.mins
    }

    /// The surface measure used by the surface-area heuristic.
    ///
    /// In 3D this is the total surface area of the box. In 2D this is its perimeter, so that
    /// boxes that are flat along one axis still get a non-zero measure. Boxes without any area
    /// (segments, or points) are measured by the sum of their extents instead.
    #[inline]
    pub fn surface_area(&self) -> Real {
        let extents = self.extents();
        #[cfg(feature = "dim2")]
        let area = (extents.x + extents.y) * 2.0;
        #[cfg(feature = "dim3")]
        let area = (extents.x * (extents.y + extents.z) + extents.y * extents.z) * 2.0;

        if area < Real::EPSILON {
            extents.sum()
        } else {
            area
        }
    }

    /// Enlarges this `Aabb` so it also contains the point `pt`.
    #[inline]
    pub fn take_point(&mut self, pt: Point) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// Does this AABB contain the given point?
    #[inline]
    pub fn contains_local_point(&self, point: &Point) -> bool {
        na::partial_le(&self.mins, point) && na::partial_ge(&self.maxs, point)
    }
}

impl BoundingVolume for Aabb {
    #[inline]
    fn center(&self) -> Point {
        self.center()
    }

    #[inline]
    fn contains(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    #[inline]
    fn merge(&mut self, other: &Aabb) {
        self.mins = self.mins.inf(&other.mins);
        self.maxs = self.maxs.sup(&other.maxs);
    }
}

#[cfg(test)]
mod test {
    use super::Aabb;
    use crate::bounding_volume::BoundingVolume;
    use crate::math::{Point, Real, Vector};

    #[test]
    fn invalid_aabb_is_neutral_for_merge() {
        let aabb = Aabb::from_half_extents(Point::origin(), Vector::repeat(1.0));
        assert_eq!(Aabb::new_invalid().merged(&aabb), aabb);
        assert_eq!(aabb.merged(&Aabb::new_invalid()), aabb);
    }

    #[test]
    fn surface_area_of_unit_box() {
        let aabb = Aabb::new(Point::origin(), Vector::repeat(1.0).into());
        #[cfg(feature = "dim2")]
        assert_relative_eq!(aabb.surface_area(), 4.0);
        #[cfg(feature = "dim3")]
        assert_relative_eq!(aabb.surface_area(), 6.0);
    }

    #[test]
    fn flat_box_has_positive_surface_area() {
        #[cfg(feature = "dim2")]
        let maxs = Point::new(3.0, 0.0);
        #[cfg(feature = "dim3")]
        let maxs = Point::new(3.0, 1.0, 0.0);

        let aabb = Aabb::new(Point::origin(), maxs);
        assert_relative_eq!(aabb.surface_area(), 6.0);
    }

    #[test]
    fn segments_are_measured_by_their_length() {
        let segment = Aabb::new(Point::origin(), Point::from(Vector::x() * 3.0));
        #[cfg(feature = "dim2")]
        assert_relative_eq!(segment.surface_area(), 6.0);
        #[cfg(feature = "dim3")]
        assert_relative_eq!(segment.surface_area(), 3.0);

        // Longer segments must cost more, even when they have no area.
        let longer = segment.merged(&Aabb::new(segment.maxs, Point::from(Vector::x() * 5.0)));
        assert!(longer.surface_area() > segment.surface_area());

        let point = Aabb::new(Point::origin(), Point::origin());
        assert_eq!(point.surface_area(), 0.0);
    }

    #[test]
    fn nested_boxes_are_contained() {
        let inner = Aabb::from_half_extents(Point::origin(), Vector::repeat(1.0));
        let outer = Aabb::from_half_extents(Point::from(Vector::x()), Vector::repeat(3.0));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(inner.contains(&inner));
    }

    #[test]
    fn from_points_encloses_all_points() {
        let pts = [
            Point::from(Vector::x() * 2.0),
            Point::from(Vector::y() * -1.0),
            Point::origin(),
        ];
        let aabb = Aabb::from_points(pts);
        assert!(pts.iter().all(|pt| aabb.contains_local_point(pt)));
        assert_eq!(aabb.mins.x, 0.0);
        assert_eq!(aabb.maxs.x, 2.0);
        assert_eq!(aabb.mins.y, -1.0);
        assert_eq!(aabb.center().x, 1.0 as Real);
    }
}
