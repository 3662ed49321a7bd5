use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Point, Real, DIM};

/// Centroid extents below this value are considered degenerate along that axis.
pub(super) const NODE_MIN_SIZE: Real = 1.0e-5;

/// A bin (or a set of merged bins) of the SAH cost model.
#[derive(Copy, Clone, Debug)]
struct BvhBin {
    aabb: Aabb,
    count: u32,
}

impl Default for BvhBin {
    fn default() -> Self {
        Self {
            aabb: Aabb::new_invalid(),
            count: 0,
        }
    }
}

impl BvhBin {
    #[inline]
    fn merge(&mut self, other: &Self) {
        self.aabb.merge(&other.aabb);
        self.count += other.count;
    }

    #[inline]
    fn cost(&self) -> Real {
        self.aabb.surface_area() * self.count as Real
    }
}

/// Maps a centroid coordinate along one axis to one of `BINS` equal-width bins.
#[derive(Copy, Clone, Debug)]
pub(super) struct BinMapping<const BINS: usize> {
    axis: usize,
    min: Real,
    inv_step: Real,
}

impl<const BINS: usize> BinMapping<BINS> {
    /// The mapping for the centroid range `[min, max]` along `axis`, or `None` if that range
    /// is too thin to be binned.
    #[inline]
    fn new(axis: usize, min: Real, max: Real) -> Option<Self> {
        let extent = max - min;
        (extent > NODE_MIN_SIZE).then(|| Self {
            axis,
            min,
            inv_step: BINS as Real / extent,
        })
    }

    /// The bin containing `center`.
    #[inline]
    pub fn bin_id(&self, center: &Point) -> usize {
        // Negative (and NaN) values saturate to 0 on cast.
        let id = ((center[self.axis] - self.min) * self.inv_step) as usize;
        id.min(BINS - 1)
    }
}

/// The best split plane found by [`find_best_split`].
#[derive(Copy, Clone, Debug)]
pub(super) struct BinnedSplit<const BINS: usize> {
    /// The axis and bins layout of the split.
    pub mapping: BinMapping<BINS>,
    /// Primitives with a bin id `<= plane` go to the left child.
    pub plane: usize,
    pub cost: Real,
    pub left_aabb: Aabb,
    pub right_aabb: Aabb,
    pub left_count: usize,
}

impl<const BINS: usize> BinnedSplit<BINS> {
    /// Does the primitive with the given centroid belong to the left side of the split?
    #[inline]
    pub fn is_left(&self, center: &Point) -> bool {
        self.mapping.bin_id(center) <= self.plane
    }
}

/// Finds the split plane minimizing the surface-area heuristic over the primitives `indices`.
///
/// For each candidate axis, primitive centroids are dispatched into `BINS` equal-width bins
/// spanning `centroid_aabb`, and the `BINS - 1` planes separating consecutive bins are
/// evaluated. Planes leaving one side empty are ignored. Ties are resolved in favor of the
/// lowest axis, then the lowest plane.
///
/// Returns `None` if no plane can separate the primitives, which happens if all their
/// centroids are (almost) equal.
pub(super) fn find_best_split<const BINS: usize>(
    aabbs: &[Aabb],
    centers: &[Point],
    indices: &[u32],
    centroid_aabb: &Aabb,
    main_axis_only: bool,
) -> Option<BinnedSplit<BINS>> {
    let extents = centroid_aabb.extents();
    let axes = if main_axis_only {
        let main_axis = extents.imax();
        main_axis..main_axis + 1
    } else {
        0..DIM
    };

    let mut best: Option<BinnedSplit<BINS>> = None;

    for axis in axes {
        let Some(mapping) =
            BinMapping::<BINS>::new(axis, centroid_aabb.mins[axis], centroid_aabb.maxs[axis])
        else {
            continue;
        };

        let mut bins = [BvhBin::default(); BINS];
        for &i in indices {
            let bin = &mut bins[mapping.bin_id(&centers[i as usize])];
            bin.aabb.merge(&aabbs[i as usize]);
            bin.count += 1;
        }

        // right_merges[k] accumulates the bins k..BINS.
        let mut right_merges = bins;
        let mut right_acc = bins[BINS - 1];
        for k in (1..BINS - 1).rev() {
            right_acc.merge(&bins[k]);
            right_merges[k] = right_acc;
        }

        let mut left_acc = BvhBin::default();
        for plane in 0..BINS - 1 {
            left_acc.merge(&bins[plane]);
            let right = &right_merges[plane + 1];

            if left_acc.count == 0 || right.count == 0 {
                continue;
            }

            let cost = left_acc.cost() + right.cost();
            if best.as_ref().map_or(true, |best| cost < best.cost) {
                best = Some(BinnedSplit {
                    mapping,
                    plane,
                    cost,
                    left_aabb: left_acc.aabb,
                    right_aabb: right.aabb,
                    left_count: left_acc.count as usize,
                });
            }
        }
    }

    best
}

/// Reorders `indices` so that the primitives on the left of `split` come first.
///
/// Returns the number of primitives on the left side.
pub(super) fn partition_indices<const BINS: usize>(
    indices: &mut [u32],
    centers: &[Point],
    split: &BinnedSplit<BINS>,
) -> usize {
    let mut mid = 0;
    for k in 0..indices.len() {
        if split.is_left(&centers[indices[k] as usize]) {
            indices.swap(mid, k);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Vector;

    fn unit_boxes_along_x(count: usize) -> (Vec<Aabb>, Vec<Point>) {
        let aabbs: Vec<_> = (0..count)
            .map(|i| {
                let mins = Point::from(Vector::x() * (i as Real * 2.0));
                Aabb::new(mins, mins + Vector::repeat(1.0))
            })
            .collect();
        let centers = aabbs.iter().map(Aabb::center).collect();
        (aabbs, centers)
    }

    #[test]
    fn bin_ids_are_clamped() {
        let mapping = BinMapping::<8>::new(0, 0.0, 1.0).unwrap();
        assert_eq!(mapping.bin_id(&Point::origin()), 0);
        assert_eq!(mapping.bin_id(&Point::from(Vector::x())), 7);
        assert_eq!(mapping.bin_id(&Point::from(Vector::x() * -5.0)), 0);
        assert_eq!(mapping.bin_id(&Point::from(Vector::x() * 5.0)), 7);
        assert!(BinMapping::<8>::new(0, 1.0, 1.0).is_none());
    }

    #[test]
    fn split_separates_two_clusters() {
        let (mut aabbs, _) = unit_boxes_along_x(3);
        aabbs.push(Aabb::new(
            Point::from(Vector::x() * 100.0),
            Point::from(Vector::x() * 101.0 + Vector::repeat(1.0)),
        ));
        let centers: Vec<_> = aabbs.iter().map(Aabb::center).collect();
        let mut indices = vec![3, 0, 2, 1];
        let centroid_aabb = Aabb::from_points(centers.iter().copied());

        let split =
            find_best_split::<32>(&aabbs, &centers, &indices, &centroid_aabb, false).unwrap();
        assert_eq!(split.mapping.axis, 0);
        assert_eq!(split.left_count, 3);

        let mid = partition_indices(&mut indices, &centers, &split);
        assert_eq!(mid, 3);
        assert!(indices[..mid].iter().all(|&i| i != 3));
        assert_eq!(indices[mid], 3);
        assert_eq!(split.right_aabb, aabbs[3]);
        assert_eq!(split.left_aabb, Aabb::from_aabbs(&aabbs[..3]));
    }

    #[test]
    fn coincident_centroids_cannot_be_split() {
        let aabbs = vec![
            Aabb::from_half_extents(Point::origin(), Vector::repeat(1.0)),
            Aabb::from_half_extents(Point::origin(), Vector::repeat(2.0)),
            Aabb::from_half_extents(Point::origin(), Vector::repeat(3.0)),
        ];
        let centers: Vec<_> = aabbs.iter().map(Aabb::center).collect();
        let centroid_aabb = Aabb::from_points(centers.iter().copied());
        let split = find_best_split::<32>(&aabbs, &centers, &[0, 1, 2], &centroid_aabb, false);
        assert!(split.is_none());
    }

    #[test]
    fn collinear_segments_split_in_the_middle() {
        let aabbs: Vec<_> = (0..10)
            .map(|i| {
                let mins = Point::from(Vector::x() * (i as Real * 2.0));
                Aabb::new(mins, mins + Vector::x())
            })
            .collect();
        let centers: Vec<_> = aabbs.iter().map(Aabb::center).collect();
        let indices: Vec<u32> = (0..10).collect();
        let centroid_aabb = Aabb::from_points(centers.iter().copied());

        let split =
            find_best_split::<32>(&aabbs, &centers, &indices, &centroid_aabb, false).unwrap();
        assert_eq!(split.mapping.axis, 0);
        assert_eq!(split.left_count, 5);
        assert!(split.cost > 0.0);
    }

    #[test]
    fn main_axis_restricts_the_search() {
        // Centroids spread along y far more than along x.
        let aabbs: Vec<_> = (0..4)
            .map(|i| {
                let coords = Vector::x() * (i % 2) as Real + Vector::y() * (i * 10) as Real;
                Aabb::from_half_extents(coords.into(), Vector::repeat(0.25))
            })
            .collect();
        let centers: Vec<_> = aabbs.iter().map(Aabb::center).collect();
        let centroid_aabb = Aabb::from_points(centers.iter().copied());
        let split =
            find_best_split::<16>(&aabbs, &centers, &[0, 1, 2, 3], &centroid_aabb, true).unwrap();
        assert_eq!(split.mapping.axis, 1);
    }
}
