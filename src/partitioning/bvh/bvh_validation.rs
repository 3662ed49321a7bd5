use super::BvhTree;
use crate::bounding_volume::Aabb;

impl BvhTree {
    /// Counts the number of leaves that can be reached from the node at index `id`.
    ///
    /// This is mostly a utility for debugging.
    pub fn reachable_leaf_count(&self, id: usize) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        match self.nodes[id].children() {
            Some([left, right]) => {
                self.reachable_leaf_count(left) + self.reachable_leaf_count(right)
            }
            None => 1,
        }
    }

    /// Panics if the tree isn’t well-formed.
    ///
    /// `aabbs` are the boxes of the primitives the tree was built on, and `permutation` is the
    /// primitive permutation computed alongside it. The tree is well-formed if:
    /// - every node is reachable exactly once from the root at index 0, and children always
    ///   have greater indices than their parent, at the next level.
    /// - the box of an inner node is the union of its children’s boxes, and the box of a leaf is
    ///   the union of its primitives’ boxes.
    /// - `permutation` is a permutation of `0..aabbs.len()` and the leaves partition it into
    ///   disjoint contiguous ranges.
    /// - [`Self::depth`] is the maximum level of the leaves.
    pub fn assert_well_formed(&self, aabbs: &[Aabb], permutation: &[u32]) {
        assert_eq!(permutation.len(), aabbs.len());

        let mut seen_primitive = vec![false; aabbs.len()];
        for i in permutation {
            let i = *i as usize;
            assert!(i < aabbs.len(), "Primitive index {} out of bounds.", i);
            assert!(!seen_primitive[i], "Primitive {} referenced twice.", i);
            seen_primitive[i] = true;
        }

        if self.nodes.is_empty() {
            assert!(aabbs.is_empty(), "Empty tree over a non-empty set.");
            assert_eq!(self.depth, 0);
            return;
        }

        assert_eq!(self.nodes[0].level, 0);

        let mut visited = vec![false; self.nodes.len()];
        let mut covered = vec![false; permutation.len()];
        let mut max_level = 0;
        self.assert_well_formed_recurse(
            0,
            aabbs,
            permutation,
            &mut visited,
            &mut covered,
            &mut max_level,
        );

        assert!(visited.iter().all(|v| *v), "Some nodes are unreachable from the root.");
        assert!(covered.iter().all(|c| *c), "Some primitives aren’t referenced by any leaf.");
        assert_eq!(self.depth, max_level);
    }

    fn assert_well_formed_recurse(
        &self,
        id: usize,
        aabbs: &[Aabb],
        permutation: &[u32],
        visited: &mut [bool],
        covered: &mut [bool],
        max_level: &mut u32,
    ) {
        if visited[id] {
            panic!("Detected loop. Node {} visited twice.", id);
        }
        visited[id] = true;

        let node = &self.nodes[id];

        match (node.children(), node.primitive_range()) {
            (Some([left, right]), None) => {
                for child in [left, right] {
                    assert!(child > id, "Child {} stored before its parent {}.", child, id);
                    assert_eq!(self.nodes[child].level, node.level + 1);
                    self.assert_well_formed_recurse(
                        child,
                        aabbs,
                        permutation,
                        visited,
                        covered,
                        max_level,
                    );
                }

                let children_aabb =
                    Aabb::from_aabbs([&self.nodes[left].aabb(), &self.nodes[right].aabb()]);
                assert_eq!(node.aabb(), children_aabb);
            }
            (None, Some(range)) => {
                assert!(!range.is_empty(), "Empty leaf {}.", id);
                assert!(range.end <= permutation.len());

                for k in range.clone() {
                    assert!(!covered[k], "Permutation entry {} in two leaves.", k);
                    covered[k] = true;
                }

                let leaf_aabb =
                    Aabb::from_aabbs(permutation[range].iter().map(|i| &aabbs[*i as usize]));
                assert_eq!(node.aabb(), leaf_aabb);
                *max_level = (*max_level).max(node.level);
            }
            _ => unreachable!(),
        }
    }
}
