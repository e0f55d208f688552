//! Connected-components coloring of the passability bitmap.
//!
//! Components are 4-connected within each Z-slice; slices never share ids.
//! Vertical continuity of labels is carried by the label payload (pins), so
//! the colorer's only contract is that ids are dense over `[0, N)` and
//! numbered in the order a `(z, y, x)` scan first meets each component.
//! Every payload format indexes its tables by exactly that ordering.

use alloc::vec;
use alloc::vec::Vec;

/// A flat union-find over `u32` ids with path halving and union by rank.
pub(crate) struct DisjointSet {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub(crate) fn new() -> Self {
        Self {
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }

    /// Add a fresh singleton set and return its id.
    pub(crate) fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    pub(crate) fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    pub(crate) fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }

        match self.rank[ra as usize].cmp(&self.rank[rb as usize]) {
            core::cmp::Ordering::Less => self.parent[ra as usize] = rb,
            core::cmp::Ordering::Greater => self.parent[rb as usize] = ra,
            core::cmp::Ordering::Equal => {
                self.parent[rb as usize] = ra;
                self.rank[ra as usize] += 1;
            }
        }
    }
}

/// Color the voxel grid under the passability bitmap.
///
/// Two passes: a scan that joins each voxel to its -x and -y neighbors where
/// the corresponding edge bits permit, then a relabeling that densifies the
/// equivalence classes into `[0, N)` in first-visit order. Returns the id
/// volume and N.
pub(crate) fn color_connectivity_graph(
    edges: &[u8],
    sx: usize,
    sy: usize,
    sz: usize,
) -> (Vec<u32>, u32) {
    let sxy = sx * sy;
    let voxels = sxy * sz;

    let mut labels = vec![0_u32; voxels];
    let mut equivalences = DisjointSet::new();

    for z in 0..sz {
        for y in 0..sy {
            for x in 0..sx {
                let loc = x + sx * y + sxy * z;
                let passable = edges[loc];

                let left = x > 0 && passable & 0b0010 != 0;
                let up = y > 0 && passable & 0b1000 != 0;

                if left {
                    labels[loc] = labels[loc - 1];
                    if up {
                        equivalences.union(labels[loc], labels[loc - sx]);
                    }
                } else if up {
                    labels[loc] = labels[loc - sx];
                } else {
                    labels[loc] = equivalences.make_set();
                }
            }
        }
    }

    // Densify in scan order.
    let provisional = equivalences.parent.len();
    let mut renumbering = vec![u32::MAX; provisional];
    let mut next = 0_u32;
    for label in labels.iter_mut() {
        let root = equivalences.find(*label);
        if renumbering[root as usize] == u32::MAX {
            renumbering[root as usize] = next;
            next += 1;
        }
        *label = renumbering[root as usize];
    }

    (labels, next)
}

#[cfg(test)]
mod tests {
    use super::{DisjointSet, color_connectivity_graph};
    use alloc::vec;

    #[test]
    fn union_find_merges_classes() {
        let mut ds = DisjointSet::new();
        for _ in 0..5 {
            ds.make_set();
        }
        ds.union(0, 2);
        ds.union(3, 4);
        ds.union(2, 3);
        assert_eq!(ds.find(0), ds.find(4));
        assert_ne!(ds.find(1), ds.find(0));
    }

    #[test]
    fn fully_passable_slice_is_one_component() {
        let edges = vec![0b1111_u8; 6];
        let (labels, n) = color_connectivity_graph(&edges, 3, 2, 1);
        assert_eq!(n, 1);
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn fully_blocked_slice_isolates_every_voxel() {
        let edges = vec![0_u8; 4];
        let (labels, n) = color_connectivity_graph(&edges, 2, 2, 1);
        assert_eq!(n, 4);
        assert_eq!(labels, vec![0, 1, 2, 3]);
    }

    #[test]
    fn vertical_crack_splits_columns() {
        // 2x2, crossing blocked between x = 0 and x = 1 in both rows.
        let edges = vec![0b1110, 0b1101, 0b1110, 0b1101];
        let (labels, n) = color_connectivity_graph(&edges, 2, 2, 1);
        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn ids_number_in_first_visit_order() {
        // 3x2 with the center column walled off: the right region is first
        // met after the center, at (2, 0).
        let edges = vec![
            0b1110, 0b1100, 0b1101, // row 0
            0b1110, 0b1100, 0b1101, // row 1
        ];
        let (labels, n) = color_connectivity_graph(&edges, 3, 2, 1);
        assert_eq!(n, 3);
        assert_eq!(labels, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn u_shape_merges_across_the_scan() {
        // 3x2: the top center voxel is cut off from its row neighbors but
        // the bottom row joins everything; the provisional ids merge.
        let edges = vec![
            0b1110, 0b1100, 0b1101, // row 0: center blocked left and right
            0b1111, 0b1111, 0b1111, // row 1: fully open
        ];
        let (labels, n) = color_connectivity_graph(&edges, 3, 2, 1);
        assert_eq!(n, 1);
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn slices_never_share_ids() {
        let edges = vec![0b1111_u8; 4];
        let (labels, n) = color_connectivity_graph(&edges, 2, 1, 2);
        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, 0, 1, 1]);
    }
}
