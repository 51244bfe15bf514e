//! Octree construction from Hilbert-sorted point sets
//!
//! Points sorted along the Hilbert curve visit every octant subtree as one
//! contiguous run, so the octree can be emitted in a single streaming pass:
//! a stack of partially filled nodes, one per level, is flushed whenever the
//! Morton keys of two adjacent points diverge above the current branch.

use log::{debug, info};
use rayon::slice::ParallelSliceMut;

use crate::core::types::Result;
use crate::core::Error;
use crate::math::hilbert::{hilbert3d, hilbert_cmp};
use crate::math::morton::morton3d;
use crate::voxel::octree::{Octree, OctreeNode, EMPTY, LEAF};
use crate::voxel::point::Point;

/// Child slot for the octant digit of `key` at digit position `pos`
/// (0 = topmost of the 20 levels).
///
/// Morton digits carry x in bit 0 and z in bit 2; node slots use the
/// renderer's convention (x in bit 4, z in bit 1), so the digit is
/// bit-reversed.
#[inline]
fn child_slot(key: u64, pos: usize) -> usize {
    let d = ((key >> (3 * (19 - pos))) & 7) as usize;
    ((d & 1) << 2) | (d & 2) | (d >> 2)
}

/// Sort points along the 3D Hilbert curve.
///
/// The sort is stable, so points in the same leaf cell keep their input
/// order.
pub fn sort_points(points: &mut [Point]) {
    points.par_sort_by(|a, b| hilbert_cmp(a.coords(), b.coords()));
}

/// Streaming emission state: one partially built node per level.
struct Emitter {
    nodes: Vec<OctreeNode>,
    /// Next node index to assign, per prefix length
    next: [u32; 20],
    open_index: [u32; 20],
    open_node: [OctreeNode; 20],
    /// Prefix length of the data root (the level fed by the point stream)
    data_level: usize,
    root_color: u32,
}

impl Emitter {
    fn open(&mut self, q: usize) {
        self.open_index[q] = self.next[q];
        self.next[q] += 1;
        self.open_node[q] = OctreeNode::unpopulated();
    }

    /// Finish the node at level `q`: write its record and register it (with
    /// its average color) in the parent's slot for `key`.
    fn flush(&mut self, q: usize, key: u64) {
        let record = self.open_node[q];
        let index = self.open_index[q];
        let color = record.average_color();
        self.nodes[index as usize] = record;
        if q > self.data_level {
            let slot = child_slot(key, q - 1);
            self.open_node[q - 1].child[slot] = index;
            self.open_node[q - 1].color[slot] = color;
        } else {
            self.root_color = color;
        }
    }
}

/// Builds `.oct` node pools from point sets.
///
/// `repeat_mask` and `repeat_depth` add replication layers above the data
/// root: each clear bit of the mask (4 = x, 2 = y, 1 = z) names an axis the
/// scene is cloned along, `repeat_depth` times.
pub struct OctreeBuilder {
    repeat_mask: u32,
    repeat_depth: usize,
}

impl OctreeBuilder {
    pub fn new() -> Self {
        Self {
            repeat_mask: 7,
            repeat_depth: 0,
        }
    }

    pub fn with_repeat(repeat_mask: u32, repeat_depth: u32) -> Result<Self> {
        if repeat_mask > 7 {
            return Err(Error::InputParse(format!(
                "repeat mask {} not in 0..8",
                repeat_mask
            )));
        }
        if repeat_depth > 15 {
            return Err(Error::InputParse(format!(
                "repeat depth {} not in 0..16",
                repeat_depth
            )));
        }
        Ok(Self {
            repeat_mask,
            repeat_depth: repeat_depth as usize,
        })
    }

    /// Build the octree, sorting the points first if they are not already in
    /// Hilbert order.
    pub fn build(&self, points: &mut [Point]) -> Result<Octree> {
        if points.is_empty() {
            return Err(Error::Invariant("empty point set".into()));
        }

        self.ensure_sorted(points);

        // Census: how many nodes open at each of the 20 levels, and how many
        // levels the data actually spans.
        let mut nodecount = [0u64; 20];
        let mut maxnode: u64 = 0;
        let mut prev: Option<u64> = None;
        for p in points.iter() {
            let cur = morton3d(p.x, p.y, p.z);
            match prev {
                None => {
                    for c in nodecount.iter_mut() {
                        *c += 1;
                    }
                }
                Some(old) => {
                    let diff = cur ^ old;
                    if diff != 0 {
                        let jmax = ((63 - diff.leading_zeros()) / 3) as usize;
                        for j in 0..=jmax {
                            nodecount[19 - j] += 1;
                        }
                    }
                }
            }
            maxnode = maxnode.max(cur);
            prev = Some(cur);
        }

        let mut layers = 0usize;
        while (maxnode >> (3 * layers)) != 0 {
            layers += 1;
        }
        // A cloud collapsed onto the origin cell still needs one data layer
        // to hold its leaf.
        let layers = layers.max(1);

        let nonlayers = 19i64 - layers as i64 - self.repeat_depth as i64;
        info!(
            "1 leaf layer + {} data layers + {} repetition layers (maxnode {:#x})",
            layers, self.repeat_depth, maxnode
        );
        if nonlayers < 0 {
            return Err(Error::Invariant(format!(
                "{} data layers + {} repetition layers exceed the 20-level grid",
                layers, self.repeat_depth
            )));
        }
        let nonlayers = nonlayers as usize;
        for (i, &c) in nodecount.iter().enumerate().skip(nonlayers) {
            if i < 19 {
                debug!("at layer {:2}: {:8} nodes", i - nonlayers, c);
            } else {
                debug!("at layer {:2}: {:8} leaves", i - nonlayers, c);
            }
        }

        // Node indices are laid out top-down by level: the repetition chain
        // first, then each data level as one contiguous block.
        let data_level = nonlayers + self.repeat_depth + 1;
        let mut base = [0u32; 21];
        base[data_level] = self.repeat_depth as u32;
        for q in data_level..19 {
            base[q + 1] = base[q] + nodecount[q - 1] as u32;
        }
        let total = base[19] + nodecount[18] as u32;
        info!(
            "creating octree with {} nodes of {}B each",
            total,
            std::mem::size_of::<OctreeNode>()
        );

        let mut next = [0u32; 20];
        next.copy_from_slice(&base[..20]);
        let mut em = Emitter {
            nodes: vec![OctreeNode::unpopulated(); total as usize],
            next,
            open_index: [0; 20],
            open_node: [OctreeNode::unpopulated(); 20],
            data_level,
            root_color: EMPTY,
        };

        let mut prev_key: Option<u64> = None;
        for p in points.iter() {
            let key = morton3d(p.x, p.y, p.z);
            match prev_key {
                None => {
                    for q in data_level..=19 {
                        em.open(q);
                    }
                }
                Some(old) if old == key => {}
                Some(old) => {
                    let diff = key ^ old;
                    let top = 19 - ((63 - diff.leading_zeros()) / 3) as usize;
                    for q in ((top + 1)..=19).rev() {
                        em.flush(q, old);
                    }
                    for q in (top + 1)..=19 {
                        em.open(q);
                    }
                }
            }
            // Leaf layer: the first point in a cell keeps the slot (the sort
            // is stable).
            let slot = child_slot(key, 19);
            if !em.open_node[19].occupied(slot) {
                em.open_node[19].child[slot] = LEAF;
                em.open_node[19].color[slot] = p.color & !EMPTY;
            }
            prev_key = Some(key);
        }
        if let Some(last) = prev_key {
            for q in (data_level..=19).rev() {
                em.flush(q, last);
            }
        }

        // Every level must have consumed exactly its census block.
        for q in data_level..=19 {
            let expect = if q < 19 { base[q + 1] } else { total };
            if em.next[q] != expect {
                return Err(Error::Invariant(format!(
                    "node census mismatch at level {}: {} != {}",
                    q, em.next[q], expect
                )));
            }
        }

        // Repetition chain: one node per layer, each slot allowed by the
        // mask referencing the single node below it.
        let mut nodes = em.nodes;
        let mut below_color = em.root_color;
        for r in (0..self.repeat_depth).rev() {
            let mut node = OctreeNode::unpopulated();
            for d in 0..8usize {
                if d as u32 & self.repeat_mask == 0 {
                    node.child[d] = (r + 1) as u32;
                    node.color[d] = below_color;
                }
            }
            below_color = node.average_color();
            nodes[r] = node;
        }

        Octree::from_nodes(nodes)
    }

    /// Verify Hilbert order, sorting if the scan finds a violation.
    fn ensure_sorted(&self, points: &mut [Point]) {
        let mut old = 0u64;
        for (i, p) in points.iter().enumerate() {
            let cur = hilbert3d(p.x, p.y, p.z);
            if old > cur {
                info!("point {} should precede its predecessor; sorting", i);
                sort_points(points);
                return;
            }
            old = cur;
        }
    }
}

impl Default for OctreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::morton::COORD_MAX;

    #[test]
    fn test_child_slot_swizzle() {
        // Morton digit x=1 (bit 0) maps to slot bit 4, z to slot bit 1.
        assert_eq!(child_slot(morton3d(1, 0, 0), 19), 4);
        assert_eq!(child_slot(morton3d(0, 1, 0), 19), 2);
        assert_eq!(child_slot(morton3d(0, 0, 1), 19), 1);
        assert_eq!(child_slot(morton3d(1, 1, 1), 19), 7);
        // Position 18 reads the next digit up.
        assert_eq!(child_slot(morton3d(2, 0, 0), 18), 4);
    }

    #[test]
    fn test_eight_corner_points() {
        // Eight points filling one leaf cell's octants collapse to a single
        // stored node whose slots carry the input colors.
        let mut points = Vec::new();
        for d in 0..8u32 {
            let (x, y, z) = (d & 1, (d >> 1) & 1, (d >> 2) & 1);
            points.push(Point::new(x, y, z, 0x0101_0101 * d));
        }
        let octree = OctreeBuilder::new().build(&mut points).expect("build failed");
        assert_eq!(octree.node_count(), 1);
        let root = octree.root();
        for d in 0..8usize {
            assert!(root.occupied(d), "slot {} empty", d);
            assert_eq!(root.child[d], LEAF);
        }
        // Slot for morton digit d is its bit-reverse; check one corner:
        // point (1,0,0) lands in slot 4.
        assert_eq!(root.color[4], 0x0101_0101);
    }

    #[test]
    fn test_two_level_tree() {
        let mut points = vec![
            Point::new(0, 0, 0, 0x0000_0010),
            Point::new(3, 3, 3, 0x0000_0030),
        ];
        let octree = OctreeBuilder::new().build(&mut points).expect("build failed");
        assert_eq!(octree.node_count(), 3);

        let root = octree.root();
        assert_eq!(root.child[0], 1);
        assert_eq!(root.child[7], 2);
        for d in 1..7 {
            assert!(!root.occupied(d));
        }
        // Each child holds one leaf in its matching corner slot.
        assert_eq!(octree.nodes()[1].child[0], LEAF);
        assert_eq!(octree.nodes()[1].color[0], 0x0000_0010);
        assert_eq!(octree.nodes()[2].child[7], LEAF);
        assert_eq!(octree.nodes()[2].color[7], 0x0000_0030);
        // Parent slots carry the child averages.
        assert_eq!(root.color[0], 0x0000_0010);
        assert_eq!(root.color[7], 0x0000_0030);
    }

    #[test]
    fn test_parent_color_averages_children() {
        // Two leaves in the same parent cell: the root slot averages them.
        let mut points = vec![
            Point::new(0, 0, 0, 0x0000_0010),
            Point::new(1, 0, 0, 0x0000_0030),
            Point::new(2, 2, 2, 0x0000_0080),
        ];
        let octree = OctreeBuilder::new().build(&mut points).expect("build failed");
        assert_eq!(octree.node_count(), 3);
        let root = octree.root();
        assert_eq!(root.color[0], 0x0000_0020);
        assert_eq!(root.color[7], 0x0000_0080);
    }

    #[test]
    fn test_full_span_overflows_grid() {
        // Points spanning the whole 20-level grid leave no room for the
        // top anchor level.
        let mut points = vec![
            Point::new(0, 0, 0, 0),
            Point::new(COORD_MAX, COORD_MAX, COORD_MAX, 0),
        ];
        match OctreeBuilder::new().build(&mut points) {
            Err(Error::Invariant(_)) => {}
            other => panic!("expected Invariant, got {:?}", other.map(|o| o.node_count())),
        }
    }

    #[test]
    fn test_repeat_layers() {
        let mut points = vec![Point::new(0, 0, 0, 0x0000_0042)];
        let octree = OctreeBuilder::with_repeat(6, 1)
            .expect("bad repeat args")
            .build(&mut points)
            .expect("build failed");
        // One repetition node above the single data node.
        assert_eq!(octree.node_count(), 2);
        let root = octree.root();
        // Mask 6 clears only bit 1 (z): slots 0 and 1 reference the data
        // root, the rest stay empty.
        assert_eq!(root.child[0], 1);
        assert_eq!(root.child[1], 1);
        assert_eq!(root.color[0], 0x0000_0042);
        for d in 2..8 {
            assert!(!root.occupied(d));
        }
        assert_eq!(octree.nodes()[1].child[0], LEAF);
    }

    #[test]
    fn test_build_is_input_order_invariant() {
        let mut sorted = Vec::new();
        for d in 0..8u32 {
            let (x, y, z) = (d & 1, (d >> 1) & 1, (d >> 2) & 1);
            sorted.push(Point::new(x + 2, y, z + 4, 0x0101_0101 * d));
        }
        let mut shuffled = sorted.clone();
        shuffled.swap(0, 7);
        shuffled.swap(2, 5);
        shuffled.swap(1, 3);

        let a = OctreeBuilder::new().build(&mut sorted).expect("build failed");
        let b = OctreeBuilder::new().build(&mut shuffled).expect("build failed");
        assert_eq!(a.nodes(), b.nodes());
    }

    #[test]
    fn test_sorted_stream_matches_census() {
        // A larger mixed cloud must pass the internal census cross-check.
        let mut points = Vec::new();
        let mut state = 0x9E37_79B9u32;
        for _ in 0..500 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            let x = state & 0x3F;
            let y = (state >> 8) & 0x3F;
            let z = (state >> 16) & 0x3F;
            points.push(Point::new(x, y, z, state & 0x00FF_FFFF));
        }
        let octree = OctreeBuilder::new().build(&mut points).expect("build failed");
        assert!(octree.node_count() > 1);
        // Root must aggregate at least one occupied slot.
        assert!((0..8).any(|d| octree.root().occupied(d)));
    }
}
