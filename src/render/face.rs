//! Recursive octree-times-quadtree face traversal
//!
//! One cube face is drawn as four quadrants, each by a [`SubFace`] whose six
//! small constants fix the projection for the whole recursion: the quadrant
//! signs `dx`/`dy`, the octree child `c` nearest the eye, and which
//! child-index bit is the face's horizontal (`ax`), vertical (`ay`) and
//! depth (`az`) axis.
//!
//! All coordinates are integers. Child intervals are derived from the parent
//! by subtracting the grandparent interval and doubling, so the descent
//! needs no division and no floating point. Occlusion falls out of the
//! quadtree: children are visited strictly front to back and every painted
//! pixel clears its map byte, so covered subtrees terminate early.

use crate::render::quadtree::Quadtree;
use crate::render::SCENE_SIZE;
use crate::voxel::octree::{OctreeNode, LEAF};

const ONE: i32 = SCENE_SIZE;

/// Alpha byte forced onto every painted pixel. Stored colors keep the top
/// bit free as the empty flag; the display pass expects opaque output.
const OPAQUE: u32 = 0xFF00_0000;

/// Per-face traversal parameters from the cubemap assembly table
#[derive(Debug, Clone, Copy)]
pub struct FaceParams {
    /// Octree child nearest the eye for this face
    pub c: usize,
    /// Child-index bit of the face's horizontal axis
    pub ax: usize,
    /// Child-index bit of the face's vertical axis
    pub ay: usize,
    /// Child-index bit of the face's depth axis
    pub az: usize,
}

/// One face quadrant's traversal constants
#[derive(Clone, Copy)]
struct SubFace {
    dx: i32,
    dy: i32,
    c: usize,
    ax: usize,
    ay: usize,
    az: usize,
}

impl SubFace {
    /// Returns true if the quadtree node `r` became fully rendered.
    ///
    /// Only called while `r`'s map byte is set.
    #[allow(clippy::too_many_arguments)]
    fn traverse(
        &self,
        nodes: &[OctreeNode],
        f: &mut Quadtree,
        r: usize,
        index: u32,
        color: u32,
        x1: i32,
        x2: i32,
        x1p: i32,
        x2p: i32,
        y1: i32,
        y2: i32,
        y1p: i32,
        y2p: i32,
    ) -> bool {
        let (dx, dy) = (self.dx, self.dy);
        // Off-face test.
        if x2 - (1 - dx) * x2p <= -ONE || ONE <= x1 - (1 + dx) * x1p {
            return false;
        }
        if y2 - (1 - dy) * y2p <= -ONE || ONE <= y1 - (1 + dy) * y1p {
            return false;
        }

        if x2 - x1 <= 2 * ONE && y2 - y1 <= 2 * ONE {
            // Octree descent: visit up to eight children front to back.
            let x3 = x1 - x1p;
            let x4 = x2 - x2p;
            let y3 = y1 - y1p;
            let y4 = y2 - y2p;
            let (c, ax, ay, az) = (self.c, self.ax, self.ay, self.az);
            if index != LEAF {
                let s = &nodes[index as usize];
                if x3 < x4 && y3 < y4 {
                    // Near layer (same side of the depth axis as the eye).
                    for (slot, sx, sy) in [
                        (c, dx, dy),
                        (c ^ ax, -dx, dy),
                        (c ^ ay, dx, -dy),
                        (c ^ ax ^ ay, -dx, -dy),
                    ] {
                        if s.occupied(slot)
                            && self.traverse(
                                nodes,
                                f,
                                r,
                                s.child[slot],
                                s.color[slot],
                                2 * x3 + sx * ONE,
                                2 * x4 + sx * ONE,
                                x1p,
                                x2p,
                                2 * y3 + sy * ONE,
                                2 * y4 + sy * ONE,
                                y1p,
                                y2p,
                            )
                        {
                            return true;
                        }
                    }
                }
                // Far layer.
                for (slot, sx, sy) in [
                    (c ^ az, dx, dy),
                    (c ^ ax ^ az, -dx, dy),
                    (c ^ ay ^ az, dx, -dy),
                    (c ^ ax ^ ay ^ az, -dx, -dy),
                ] {
                    if s.occupied(slot)
                        && self.traverse(
                            nodes,
                            f,
                            r,
                            s.child[slot],
                            s.color[slot],
                            2 * x1 + sx * ONE,
                            2 * x2 + sx * ONE,
                            x1p,
                            x2p,
                            2 * y1 + sy * ONE,
                            2 * y2 + sy * ONE,
                            y1p,
                            y2p,
                        )
                    {
                        return true;
                    }
                }
            } else {
                // Solid leaf: children are copies of this cell. The nearest
                // copy is skipped, it would recurse onto itself forever.
                if x3 < x4 && y3 < y4 {
                    for (sx, sy) in [(-dx, dy), (dx, -dy), (-dx, -dy)] {
                        if self.traverse(
                            nodes,
                            f,
                            r,
                            LEAF,
                            color,
                            2 * x3 + sx * ONE,
                            2 * x4 + sx * ONE,
                            x1p,
                            x2p,
                            2 * y3 + sy * ONE,
                            2 * y4 + sy * ONE,
                            y1p,
                            y2p,
                        ) {
                            return true;
                        }
                    }
                }
                for (sx, sy) in [(dx, dy), (-dx, dy), (dx, -dy), (-dx, -dy)] {
                    if self.traverse(
                        nodes,
                        f,
                        r,
                        LEAF,
                        color,
                        2 * x1 + sx * ONE,
                        2 * x2 + sx * ONE,
                        x1p,
                        x2p,
                        2 * y1 + sy * ONE,
                        2 * y2 + sy * ONE,
                        y1p,
                        y2p,
                    ) {
                        return true;
                    }
                }
            }
            false
        } else {
            // Quadtree descent: split the screen interval at the midpoint.
            let xm = (x1 + x2) / 2;
            let xmp = (x1p + x2p) / 2;
            let ym = (y1 + y2) / 2;
            let ymp = (y1p + y2p) / 2;
            if r < f.leaf_parents() {
                if f.marked(r * 4 + 4) {
                    self.traverse(nodes, f, r * 4 + 4, index, color, x1, xm, x1p, xmp, y1, ym, y1p, ymp);
                }
                if f.marked(r * 4 + 5) {
                    self.traverse(nodes, f, r * 4 + 5, index, color, xm, x2, xmp, x2p, y1, ym, y1p, ymp);
                }
                if f.marked(r * 4 + 6) {
                    self.traverse(nodes, f, r * 4 + 6, index, color, x1, xm, x1p, xmp, ym, y2, ymp, y2p);
                }
                if f.marked(r * 4 + 7) {
                    self.traverse(nodes, f, r * 4 + 7, index, color, xm, x2, xmp, x2p, ym, y2, ymp, y2p);
                }
            } else {
                if f.marked(r * 4 + 4) {
                    self.paint(f, r * 4 + 4, color, x1, xm, x1p, xmp, y1, ym, y1p, ymp);
                }
                if f.marked(r * 4 + 5) {
                    self.paint(f, r * 4 + 5, color, xm, x2, xmp, x2p, y1, ym, y1p, ymp);
                }
                if f.marked(r * 4 + 6) {
                    self.paint(f, r * 4 + 6, color, x1, xm, x1p, xmp, ym, y2, ymp, y2p);
                }
                if f.marked(r * 4 + 7) {
                    self.paint(f, r * 4 + 7, color, xm, x2, xmp, x2p, ym, y2, ymp, y2p);
                }
            }
            f.compute(r);
            !f.marked(r)
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn paint(
        &self,
        f: &mut Quadtree,
        r: usize,
        color: u32,
        x1: i32,
        x2: i32,
        x1p: i32,
        x2p: i32,
        y1: i32,
        y2: i32,
        y1p: i32,
        y2p: i32,
    ) {
        if x2 - (1 - self.dx) * x2p <= -ONE || ONE <= x1 - (1 + self.dx) * x1p {
            return;
        }
        if y2 - (1 - self.dy) * y2p <= -ONE || ONE <= y1 - (1 + self.dy) * y1p {
            return;
        }
        f.set_face(r, color | OPAQUE);
    }
}

/// Draw one cube face: the four quadrants around the projected eye position
/// `(x, y)`, with `q` the distance from the eye to the face plane in scene
/// units.
pub fn render_face(f: &mut Quadtree, nodes: &[OctreeNode], p: FaceParams, x: i32, y: i32, q: i32) {
    let FaceParams { c, ax, ay, az } = p;
    if f.marked(0) {
        SubFace { dx: -1, dy: -1, c: c ^ ax ^ ay, ax, ay, az }
            .traverse(nodes, f, 0, 0, 0, x - q, x, -ONE, 0, y - q, y, -ONE, 0);
    }
    if f.marked(1) {
        SubFace { dx: 1, dy: -1, c: c ^ ay, ax, ay, az }
            .traverse(nodes, f, 1, 0, 0, x, x + q, 0, ONE, y - q, y, -ONE, 0);
    }
    if f.marked(2) {
        SubFace { dx: -1, dy: 1, c: c ^ ax, ax, ay, az }
            .traverse(nodes, f, 2, 0, 0, x - q, x, -ONE, 0, y, y + q, 0, ONE);
    }
    if f.marked(3) {
        SubFace { dx: 1, dy: 1, c, ax, ay, az }
            .traverse(nodes, f, 3, 0, 0, x, x + q, 0, ONE, y, y + q, 0, ONE);
    }
}
