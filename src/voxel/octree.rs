//! Octree node store and .oct blob I/O

use std::io::Write;
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::core::types::Result;
use crate::core::Error;

/// Child index sentinel: solid at this granularity, no deeper node stored
pub const LEAF: u32 = u32::MAX;

/// Color flag: slot holds no child at all. Stored colors keep this bit
/// clear, so the test is a single mask.
pub const EMPTY: u32 = 0x8000_0000;

/// One octree node: eight child slots.
///
/// Child slot digits follow the renderer's axis convention: bit 4 selects
/// the upper x half, bit 2 the upper y half, bit 1 the upper z half.
/// `child[i]` is a node index into the pool or [`LEAF`]; `color[i]` is the
/// slot's average BGRA color, or has the [`EMPTY`] bit set when the slot is
/// unoccupied. This struct is also the on-disk `.oct` record.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct OctreeNode {
    pub child: [u32; 8],
    pub color: [u32; 8],
}

impl OctreeNode {
    /// A node with all eight slots unoccupied
    pub const fn unpopulated() -> Self {
        Self {
            child: [LEAF; 8],
            color: [EMPTY; 8],
        }
    }

    /// Whether slot `i` holds geometry (a child node or a solid leaf)
    #[inline]
    pub fn occupied(&self, i: usize) -> bool {
        self.color[i] & EMPTY == 0
    }

    /// Component-wise mean color of the occupied slots.
    ///
    /// Returns `EMPTY` if nothing is occupied; nodes in a well-formed pool
    /// always have at least one occupied slot.
    pub fn average_color(&self) -> u32 {
        let mut sum = [0u32; 4];
        let mut count = 0u32;
        for i in 0..8 {
            if self.occupied(i) {
                let c = self.color[i];
                sum[0] += c & 0xFF;
                sum[1] += (c >> 8) & 0xFF;
                sum[2] += (c >> 16) & 0xFF;
                sum[3] += (c >> 24) & 0xFF;
                count += 1;
            }
        }
        if count == 0 {
            return EMPTY;
        }
        (sum[0] / count)
            | ((sum[1] / count) << 8)
            | ((sum[2] / count) << 16)
            | ((sum[3] / count) << 24)
    }
}

/// Flat pool of octree nodes, root at index 0.
///
/// The pool is immutable once loaded; rendering only reads it.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
}

impl Octree {
    /// Wrap a node pool, checking basic consistency.
    ///
    /// Every non-leaf child index must point inside the pool; a violation
    /// means the pool is corrupt and is fatal here rather than mid-render.
    pub fn from_nodes(nodes: Vec<OctreeNode>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(Error::Invariant("octree has no root node".into()));
        }
        let count = nodes.len() as u32;
        for (i, node) in nodes.iter().enumerate() {
            for s in 0..8 {
                if node.occupied(s) && node.child[s] != LEAF && node.child[s] >= count {
                    return Err(Error::Invariant(format!(
                        "node {} slot {} points at {} of {}",
                        i, s, node.child[s], count
                    )));
                }
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[0]
    }

    /// Write the pool as a `.oct` blob: `u32` node count, then the records.
    /// Host endian.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        let count = self.nodes.len() as u32;
        file.write_all(&count.to_ne_bytes())?;
        file.write_all(bytemuck::cast_slice(&self.nodes))?;
        Ok(())
    }

    /// Read a `.oct` blob written by [`Octree::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::IoMissing(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        if bytes.len() < 4 {
            return Err(Error::IoShort(path.to_path_buf()));
        }
        let count = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let record = std::mem::size_of::<OctreeNode>();
        if bytes.len() != 4 + count * record {
            return Err(Error::IoShort(path.to_path_buf()));
        }

        let mut nodes = vec![OctreeNode::zeroed(); count];
        bytemuck::cast_slice_mut::<OctreeNode, u8>(&mut nodes).copy_from_slice(&bytes[4..]);
        Self::from_nodes(nodes)
    }
}
