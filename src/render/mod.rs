//! Cubemap face rendering: coverage quadtrees, frustum masks, and the
//! integer octree traversal

pub mod quadtree;
pub mod frustum;
pub mod face;
pub mod cubemap;

pub use cubemap::Cubemap;
pub use quadtree::Quadtree;

/// Half extent of the octree root cube in projected integer units.
///
/// Every interval in the face traversal is measured against this; it is
/// large enough for sub-voxel precision and small enough that the doubling
/// recursion stays inside `i32`.
pub const SCENE_SIZE: i32 = 1 << 26;
