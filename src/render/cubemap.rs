//! Six-face cubemap assembly
//!
//! Owns the six per-face quadtrees and pixel buffers for one viewer. Per
//! frame: clear the pixel buffers to the sky color, rebuild the coverage
//! masks from the camera frustum, then render the six faces. Faces are
//! independent (each owns its quadtree and buffer, all share the read-only
//! node pool), so they render in parallel.

use rayon::prelude::*;

use crate::core::camera::Camera;
use crate::core::config::RenderConfig;
use crate::core::types::IVec3;
use crate::render::face::{render_face, FaceParams};
use crate::render::frustum::prepare_cubemap;
use crate::render::quadtree::Quadtree;
use crate::render::SCENE_SIZE;
use crate::voxel::octree::Octree;

/// Upload targets of the six faces, in face-index order. Face 0 renders the
/// view toward scene +Y but lands on the -Y target (and 5 the reverse); the
/// swap is part of the pinned face table.
pub const FACE_TARGETS: [&str; 6] = ["-Y", "+Z", "+X", "-Z", "-X", "+Y"];

/// Traversal parameters per face, and how the viewer position projects into
/// the face's screen and depth offsets.
fn face_jobs(position: IVec3) -> [(FaceParams, i32, i32, i32); 6] {
    let (x, y, z) = (position.x, position.y, position.z);
    let w = SCENE_SIZE;
    [
        // Y+ view
        (FaceParams { c: 1, ax: 4, ay: 1, az: 2 }, x, -z, w - y),
        // Z+ view
        (FaceParams { c: 0, ax: 4, ay: 2, az: 1 }, x, y, w - z),
        // X+ view
        (FaceParams { c: 1, ax: 1, ay: 2, az: 4 }, -z, y, w - x),
        // Z- view
        (FaceParams { c: 5, ax: 4, ay: 2, az: 1 }, -x, y, w + z),
        // X- view
        (FaceParams { c: 4, ax: 1, ay: 2, az: 4 }, z, y, w + x),
        // Y- view
        (FaceParams { c: 2, ax: 4, ay: 1, az: 2 }, x, z, w + y),
    ]
}

pub struct Cubemap {
    faces: [Quadtree; 6],
    sky_color: u32,
}

impl Cubemap {
    pub fn new(depth: u32) -> Self {
        Self {
            faces: std::array::from_fn(|_| Quadtree::new(depth)),
            sky_color: RenderConfig::default().sky_color,
        }
    }

    pub fn with_config(config: &RenderConfig) -> Self {
        Self {
            faces: std::array::from_fn(|_| Quadtree::new(config.face_depth)),
            sky_color: config.sky_color,
        }
    }

    /// Pixels per face side
    pub fn face_size(&self) -> u32 {
        self.faces[0].size()
    }

    /// Pixels of face `i`, row-major
    pub fn face(&self, i: usize) -> &[u32] {
        self.faces[i].face()
    }

    pub fn quadtree(&self, i: usize) -> &Quadtree {
        &self.faces[i]
    }

    /// Render a frame: frustum-masked coverage, then the six faces in
    /// parallel.
    pub fn render(&mut self, octree: &Octree, camera: &Camera) {
        for f in self.faces.iter_mut() {
            f.clear_face(self.sky_color);
        }
        prepare_cubemap(&mut self.faces, camera);
        self.render_faces(octree, camera.position);
    }

    /// Render a frame with every face fully uncovered, ignoring the camera
    /// orientation. Used when the viewer wants all six faces (environment
    /// capture) and by the renderer tests.
    pub fn render_unclipped(&mut self, octree: &Octree, position: IVec3) {
        for f in self.faces.iter_mut() {
            f.clear_face(self.sky_color);
            let size = f.size() as i32;
            f.build(size, size);
        }
        self.render_faces(octree, position);
    }

    fn render_faces(&mut self, octree: &Octree, position: IVec3) {
        let jobs = face_jobs(position);
        let nodes = octree.nodes();
        self.faces
            .par_iter_mut()
            .zip(jobs.par_iter())
            .for_each(|(f, &(params, x, y, q))| {
                render_face(f, nodes, params, x, y, q);
            });
    }
}
