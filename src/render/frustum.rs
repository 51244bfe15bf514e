//! Per-face frustum coverage preparation
//!
//! The camera's view pyramid is intersected with each cube face to decide
//! which face pixels can possibly be visible this frame. Everything here is
//! double-precision and per-frame; the result is only the `(width, height)`
//! rectangle handed to [`Quadtree::build`].

use crate::core::camera::Camera;
use crate::core::types::DVec3;
use crate::render::quadtree::Quadtree;

/// Map a world-space pyramid normal into the local frame of cube face
/// `face`. One fixed permutation/sign-flip per face; the face looks along
/// its local +Z.
pub fn face_normal(face: usize, v: DVec3) -> DVec3 {
    match face {
        0 => DVec3::new(v.x, -v.z, v.y),
        1 => v,
        2 => DVec3::new(-v.z, v.y, v.x),
        3 => DVec3::new(-v.x, v.y, -v.z),
        4 => DVec3::new(v.z, v.y, -v.x),
        5 => DVec3::new(v.x, v.z, -v.y),
        _ => unreachable!("cube has six faces"),
    }
}

/// Clip a convex polygon on the face plane against the half-plane
/// `a*x + b*y + c >= 0` (Sutherland-Hodgman, one edge).
fn clip(polygon: &mut Vec<(f64, f64)>, a: f64, b: f64, c: f64) {
    if polygon.is_empty() {
        return;
    }
    let inside = |p: (f64, f64)| a * p.0 + b * p.1 + c;
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for k in 0..polygon.len() {
        let p = polygon[k];
        let q = polygon[(k + 1) % polygon.len()];
        let dp = inside(p);
        let dq = inside(q);
        if dp >= 0.0 {
            out.push(p);
        }
        if (dp < 0.0) != (dq < 0.0) {
            let t = dp / (dp - dq);
            out.push((p.0 + t * (q.0 - p.0), p.1 + t * (q.1 - p.1)));
        }
    }
    *polygon = out;
}

/// Visible rectangle of a face, in pixels, for the four face-local pyramid
/// normals.
///
/// The face square spans [-1, 1]^2 at local z = +1. The exact visible region
/// is the square clipped by the four half-planes; the coverage mask consumes
/// the anchored rectangle `(width, height)` bounding it, which is
/// conservative.
fn visible_rect(normals: &[DVec3; 4], size: u32) -> (i32, i32) {
    let mut polygon = vec![(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    for n in normals {
        clip(&mut polygon, n.x, n.y, n.z);
    }
    if polygon.len() < 3 {
        return (0, 0);
    }
    // A sliver along the face edge (the antipodal face of the view axis
    // degenerates to one) covers no pixels.
    let mut area = 0.0;
    for k in 0..polygon.len() {
        let p = polygon[k];
        let q = polygon[(k + 1) % polygon.len()];
        area += p.0 * q.1 - q.0 * p.1;
    }
    if area.abs() < 1e-12 {
        return (0, 0);
    }

    let size = size as f64;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for &(x, y) in &polygon {
        xmax = xmax.max(x);
        ymax = ymax.max(y);
    }
    let width = (((xmax + 1.0) / 2.0) * size).ceil();
    let height = (((ymax + 1.0) / 2.0) * size).ceil();
    (
        width.clamp(0.0, size) as i32,
        height.clamp(0.0, size) as i32,
    )
}

/// Rebuild one face's coverage mask from the camera's view pyramid
pub fn prepare_face(face: usize, quadtree: &mut Quadtree, pyramid: &[DVec3; 4]) {
    let normals = [
        face_normal(face, pyramid[0]),
        face_normal(face, pyramid[1]),
        face_normal(face, pyramid[2]),
        face_normal(face, pyramid[3]),
    ];
    let (width, height) = visible_rect(&normals, quadtree.size());
    quadtree.build(width, height);
}

/// Rebuild all six coverage masks
pub fn prepare_cubemap(faces: &mut [Quadtree; 6], camera: &Camera) {
    let pyramid = camera.pyramid_normals();
    for (i, quadtree) in faces.iter_mut().enumerate() {
        prepare_face(i, quadtree, &pyramid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_camera_covers_forward_face() {
        // The identity camera looks along +Z, which is face 1; its mask must
        // cover the whole face.
        let camera = Camera::default();
        let pyramid = camera.pyramid_normals();
        let mut q = Quadtree::new(4);
        prepare_face(1, &mut q, &pyramid);
        assert!(q.marked(0) && q.marked(1) && q.marked(2) && q.marked(3));
    }

    #[test]
    fn test_identity_camera_masks_backward_face() {
        let camera = Camera::default();
        let pyramid = camera.pyramid_normals();
        let mut q = Quadtree::new(4);
        prepare_face(3, &mut q, &pyramid);
        assert!(q.fully_painted());
    }

    #[test]
    fn test_clip_square_in_half() {
        let mut polygon = vec![(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        // Keep x <= 0.
        clip(&mut polygon, -1.0, 0.0, 0.0);
        assert_eq!(polygon.len(), 4);
        for &(x, _) in &polygon {
            assert!(x <= 1e-12);
        }
    }

    #[test]
    fn test_face_normal_permutations_are_rotations() {
        // Each permutation must preserve handedness and length.
        let v = DVec3::new(1.0, 2.0, 3.0);
        for face in 0..6 {
            let w = face_normal(face, v);
            assert!((w.length() - v.length()).abs() < 1e-12);
        }
        let x = DVec3::X;
        let y = DVec3::Y;
        let z = DVec3::Z;
        for face in 0..6 {
            let (fx, fy, fz) = (face_normal(face, x), face_normal(face, y), face_normal(face, z));
            let det = fx.dot(fy.cross(fz));
            assert!((det - 1.0).abs() < 1e-12, "face {} flips handedness", face);
        }
    }
}
