//! Camera pose for cubemap rendering

use crate::core::types::{DMat3, DVec3, IVec3};

/// View pyramid parameters, in near-plane units.
///
/// `left`/`right`/`top`/`bottom` are signed coordinates of the view
/// rectangle's edges on the near plane at distance `near`, as in
/// `glFrustum`. The camera looks along its local +Z axis. `slack` pushes the
/// four edge planes outward so coverage masks stay conservative.
#[derive(Debug, Clone, Copy)]
pub struct FrustumParams {
    pub near: f64,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub slack: f64,
}

impl Default for FrustumParams {
    fn default() -> Self {
        Self {
            near: 1.0,
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
            slack: 0.5,
        }
    }
}

/// Camera with integer scene position and double-precision orientation.
///
/// The position is in scene units relative to the octree root cube's center;
/// the orientation is orthonormal, looking along its local +Z axis. Only the
/// frustum-mask preparation touches the orientation; the traversal itself is
/// pure integer math driven by `position`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: IVec3,
    pub orientation: DMat3,
    pub frustum: FrustumParams,
}

impl Camera {
    pub fn new(position: IVec3, orientation: DMat3) -> Self {
        Self {
            position,
            orientation,
            frustum: FrustumParams::default(),
        }
    }

    /// Inward normals of the four side planes of the view pyramid, in world
    /// space. The orientation is orthonormal, so its inverse is the
    /// transpose.
    pub fn pyramid_normals(&self) -> [DVec3; 4] {
        let f = &self.frustum;
        let inverse_orientation = self.orientation.transpose();
        [
            inverse_orientation * DVec3::new(f.near, 0.0, -f.left + f.slack),
            inverse_orientation * DVec3::new(-f.near, 0.0, f.right + f.slack),
            inverse_orientation * DVec3::new(0.0, f.near, -f.bottom + f.slack),
            inverse_orientation * DVec3::new(0.0, -f.near, f.top + f.slack),
        ]
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(IVec3::ZERO, DMat3::IDENTITY)
    }
}
