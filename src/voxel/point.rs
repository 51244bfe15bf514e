//! Voxel point records and .vxl loading

use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::core::types::Result;
use crate::core::Error;
use crate::math::morton::COORD_MAX;

/// One voxel sample: 20-bit grid coordinates and a BGRA color.
///
/// This is also the on-disk `.vxl` record; a `.vxl` file is a flat array of
/// these with the length implied by the file size.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Point {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub color: u32,
}

impl Point {
    pub fn new(x: u32, y: u32, z: u32, color: u32) -> Self {
        Self { x, y, z, color }
    }

    pub fn coords(&self) -> (u32, u32, u32) {
        (self.x, self.y, self.z)
    }
}

/// Load a `.vxl` point set.
///
/// Fails with `IoMissing` if the file cannot be opened, `IoShort` if its size
/// is not a whole number of records, and `RangeCheck` if any coordinate does
/// not fit the 20-bit grid.
pub fn load_points(path: &Path) -> Result<Vec<Point>> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::IoMissing(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let record = std::mem::size_of::<Point>();
    if bytes.len() % record != 0 {
        return Err(Error::IoShort(path.to_path_buf()));
    }

    let mut points = vec![Point::zeroed(); bytes.len() / record];
    bytemuck::cast_slice_mut::<Point, u8>(&mut points).copy_from_slice(&bytes);

    for (i, p) in points.iter().enumerate() {
        if p.x > COORD_MAX || p.y > COORD_MAX || p.z > COORD_MAX {
            return Err(Error::RangeCheck(format!(
                "point {} at ({}, {}, {})",
                i, p.x, p.y, p.z
            )));
        }
    }

    Ok(points)
}
