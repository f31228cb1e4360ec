use glam::{Mat3, Mat4, Vec3};
use serde::Deserialize;

use crate::errors::Result;

/// Placement of one icosphere patch.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PatchPlacement {
    pub center: [f32; 3],
    /// Column-major 3×3 orientation.
    pub mat3: [f32; 9],
}

impl PatchPlacement {
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    /// The orientation widened to a 4×4 matrix with no translation.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_cols_array(&self.mat3))
    }
}

/// `icosphere.json`: one raw mesh per level of detail plus patch placements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcosphereDescriptor {
    /// Raw mesh files, coarsest first.
    pub levels_meshes: Vec<String>,
    pub position_matrices: Vec<PatchPlacement>,
}

impl IcosphereDescriptor {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
