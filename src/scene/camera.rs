use glam::{Mat4, Quat, Vec3};

use super::CameraUniforms;
use crate::errors::Result;
use crate::gpu::ShaderProgram;

/// A viewpoint with a projection.
///
/// `orientation` is the world-to-view rotation; the view matrix is that
/// rotation alone (rendering is camera-relative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Quat,
    projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// A camera at the origin with identity projection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }

    /// OpenGL-style perspective (clip z in `-1..1`); `fov_y` in radians.
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective_rh_gl(fov_y, aspect, near, far);
    }

    pub fn set_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::orthographic_rh_gl(left, right, bottom, top, near, far);
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.orientation)
    }

    /// Uploads projection and view matrices. The program must be in use.
    pub fn set_uniforms<S: CameraUniforms>(&self, shader: &impl ShaderProgram<S>) -> Result<()> {
        shader.set_uniform_matrix_array(
            S::PERSPECTIVE_MATRIX,
            4,
            false,
            &self.projection.to_cols_array(),
        )?;
        shader.set_uniform_matrix_array(
            S::VIEW_MATRIX,
            4,
            false,
            &self.view_matrix().to_cols_array(),
        )
    }
}
