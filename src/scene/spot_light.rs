use glam::{Mat4, Quat, Vec3};

use super::{Camera, CameraUniforms, LightResolveUniforms};
use crate::errors::Result;
use crate::gpu::{ShaderProgram, UniformValue};

/// A shadow-casting light with its own projection.
///
/// Rendered twice per frame: once as a camera into its shadow map, then as a
/// light when the deferred resolve pass shades the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub position: Vec3,
    pub orientation: Quat,
    pub color: Vec3,
    projection: Mat4,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotLight {
    /// A white light at the origin with identity projection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            color: Vec3::ONE,
            projection: Mat4::IDENTITY,
        }
    }

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

    /// Uploads the light's matrices for rendering its shadow map.
    pub fn set_uniforms_for_rendering<S: CameraUniforms>(
        &self,
        shader: &impl ShaderProgram<S>,
    ) -> Result<()> {
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

    /// Uploads matrices, color and the camera-relative position for shading.
    pub fn set_uniforms_for_resolving<S: LightResolveUniforms>(
        &self,
        camera: &Camera,
        shader: &impl ShaderProgram<S>,
    ) -> Result<()> {
        shader.set_uniform_matrix_array(
            S::LIGHT_PERSPECTIVE_MATRIX,
            4,
            false,
            &self.projection.to_cols_array(),
        )?;
        shader.set_uniform_matrix_array(
            S::LIGHT_VIEW_MATRIX,
            4,
            false,
            &self.view_matrix().to_cols_array(),
        )?;
        shader.set_uniform(S::LIGHT_COLOR, UniformValue::Float(&self.color.to_array()))?;
        let relative = self.position - camera.position;
        shader.set_uniform(
            S::LIGHT_CAMERA_RELATIVE_POSITION,
            UniformValue::Float(&relative.to_array()),
        )
    }
}
