use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};

use super::{ColorTextureUniforms, ModelUniforms};
use crate::errors::Result;
use crate::gpu::{Geometry, GpuApi, ShaderProgram};

/// Geometry plus a color texture, placed in the world.
///
/// Geometry and texture are shared: several meshes may draw the same
/// resources with different transforms.
pub struct Mesh<A: GpuApi> {
    geometry: Rc<A::Geometry>,
    color_texture: Rc<A::Texture>,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl<A: GpuApi> Mesh<A> {
    #[must_use]
    pub fn new(geometry: Rc<A::Geometry>, color_texture: Rc<A::Texture>) -> Self {
        Self {
            geometry,
            color_texture,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &Rc<A::Geometry> {
        &self.geometry
    }

    #[inline]
    #[must_use]
    pub fn color_texture(&self) -> &Rc<A::Texture> {
        &self.color_texture
    }

    /// Model matrix relative to `origin`, usually the camera position.
    #[must_use]
    pub fn model_matrix(&self, origin: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position - origin)
    }

    pub fn set_uniforms<S: ModelUniforms>(
        &self,
        origin: Vec3,
        shader: &A::Shader<S>,
    ) -> Result<()> {
        shader.set_uniform_matrix_array(
            S::MODEL_MATRIX,
            4,
            false,
            &self.model_matrix(origin).to_cols_array(),
        )
    }

    /// Binds the color texture and draws.
    pub fn draw<S: ColorTextureUniforms>(&self, shader: &A::Shader<S>) -> Result<()> {
        shader.set_samplers(&[(S::COLOR_TEXTURE, &*self.color_texture)])?;
        self.geometry.draw()
    }

    /// Draws geometry only, for passes that ignore surface color.
    pub fn draw_distance(&self) -> Result<()> {
        self.geometry.draw()
    }
}
