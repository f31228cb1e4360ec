use std::rc::Rc;

use crate::errors::Result;
use crate::gpu::{
    Channels, Framebuffer, GpuApi, RenderTarget, ShaderProgram, TextureFormat, TextureParams,
    TextureSource,
};
use crate::scene::{Camera, CameraUniforms, Mesh, ModelUniforms};

pub const VERTEX_SHADER: &str = "entrypoints/mesh/distance.vert";
pub const FRAGMENT_SHADER: &str = "entrypoints/mesh/distance.frag";

crate::uniform_schema! {
    pub enum MeshDistanceUniform {
        PerspectiveMatrix => "perspectiveMatrix",
        ViewMatrix => "viewMatrix",
        ModelMatrix => "modelMatrix",
    }
}

impl CameraUniforms for MeshDistanceUniform {
    const PERSPECTIVE_MATRIX: Self = MeshDistanceUniform::PerspectiveMatrix;
    const VIEW_MATRIX: Self = MeshDistanceUniform::ViewMatrix;
}

impl ModelUniforms for MeshDistanceUniform {
    const MODEL_MATRIX: Self = MeshDistanceUniform::ModelMatrix;
}

/// Renders camera distance only, into a fixed-size float32 × 1 target.
pub struct MeshDistanceStage<A: GpuApi> {
    shader: A::Shader<MeshDistanceUniform>,
    framebuffer: A::Framebuffer,
    distance: A::Texture,
}

impl<A: GpuApi> MeshDistanceStage<A> {
    pub async fn new(api: Rc<A>, width: u32, height: u32) -> Result<Self> {
        let shader = api
            .create_shader::<MeshDistanceUniform>(VERTEX_SHADER, FRAGMENT_SHADER)
            .await?;
        let framebuffer = api.create_framebuffer(width, height, true)?;
        let distance = api.create_texture_2d(
            TextureParams::render_target(Channels::R, TextureFormat::Float32),
            TextureSource::Empty { width, height },
        )?;
        framebuffer.set_attachments(&[&distance])?;

        Ok(Self {
            shader,
            framebuffer,
            distance,
        })
    }

    pub fn draw(&self, camera: &Camera, meshes: &[Mesh<A>]) -> Result<()> {
        self.framebuffer.bind()?;
        self.framebuffer.clear([1.0, 1.0, 1.0, 1.0], Some(1.0));
        self.shader.use_program();
        camera.set_uniforms(&self.shader)?;
        for mesh in meshes {
            mesh.set_uniforms(camera.position, &self.shader)?;
            mesh.draw_distance()?;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn output(&self) -> &A::Texture {
        &self.distance
    }

    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> &A::Framebuffer {
        &self.framebuffer
    }
}
