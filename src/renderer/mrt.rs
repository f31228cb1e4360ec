use std::rc::Rc;

use crate::errors::Result;
use crate::gpu::{
    Channels, Framebuffer, GpuApi, RenderTarget, ShaderProgram, Texture2D, TextureFormat,
    TextureParams, TextureSource, UniformValue,
};
use crate::scene::{Camera, CameraUniforms, ColorTextureUniforms, Mesh, ModelUniforms};

pub const VERTEX_SHADER: &str = "entrypoints/mesh/mesh.vert";
pub const FRAGMENT_SHADER: &str = "entrypoints/mesh/mesh.frag";

/// Cleared to opaque black; distance and positions start at zero.
pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

crate::uniform_schema! {
    pub enum MeshUniform {
        ColorTexture => "colorTexture",
        Elapsed => "elapsed",
        PerspectiveMatrix => "perspectiveMatrix",
        ViewMatrix => "viewMatrix",
        ModelMatrix => "modelMatrix",
    }
}

impl CameraUniforms for MeshUniform {
    const PERSPECTIVE_MATRIX: Self = MeshUniform::PerspectiveMatrix;
    const VIEW_MATRIX: Self = MeshUniform::ViewMatrix;
}

impl ModelUniforms for MeshUniform {
    const MODEL_MATRIX: Self = MeshUniform::ModelMatrix;
}

impl ColorTextureUniforms for MeshUniform {
    const COLOR_TEXTURE: Self = MeshUniform::ColorTexture;
}

/// The geometry buffer, in attachment order.
pub struct MrtTargets<T> {
    /// float16 × 4, surface color
    pub color: T,
    /// float32 × 1, distance to the camera
    pub distance: T,
    /// float32 × 4, camera-relative position
    pub world_pos: T,
    /// float32 × 4
    pub normal: T,
}

impl<T: Texture2D> MrtTargets<T> {
    fn create<A: GpuApi<Texture = T>>(api: &A, width: u32, height: u32) -> Result<Self> {
        let empty = TextureSource::Empty { width, height };
        Ok(Self {
            color: api.create_texture_2d(
                TextureParams::render_target(Channels::Rgba, TextureFormat::Float16),
                empty,
            )?,
            distance: api.create_texture_2d(
                TextureParams::render_target(Channels::R, TextureFormat::Float32),
                empty,
            )?,
            world_pos: api.create_texture_2d(
                TextureParams::render_target(Channels::Rgba, TextureFormat::Float32),
                empty,
            )?,
            normal: api.create_texture_2d(
                TextureParams::render_target(Channels::Rgba, TextureFormat::Float32),
                empty,
            )?,
        })
    }

    #[must_use]
    pub fn as_array(&self) -> [&T; 4] {
        [&self.color, &self.distance, &self.world_pos, &self.normal]
    }

    fn free(&self) -> Result<()> {
        self.as_array()
            .into_iter()
            .try_for_each(|texture| texture.free())
    }
}

/// Geometry pass: renders every mesh into the four-target geometry buffer.
pub struct MeshMrtStage<A: GpuApi> {
    api: Rc<A>,
    shader: A::Shader<MeshUniform>,
    framebuffer: A::Framebuffer,
    targets: MrtTargets<A::Texture>,
}

impl<A: GpuApi> MeshMrtStage<A> {
    /// Builds a depth-tested target the size of the default framebuffer.
    pub async fn new(api: Rc<A>) -> Result<Self> {
        let shader = api
            .create_shader::<MeshUniform>(VERTEX_SHADER, FRAGMENT_SHADER)
            .await?;
        let size = api.default_framebuffer().size();
        let framebuffer = api.create_framebuffer(size.width, size.height, true)?;
        let targets = MrtTargets::create(&*api, size.width, size.height)?;
        framebuffer.set_attachments(&targets.as_array())?;
        log::debug!("MRT stage allocated at {}x{}", size.width, size.height);

        Ok(Self {
            api,
            shader,
            framebuffer,
            targets,
        })
    }

    /// Follows the default framebuffer's size.
    ///
    /// Resizes the framebuffer, frees the current targets, then allocates and
    /// attaches a new set. Must run after the default framebuffer is resized.
    pub fn recreate_textures(&mut self) -> Result<()> {
        let size = self.api.default_framebuffer().size();
        self.framebuffer.resize(size.width, size.height)?;
        self.targets.free()?;
        self.targets = MrtTargets::create(&*self.api, size.width, size.height)?;
        self.framebuffer.set_attachments(&self.targets.as_array())?;
        log::debug!("MRT targets recreated at {}x{}", size.width, size.height);
        Ok(())
    }

    pub fn draw(&self, camera: &Camera, meshes: &[Mesh<A>], elapsed: f32) -> Result<()> {
        self.framebuffer.bind()?;
        self.framebuffer.clear(CLEAR_COLOR, Some(1.0));
        self.shader.use_program();
        self.shader
            .set_uniform(MeshUniform::Elapsed, UniformValue::Float(&[elapsed]))?;
        camera.set_uniforms(&self.shader)?;
        for mesh in meshes {
            mesh.set_uniforms(camera.position, &self.shader)?;
            mesh.draw(&self.shader)?;
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &MrtTargets<A::Texture> {
        &self.targets
    }

    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> &A::Framebuffer {
        &self.framebuffer
    }
}
