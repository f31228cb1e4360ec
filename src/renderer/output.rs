use std::rc::Rc;

use super::quad::create_full_screen_quad;
use crate::errors::Result;
use crate::gpu::{Geometry, GpuApi, RenderTarget, ShaderProgram};

pub const VERTEX_SHADER: &str = "entrypoints/output/output.vert";
pub const FRAGMENT_SHADER: &str = "entrypoints/output/output.frag";

crate::uniform_schema! {
    pub enum OutputUniform {
        ColorTexture => "colorTexture",
        LightTexture => "lightTexture",
        DistanceTexture => "distanceTexture",
    }
}

/// Composites surface color, accumulated light and distance fog onto the
/// default framebuffer.
pub struct OutputStage<A: GpuApi> {
    api: Rc<A>,
    quad: A::Geometry,
    shader: A::Shader<OutputUniform>,
    clear_color: [f32; 4],
}

impl<A: GpuApi> OutputStage<A> {
    pub async fn new(api: Rc<A>, clear_color: [f32; 4]) -> Result<Self> {
        let quad = create_full_screen_quad(&*api)?;
        let shader = api
            .create_shader::<OutputUniform>(VERTEX_SHADER, FRAGMENT_SHADER)
            .await?;
        Ok(Self {
            api,
            quad,
            shader,
            clear_color,
        })
    }

    pub fn draw(&self, color: &A::Texture, light: &A::Texture, distance: &A::Texture) -> Result<()> {
        let target = self.api.default_framebuffer();
        target.bind()?;
        target.clear(self.clear_color, Some(1.0));
        self.shader.use_program();
        self.shader.set_samplers(&[
            (OutputUniform::ColorTexture, color),
            (OutputUniform::LightTexture, light),
            (OutputUniform::DistanceTexture, distance),
        ])?;
        self.quad.draw()
    }
}
