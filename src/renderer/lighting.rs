use std::rc::Rc;

use super::mrt::MrtTargets;
use super::quad::create_full_screen_quad;
use crate::errors::Result;
use crate::gpu::{
    BlendMode, Channels, Framebuffer, Geometry, GpuApi, RenderTarget, ShaderProgram, Texture2D,
    TextureFormat, TextureParams, TextureSource,
};
use crate::scene::{
    Camera, CameraUniforms, LightResolveUniforms, Mesh, ModelUniforms, SpotLight,
};

pub const DISTANCE_VERTEX_SHADER: &str = "entrypoints/shadowmapping/distance.vert";
pub const DISTANCE_FRAGMENT_SHADER: &str = "entrypoints/shadowmapping/distance.frag";
pub const RESOLVE_VERTEX_SHADER: &str = "entrypoints/shadowmapping/resolve.vert";
pub const RESOLVE_FRAGMENT_SHADER: &str = "entrypoints/shadowmapping/resolve.frag";

pub const DEFAULT_SHADOW_MAP_SIZE: u32 = 1024;

/// Shadow map clear: everything is as far as it gets.
pub const SHADOW_CLEAR_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const RESOLVE_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

crate::uniform_schema! {
    pub enum ShadowDistanceUniform {
        PerspectiveMatrix => "perspectiveMatrix",
        ViewMatrix => "viewMatrix",
        ModelMatrix => "modelMatrix",
    }
}

impl CameraUniforms for ShadowDistanceUniform {
    const PERSPECTIVE_MATRIX: Self = ShadowDistanceUniform::PerspectiveMatrix;
    const VIEW_MATRIX: Self = ShadowDistanceUniform::ViewMatrix;
}

impl ModelUniforms for ShadowDistanceUniform {
    const MODEL_MATRIX: Self = ShadowDistanceUniform::ModelMatrix;
}

crate::uniform_schema! {
    pub enum ResolveUniform {
        DistanceTexture => "distanceTexture",
        WorldPosTexture => "worldPosTexture",
        NormalTexture => "normalTexture",
        LightPerspectiveMatrix => "lightPerspectiveMatrix",
        LightViewMatrix => "lightViewMatrix",
        LightColor => "lightColor",
        LightCameraRelativePosition => "lightCameraRelativePosition",
    }
}

impl LightResolveUniforms for ResolveUniform {
    const LIGHT_PERSPECTIVE_MATRIX: Self = ResolveUniform::LightPerspectiveMatrix;
    const LIGHT_VIEW_MATRIX: Self = ResolveUniform::LightViewMatrix;
    const LIGHT_COLOR: Self = ResolveUniform::LightColor;
    const LIGHT_CAMERA_RELATIVE_POSITION: Self = ResolveUniform::LightCameraRelativePosition;
}

fn resolve_params() -> TextureParams {
    TextureParams::render_target(Channels::Rgba, TextureFormat::Float32)
}

fn shadow_params() -> TextureParams {
    TextureParams::render_target(Channels::R, TextureFormat::Float32)
}

/// Deferred lighting with one shadow map per spot light.
///
/// For each light the stage renders scene distance from the light into the
/// shadow target, then accumulates that light's contribution into the
/// resolve target with a full-screen pass. The resolve target is cleared once
/// per frame, not per light.
pub struct MeshDeferredLightingStage<A: GpuApi> {
    api: Rc<A>,
    quad: A::Geometry,
    distance_shader: A::Shader<ShadowDistanceUniform>,
    resolve_shader: A::Shader<ResolveUniform>,
    shadow_framebuffer: A::Framebuffer,
    shadow_texture: A::Texture,
    resolve_framebuffer: A::Framebuffer,
    resolved_light: A::Texture,
}

impl<A: GpuApi> MeshDeferredLightingStage<A> {
    pub async fn new(api: Rc<A>, shadow_map_size: u32) -> Result<Self> {
        let quad = create_full_screen_quad(&*api)?;
        let distance_shader = api
            .create_shader::<ShadowDistanceUniform>(
                DISTANCE_VERTEX_SHADER,
                DISTANCE_FRAGMENT_SHADER,
            )
            .await?;
        let resolve_shader = api
            .create_shader::<ResolveUniform>(RESOLVE_VERTEX_SHADER, RESOLVE_FRAGMENT_SHADER)
            .await?;

        let shadow_framebuffer = api.create_framebuffer(shadow_map_size, shadow_map_size, true)?;
        let shadow_texture = api.create_texture_2d(
            shadow_params(),
            TextureSource::Empty {
                width: shadow_map_size,
                height: shadow_map_size,
            },
        )?;
        shadow_framebuffer.set_attachments(&[&shadow_texture])?;

        let size = api.default_framebuffer().size();
        let resolve_framebuffer = api.create_framebuffer(size.width, size.height, false)?;
        let resolved_light = api.create_texture_2d(
            resolve_params(),
            TextureSource::Empty {
                width: size.width,
                height: size.height,
            },
        )?;
        resolve_framebuffer.set_attachments(&[&resolved_light])?;
        log::debug!(
            "Lighting stage allocated: shadow map {shadow_map_size}², resolve {}x{}",
            size.width,
            size.height
        );

        Ok(Self {
            api,
            quad,
            distance_shader,
            resolve_shader,
            shadow_framebuffer,
            shadow_texture,
            resolve_framebuffer,
            resolved_light,
        })
    }

    /// Follows the default framebuffer's size. The shadow map keeps its size.
    pub fn recreate_textures(&mut self) -> Result<()> {
        let size = self.api.default_framebuffer().size();
        self.resolve_framebuffer.resize(size.width, size.height)?;
        self.resolved_light.free()?;
        self.resolved_light = self.api.create_texture_2d(
            resolve_params(),
            TextureSource::Empty {
                width: size.width,
                height: size.height,
            },
        )?;
        self.resolve_framebuffer
            .set_attachments(&[&self.resolved_light])?;
        log::debug!("Resolve target recreated at {}x{}", size.width, size.height);
        Ok(())
    }

    pub fn draw(
        &self,
        camera: &Camera,
        lights: &[SpotLight],
        meshes: &[Mesh<A>],
        mrt: &MrtTargets<A::Texture>,
    ) -> Result<()> {
        self.resolve_framebuffer.bind()?;
        self.resolve_framebuffer.clear(RESOLVE_CLEAR_COLOR, Some(1.0));
        for light in lights {
            self.draw_shadow_map(light, meshes)?;
            self.draw_resolve(camera, light, mrt)?;
        }
        Ok(())
    }

    fn draw_shadow_map(&self, light: &SpotLight, meshes: &[Mesh<A>]) -> Result<()> {
        self.shadow_framebuffer.bind()?;
        self.shadow_framebuffer
            .clear(SHADOW_CLEAR_COLOR, Some(1.0));
        self.distance_shader.use_program();
        light.set_uniforms_for_rendering(&self.distance_shader)?;
        for mesh in meshes {
            mesh.set_uniforms(light.position, &self.distance_shader)?;
            mesh.draw_distance()?;
        }
        Ok(())
    }

    fn draw_resolve(
        &self,
        camera: &Camera,
        light: &SpotLight,
        mrt: &MrtTargets<A::Texture>,
    ) -> Result<()> {
        // Binding resets blend state, so accumulation is re-enabled per light.
        self.resolve_framebuffer.bind()?;
        self.resolve_framebuffer.set_blending(BlendMode::Add);
        self.resolve_shader.use_program();
        light.set_uniforms_for_resolving(camera, &self.resolve_shader)?;
        self.resolve_shader.set_samplers(&[
            (ResolveUniform::DistanceTexture, &self.shadow_texture),
            (ResolveUniform::WorldPosTexture, &mrt.world_pos),
            (ResolveUniform::NormalTexture, &mrt.normal),
        ])?;
        self.quad.draw()
    }

    /// Accumulated light, float32 × 4 at the default framebuffer's size.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &A::Texture {
        &self.resolved_light
    }

    #[inline]
    #[must_use]
    pub fn shadow_map(&self) -> &A::Texture {
        &self.shadow_texture
    }

    #[inline]
    #[must_use]
    pub fn resolve_framebuffer(&self) -> &A::Framebuffer {
        &self.resolve_framebuffer
    }
}
