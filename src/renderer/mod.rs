//! Deferred Rendering Pipeline
//!
//! A fixed sequence of stages run once per frame. Each stage owns its render
//! targets and programs and holds no other state between frames.
//!
//! | Order | Stage                          | Writes                                  |
//! |-------|--------------------------------|-----------------------------------------|
//! | 1     | [`MeshMrtStage`]               | color, distance, world position, normal |
//! | 2     | [`MeshDeferredLightingStage`]  | accumulated light (one pass pair/light) |
//! | 3     | [`OutputStage`]                | the default framebuffer (color × light) |
//!
//! [`MeshDistanceStage`] is a standalone distance-only pass, not part of the
//! frame.
//!
//! # Resizing
//!
//! Offscreen color targets do not follow a framebuffer resize on their own.
//! [`Pipeline::resize`] resizes the default framebuffer first, then has each
//! stage resize its framebuffer, free its old targets and attach new ones.
//!
//! # Usage
//!
//! ```rust,ignore
//! let api = Rc::new(WebGlApi::initialize(gl, settings.asset_reader()?, 1024, 1024, false)?);
//! let pipeline = Pipeline::new(api.clone(), &settings).await?;
//!
//! pipeline.draw(&camera, &lights, &meshes, timer.elapsed.as_secs_f32())?;
//! ```

pub mod distance;
pub mod lighting;
pub mod mrt;
pub mod output;
pub mod quad;
pub mod settings;

use std::rc::Rc;

pub use distance::MeshDistanceStage;
pub use lighting::MeshDeferredLightingStage;
pub use mrt::{MeshMrtStage, MrtTargets};
pub use output::OutputStage;
pub use quad::FULL_SCREEN_QUAD;
pub use settings::RendererSettings;

use crate::errors::Result;
use crate::gpu::GpuApi;
use crate::scene::{Camera, Mesh, SpotLight};

/// The MRT → lighting → output frame.
pub struct Pipeline<A: GpuApi> {
    api: Rc<A>,
    mrt: MeshMrtStage<A>,
    lighting: MeshDeferredLightingStage<A>,
    output: OutputStage<A>,
}

impl<A: GpuApi> Pipeline<A> {
    pub async fn new(api: Rc<A>, settings: &RendererSettings) -> Result<Self> {
        let mrt = MeshMrtStage::new(api.clone()).await?;
        let lighting = MeshDeferredLightingStage::new(api.clone(), settings.shadow_map_size).await?;
        let output = OutputStage::new(api.clone(), settings.clear_color).await?;
        log::info!("Pipeline ready");
        Ok(Self {
            api,
            mrt,
            lighting,
            output,
        })
    }

    pub fn draw(
        &self,
        camera: &Camera,
        lights: &[SpotLight],
        meshes: &[Mesh<A>],
        elapsed: f32,
    ) -> Result<()> {
        self.mrt.draw(camera, meshes, elapsed)?;
        let gbuffer = self.mrt.outputs();
        self.lighting.draw(camera, lights, meshes, gbuffer)?;
        self.output
            .draw(&gbuffer.color, self.lighting.output(), &gbuffer.distance)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.api.resize_default_framebuffer(width, height)?;
        self.mrt.recreate_textures()?;
        self.lighting.recreate_textures()?;
        log::debug!("Pipeline resized to {width}x{height}");
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn mrt(&self) -> &MeshMrtStage<A> {
        &self.mrt
    }

    #[inline]
    #[must_use]
    pub fn lighting(&self) -> &MeshDeferredLightingStage<A> {
        &self.lighting
    }
}
