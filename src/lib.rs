//! # Umbra
//!
//! A thin GPU abstraction over WebGL2 and the deferred, shadow-mapped
//! lighting pipeline built on it.
//!
//! - [`gpu`]: the backend-agnostic resource contract ([`GpuApi`]) and its
//!   WebGL2 implementation, plus an in-memory GL context for tests
//! - [`renderer`]: MRT, deferred lighting and output stages
//! - [`scene`]: camera, spot lights, meshes and the LOD icosphere
//! - [`assets`]: asset readers, OBJ/raw meshes, images, shader includes
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use umbra::prelude::*;
//!
//! let settings = RendererSettings::default();
//! let api = Rc::new(WebGlApi::initialize(
//!     Rc::new(gl),
//!     settings.asset_reader()?,
//!     settings.width,
//!     settings.height,
//!     settings.depth,
//! )?);
//! let pipeline = Pipeline::new(api.clone(), &settings).await?;
//!
//! let mesh = Mesh::new(
//!     Rc::new(api.load_geometry("dingus.obj").await?),
//!     Rc::new(api.load_texture_2d("dingus.jpg", TextureParams::color_image()).await?),
//! );
//! pipeline.draw(&camera, &[light], &[mesh], timer.elapsed_seconds())?;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod assets;
pub mod errors;
pub mod gpu;
pub mod renderer;
pub mod scene;
pub mod utils;

pub use errors::{Result, UmbraError};
#[cfg(feature = "headless")]
pub use gpu::webgl::HeadlessGl;
pub use gpu::webgl::WebGlApi;
pub use gpu::{GpuApi, TextureParams};
pub use renderer::{Pipeline, RendererSettings};
pub use scene::{Camera, Mesh, SpotLight};

pub mod prelude {
    pub use crate::assets::{AssetReaderVariant, MemoryAssetReader};
    pub use crate::errors::{Result, UmbraError};
    #[cfg(feature = "headless")]
    pub use crate::gpu::webgl::HeadlessGl;
    pub use crate::gpu::webgl::{GlContext, WebGlApi};
    pub use crate::gpu::{
        BlendMode, Channels, CullMode, Framebuffer, Geometry, GpuApi, RenderTarget,
        ShaderProgram, Texture2D, TextureFormat, TextureParams, TextureSource, UniformValue,
    };
    pub use crate::renderer::{
        MeshDeferredLightingStage, MeshDistanceStage, MeshMrtStage, OutputStage, Pipeline,
        RendererSettings,
    };
    pub use crate::scene::{Camera, IcosphereDrawer, Mesh, SpotLight};
    pub use crate::utils::{FpsCounter, Timer};
}
