//! WebGL2 Backend
//!
//! [`WebGlApi`] implements [`GpuApi`] over any [`GlContext`]: a browser
//! `WebGL2RenderingContext` (through `glow` on wasm32), a native GL ES 3.0 /
//! GL 3.3+ context, or the in-memory `HeadlessGl` (feature `headless`).
//!
//! # Usage
//!
//! ```rust,ignore
//! let reader = AssetReaderVariant::from_source("https://example.com/assets/")?;
//! let api = WebGlApi::initialize(Rc::new(gl), reader, 1024, 1024, false)?;
//!
//! let geometry = api.load_geometry("dingus.obj").await?;
//! let texture = api.load_texture_2d("dingus.jpg", TextureParams::color_image()).await?;
//! ```

pub mod context;
pub mod framebuffer;
pub mod geometry;
#[cfg(feature = "headless")]
pub mod headless;
pub mod mapper;
pub mod shader;
pub mod texture;

#[cfg(target_arch = "wasm32")]
pub mod canvas;

use std::cell::Cell;
use std::rc::Rc;

pub use context::{GlContext, GlVersion};
pub use framebuffer::{WebGlDefaultFramebuffer, WebGlFramebuffer};
pub use geometry::WebGlGeometry;
#[cfg(feature = "headless")]
pub use headless::{GlObjectKind, HeadlessGl};
pub use shader::WebGlShader;
pub use texture::WebGlTexture;

use crate::assets::{AssetReaderVariant, DecodedImage, mesh, shader_source};
use crate::errors::{Result, UmbraError};
use crate::gpu::types::{
    BlendMode, Channels, CullMode, TextureFormat, TextureParams, TextureSource,
};
use crate::gpu::{GpuApi, RenderTarget, UniformSchema};

/// Extension that makes float16/float32 textures color-renderable on ES 3.0.
pub const COLOR_BUFFER_FLOAT: &str = "EXT_color_buffer_float";

/// Extension that makes float32 textures linearly filterable on ES 3.0.
pub const FLOAT_LINEAR: &str = "OES_texture_float_linear";

/// Desktop GL 3.0+ has both float features in core.
fn core_float_support(version: GlVersion) -> bool {
    !version.is_embedded && version.major >= 3
}

/// Whether float16/float32 textures can be rendered to.
#[must_use]
pub fn supports_float_targets<C: GlContext>(gl: &C) -> bool {
    gl.has_extension(COLOR_BUFFER_FLOAT)
        || gl.has_extension("GL_EXT_color_buffer_float")
        || core_float_support(gl.version())
}

/// Whether float32 textures can be sampled with linear filtering.
#[must_use]
pub fn supports_float_linear<C: GlContext>(gl: &C) -> bool {
    gl.has_extension(FLOAT_LINEAR)
        || gl.has_extension("GL_OES_texture_float_linear")
        || core_float_support(gl.version())
}

/// Maps a `glGetError` code to its enum name.
#[must_use]
pub fn gl_error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "INVALID_ENUM",
        glow::INVALID_VALUE => "INVALID_VALUE",
        glow::INVALID_OPERATION => "INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        glow::CONTEXT_LOST => "CONTEXT_LOST_WEBGL",
        _ => "UNKNOWN_ERROR",
    }
}

/// WebGL2 implementation of [`GpuApi`].
pub struct WebGlApi<C: GlContext> {
    gl: Rc<C>,
    reader: AssetReaderVariant,
    default_framebuffer: WebGlDefaultFramebuffer<C>,
    float_linear: bool,
    /// Texture units bound by the last `set_samplers` on any program.
    sampler_units: Rc<Cell<usize>>,
}

impl<C: GlContext> WebGlApi<C> {
    /// Checks capabilities and sets up global state.
    ///
    /// Fails with [`UmbraError::MissingCapability`] when float textures cannot
    /// be rendered to. Enables back-face culling and byte-aligned pixel
    /// transfers.
    pub fn initialize(
        gl: Rc<C>,
        reader: AssetReaderVariant,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> Result<Self> {
        let version = gl.version();
        if !supports_float_targets(&*gl) {
            log::error!("{COLOR_BUFFER_FLOAT} is not supported by this context");
            return Err(UmbraError::MissingCapability(COLOR_BUFFER_FLOAT.to_string()));
        }

        gl.enable(glow::CULL_FACE);
        gl.cull_face(glow::BACK);
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);

        let float_linear = supports_float_linear(&*gl);
        if !float_linear {
            log::warn!("{FLOAT_LINEAR} is not supported; float32 textures cannot be mipmapped");
        }

        log::info!(
            "WebGL backend initialized: GL{} {}.{}, {width}x{height} surface{}",
            if version.is_embedded { " ES" } else { "" },
            version.major,
            version.minor,
            if with_depth { " with depth" } else { "" }
        );

        let default_framebuffer =
            WebGlDefaultFramebuffer::new(Rc::clone(&gl), width, height, with_depth);
        Ok(Self {
            gl,
            reader,
            default_framebuffer,
            float_linear,
            sampler_units: Rc::new(Cell::new(0)),
        })
    }

    #[inline]
    #[must_use]
    pub fn gl(&self) -> &Rc<C> {
        &self.gl
    }

    #[inline]
    #[must_use]
    pub fn reader(&self) -> &AssetReaderVariant {
        &self.reader
    }

    /// Whether float32 textures can be linearly filtered and mipmapped.
    #[inline]
    #[must_use]
    pub fn float_linear(&self) -> bool {
        self.float_linear
    }

    /// Polls `glGetError` once.
    pub fn check_error(&self) -> Result<()> {
        match self.gl.get_error() {
            glow::NO_ERROR => Ok(()),
            code => {
                let name = gl_error_name(code);
                log::error!("GL error: {name} (0x{code:04X})");
                Err(UmbraError::Gl { code, name })
            }
        }
    }
}

impl<C: GlContext> GpuApi for WebGlApi<C> {
    type Texture = WebGlTexture<C>;
    type Geometry = WebGlGeometry<C>;
    type Framebuffer = WebGlFramebuffer<C>;
    type DefaultFramebuffer = WebGlDefaultFramebuffer<C>;
    type Shader<S: UniformSchema> = WebGlShader<C, S>;

    fn create_geometry(&self, vertices: &[f32]) -> Result<WebGlGeometry<C>> {
        WebGlGeometry::new(Rc::clone(&self.gl), vertices)
    }

    async fn load_geometry(&self, path: &str) -> Result<WebGlGeometry<C>> {
        let bytes = self.reader.read_bytes(path).await?;
        let vertices = mesh::parse_geometry(path, &bytes)?;
        self.create_geometry(&vertices)
    }

    async fn create_shader<S: UniformSchema>(
        &self,
        vertex_path: &str,
        fragment_path: &str,
    ) -> Result<WebGlShader<C, S>> {
        let vertex = shader_source::load_and_resolve(&self.reader, vertex_path).await?;
        let fragment = shader_source::load_and_resolve(&self.reader, fragment_path).await?;
        self.create_shader_from_source(&vertex, &fragment)
    }

    fn create_shader_from_source<S: UniformSchema>(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<WebGlShader<C, S>> {
        WebGlShader::new(
            Rc::clone(&self.gl),
            Rc::clone(&self.sampler_units),
            vertex_source,
            fragment_source,
        )
    }

    fn create_texture_2d(
        &self,
        params: TextureParams,
        source: TextureSource<'_>,
    ) -> Result<WebGlTexture<C>> {
        WebGlTexture::new(Rc::clone(&self.gl), self.float_linear, params, source)
    }

    async fn load_texture_2d(&self, path: &str, params: TextureParams) -> Result<WebGlTexture<C>> {
        let bytes = self.reader.read_bytes(path).await?;
        let image = DecodedImage::decode(&bytes)?;
        let params = TextureParams {
            channels: Channels::Rgba,
            format: TextureFormat::Uint8,
            ..params
        };
        self.create_texture_2d(params, TextureSource::Image(&image))
    }

    #[inline]
    fn default_framebuffer(&self) -> &WebGlDefaultFramebuffer<C> {
        &self.default_framebuffer
    }

    fn resize_default_framebuffer(&self, width: u32, height: u32) -> Result<()> {
        self.default_framebuffer.resize(width, height)
    }

    fn create_framebuffer(
        &self,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> Result<WebGlFramebuffer<C>> {
        WebGlFramebuffer::new(Rc::clone(&self.gl), width, height, with_depth)
    }

    fn set_blending(&self, mode: BlendMode) {
        framebuffer::apply_blending(&*self.gl, mode);
    }

    fn set_cull_face(&self, mode: CullMode) {
        match mode {
            CullMode::None => self.gl.disable(glow::CULL_FACE),
            CullMode::Front | CullMode::Back => {
                self.gl.enable(glow::CULL_FACE);
                self.gl.cull_face(if mode == CullMode::Front {
                    glow::FRONT
                } else {
                    glow::BACK
                });
            }
        }
    }
}
