//! GPU Abstraction Layer
//!
//! The contract a render stage talks to, independent of the graphics API
//! underneath. A backend provides one [`GpuApi`] implementation plus the four
//! resource kinds it hands out:
//!
//! | Trait               | Owns                                        |
//! |---------------------|---------------------------------------------|
//! | [`Texture2D`]       | one texture handle + its descriptor         |
//! | [`Geometry`]        | one vertex buffer with the fixed layout     |
//! | [`ShaderProgram`]   | one linked program + resolved uniform slots |
//! | [`Framebuffer`]     | color attachments + optional depth surface  |
//!
//! The default (swapchain) target shares [`RenderTarget`] with offscreen
//! framebuffers but cannot take attachments or be read back.
//!
//! # Threading
//!
//! All resources are bound to the thread that created the context. Loading
//! futures suspend only on asset I/O; they cannot be cancelled and impose no
//! timeout, so a stalled fetch stalls the caller until the transport gives up.

pub mod types;
pub mod uniforms;
pub mod webgl;

#[cfg(feature = "webgpu")]
pub mod webgpu;

use std::future::Future;

use crate::errors::Result;

pub use types::{
    BlendMode, Channels, CullMode, Extent, MagFilter, MinFilter, TextureDescriptor,
    TextureFormat, TextureParams, TextureSource, WrapMode,
};
pub use uniforms::{UniformSchema, UniformValue};

/// Floats per interleaved vertex: position(3) uv(2) normal(3) tangent(4).
pub const FLOATS_PER_VERTEX: usize = 12;

/// Byte stride of one interleaved vertex.
pub const VERTEX_STRIDE: usize = FLOATS_PER_VERTEX * std::mem::size_of::<f32>();

// ============================================================================
// Resources
// ============================================================================

/// A GPU texture. Its handle stays valid until [`free`](Texture2D::free).
pub trait Texture2D {
    type Handle: Copy;

    /// Backend handle for binding. Fails once the texture has been freed.
    fn handle(&self) -> Result<Self::Handle>;

    fn descriptor(&self) -> &TextureDescriptor;

    /// `width × height × pixel_byte_size`.
    fn byte_size(&self) -> usize {
        self.descriptor().byte_size()
    }

    /// Releases the backend storage. Freeing twice is reported, not ignored.
    fn free(&self) -> Result<()>;

    fn is_freed(&self) -> bool;
}

/// A vertex buffer drawn as a triangle list.
pub trait Geometry {
    fn draw(&self) -> Result<()>;

    fn free(&self) -> Result<()>;

    fn vertex_count(&self) -> usize;
}

/// A linked program whose uniforms are addressed through schema `S`.
pub trait ShaderProgram<S: UniformSchema> {
    type Texture: Texture2D;

    fn use_program(&self);

    /// Uploads a single scalar or vector; the slice length picks the arity.
    fn set_uniform(&self, slot: S, value: UniformValue<'_>) -> Result<()>;

    /// Uploads an array of `components`-wide vectors.
    fn set_uniform_array(&self, slot: S, value: UniformValue<'_>, components: usize)
    -> Result<()>;

    /// Uploads one or more square `dims × dims` matrices.
    fn set_uniform_matrix_array(
        &self,
        slot: S,
        dims: usize,
        transpose: bool,
        data: &[f32],
    ) -> Result<()>;

    /// Binds textures to units `0..n` in order and points each sampler at its unit.
    fn set_samplers(&self, bindings: &[(S, &Self::Texture)]) -> Result<()>;
}

// ============================================================================
// Render Targets
// ============================================================================

/// Anything a draw can be directed at.
pub trait RenderTarget {
    /// Makes this the active destination, sets the viewport to its size and
    /// toggles depth testing on whether it owns a depth surface.
    fn bind(&self) -> Result<()>;

    /// Clears color; clears depth only when a depth surface exists and
    /// `depth` is given.
    fn clear(&self, color: [f32; 4], depth: Option<f32>);

    fn resize(&self, width: u32, height: u32) -> Result<()>;

    fn size(&self) -> Extent;

    fn has_depth(&self) -> bool;

    fn set_blending(&self, mode: BlendMode);
}

/// An offscreen render target with texture attachments.
pub trait Framebuffer: RenderTarget {
    type Texture: Texture2D;

    /// Replaces the color attachments with `textures`, bound to
    /// `COLOR_ATTACHMENT0..n` in order. Fails if the result is incomplete.
    fn set_attachments(&self, textures: &[&Self::Texture]) -> Result<()>;

    fn attachment_count(&self) -> usize;

    /// Reads a rectangle of attachment `slot` into `dst[dst_offset..]`,
    /// interpreted with that attachment's own format. Leaves this framebuffer
    /// bound without touching blend or viewport state.
    fn read_pixels(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        slot: usize,
        dst: &mut [u8],
        dst_offset: usize,
    ) -> Result<()>;
}

// ============================================================================
// Facade
// ============================================================================

/// Single entry point a pipeline stage uses to create GPU resources.
pub trait GpuApi {
    type Texture: Texture2D;
    type Geometry: Geometry;
    type Framebuffer: Framebuffer<Texture = Self::Texture>;
    type DefaultFramebuffer: RenderTarget;
    type Shader<S: UniformSchema>: ShaderProgram<S, Texture = Self::Texture>;

    /// Uploads interleaved vertices; `vertices.len()` must be a multiple of 12.
    fn create_geometry(&self, vertices: &[f32]) -> Result<Self::Geometry>;

    /// Fetches and parses `.obj` or `.raw` geometry.
    fn load_geometry(&self, path: &str) -> impl Future<Output = Result<Self::Geometry>>;

    /// Fetches both stages, resolves their includes and links them.
    fn create_shader<S: UniformSchema>(
        &self,
        vertex_path: &str,
        fragment_path: &str,
    ) -> impl Future<Output = Result<Self::Shader<S>>>;

    /// Links already-resolved GLSL sources.
    fn create_shader_from_source<S: UniformSchema>(
        &self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self::Shader<S>>;

    fn create_texture_2d(
        &self,
        params: TextureParams,
        source: TextureSource<'_>,
    ) -> Result<Self::Texture>;

    /// Fetches and decodes an image into an RGBA8 texture. The channel
    /// layout and format in `params` are replaced by the image's.
    fn load_texture_2d(
        &self,
        path: &str,
        params: TextureParams,
    ) -> impl Future<Output = Result<Self::Texture>>;

    fn default_framebuffer(&self) -> &Self::DefaultFramebuffer;

    fn resize_default_framebuffer(&self, width: u32, height: u32) -> Result<()>;

    fn create_framebuffer(
        &self,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> Result<Self::Framebuffer>;

    fn set_blending(&self, mode: BlendMode);

    fn set_cull_face(&self, mode: CullMode);
}
