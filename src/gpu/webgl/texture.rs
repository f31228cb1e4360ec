use std::cell::Cell;
use std::rc::Rc;

use super::context::GlContext;
use super::mapper;
use crate::errors::{Result, UmbraError};
use crate::gpu::types::{Channels, TextureDescriptor, TextureFormat, TextureParams, TextureSource};
use crate::gpu::Texture2D;

/// A `TEXTURE_2D` owned by one GL context.
///
/// Dropping a texture that was never freed releases it.
pub struct WebGlTexture<C: GlContext> {
    gl: Rc<C>,
    handle: Cell<Option<C::Texture>>,
    descriptor: TextureDescriptor,
}

impl<C: GlContext> std::fmt::Debug for WebGlTexture<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGlTexture")
            .field("handle", &self.handle.get())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl<C: GlContext> WebGlTexture<C> {
    /// Creation runs after `initialize` proved float targets, so only float
    /// filtering varies between contexts.
    pub(crate) fn new(
        gl: Rc<C>,
        float_linear: bool,
        params: TextureParams,
        source: TextureSource<'_>,
    ) -> Result<Self> {
        let mut params = params;
        let flipped;
        let pixels = match source {
            TextureSource::Empty { .. } => None,
            TextureSource::Buffer {
                width,
                height,
                data,
            } => {
                let expected = TextureDescriptor::new(width, height, params).byte_size();
                if data.len() < expected {
                    return Err(UmbraError::InvalidTextureData(format!(
                        "{width}x{height} {}x{} needs {expected} bytes, got {}",
                        params.channels.count(),
                        params.format.name(),
                        data.len()
                    )));
                }
                Some(&data[..expected])
            }
            TextureSource::Image(image) => {
                params.channels = Channels::Rgba;
                params.format = TextureFormat::Uint8;
                // GL rows run bottom-up.
                flipped = image.rows_bottom_up();
                Some(flipped.as_slice())
            }
        };

        let native = mapper::format(params.channels, params.format);
        if params.mipmap && !mapper::can_generate_mipmap(native.internal_format, true, float_linear)
        {
            return Err(UmbraError::MipmapUnsupported(format!(
                "{}x{}",
                params.channels.count(),
                params.format.name()
            )));
        }

        let size = source.size();
        let descriptor = TextureDescriptor::new(size.width, size.height, params);

        let handle = gl.create_texture().map_err(UmbraError::GlObjectCreation)?;
        gl.bind_texture(glow::TEXTURE_2D, Some(handle));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            native.internal_format as i32,
            size.width as i32,
            size.height as i32,
            native.format,
            native.ty,
            pixels,
        );
        if params.mipmap {
            gl.generate_mipmap(glow::TEXTURE_2D);
        }
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_S,
            mapper::wrap_mode(params.wrap_x) as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_WRAP_T,
            mapper::wrap_mode(params.wrap_y) as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MIN_FILTER,
            mapper::min_filter(params.min_filter) as i32,
        );
        gl.tex_parameter_i32(
            glow::TEXTURE_2D,
            glow::TEXTURE_MAG_FILTER,
            mapper::mag_filter(params.mag_filter) as i32,
        );
        gl.bind_texture(glow::TEXTURE_2D, None);

        log::debug!(
            "Created {}x{} texture ({}x{})",
            size.width,
            size.height,
            params.channels.count(),
            params.format.name()
        );

        Ok(Self {
            gl,
            handle: Cell::new(Some(handle)),
            descriptor,
        })
    }
}

impl<C: GlContext> Texture2D for WebGlTexture<C> {
    type Handle = C::Texture;

    #[inline]
    fn handle(&self) -> Result<C::Texture> {
        self.handle.get().ok_or(UmbraError::ResourceFreed("texture"))
    }

    #[inline]
    fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    fn free(&self) -> Result<()> {
        let handle = self
            .handle
            .take()
            .ok_or(UmbraError::ResourceFreed("texture"))?;
        self.gl.delete_texture(handle);
        Ok(())
    }

    #[inline]
    fn is_freed(&self) -> bool {
        self.handle.get().is_none()
    }
}

impl<C: GlContext> Drop for WebGlTexture<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.gl.delete_texture(handle);
        }
    }
}
