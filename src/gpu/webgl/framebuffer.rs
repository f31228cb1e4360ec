use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

use super::context::GlContext;
use super::mapper;
use super::texture::WebGlTexture;
use crate::errors::{Result, UmbraError};
use crate::gpu::types::{BlendMode, Extent, TextureDescriptor};
use crate::gpu::{Framebuffer, RenderTarget, Texture2D};

/// State shared by every bind: blending off, viewport to size, depth test
/// on iff the target has a depth surface.
fn apply_bind_state<C: GlContext>(gl: &C, size: Extent, depth: bool) {
    gl.disable(glow::BLEND);
    gl.viewport(0, 0, size.width as i32, size.height as i32);
    if depth {
        gl.enable(glow::DEPTH_TEST);
    } else {
        gl.disable(glow::DEPTH_TEST);
    }
}

fn apply_clear<C: GlContext>(gl: &C, color: [f32; 4], depth: Option<f32>, has_depth: bool) {
    let [r, g, b, a] = color;
    gl.clear_color(r, g, b, a);
    let mut mask = glow::COLOR_BUFFER_BIT;
    if let Some(depth) = depth.filter(|_| has_depth) {
        gl.clear_depth(depth);
        mask |= glow::DEPTH_BUFFER_BIT;
    }
    gl.clear(mask);
}

pub(crate) fn apply_blending<C: GlContext>(gl: &C, mode: BlendMode) {
    match mode {
        BlendMode::None => gl.disable(glow::BLEND),
        BlendMode::Add => {
            gl.enable(glow::BLEND);
            gl.blend_equation(glow::FUNC_ADD);
            gl.blend_func(glow::ONE, glow::ONE);
        }
    }
}

// ============================================================================
// Default framebuffer
// ============================================================================

/// The canvas / window surface.
pub struct WebGlDefaultFramebuffer<C: GlContext> {
    gl: Rc<C>,
    size: Cell<Extent>,
    with_depth: bool,
}

impl<C: GlContext> WebGlDefaultFramebuffer<C> {
    pub(crate) fn new(gl: Rc<C>, width: u32, height: u32, with_depth: bool) -> Self {
        Self {
            gl,
            size: Cell::new(Extent::new(width, height)),
            with_depth,
        }
    }
}

impl<C: GlContext> RenderTarget for WebGlDefaultFramebuffer<C> {
    fn bind(&self) -> Result<()> {
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        apply_bind_state(&*self.gl, self.size.get(), self.with_depth);
        Ok(())
    }

    fn clear(&self, color: [f32; 4], depth: Option<f32>) {
        apply_clear(&*self.gl, color, depth, self.with_depth);
    }

    /// Records the new surface size; the surface itself is resized by its owner.
    fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.size.set(Extent::new(width, height));
        Ok(())
    }

    #[inline]
    fn size(&self) -> Extent {
        self.size.get()
    }

    #[inline]
    fn has_depth(&self) -> bool {
        self.with_depth
    }

    fn set_blending(&self, mode: BlendMode) {
        apply_blending(&*self.gl, mode);
    }
}

// ============================================================================
// Offscreen framebuffer
// ============================================================================

/// An FBO with texture color attachments and an optional `DEPTH_COMPONENT32F`
/// renderbuffer.
pub struct WebGlFramebuffer<C: GlContext> {
    gl: Rc<C>,
    handle: C::Framebuffer,
    depth: Cell<Option<C::Renderbuffer>>,
    with_depth: bool,
    size: Cell<Extent>,
    attachments: RefCell<SmallVec<[TextureDescriptor; 4]>>,
}

impl<C: GlContext> WebGlFramebuffer<C> {
    pub(crate) fn new(gl: Rc<C>, width: u32, height: u32, with_depth: bool) -> Result<Self> {
        let handle = gl
            .create_framebuffer()
            .map_err(UmbraError::GlObjectCreation)?;
        let framebuffer = Self {
            gl,
            handle,
            depth: Cell::new(None),
            with_depth,
            size: Cell::new(Extent::new(width, height)),
            attachments: RefCell::new(SmallVec::new()),
        };
        if with_depth {
            framebuffer.allocate_depth()?;
        }
        Ok(framebuffer)
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> C::Framebuffer {
        self.handle
    }

    /// Replaces the depth renderbuffer with one matching the current size.
    fn allocate_depth(&self) -> Result<()> {
        let gl = &*self.gl;
        let size = self.size.get();
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.handle));
        if let Some(old) = self.depth.take() {
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                None,
            );
            gl.delete_renderbuffer(old);
        }
        let renderbuffer = gl
            .create_renderbuffer()
            .map_err(UmbraError::GlObjectCreation)?;
        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
        gl.renderbuffer_storage(
            glow::RENDERBUFFER,
            glow::DEPTH_COMPONENT32F,
            size.width as i32,
            size.height as i32,
        );
        gl.framebuffer_renderbuffer(
            glow::FRAMEBUFFER,
            glow::DEPTH_ATTACHMENT,
            glow::RENDERBUFFER,
            Some(renderbuffer),
        );
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        self.depth.set(Some(renderbuffer));
        Ok(())
    }

    /// Descriptor of the texture attached at `slot`.
    #[must_use]
    pub fn attachment(&self, slot: usize) -> Option<TextureDescriptor> {
        self.attachments.borrow().get(slot).copied()
    }
}

impl<C: GlContext> RenderTarget for WebGlFramebuffer<C> {
    fn bind(&self) -> Result<()> {
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.handle));
        apply_bind_state(&*self.gl, self.size.get(), self.with_depth);
        Ok(())
    }

    fn clear(&self, color: [f32; 4], depth: Option<f32>) {
        apply_clear(&*self.gl, color, depth, self.with_depth);
    }

    /// Reallocates the depth surface. Color attachments keep their storage;
    /// callers swap them through [`Framebuffer::set_attachments`].
    fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.size.set(Extent::new(width, height));
        if self.with_depth {
            self.allocate_depth()?;
        }
        Ok(())
    }

    #[inline]
    fn size(&self) -> Extent {
        self.size.get()
    }

    #[inline]
    fn has_depth(&self) -> bool {
        self.with_depth
    }

    fn set_blending(&self, mode: BlendMode) {
        apply_blending(&*self.gl, mode);
    }
}

impl<C: GlContext> Framebuffer for WebGlFramebuffer<C> {
    type Texture = WebGlTexture<C>;

    /// Every texture must match the framebuffer's size; a mismatch is
    /// rejected before anything is attached.
    fn set_attachments(&self, textures: &[&WebGlTexture<C>]) -> Result<()> {
        let size = self.size.get();
        for (slot, texture) in textures.iter().enumerate() {
            let descriptor = texture.descriptor();
            if descriptor.width != size.width || descriptor.height != size.height {
                log::error!(
                    "Attachment {slot} is {}x{}, framebuffer is {}x{}",
                    descriptor.width,
                    descriptor.height,
                    size.width,
                    size.height
                );
                return Err(UmbraError::AttachmentSizeMismatch {
                    slot,
                    expected_width: size.width,
                    expected_height: size.height,
                    width: descriptor.width,
                    height: descriptor.height,
                });
            }
        }

        let handles = textures
            .iter()
            .map(|texture| texture.handle())
            .collect::<Result<SmallVec<[C::Texture; 4]>>>()?;

        let gl = &*self.gl;
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.handle));

        let previous = self.attachments.borrow().len();
        for slot in handles.len()..previous {
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0 + slot as u32,
                glow::TEXTURE_2D,
                None,
                0,
            );
        }

        let mut draw_buffers = SmallVec::<[u32; 4]>::new();
        for (slot, handle) in handles.iter().enumerate() {
            let attachment = glow::COLOR_ATTACHMENT0 + slot as u32;
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment,
                glow::TEXTURE_2D,
                Some(*handle),
                0,
            );
            draw_buffers.push(attachment);
        }
        if draw_buffers.is_empty() {
            draw_buffers.push(glow::NONE);
        }
        gl.draw_buffers(&draw_buffers);

        *self.attachments.borrow_mut() = textures.iter().map(|t| *t.descriptor()).collect();

        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            log::error!(
                "Framebuffer incomplete after attaching {} textures: 0x{status:04X}",
                textures.len()
            );
            return Err(UmbraError::FramebufferIncomplete { status });
        }
        Ok(())
    }

    #[inline]
    fn attachment_count(&self) -> usize {
        self.attachments.borrow().len()
    }

    fn read_pixels(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        slot: usize,
        dst: &mut [u8],
        dst_offset: usize,
    ) -> Result<()> {
        let descriptor = self
            .attachment(slot)
            .ok_or(UmbraError::AttachmentOutOfRange {
                slot,
                count: self.attachment_count(),
            })?;

        if x.saturating_add(width) > descriptor.width || y.saturating_add(height) > descriptor.height {
            return Err(UmbraError::ReadbackOutOfBounds(format!(
                "rect {x},{y} {width}x{height} exceeds {}x{} attachment",
                descriptor.width, descriptor.height
            )));
        }
        let len = width as usize * height as usize * descriptor.params.pixel_byte_size();
        let Some(target) = dst_offset
            .checked_add(len)
            .and_then(|end| dst.get_mut(dst_offset..end))
        else {
            return Err(UmbraError::ReadbackOutOfBounds(format!(
                "{len} bytes at offset {dst_offset} exceed a {} byte buffer",
                dst.len()
            )));
        };

        let native = mapper::format(descriptor.params.channels, descriptor.params.format);
        // Blend and viewport state belong to the caller's pass.
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.handle));
        self.gl.read_buffer(glow::COLOR_ATTACHMENT0 + slot as u32);
        self.gl.read_pixels(
            x as i32,
            y as i32,
            width as i32,
            height as i32,
            native.format,
            native.ty,
            target,
        );
        Ok(())
    }
}

impl<C: GlContext> Drop for WebGlFramebuffer<C> {
    fn drop(&mut self) {
        if let Some(renderbuffer) = self.depth.take() {
            self.gl.delete_renderbuffer(renderbuffer);
        }
        self.gl.delete_framebuffer(self.handle);
    }
}
