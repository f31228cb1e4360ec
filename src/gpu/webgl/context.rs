//! The raw GL surface the WebGL backend is written against.
//!
//! [`GlContext`] is the subset of OpenGL ES 3.0 / WebGL2 the backend issues,
//! with `glow` naming and argument order. Two implementations exist:
//!
//! - `glow::Context`: a real WebGL2 context on wasm32 or a desktop/ES
//!   context natively.
//! - `HeadlessGl` (feature `headless`): an in-memory emulation for tests and
//!   CI machines without a GPU.
//!
//! Unlike `glow::HasContext`, every method here is safe: the backend only
//! passes handles it created on the same context.

use std::fmt::Debug;

use glow::HasContext;

/// API version reported by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    /// OpenGL ES or WebGL rather than desktop GL.
    pub is_embedded: bool,
}

pub trait GlContext {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Buffer: Copy + Debug;
    type VertexArray: Copy + Debug;
    type Texture: Copy + Debug;
    type Framebuffer: Copy + Debug;
    type Renderbuffer: Copy + Debug;
    type UniformLocation: Clone + Debug;

    // --- Capabilities -----------------------------------------------------

    fn version(&self) -> GlVersion;
    fn has_extension(&self, name: &str) -> bool;
    fn get_error(&self) -> u32;

    // --- Global state -----------------------------------------------------

    fn enable(&self, capability: u32);
    fn disable(&self, capability: u32);
    fn cull_face(&self, mode: u32);
    fn blend_equation(&self, mode: u32);
    fn blend_func(&self, src: u32, dst: u32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn pixel_store_i32(&self, parameter: u32, value: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_depth(&self, depth: f32);
    fn clear(&self, mask: u32);

    // --- Shaders & programs -----------------------------------------------

    fn create_shader(&self, kind: u32) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn get_shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn get_program_link_status(&self, program: Self::Program) -> bool;
    fn get_program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);
    fn get_uniform_location(&self, program: Self::Program, name: &str)
    -> Option<Self::UniformLocation>;

    /// `glUniform{components}iv`; `data.len()` is a multiple of `components`.
    fn uniform_i32(&self, location: &Self::UniformLocation, components: usize, data: &[i32]);
    /// `glUniform{components}uiv`.
    fn uniform_u32(&self, location: &Self::UniformLocation, components: usize, data: &[u32]);
    /// `glUniform{components}fv`.
    fn uniform_f32(&self, location: &Self::UniformLocation, components: usize, data: &[f32]);
    /// `glUniformMatrix{dims}fv`.
    fn uniform_matrix_f32(
        &self,
        location: &Self::UniformLocation,
        dims: usize,
        transpose: bool,
        data: &[f32],
    );

    // --- Textures ---------------------------------------------------------

    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn delete_texture(&self, texture: Self::Texture);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>);
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    fn generate_mipmap(&self, target: u32);

    // --- Buffers & vertex arrays ------------------------------------------

    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>);
    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);

    // --- Framebuffers -----------------------------------------------------

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String>;
    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer);
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>);
    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<Self::Texture>,
        level: i32,
    );
    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<Self::Renderbuffer>,
    );
    fn check_framebuffer_status(&self, target: u32) -> u32;
    fn draw_buffers(&self, buffers: &[u32]);
    fn read_buffer(&self, source: u32);
    fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    );

    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String>;
    fn delete_renderbuffer(&self, renderbuffer: Self::Renderbuffer);
    fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<Self::Renderbuffer>);
    fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32);
}

// ============================================================================
// glow
// ============================================================================

impl GlContext for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Texture = glow::Texture;
    type Framebuffer = glow::Framebuffer;
    type Renderbuffer = glow::Renderbuffer;
    type UniformLocation = glow::UniformLocation;

    fn version(&self) -> GlVersion {
        let version = HasContext::version(self);
        GlVersion {
            major: version.major,
            minor: version.minor,
            is_embedded: version.is_embedded,
        }
    }

    fn has_extension(&self, name: &str) -> bool {
        self.supported_extensions().contains(name)
    }

    fn get_error(&self) -> u32 {
        unsafe { HasContext::get_error(self) }
    }

    fn enable(&self, capability: u32) {
        unsafe { HasContext::enable(self, capability) }
    }

    fn disable(&self, capability: u32) {
        unsafe { HasContext::disable(self, capability) }
    }

    fn cull_face(&self, mode: u32) {
        unsafe { HasContext::cull_face(self, mode) }
    }

    fn blend_equation(&self, mode: u32) {
        unsafe { HasContext::blend_equation(self, mode) }
    }

    fn blend_func(&self, src: u32, dst: u32) {
        unsafe { HasContext::blend_func(self, src, dst) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn pixel_store_i32(&self, parameter: u32, value: i32) {
        unsafe { HasContext::pixel_store_i32(self, parameter, value) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { HasContext::clear_depth_f32(self, depth) }
    }

    fn clear(&self, mask: u32) {
        unsafe { HasContext::clear(self, mask) }
    }

    fn create_shader(&self, kind: u32) -> Result<Self::Shader, String> {
        unsafe { HasContext::create_shader(self, kind) }
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { HasContext::get_shader_compile_status(self, shader) }
    }

    fn get_shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { HasContext::get_shader_info_log(self, shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn get_program_link_status(&self, program: Self::Program) -> bool {
        unsafe { HasContext::get_program_link_status(self, program) }
    }

    fn get_program_info_log(&self, program: Self::Program) -> String {
        unsafe { HasContext::get_program_info_log(self, program) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn get_uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        unsafe { HasContext::get_uniform_location(self, program, name) }
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, components: usize, data: &[i32]) {
        let location = Some(location);
        unsafe {
            match components {
                1 => self.uniform_1_i32_slice(location, data),
                2 => self.uniform_2_i32_slice(location, data),
                3 => self.uniform_3_i32_slice(location, data),
                4 => self.uniform_4_i32_slice(location, data),
                _ => log::error!("glUniform*iv called with {components} components"),
            }
        }
    }

    fn uniform_u32(&self, location: &Self::UniformLocation, components: usize, data: &[u32]) {
        let location = Some(location);
        unsafe {
            match components {
                1 => self.uniform_1_u32_slice(location, data),
                2 => self.uniform_2_u32_slice(location, data),
                3 => self.uniform_3_u32_slice(location, data),
                4 => self.uniform_4_u32_slice(location, data),
                _ => log::error!("glUniform*uiv called with {components} components"),
            }
        }
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, components: usize, data: &[f32]) {
        let location = Some(location);
        unsafe {
            match components {
                1 => self.uniform_1_f32_slice(location, data),
                2 => self.uniform_2_f32_slice(location, data),
                3 => self.uniform_3_f32_slice(location, data),
                4 => self.uniform_4_f32_slice(location, data),
                _ => log::error!("glUniform*fv called with {components} components"),
            }
        }
    }

    fn uniform_matrix_f32(
        &self,
        location: &Self::UniformLocation,
        dims: usize,
        transpose: bool,
        data: &[f32],
    ) {
        let location = Some(location);
        unsafe {
            match dims {
                2 => self.uniform_matrix_2_f32_slice(location, transpose, data),
                3 => self.uniform_matrix_3_f32_slice(location, transpose, data),
                4 => self.uniform_matrix_4_f32_slice(location, transpose, data),
                _ => log::error!("glUniformMatrix*fv called with {dims}x{dims} matrix"),
            }
        }
    }

    fn create_texture(&self) -> Result<Self::Texture, String> {
        unsafe { HasContext::create_texture(self) }
    }

    fn delete_texture(&self, texture: Self::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, unit) }
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        unsafe { HasContext::bind_texture(self, target, texture) }
    }

    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            HasContext::tex_image_2d(
                self,
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            );
        }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { HasContext::tex_parameter_i32(self, target, parameter, value) }
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { HasContext::generate_mipmap(self, target) }
    }

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        unsafe { HasContext::bind_buffer(self, target, buffer) }
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { HasContext::buffer_data_u8_slice(self, target, data, usage) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        unsafe { HasContext::create_vertex_array(self) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        unsafe { HasContext::bind_vertex_array(self, vertex_array) }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }

    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(
                self, index, size, data_type, normalized, stride, offset,
            );
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { HasContext::draw_arrays(self, mode, first, count) }
    }

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String> {
        unsafe { HasContext::create_framebuffer(self) }
    }

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer) {
        unsafe { HasContext::delete_framebuffer(self, framebuffer) }
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<Self::Framebuffer>) {
        unsafe { HasContext::bind_framebuffer(self, target, framebuffer) }
    }

    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<Self::Texture>,
        level: i32,
    ) {
        unsafe {
            HasContext::framebuffer_texture_2d(
                self,
                target,
                attachment,
                texture_target,
                texture,
                level,
            );
        }
    }

    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer_target: u32,
        renderbuffer: Option<Self::Renderbuffer>,
    ) {
        unsafe {
            HasContext::framebuffer_renderbuffer(
                self,
                target,
                attachment,
                renderbuffer_target,
                renderbuffer,
            );
        }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { HasContext::check_framebuffer_status(self, target) }
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        unsafe { HasContext::draw_buffers(self, buffers) }
    }

    fn read_buffer(&self, source: u32) {
        unsafe { HasContext::read_buffer(self, source) }
    }

    fn read_pixels(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    ) {
        unsafe {
            HasContext::read_pixels(
                self,
                x,
                y,
                width,
                height,
                format,
                ty,
                glow::PixelPackData::Slice(Some(pixels)),
            );
        }
    }

    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String> {
        unsafe { HasContext::create_renderbuffer(self) }
    }

    fn delete_renderbuffer(&self, renderbuffer: Self::Renderbuffer) {
        unsafe { HasContext::delete_renderbuffer(self, renderbuffer) }
    }

    fn bind_renderbuffer(&self, target: u32, renderbuffer: Option<Self::Renderbuffer>) {
        unsafe { HasContext::bind_renderbuffer(self, target, renderbuffer) }
    }

    fn renderbuffer_storage(&self, target: u32, internal_format: u32, width: i32, height: i32) {
        unsafe { HasContext::renderbuffer_storage(self, target, internal_format, width, height) }
    }
}
