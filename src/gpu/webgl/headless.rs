//! In-memory GL emulation.
//!
//! [`HeadlessGl`] implements [`GlContext`] without a GPU. It tracks object
//! lifetimes and binding state, validates calls the way an ES 3.0 driver does
//! (framebuffer completeness, format/type pairs, program state), and keeps
//! real texel storage so clears and readbacks round-trip.
//!
//! Draws are validated and recorded. `TRIANGLES` draws into an offscreen
//! framebuffer are also rasterized flat when the program declares a
//! `fillColor` uniform: attribute 0 supplies clip-space `xy` (with `w = 1`),
//! covered pixel centers receive the last `fillColor` upload in every draw
//! buffer, and `(ONE, ONE)` blending adds to the stored value. Culling
//! follows `CULL_FACE` with counter-clockwise front faces. Depth testing and
//! other programs' shading are not emulated.
//!
//! Shaders compile unless their source contains an `#error` directive or is
//! empty; programs link when both stages compiled and declare `main`. Uniform
//! locations resolve for every `uniform` declaration found in either stage.
//!
//! # Usage
//!
//! ```rust,ignore
//! let gl = Rc::new(HeadlessGl::new());
//! let api = WebGlApi::initialize(Rc::clone(&gl), reader, 64, 64, true)?;
//! // ... exercise the backend ...
//! assert_eq!(gl.live(GlObjectKind::Texture), 0);
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use super::context::{GlContext, GlVersion};
use super::mapper;
use crate::gpu::types::TextureFormat;

/// Not exposed by every GL header; identical value across ES 2.0 and WebGL.
pub const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: u32 = 0x8CD9;

/// Opaque object name handed out by [`HeadlessGl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadlessHandle(u32);

impl HeadlessHandle {
    #[inline]
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

/// A resolved uniform: owning program and declaration index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadlessUniform {
    program: u32,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlObjectKind {
    Shader,
    Program,
    Buffer,
    VertexArray,
    Texture,
    Framebuffer,
    Renderbuffer,
}

impl GlObjectKind {
    const COUNT: usize = 7;

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Last value uploaded to a uniform.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Int { components: usize, data: Vec<i32> },
    UInt { components: usize, data: Vec<u32> },
    Float { components: usize, data: Vec<f32> },
    Matrix { dims: usize, transpose: bool, data: Vec<f32> },
}

/// State captured at each `draw_arrays`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: u32,
    pub first: i32,
    pub count: i32,
    pub program: HeadlessHandle,
    pub vertex_array: HeadlessHandle,
    /// `None` for the default framebuffer.
    pub framebuffer: Option<HeadlessHandle>,
    pub blend: bool,
    pub depth_test: bool,
    pub cull_face: Option<u32>,
}

/// State captured at each `clear`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearCall {
    pub framebuffer: Option<HeadlessHandle>,
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
}

// ============================================================================
// Object storage
// ============================================================================

#[derive(Debug)]
struct ShaderObject {
    kind: u32,
    source: String,
    compiled: bool,
    info_log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<u32>,
    linked: bool,
    info_log: String,
    uniforms: Vec<String>,
    values: FxHashMap<usize, UniformData>,
}

/// One `glVertexAttribPointer` record.
#[derive(Debug, Clone, Copy)]
struct AttributePointer {
    buffer: u32,
    size: i32,
    data_type: u32,
    stride: i32,
    offset: i32,
}

#[derive(Debug, Default)]
struct VertexArrayObject {
    enabled: FxHashSet<u32>,
    attributes: BTreeMap<u32, AttributePointer>,
}

#[derive(Debug)]
struct TextureObject {
    width: i32,
    height: i32,
    internal_format: u32,
    format: u32,
    ty: u32,
    pixel_byte_size: usize,
    data: Vec<u8>,
    parameters: FxHashMap<u32, i32>,
    mipmapped: bool,
}

#[derive(Debug)]
struct RenderbufferObject {
    internal_format: u32,
    width: i32,
    height: i32,
    depth: Vec<f32>,
}

#[derive(Debug)]
struct FramebufferObject {
    colors: BTreeMap<u32, u32>,
    depth: Option<u32>,
    draw_buffers: Vec<u32>,
    read_buffer: u32,
}

impl Default for FramebufferObject {
    fn default() -> Self {
        Self {
            colors: BTreeMap::new(),
            depth: None,
            draw_buffers: vec![glow::COLOR_ATTACHMENT0],
            read_buffer: glow::COLOR_ATTACHMENT0,
        }
    }
}

#[derive(Debug)]
struct State {
    next_name: u32,
    errors: Vec<u32>,
    created: [usize; GlObjectKind::COUNT],
    deleted: [usize; GlObjectKind::COUNT],

    shaders: FxHashMap<u32, ShaderObject>,
    programs: FxHashMap<u32, ProgramObject>,
    buffers: FxHashMap<u32, Vec<u8>>,
    vertex_arrays: FxHashMap<u32, VertexArrayObject>,
    textures: FxHashMap<u32, TextureObject>,
    renderbuffers: FxHashMap<u32, RenderbufferObject>,
    framebuffers: FxHashMap<u32, FramebufferObject>,

    capabilities: FxHashSet<u32>,
    cull_mode: u32,
    blend_equation: u32,
    blend_func: (u32, u32),
    viewport: [i32; 4],
    clear_color: [f32; 4],
    clear_depth: f32,
    pack_alignment: usize,
    unpack_alignment: usize,

    active_unit: u32,
    units: FxHashMap<u32, u32>,
    array_buffer: Option<u32>,
    vertex_array: Option<u32>,
    framebuffer: Option<u32>,
    renderbuffer: Option<u32>,
    program: Option<u32>,

    draws: Vec<DrawCall>,
    clears: Vec<ClearCall>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_name: 1,
            errors: Vec::new(),
            created: [0; GlObjectKind::COUNT],
            deleted: [0; GlObjectKind::COUNT],
            shaders: FxHashMap::default(),
            programs: FxHashMap::default(),
            buffers: FxHashMap::default(),
            vertex_arrays: FxHashMap::default(),
            textures: FxHashMap::default(),
            renderbuffers: FxHashMap::default(),
            framebuffers: FxHashMap::default(),
            capabilities: FxHashSet::default(),
            cull_mode: glow::BACK,
            blend_equation: glow::FUNC_ADD,
            blend_func: (glow::ONE, glow::ZERO),
            viewport: [0; 4],
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            pack_alignment: 4,
            unpack_alignment: 4,
            active_unit: 0,
            units: FxHashMap::default(),
            array_buffer: None,
            vertex_array: None,
            framebuffer: None,
            renderbuffer: None,
            program: None,
            draws: Vec::new(),
            clears: Vec::new(),
        }
    }
}

impl State {
    fn allocate(&mut self, kind: GlObjectKind) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        self.created[kind.slot()] += 1;
        name
    }

    fn release(&mut self, kind: GlObjectKind) {
        self.deleted[kind.slot()] += 1;
    }

    fn error(&mut self, code: u32, context: &str) {
        log::debug!("headless GL error 0x{code:04X}: {context}");
        self.errors.push(code);
    }

    fn bound_texture(&self) -> Option<u32> {
        self.units.get(&self.active_unit).copied()
    }

    fn framebuffer_status(&self, float_targets: bool) -> u32 {
        let Some(name) = self.framebuffer else {
            return glow::FRAMEBUFFER_COMPLETE;
        };
        let Some(fb) = self.framebuffers.get(&name) else {
            return glow::FRAMEBUFFER_UNSUPPORTED;
        };
        if fb.colors.is_empty() && fb.depth.is_none() {
            return glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }

        let mut sizes = Vec::with_capacity(fb.colors.len() + 1);
        for texture in fb.colors.values() {
            let Some(texture) = self.textures.get(texture) else {
                return glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            };
            if texture.width == 0
                || !mapper::is_color_renderable(texture.internal_format, float_targets)
            {
                return glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            }
            sizes.push((texture.width, texture.height));
        }
        if let Some(rb) = fb.depth {
            let Some(rb) = self.renderbuffers.get(&rb) else {
                return glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            };
            if rb.width == 0 || !is_depth_format(rb.internal_format) {
                return glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            }
            sizes.push((rb.width, rb.height));
        }
        if sizes.windows(2).any(|pair| pair[0] != pair[1]) {
            return FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
        }
        glow::FRAMEBUFFER_COMPLETE
    }
}

impl State {
    /// Window-space positions of `count` vertices from attribute 0.
    fn window_positions(&self, vertex_array: u32, first: i32, count: i32) -> Option<Vec<[f32; 2]>> {
        let vao = self.vertex_arrays.get(&vertex_array)?;
        if !vao.enabled.contains(&0) {
            return None;
        }
        let pointer = vao.attributes.get(&0)?;
        if pointer.data_type != glow::FLOAT || pointer.size < 2 {
            return None;
        }
        let bytes = self.buffers.get(&pointer.buffer)?;
        let stride = if pointer.stride == 0 {
            pointer.size as usize * 4
        } else {
            pointer.stride as usize
        };
        let [vx, vy, vw, vh] = self.viewport.map(|v| v as f32);

        (first.max(0)..first.max(0) + count.max(0))
            .map(|vertex| {
                let base = pointer.offset as usize + vertex as usize * stride;
                let x = f32::from_ne_bytes(bytes.get(base..base + 4)?.try_into().ok()?);
                let y = f32::from_ne_bytes(bytes.get(base + 4..base + 8)?.try_into().ok()?);
                Some([vx + (x + 1.0) * 0.5 * vw, vy + (y + 1.0) * 0.5 * vh])
            })
            .collect()
    }

    /// Uniform `fillColor` of `program`, padded to RGBA with opaque alpha.
    fn fill_color(&self, program: u32) -> Option<[f32; 4]> {
        let program = self.programs.get(&program)?;
        let index = program.uniforms.iter().position(|u| u == "fillColor")?;
        let UniformData::Float { data, .. } = program.values.get(&index)? else {
            return None;
        };
        let mut color = [0.0, 0.0, 0.0, 1.0];
        for (channel, value) in color.iter_mut().zip(data) {
            *channel = *value;
        }
        Some(color)
    }

    fn culls(&self, signed_area: f32) -> bool {
        if !self.capabilities.contains(&glow::CULL_FACE) {
            return false;
        }
        let front = signed_area > 0.0;
        match self.cull_mode {
            glow::FRONT => front,
            glow::BACK => !front,
            _ => true,
        }
    }

    /// Flat-fills `TRIANGLES` into the draw buffers of the bound framebuffer.
    fn rasterize(&mut self, program: u32, vertex_array: u32, first: i32, count: i32) {
        let Some(fb) = self.framebuffer.and_then(|fb| self.framebuffers.get(&fb)) else {
            return;
        };
        let Some(color) = self.fill_color(program) else {
            return;
        };
        let targets = fb
            .draw_buffers
            .iter()
            .filter_map(|buffer| {
                let index = buffer.checked_sub(glow::COLOR_ATTACHMENT0)?;
                fb.colors.get(&index).copied()
            })
            .collect::<Vec<_>>();
        let Some(positions) = self.window_positions(vertex_array, first, count) else {
            self.error(glow::INVALID_OPERATION, "attribute 0 does not hold float positions");
            return;
        };
        let additive = self.capabilities.contains(&glow::BLEND)
            && self.blend_equation == glow::FUNC_ADD
            && self.blend_func == (glow::ONE, glow::ONE);

        let mut covered = Vec::new();
        for triangle in positions.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]];
            let area = edge(a, b, c);
            if area == 0.0 || self.culls(area) {
                continue;
            }
            let [vx, vy, vw, vh] = self.viewport;
            let min_x = a[0].min(b[0]).min(c[0]).floor().max(vx as f32) as i32;
            let min_y = a[1].min(b[1]).min(c[1]).floor().max(vy as f32) as i32;
            let max_x = a[0].max(b[0]).max(c[0]).ceil().min((vx + vw) as f32) as i32;
            let max_y = a[1].max(b[1]).max(c[1]).ceil().min((vy + vh) as f32) as i32;
            for py in min_y..max_y {
                for px in min_x..max_x {
                    let p = [px as f32 + 0.5, py as f32 + 0.5];
                    let weights = [edge(b, c, p), edge(c, a, p), edge(a, b, p)];
                    let inside = if area > 0.0 {
                        weights.iter().all(|w| *w >= 0.0)
                    } else {
                        weights.iter().all(|w| *w <= 0.0)
                    };
                    if inside {
                        covered.push((px, py));
                    }
                }
            }
        }

        for texture in targets {
            let Some(texture) = self.textures.get_mut(&texture) else {
                continue;
            };
            let px = texture.pixel_byte_size;
            for &(x, y) in &covered {
                if x < 0 || y < 0 || x >= texture.width || y >= texture.height {
                    continue;
                }
                let start = (y as usize * texture.width as usize + x as usize) * px;
                let texel = &mut texture.data[start..start + px];
                let value = match decode_texel(texture.internal_format, texel) {
                    Some(existing) if additive => {
                        std::array::from_fn(|i| existing[i] + color[i])
                    }
                    _ => color,
                };
                if let Some(encoded) = encode_texel(texture.internal_format, value) {
                    texel.copy_from_slice(&encoded);
                }
            }
        }
    }
}

/// Twice the signed area of `(a, b, p)`; positive when counter-clockwise.
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn is_depth_format(internal_format: u32) -> bool {
    matches!(
        internal_format,
        glow::DEPTH_COMPONENT16
            | glow::DEPTH_COMPONENT24
            | glow::DEPTH_COMPONENT32F
            | glow::DEPTH24_STENCIL8
            | glow::DEPTH32F_STENCIL8
    )
}

/// Encodes a color for a color-renderable format. `None` for integer
/// formats, whose contents `glClear` leaves undefined.
fn encode_texel(internal_format: u32, color: [f32; 4]) -> Option<Vec<u8>> {
    let (channels, kind) = mapper::describe(internal_format)?;
    let color = &color[..channels.count()];
    let texel = match kind {
        TextureFormat::Uint8 => color
            .iter()
            .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect(),
        TextureFormat::Float16 => color
            .iter()
            .flat_map(|c| half::f16::from_f32(*c).to_ne_bytes())
            .collect(),
        TextureFormat::Float32 => color.iter().flat_map(|c| c.to_ne_bytes()).collect(),
        _ => return None,
    };
    Some(texel)
}

/// Inverse of [`encode_texel`]; missing channels read as zero.
fn decode_texel(internal_format: u32, texel: &[u8]) -> Option<[f32; 4]> {
    let (_, kind) = mapper::describe(internal_format)?;
    let values: Vec<f32> = match kind {
        TextureFormat::Uint8 => texel.iter().map(|&b| f32::from(b) / 255.0).collect(),
        TextureFormat::Float16 => texel
            .chunks_exact(2)
            .map(|c| half::f16::from_ne_bytes([c[0], c[1]]).to_f32())
            .collect(),
        TextureFormat::Float32 => texel
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        _ => return None,
    };
    let mut color = [0.0; 4];
    for (channel, value) in color.iter_mut().zip(values) {
        *channel = value;
    }
    Some(color)
}

const fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Collects identifiers declared with `uniform` in GLSL source.
fn declared_uniforms(source: &str, out: &mut Vec<String>) {
    const QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

    for line in source.lines() {
        let Some(rest) = line.trim().strip_prefix("uniform ") else {
            continue;
        };
        if rest.contains('{') {
            continue;
        }
        let declaration = rest.split(';').next().unwrap_or_default();
        let mut tokens = declaration
            .split_whitespace()
            .filter(|token| !QUALIFIERS.contains(token));
        // type
        if tokens.next().is_none() {
            continue;
        }
        let declarators = tokens.collect::<Vec<_>>().join(" ");
        for declarator in declarators.split(',') {
            let name = declarator.split('[').next().unwrap_or_default().trim();
            if !name.is_empty() && !out.iter().any(|known| known == name) {
                out.push(name.to_string());
            }
        }
    }
}

// ============================================================================
// HeadlessGl
// ============================================================================

/// A software stand-in for a WebGL2 context.
#[derive(Debug)]
pub struct HeadlessGl {
    extensions: FxHashSet<String>,
    state: RefCell<State>,
}

impl Default for HeadlessGl {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessGl {
    /// A context advertising `EXT_color_buffer_float`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_extensions(&["EXT_color_buffer_float"])
    }

    #[must_use]
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|&e| e.to_string()).collect(),
            state: RefCell::new(State::default()),
        }
    }

    fn float_targets(&self) -> bool {
        self.extensions.contains("EXT_color_buffer_float")
    }

    fn float_linear(&self) -> bool {
        self.extensions.contains("OES_texture_float_linear")
    }

    // --- Introspection ----------------------------------------------------

    #[must_use]
    pub fn created(&self, kind: GlObjectKind) -> usize {
        self.state.borrow().created[kind.slot()]
    }

    #[must_use]
    pub fn deleted(&self, kind: GlObjectKind) -> usize {
        self.state.borrow().deleted[kind.slot()]
    }

    /// Objects of `kind` created and not yet deleted.
    #[must_use]
    pub fn live(&self, kind: GlObjectKind) -> usize {
        let state = self.state.borrow();
        state.created[kind.slot()] - state.deleted[kind.slot()]
    }

    #[must_use]
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    #[must_use]
    pub fn clear_calls(&self) -> Vec<ClearCall> {
        self.state.borrow().clears.clone()
    }

    /// Forgets recorded draws and clears.
    pub fn reset_calls(&self) {
        let mut state = self.state.borrow_mut();
        state.draws.clear();
        state.clears.clear();
    }

    #[must_use]
    pub fn is_enabled(&self, capability: u32) -> bool {
        self.state.borrow().capabilities.contains(&capability)
    }

    #[must_use]
    pub fn cull_mode(&self) -> u32 {
        self.state.borrow().cull_mode
    }

    /// `(equation, src factor, dst factor)`.
    #[must_use]
    pub fn blend_state(&self) -> (u32, u32, u32) {
        let state = self.state.borrow();
        (state.blend_equation, state.blend_func.0, state.blend_func.1)
    }

    #[must_use]
    pub fn viewport(&self) -> [i32; 4] {
        self.state.borrow().viewport
    }

    #[must_use]
    pub fn bound_framebuffer(&self) -> Option<HeadlessHandle> {
        self.state.borrow().framebuffer.map(HeadlessHandle)
    }

    /// Texture bound to `TEXTURE_2D` on `unit`.
    #[must_use]
    pub fn texture_on_unit(&self, unit: u32) -> Option<HeadlessHandle> {
        self.state.borrow().units.get(&unit).copied().map(HeadlessHandle)
    }

    /// Color attachments of `framebuffer` as `(index, texture)`, in index order.
    #[must_use]
    pub fn color_attachments(&self, framebuffer: HeadlessHandle) -> Vec<(u32, HeadlessHandle)> {
        self.state
            .borrow()
            .framebuffers
            .get(&framebuffer.0)
            .map(|fb| {
                fb.colors
                    .iter()
                    .map(|(&index, &texture)| (index, HeadlessHandle(texture)))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn draw_buffer_list(&self, framebuffer: HeadlessHandle) -> Vec<u32> {
        self.state
            .borrow()
            .framebuffers
            .get(&framebuffer.0)
            .map(|fb| fb.draw_buffers.clone())
            .unwrap_or_default()
    }

    /// Size of the depth renderbuffer attached to `framebuffer`.
    #[must_use]
    pub fn depth_attachment_size(&self, framebuffer: HeadlessHandle) -> Option<(i32, i32)> {
        let state = self.state.borrow();
        let rb = state.framebuffers.get(&framebuffer.0)?.depth?;
        state.renderbuffers.get(&rb).map(|rb| (rb.width, rb.height))
    }

    /// `(width, height, internal format)` of a live texture.
    #[must_use]
    pub fn texture_storage(&self, texture: HeadlessHandle) -> Option<(i32, i32, u32)> {
        self.state
            .borrow()
            .textures
            .get(&texture.0)
            .map(|t| (t.width, t.height, t.internal_format))
    }

    #[must_use]
    pub fn texture_parameter(&self, texture: HeadlessHandle, parameter: u32) -> Option<i32> {
        self.state
            .borrow()
            .textures
            .get(&texture.0)
            .and_then(|t| t.parameters.get(&parameter).copied())
    }

    #[must_use]
    pub fn texture_is_mipmapped(&self, texture: HeadlessHandle) -> bool {
        self.state
            .borrow()
            .textures
            .get(&texture.0)
            .is_some_and(|t| t.mipmapped)
    }

    /// Raw texel bytes of a live texture, bottom row first.
    #[must_use]
    pub fn texture_data(&self, texture: HeadlessHandle) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .textures
            .get(&texture.0)
            .map(|t| t.data.clone())
    }

    /// Last value uploaded to the uniform `name` of `program`.
    #[must_use]
    pub fn uniform_value(&self, program: HeadlessHandle, name: &str) -> Option<UniformData> {
        let state = self.state.borrow();
        let program = state.programs.get(&program.0)?;
        let index = program.uniforms.iter().position(|u| u == name)?;
        program.values.get(&index).cloned()
    }

    #[must_use]
    pub fn current_program(&self) -> Option<HeadlessHandle> {
        self.state.borrow().program.map(HeadlessHandle)
    }

    /// Errors raised and not yet fetched with `get_error`.
    #[must_use]
    pub fn pending_errors(&self) -> Vec<u32> {
        self.state.borrow().errors.clone()
    }

    fn set_uniform(&self, location: &HeadlessUniform, value: UniformData) {
        let mut state = self.state.borrow_mut();
        if state.program != Some(location.program) {
            state.error(glow::INVALID_OPERATION, "uniform set on a program that is not in use");
            return;
        }
        if let Some(program) = state.programs.get_mut(&location.program) {
            program.values.insert(location.index, value);
        }
    }
}

impl GlContext for HeadlessGl {
    type Shader = HeadlessHandle;
    type Program = HeadlessHandle;
    type Buffer = HeadlessHandle;
    type VertexArray = HeadlessHandle;
    type Texture = HeadlessHandle;
    type Framebuffer = HeadlessHandle;
    type Renderbuffer = HeadlessHandle;
    type UniformLocation = HeadlessUniform;

    fn version(&self) -> GlVersion {
        GlVersion {
            major: 3,
            minor: 0,
            is_embedded: true,
        }
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn get_error(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        if state.errors.is_empty() {
            glow::NO_ERROR
        } else {
            state.errors.remove(0)
        }
    }

    fn enable(&self, capability: u32) {
        self.state.borrow_mut().capabilities.insert(capability);
    }

    fn disable(&self, capability: u32) {
        self.state.borrow_mut().capabilities.remove(&capability);
    }

    fn cull_face(&self, mode: u32) {
        self.state.borrow_mut().cull_mode = mode;
    }

    fn blend_equation(&self, mode: u32) {
        self.state.borrow_mut().blend_equation = mode;
    }

    fn blend_func(&self, src: u32, dst: u32) {
        self.state.borrow_mut().blend_func = (src, dst);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.error(glow::INVALID_VALUE, "negative viewport size");
            return;
        }
        state.viewport = [x, y, width, height];
    }

    fn pixel_store_i32(&self, parameter: u32, value: i32) {
        let mut state = self.state.borrow_mut();
        let Ok(alignment @ (1 | 2 | 4 | 8)) = usize::try_from(value) else {
            state.error(glow::INVALID_VALUE, "alignment must be 1, 2, 4 or 8");
            return;
        };
        match parameter {
            glow::PACK_ALIGNMENT => state.pack_alignment = alignment,
            glow::UNPACK_ALIGNMENT => state.unpack_alignment = alignment,
            _ => state.error(glow::INVALID_ENUM, "unsupported pixel store parameter"),
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().clear_color = [r, g, b, a];
    }

    fn clear_depth(&self, depth: f32) {
        self.state.borrow_mut().clear_depth = depth.clamp(0.0, 1.0);
    }

    fn clear(&self, mask: u32) {
        let float_targets = self.float_targets();
        let mut state = self.state.borrow_mut();
        if state.framebuffer_status(float_targets) != glow::FRAMEBUFFER_COMPLETE {
            state.error(glow::INVALID_FRAMEBUFFER_OPERATION, "clear on incomplete framebuffer");
            return;
        }
        let color = (mask & glow::COLOR_BUFFER_BIT != 0).then_some(state.clear_color);
        let depth = (mask & glow::DEPTH_BUFFER_BIT != 0).then_some(state.clear_depth);
        let framebuffer = state.framebuffer;
        state.clears.push(ClearCall {
            framebuffer: framebuffer.map(HeadlessHandle),
            color,
            depth,
        });

        let Some(fb_name) = framebuffer else {
            return;
        };
        let (targets, depth_rb) = match state.framebuffers.get(&fb_name) {
            Some(fb) => (
                fb.draw_buffers
                    .iter()
                    .filter_map(|buffer| {
                        let index = buffer.checked_sub(glow::COLOR_ATTACHMENT0)?;
                        fb.colors.get(&index).copied()
                    })
                    .collect::<Vec<_>>(),
                fb.depth,
            ),
            None => return,
        };

        if let Some(color) = color {
            for texture in targets {
                if let Some(texture) = state.textures.get_mut(&texture)
                    && let Some(texel) = encode_texel(texture.internal_format, color)
                {
                    for chunk in texture.data.chunks_exact_mut(texture.pixel_byte_size) {
                        chunk.copy_from_slice(&texel);
                    }
                }
            }
        }
        if let (Some(depth), Some(rb)) = (depth, depth_rb)
            && let Some(rb) = state.renderbuffers.get_mut(&rb)
        {
            rb.depth.fill(depth);
        }
    }

    // --- Shaders & programs -----------------------------------------------

    fn create_shader(&self, kind: u32) -> Result<Self::Shader, String> {
        if kind != glow::VERTEX_SHADER && kind != glow::FRAGMENT_SHADER {
            return Err(format!("unsupported shader type 0x{kind:04X}"));
        }
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::Shader);
        state.shaders.insert(
            name,
            ShaderObject {
                kind,
                source: String::new(),
                compiled: false,
                info_log: String::new(),
            },
        );
        Ok(HeadlessHandle(name))
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        if let Some(object) = self.state.borrow_mut().shaders.get_mut(&shader.0) {
            object.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        let Some(object) = state.shaders.get_mut(&shader.0) else {
            state.error(glow::INVALID_VALUE, "compile of unknown shader");
            return;
        };
        let error_line = object
            .source
            .lines()
            .enumerate()
            .find(|(_, line)| line.trim_start().starts_with("#error"));
        if let Some((line, text)) = error_line {
            let message = text.trim_start().trim_start_matches("#error").trim();
            object.info_log = format!("ERROR: 0:{}: '#error' : {message}", line + 1);
            object.compiled = false;
        } else if object.source.trim().is_empty() {
            object.info_log = "ERROR: 0:0: '' : syntax error, empty source".to_string();
            object.compiled = false;
        } else {
            object.info_log.clear();
            object.compiled = true;
        }
    }

    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader.0)
            .is_some_and(|s| s.compiled)
    }

    fn get_shader_info_log(&self, shader: Self::Shader) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader.0)
            .map(|s| s.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if state.shaders.remove(&shader.0).is_some() {
            state.release(GlObjectKind::Shader);
        }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::Program);
        state.programs.insert(name, ProgramObject::default());
        Ok(HeadlessHandle(name))
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader.0) {
            state.error(glow::INVALID_VALUE, "attach of unknown shader");
            return;
        }
        if let Some(object) = state.programs.get_mut(&program.0) {
            object.shaders.push(shader.0);
        }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        if let Some(object) = self.state.borrow_mut().programs.get_mut(&program.0) {
            object.shaders.retain(|&s| s != shader.0);
        }
    }

    fn link_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        let Some(attached) = state.programs.get(&program.0).map(|p| p.shaders.clone()) else {
            state.error(glow::INVALID_VALUE, "link of unknown program");
            return;
        };

        let mut uniforms = Vec::new();
        let mut stages = FxHashSet::default();
        let mut log = String::new();
        for shader in &attached {
            let Some(shader) = state.shaders.get(shader) else {
                continue;
            };
            if !shader.compiled {
                log = "Attached shader is not compiled".to_string();
                break;
            }
            if !shader.source.contains("main") {
                log = "Missing entry point `main`".to_string();
                break;
            }
            stages.insert(shader.kind);
            declared_uniforms(&shader.source, &mut uniforms);
        }
        if log.is_empty()
            && !(stages.contains(&glow::VERTEX_SHADER) && stages.contains(&glow::FRAGMENT_SHADER))
        {
            log = "Program needs both a vertex and a fragment shader".to_string();
        }

        if let Some(object) = state.programs.get_mut(&program.0) {
            object.linked = log.is_empty();
            object.uniforms = if object.linked { uniforms } else { Vec::new() };
            object.values.clear();
            object.info_log = log;
        }
    }

    fn get_program_link_status(&self, program: Self::Program) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .is_some_and(|p| p.linked)
    }

    fn get_program_info_log(&self, program: Self::Program) -> String {
        self.state
            .borrow()
            .programs
            .get(&program.0)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_program(&self, program: Self::Program) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&program.0).is_some() {
            state.release(GlObjectKind::Program);
            if state.program == Some(program.0) {
                state.program = None;
            }
        }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        let mut state = self.state.borrow_mut();
        if let Some(program) = program
            && !state.programs.get(&program.0).is_some_and(|p| p.linked)
        {
            state.error(glow::INVALID_OPERATION, "use of unlinked program");
            return;
        }
        state.program = program.map(|p| p.0);
    }

    fn get_uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation> {
        let state = self.state.borrow();
        let object = state.programs.get(&program.0)?;
        let base = name.strip_suffix("[0]").unwrap_or(name);
        object
            .uniforms
            .iter()
            .position(|u| u == base)
            .map(|index| HeadlessUniform {
                program: program.0,
                index,
            })
    }

    fn uniform_i32(&self, location: &Self::UniformLocation, components: usize, data: &[i32]) {
        self.set_uniform(location, UniformData::Int { components, data: data.to_vec() });
    }

    fn uniform_u32(&self, location: &Self::UniformLocation, components: usize, data: &[u32]) {
        self.set_uniform(location, UniformData::UInt { components, data: data.to_vec() });
    }

    fn uniform_f32(&self, location: &Self::UniformLocation, components: usize, data: &[f32]) {
        self.set_uniform(location, UniformData::Float { components, data: data.to_vec() });
    }

    fn uniform_matrix_f32(
        &self,
        location: &Self::UniformLocation,
        dims: usize,
        transpose: bool,
        data: &[f32],
    ) {
        self.set_uniform(
            location,
            UniformData::Matrix {
                dims,
                transpose,
                data: data.to_vec(),
            },
        );
    }

    // --- Textures ---------------------------------------------------------

    fn create_texture(&self) -> Result<Self::Texture, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::Texture);
        state.textures.insert(
            name,
            TextureObject {
                width: 0,
                height: 0,
                internal_format: glow::NONE,
                format: glow::NONE,
                ty: glow::NONE,
                pixel_byte_size: 0,
                data: Vec::new(),
                parameters: FxHashMap::default(),
                mipmapped: false,
            },
        );
        Ok(HeadlessHandle(name))
    }

    fn delete_texture(&self, texture: Self::Texture) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(&texture.0).is_some() {
            state.release(GlObjectKind::Texture);
            state.units.retain(|_, bound| *bound != texture.0);
            // Deleting detaches from the bound framebuffer only.
            if let Some(fb) = state.framebuffer
                && let Some(fb) = state.framebuffers.get_mut(&fb)
            {
                fb.colors.retain(|_, attached| *attached != texture.0);
            }
        }
    }

    fn active_texture(&self, unit: u32) {
        let mut state = self.state.borrow_mut();
        match unit.checked_sub(glow::TEXTURE0) {
            Some(index) if index < 32 => state.active_unit = index,
            _ => state.error(glow::INVALID_ENUM, "texture unit out of range"),
        }
    }

    fn bind_texture(&self, target: u32, texture: Option<Self::Texture>) {
        let mut state = self.state.borrow_mut();
        if target != glow::TEXTURE_2D {
            state.error(glow::INVALID_ENUM, "only TEXTURE_2D is emulated");
            return;
        }
        let unit = state.active_unit;
        match texture {
            Some(texture) if state.textures.contains_key(&texture.0) => {
                state.units.insert(unit, texture.0);
            }
            Some(_) => state.error(glow::INVALID_OPERATION, "bind of deleted texture"),
            None => {
                state.units.remove(&unit);
            }
        }
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
        let mut state = self.state.borrow_mut();
        if target != glow::TEXTURE_2D || level != 0 {
            state.error(glow::INVALID_ENUM, "only level 0 of TEXTURE_2D is emulated");
            return;
        }
        if width < 0 || height < 0 {
            state.error(glow::INVALID_VALUE, "negative texture size");
            return;
        }
        let internal_format = internal_format as u32;
        let Some((channels, kind)) = mapper::describe(internal_format) else {
            state.error(glow::INVALID_VALUE, "unsized or unknown internal format");
            return;
        };
        let native = mapper::format(channels, kind);
        if native.format != format || native.ty != ty {
            state.error(glow::INVALID_OPERATION, "format/type do not match internal format");
            return;
        }
        let Some(bound) = state.bound_texture() else {
            state.error(glow::INVALID_OPERATION, "no texture bound");
            return;
        };

        let (w, h) = (width as usize, height as usize);
        let row = w * native.pixel_byte_size;
        let data = match pixels {
            Some(pixels) => {
                let stride = align_to(row, state.unpack_alignment);
                let needed = if h == 0 { 0 } else { stride * (h - 1) + row };
                if pixels.len() < needed {
                    state.error(glow::INVALID_OPERATION, "pixel data too small");
                    return;
                }
                let mut packed = Vec::with_capacity(row * h);
                for y in 0..h {
                    packed.extend_from_slice(&pixels[y * stride..y * stride + row]);
                }
                packed
            }
            None => vec![0; row * h],
        };

        if let Some(texture) = state.textures.get_mut(&bound) {
            texture.width = width;
            texture.height = height;
            texture.internal_format = internal_format;
            texture.format = format;
            texture.ty = ty;
            texture.pixel_byte_size = native.pixel_byte_size;
            texture.data = data;
            texture.mipmapped = false;
        }
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        let mut state = self.state.borrow_mut();
        if target != glow::TEXTURE_2D {
            state.error(glow::INVALID_ENUM, "only TEXTURE_2D is emulated");
            return;
        }
        let Some(bound) = state.bound_texture() else {
            state.error(glow::INVALID_OPERATION, "no texture bound");
            return;
        };
        if let Some(texture) = state.textures.get_mut(&bound) {
            texture.parameters.insert(parameter, value);
        }
    }

    fn generate_mipmap(&self, target: u32) {
        let (float_targets, float_linear) = (self.float_targets(), self.float_linear());
        let mut state = self.state.borrow_mut();
        if target != glow::TEXTURE_2D {
            state.error(glow::INVALID_ENUM, "only TEXTURE_2D is emulated");
            return;
        }
        let Some(bound) = state.bound_texture() else {
            state.error(glow::INVALID_OPERATION, "no texture bound");
            return;
        };
        let mippable = state.textures.get(&bound).is_some_and(|t| {
            mapper::can_generate_mipmap(t.internal_format, float_targets, float_linear)
        });
        if !mippable {
            state.error(
                glow::INVALID_OPERATION,
                "mipmaps need a color-renderable, filterable format",
            );
            return;
        }
        if let Some(texture) = state.textures.get_mut(&bound) {
            texture.mipmapped = true;
        }
    }

    // --- Buffers & vertex arrays ------------------------------------------

    fn create_buffer(&self) -> Result<Self::Buffer, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::Buffer);
        state.buffers.insert(name, Vec::new());
        Ok(HeadlessHandle(name))
    }

    fn delete_buffer(&self, buffer: Self::Buffer) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer.0).is_some() {
            state.release(GlObjectKind::Buffer);
            if state.array_buffer == Some(buffer.0) {
                state.array_buffer = None;
            }
        }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<Self::Buffer>) {
        let mut state = self.state.borrow_mut();
        if target != glow::ARRAY_BUFFER {
            state.error(glow::INVALID_ENUM, "only ARRAY_BUFFER is emulated");
            return;
        }
        state.array_buffer = buffer.map(|b| b.0);
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], _usage: u32) {
        let mut state = self.state.borrow_mut();
        let bound = (target == glow::ARRAY_BUFFER)
            .then_some(state.array_buffer)
            .flatten();
        match bound {
            Some(buffer) => {
                state.buffers.insert(buffer, data.to_vec());
            }
            None => state.error(glow::INVALID_OPERATION, "no array buffer bound"),
        }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::VertexArray);
        state.vertex_arrays.insert(name, VertexArrayObject::default());
        Ok(HeadlessHandle(name))
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(&vertex_array.0).is_some() {
            state.release(GlObjectKind::VertexArray);
            if state.vertex_array == Some(vertex_array.0) {
                state.vertex_array = None;
            }
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>) {
        let mut state = self.state.borrow_mut();
        match vertex_array {
            Some(vao) if !state.vertex_arrays.contains_key(&vao.0) => {
                state.error(glow::INVALID_OPERATION, "bind of deleted vertex array");
            }
            _ => state.vertex_array = vertex_array.map(|v| v.0),
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        let Some(vao) = state.vertex_array else {
            state.error(glow::INVALID_OPERATION, "no vertex array bound");
            return;
        };
        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            vao.enabled.insert(index);
        }
    }

    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        _normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(buffer) = state.array_buffer else {
            state.error(glow::INVALID_OPERATION, "no array buffer bound");
            return;
        };
        let Some(vao) = state.vertex_array else {
            state.error(glow::INVALID_OPERATION, "no vertex array bound");
            return;
        };
        if !(1..=4).contains(&size) {
            state.error(glow::INVALID_VALUE, "attribute size must be 1..=4");
            return;
        }
        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            vao.attributes.insert(
                index,
                AttributePointer {
                    buffer,
                    size,
                    data_type,
                    stride,
                    offset,
                },
            );
        }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        let float_targets = self.float_targets();
        let mut state = self.state.borrow_mut();
        let (Some(program), Some(vertex_array)) = (state.program, state.vertex_array) else {
            state.error(glow::INVALID_OPERATION, "draw without program or vertex array");
            return;
        };
        if state.framebuffer_status(float_targets) != glow::FRAMEBUFFER_COMPLETE {
            state.error(glow::INVALID_FRAMEBUFFER_OPERATION, "draw into incomplete framebuffer");
            return;
        }
        let call = DrawCall {
            mode,
            first,
            count,
            program: HeadlessHandle(program),
            vertex_array: HeadlessHandle(vertex_array),
            framebuffer: state.framebuffer.map(HeadlessHandle),
            blend: state.capabilities.contains(&glow::BLEND),
            depth_test: state.capabilities.contains(&glow::DEPTH_TEST),
            cull_face: state
                .capabilities
                .contains(&glow::CULL_FACE)
                .then_some(state.cull_mode),
        };
        state.draws.push(call);
        if mode == glow::TRIANGLES {
            state.rasterize(program, vertex_array, first, count);
        }
    }

    // --- Framebuffers -----------------------------------------------------

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::Framebuffer);
        state.framebuffers.insert(name, FramebufferObject::default());
        Ok(HeadlessHandle(name))
    }

    fn delete_framebuffer(&self, framebuffer: Self::Framebuffer) {
        let mut state = self.state.borrow_mut();
        if state.framebuffers.remove(&framebuffer.0).is_some() {
            state.release(GlObjectKind::Framebuffer);
            if state.framebuffer == Some(framebuffer.0) {
                state.framebuffer = None;
            }
        }
    }

    fn bind_framebuffer(&self, _target: u32, framebuffer: Option<Self::Framebuffer>) {
        let mut state = self.state.borrow_mut();
        match framebuffer {
            Some(fb) if !state.framebuffers.contains_key(&fb.0) => {
                state.error(glow::INVALID_OPERATION, "bind of deleted framebuffer");
            }
            _ => state.framebuffer = framebuffer.map(|f| f.0),
        }
    }

    fn framebuffer_texture_2d(
        &self,
        _target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<Self::Texture>,
        _level: i32,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(fb) = state.framebuffer else {
            state.error(glow::INVALID_OPERATION, "attachment on the default framebuffer");
            return;
        };
        if texture_target != glow::TEXTURE_2D {
            state.error(glow::INVALID_ENUM, "only TEXTURE_2D attachments are emulated");
            return;
        }
        let Some(index) = attachment
            .checked_sub(glow::COLOR_ATTACHMENT0)
            .filter(|index| *index < 16)
        else {
            state.error(glow::INVALID_ENUM, "only color attachments take textures");
            return;
        };
        if let Some(texture) = texture
            && !state.textures.contains_key(&texture.0)
        {
            state.error(glow::INVALID_OPERATION, "attachment of deleted texture");
            return;
        }
        if let Some(fb) = state.framebuffers.get_mut(&fb) {
            match texture {
                Some(texture) => fb.colors.insert(index, texture.0),
                None => fb.colors.remove(&index),
            };
        }
    }

    fn framebuffer_renderbuffer(
        &self,
        _target: u32,
        attachment: u32,
        _renderbuffer_target: u32,
        renderbuffer: Option<Self::Renderbuffer>,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(fb) = state.framebuffer else {
            state.error(glow::INVALID_OPERATION, "attachment on the default framebuffer");
            return;
        };
        if attachment != glow::DEPTH_ATTACHMENT {
            state.error(glow::INVALID_ENUM, "only depth renderbuffers are emulated");
            return;
        }
        if let Some(fb) = state.framebuffers.get_mut(&fb) {
            fb.depth = renderbuffer.map(|rb| rb.0);
        }
    }

    fn check_framebuffer_status(&self, _target: u32) -> u32 {
        self.state.borrow().framebuffer_status(self.float_targets())
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        let mut state = self.state.borrow_mut();
        let Some(fb) = state.framebuffer else {
            if buffers.len() != 1 || !matches!(buffers[0], glow::BACK | glow::NONE) {
                state.error(glow::INVALID_OPERATION, "default framebuffer takes BACK or NONE");
            }
            return;
        };
        let in_order = buffers.iter().enumerate().all(|(i, &buffer)| {
            buffer == glow::NONE || buffer == glow::COLOR_ATTACHMENT0 + i as u32
        });
        if !in_order {
            state.error(glow::INVALID_OPERATION, "draw buffer i must be COLOR_ATTACHMENTi");
            return;
        }
        if let Some(fb) = state.framebuffers.get_mut(&fb) {
            fb.draw_buffers = buffers.to_vec();
        }
    }

    fn read_buffer(&self, source: u32) {
        let mut state = self.state.borrow_mut();
        let Some(fb) = state.framebuffer else {
            return;
        };
        if let Some(fb) = state.framebuffers.get_mut(&fb) {
            fb.read_buffer = source;
        }
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
        let float_targets = self.float_targets();
        let mut state = self.state.borrow_mut();
        if state.framebuffer_status(float_targets) != glow::FRAMEBUFFER_COMPLETE {
            state.error(glow::INVALID_FRAMEBUFFER_OPERATION, "read from incomplete framebuffer");
            return;
        }
        let Some(fb) = state.framebuffer else {
            // The default surface is not backed by storage here.
            pixels.fill(0);
            return;
        };
        let texture = state.framebuffers.get(&fb).and_then(|fb| {
            let index = fb.read_buffer.checked_sub(glow::COLOR_ATTACHMENT0)?;
            fb.colors.get(&index).copied()
        });
        let Some(texture) = texture.and_then(|t| state.textures.get(&t)) else {
            state.error(glow::INVALID_OPERATION, "read buffer has no attachment");
            return;
        };
        if texture.format != format || texture.ty != ty {
            state.error(glow::INVALID_OPERATION, "read format/type do not match attachment");
            return;
        }

        let px = texture.pixel_byte_size;
        let row = width.max(0) as usize * px;
        let stride = align_to(row, state.pack_alignment);
        let rows = height.max(0) as usize;
        let needed = if rows == 0 { 0 } else { stride * (rows - 1) + row };
        if pixels.len() < needed {
            state.error(glow::INVALID_OPERATION, "destination too small");
            return;
        }

        let source_row = texture.width as usize * px;
        for dy in 0..rows {
            let sy = y + dy as i32;
            for dx in 0..width.max(0) as usize {
                let sx = x + dx as i32;
                let dst = dy * stride + dx * px;
                if sx < 0 || sy < 0 || sx >= texture.width || sy >= texture.height {
                    continue;
                }
                let src = sy as usize * source_row + sx as usize * px;
                pixels[dst..dst + px].copy_from_slice(&texture.data[src..src + px]);
            }
        }
    }

    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate(GlObjectKind::Renderbuffer);
        state.renderbuffers.insert(
            name,
            RenderbufferObject {
                internal_format: glow::NONE,
                width: 0,
                height: 0,
                depth: Vec::new(),
            },
        );
        Ok(HeadlessHandle(name))
    }

    fn delete_renderbuffer(&self, renderbuffer: Self::Renderbuffer) {
        let mut state = self.state.borrow_mut();
        if state.renderbuffers.remove(&renderbuffer.0).is_some() {
            state.release(GlObjectKind::Renderbuffer);
            if state.renderbuffer == Some(renderbuffer.0) {
                state.renderbuffer = None;
            }
            if let Some(fb) = state.framebuffer
                && let Some(fb) = state.framebuffers.get_mut(&fb)
                && fb.depth == Some(renderbuffer.0)
            {
                fb.depth = None;
            }
        }
    }

    fn bind_renderbuffer(&self, _target: u32, renderbuffer: Option<Self::Renderbuffer>) {
        self.state.borrow_mut().renderbuffer = renderbuffer.map(|rb| rb.0);
    }

    fn renderbuffer_storage(&self, _target: u32, internal_format: u32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        let Some(bound) = state.renderbuffer else {
            state.error(glow::INVALID_OPERATION, "no renderbuffer bound");
            return;
        };
        if width < 0 || height < 0 {
            state.error(glow::INVALID_VALUE, "negative renderbuffer size");
            return;
        }
        if let Some(rb) = state.renderbuffers.get_mut(&bound) {
            rb.internal_format = internal_format;
            rb.width = width;
            rb.height = height;
            rb.depth = vec![1.0; width as usize * height as usize];
        }
    }
}
