use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

use smallvec::SmallVec;

use super::context::GlContext;
use super::texture::WebGlTexture;
use crate::errors::{Result, UmbraError};
use crate::gpu::{ShaderProgram, Texture2D, UniformSchema, UniformValue};

/// A linked program with every slot of `S` resolved to a location.
pub struct WebGlShader<C: GlContext, S: UniformSchema> {
    gl: Rc<C>,
    program: C::Program,
    locations: Vec<C::UniformLocation>,
    /// Units bound by the previous `set_samplers` call on any program of
    /// this context.
    bound_units: Rc<Cell<usize>>,
    _schema: PhantomData<S>,
}

fn compile<C: GlContext>(gl: &C, kind: u32, stage: &'static str, source: &str) -> Result<C::Shader> {
    let shader = gl.create_shader(kind).map_err(UmbraError::GlObjectCreation)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        log::error!("Failed to compile {stage} shader:\n{log}");
        gl.delete_shader(shader);
        return Err(UmbraError::ShaderCompile { stage, log });
    }
    Ok(shader)
}

impl<C: GlContext, S: UniformSchema> WebGlShader<C, S> {
    pub(crate) fn new(
        gl: Rc<C>,
        bound_units: Rc<Cell<usize>>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self> {
        let vertex = compile(&*gl, glow::VERTEX_SHADER, "vertex", vertex_source)?;
        let fragment = match compile(&*gl, glow::FRAGMENT_SHADER, "fragment", fragment_source) {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_shader(vertex);
                return Err(e);
            }
        };

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(e) => {
                gl.delete_shader(vertex);
                gl.delete_shader(fragment);
                return Err(UmbraError::GlObjectCreation(e));
            }
        };
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);
        for shader in [vertex, fragment] {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            log::error!("Failed to link program:\n{log}");
            gl.delete_program(program);
            return Err(UmbraError::ShaderLink(log));
        }

        let mut locations = Vec::with_capacity(S::ALL.len());
        for &slot in S::ALL {
            match gl.get_uniform_location(program, slot.name()) {
                Some(location) => locations.push(location),
                None => {
                    gl.delete_program(program);
                    return Err(UmbraError::UniformNotFound { name: slot.name() });
                }
            }
        }

        Ok(Self {
            gl,
            program,
            locations,
            bound_units,
            _schema: PhantomData,
        })
    }

    #[inline]
    fn location(&self, slot: S) -> &C::UniformLocation {
        &self.locations[slot.index()]
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> C::Program {
        self.program
    }
}

impl<C: GlContext, S: UniformSchema> ShaderProgram<S> for WebGlShader<C, S> {
    type Texture = WebGlTexture<C>;

    fn use_program(&self) {
        self.gl.use_program(Some(self.program));
    }

    fn set_uniform(&self, slot: S, value: UniformValue<'_>) -> Result<()> {
        let components = value.len();
        if !(1..=4).contains(&components) {
            return Err(UmbraError::InvalidUniformArity {
                name: slot.name(),
                detail: format!("{components} {} components", value.scalar_name()),
            });
        }
        self.upload(slot, value, components);
        Ok(())
    }

    fn set_uniform_array(
        &self,
        slot: S,
        value: UniformValue<'_>,
        components: usize,
    ) -> Result<()> {
        if !(1..=4).contains(&components) || value.is_empty() || value.len() % components != 0 {
            return Err(UmbraError::InvalidUniformArity {
                name: slot.name(),
                detail: format!(
                    "{} {} values as vec{components} array",
                    value.len(),
                    value.scalar_name()
                ),
            });
        }
        self.upload(slot, value, components);
        Ok(())
    }

    fn set_uniform_matrix_array(
        &self,
        slot: S,
        dims: usize,
        transpose: bool,
        data: &[f32],
    ) -> Result<()> {
        let per_matrix = dims * dims;
        if !(2..=4).contains(&dims) || data.is_empty() || data.len() % per_matrix != 0 {
            return Err(UmbraError::InvalidUniformArity {
                name: slot.name(),
                detail: format!("{} floats as mat{dims} array", data.len()),
            });
        }
        self.gl
            .uniform_matrix_f32(self.location(slot), dims, transpose, data);
        Ok(())
    }

    fn set_samplers(&self, bindings: &[(S, &WebGlTexture<C>)]) -> Result<()> {
        let handles = bindings
            .iter()
            .map(|(_, texture)| texture.handle())
            .collect::<Result<SmallVec<[C::Texture; 4]>>>()?;

        for (unit, ((slot, _), handle)) in bindings.iter().zip(handles).enumerate() {
            self.gl.active_texture(glow::TEXTURE0 + unit as u32);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(handle));
            self.gl.uniform_i32(self.location(*slot), 1, &[unit as i32]);
        }
        for unit in bindings.len()..self.bound_units.get() {
            self.gl.active_texture(glow::TEXTURE0 + unit as u32);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        self.gl.active_texture(glow::TEXTURE0);
        self.bound_units.set(bindings.len());
        Ok(())
    }
}

impl<C: GlContext, S: UniformSchema> WebGlShader<C, S> {
    fn upload(&self, slot: S, value: UniformValue<'_>, components: usize) {
        let location = self.location(slot);
        match value {
            UniformValue::Int(data) => self.gl.uniform_i32(location, components, data),
            UniformValue::UInt(data) => self.gl.uniform_u32(location, components, data),
            UniformValue::Float(data) => self.gl.uniform_f32(location, components, data),
        }
    }
}

impl<C: GlContext, S: UniformSchema> Drop for WebGlShader<C, S> {
    fn drop(&mut self) {
        self.gl.delete_program(self.program);
    }
}
