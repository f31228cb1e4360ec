use std::cell::Cell;
use std::rc::Rc;

use super::context::GlContext;
use crate::errors::{Result, UmbraError};
use crate::gpu::{FLOATS_PER_VERTEX, Geometry, VERTEX_STRIDE};

/// `(location, components, byte offset)` for position, uv, normal, tangent.
const ATTRIBUTES: [(u32, i32, i32); 4] = [(0, 3, 0), (1, 2, 12), (2, 3, 20), (3, 4, 32)];

/// A static vertex buffer plus the vertex array describing its layout.
pub struct WebGlGeometry<C: GlContext> {
    gl: Rc<C>,
    objects: Cell<Option<(C::VertexArray, C::Buffer)>>,
    vertex_count: usize,
}

impl<C: GlContext> WebGlGeometry<C> {
    pub(crate) fn new(gl: Rc<C>, vertices: &[f32]) -> Result<Self> {
        if vertices.len() % FLOATS_PER_VERTEX != 0 {
            return Err(UmbraError::InvalidVertexData {
                len: vertices.len(),
                stride: FLOATS_PER_VERTEX,
            });
        }

        let vertex_array = gl
            .create_vertex_array()
            .map_err(UmbraError::GlObjectCreation)?;
        let buffer = match gl.create_buffer() {
            Ok(buffer) => buffer,
            Err(e) => {
                gl.delete_vertex_array(vertex_array);
                return Err(UmbraError::GlObjectCreation(e));
            }
        };

        gl.bind_vertex_array(Some(vertex_array));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(vertices),
            glow::STATIC_DRAW,
        );
        for (location, components, offset) in ATTRIBUTES {
            gl.enable_vertex_attrib_array(location);
            gl.vertex_attrib_pointer_f32(
                location,
                components,
                glow::FLOAT,
                false,
                VERTEX_STRIDE as i32,
                offset,
            );
        }
        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);

        Ok(Self {
            gl,
            objects: Cell::new(Some((vertex_array, buffer))),
            vertex_count: vertices.len() / FLOATS_PER_VERTEX,
        })
    }
}

impl<C: GlContext> Geometry for WebGlGeometry<C> {
    fn draw(&self) -> Result<()> {
        let (vertex_array, _) = self
            .objects
            .get()
            .ok_or(UmbraError::ResourceFreed("geometry"))?;
        self.gl.bind_vertex_array(Some(vertex_array));
        self.gl
            .draw_arrays(glow::TRIANGLES, 0, self.vertex_count as i32);
        Ok(())
    }

    fn free(&self) -> Result<()> {
        let (vertex_array, buffer) = self
            .objects
            .take()
            .ok_or(UmbraError::ResourceFreed("geometry"))?;
        self.gl.delete_vertex_array(vertex_array);
        self.gl.delete_buffer(buffer);
        Ok(())
    }

    #[inline]
    fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

impl<C: GlContext> Drop for WebGlGeometry<C> {
    fn drop(&mut self) {
        if let Some((vertex_array, buffer)) = self.objects.take() {
            self.gl.delete_vertex_array(vertex_array);
            self.gl.delete_buffer(buffer);
        }
    }
}
