//! WebGPU Backend (partial)
//!
//! Acquires a device and uploads geometry with the same interleaved layout
//! as the WebGL backend. Shaders, textures and render targets are not
//! implemented, so this backend does not implement [`GpuApi`] yet.
//!
//! [`GpuApi`]: crate::gpu::GpuApi

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::assets::{AssetReaderVariant, mesh};
use crate::errors::{Result, UmbraError};
use crate::gpu::{FLOATS_PER_VERTEX, VERTEX_STRIDE};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
    2 => Float32x3,
    3 => Float32x4,
];

/// Vertex layout: position, uv, normal, tangent at locations 0..=3.
#[must_use]
pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

pub struct WebGpuApi {
    device: wgpu::Device,
    queue: wgpu::Queue,
    reader: AssetReaderVariant,
}

impl WebGpuApi {
    /// Requests an adapter and a device with default limits.
    pub async fn initialize(reader: AssetReaderVariant) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| UmbraError::AdapterRequestFailed(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("umbra"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        log::info!("WebGPU device acquired: {}", adapter.get_info().name);
        Ok(Self {
            device,
            queue,
            reader,
        })
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn create_geometry(&self, vertices: &[f32]) -> Result<WebGpuGeometry> {
        if vertices.len() % FLOATS_PER_VERTEX != 0 {
            return Err(UmbraError::InvalidVertexData {
                len: vertices.len(),
                stride: FLOATS_PER_VERTEX,
            });
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Geometry Vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(WebGpuGeometry {
            buffer: Some(buffer),
            vertex_count: (vertices.len() / FLOATS_PER_VERTEX) as u32,
        })
    }

    /// Same `.obj` / `.raw` dispatch as the WebGL backend.
    pub async fn load_geometry(&self, path: &str) -> Result<WebGpuGeometry> {
        let bytes = self.reader.read_bytes(path).await?;
        let vertices = mesh::parse_geometry(path, &bytes)?;
        self.create_geometry(&vertices)
    }
}

pub struct WebGpuGeometry {
    buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
}

impl WebGpuGeometry {
    /// Records a draw of every vertex into `pass`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or(UmbraError::ResourceFreed("geometry"))?;
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(self.vertices(), 0..1);
        Ok(())
    }

    pub fn free(&mut self) -> Result<()> {
        let buffer = self
            .buffer
            .take()
            .ok_or(UmbraError::ResourceFreed("geometry"))?;
        buffer.destroy();
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn vertices(&self) -> Range<u32> {
        0..self.vertex_count
    }
}
