//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`UmbraError`] covers three families of failure:
//! - Capability errors: the GPU context cannot do what the pipeline needs
//!   (missing extension, shader compile/link failure, incomplete framebuffer).
//!   These abort initialization and are never retried.
//! - Resource misuse: contract violations by the caller (draw after free,
//!   undeclared uniform, malformed vertex data).
//! - I/O errors raised while loading meshes, shaders and images.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, UmbraError>`.
//!
//! ```rust,ignore
//! use umbra::errors::{UmbraError, Result};
//!
//! fn load_asset() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Umbra engine.
#[derive(Error, Debug)]
pub enum UmbraError {
    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// A GPU capability the pipeline cannot run without is unavailable.
    #[error("Missing required GPU capability: {0}")]
    MissingCapability(String),

    /// A shader stage failed to compile. Carries the driver's info log.
    #[error("Failed to compile {stage} shader: {log}")]
    ShaderCompile {
        /// "vertex" or "fragment"
        stage: &'static str,
        /// Driver diagnostic output
        log: String,
    },

    /// Program linking failed. Carries the driver's info log.
    #[error("Failed to link shader program: {0}")]
    ShaderLink(String),

    /// The framebuffer did not report complete after attaching targets.
    #[error("Framebuffer incomplete (status 0x{status:04X})")]
    FramebufferIncomplete {
        /// Raw status returned by the backend
        status: u32,
    },

    /// A color attachment's size differs from its framebuffer's size.
    #[error(
        "Attachment {slot} is {width}x{height}, framebuffer is {expected_width}x{expected_height}"
    )]
    AttachmentSizeMismatch {
        /// Slot of the offending texture
        slot: usize,
        /// Framebuffer width
        expected_width: u32,
        /// Framebuffer height
        expected_height: u32,
        /// Texture width
        width: u32,
        /// Texture height
        height: u32,
    },

    /// The backend refused to create an object (context lost, out of memory).
    #[error("Failed to create GL object: {0}")]
    GlObjectCreation(String),

    /// A GL error was pending when polled.
    #[error("GL error: {name} (0x{code:04X})")]
    Gl {
        /// Raw error code from `glGetError`
        code: u32,
        /// Symbolic name of the code
        name: &'static str,
    },

    /// Failed to request a WebGPU adapter.
    #[cfg(feature = "webgpu")]
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the WebGPU device.
    #[cfg(feature = "webgpu")]
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Resource Misuse Errors
    // ========================================================================
    /// A resource was used (or freed) after it had already been freed.
    #[error("{0} used after free")]
    ResourceFreed(&'static str),

    /// A declared uniform did not resolve to a location after linking.
    #[error("Uniform `{name}` is not declared by the shader program")]
    UniformNotFound {
        /// Uniform identifier as written in the shader
        name: &'static str,
    },

    /// Vertex data length is not a whole number of vertices.
    #[error("Vertex data length {len} is not a multiple of {stride} floats")]
    InvalidVertexData {
        /// Number of floats supplied
        len: usize,
        /// Floats per vertex
        stride: usize,
    },

    /// A uniform setter received a component count it cannot dispatch.
    #[error("Invalid uniform arity for `{name}`: {detail}")]
    InvalidUniformArity {
        /// Uniform identifier
        name: &'static str,
        /// What was wrong with the supplied data
        detail: String,
    },

    /// Readback referenced an attachment slot that is not bound.
    #[error("Attachment slot {slot} out of range ({count} attached)")]
    AttachmentOutOfRange {
        /// Requested slot
        slot: usize,
        /// Number of attachments currently set
        count: usize,
    },

    /// Readback rectangle or destination buffer is out of bounds.
    #[error("Readback out of bounds: {0}")]
    ReadbackOutOfBounds(String),

    /// Mipmaps were requested for a format the backend cannot mip.
    #[error("Mipmaps are not supported for {0} textures")]
    MipmapUnsupported(String),

    /// Texel data does not match the texture descriptor.
    #[error("Invalid texture data: {0}")]
    InvalidTextureData(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP response error with status code.
    #[error("HTTP response error for `{url}`: status {status}")]
    Http {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The HTTP request itself failed (DNS, connection, CORS).
    #[error("HTTP transport error: {0}")]
    HttpTransport(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The server answered with an HTML page instead of the asset.
    #[error("Got an HTML page instead of the asset `{0}`; check the path")]
    HtmlInsteadOfAsset(String),

    /// No loader exists for the asset's extension.
    #[error("Unsupported asset type: {0}")]
    UnsupportedAsset(String),

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed mesh source.
    #[error("Mesh parse error at line {line}: {message}")]
    MeshParse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A descriptor parsed but describes something the renderer cannot draw.
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Asset bytes were not valid UTF-8 text.
    #[error("Asset `{0}` is not valid UTF-8")]
    InvalidText(String),

    // ========================================================================
    // Platform-Specific Errors
    // ========================================================================
    /// WASM-specific error.
    #[cfg(target_arch = "wasm32")]
    #[error("WASM error: {0}")]
    Wasm(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for UmbraError {
    fn from(err: image::ImageError) -> Self {
        UmbraError::ImageDecode(err.to_string())
    }
}

/// Alias for `Result<T, UmbraError>`.
pub type Result<T> = std::result::Result<T, UmbraError>;
