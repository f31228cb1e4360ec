//! Backend-agnostic GPU vocabulary.
//!
//! Everything in here is plain data: texture descriptors, sampler modes and
//! the small enums that pipeline stages use to talk to a [`GpuApi`] without
//! naming a concrete backend.
//!
//! [`GpuApi`]: crate::gpu::GpuApi

use serde::Deserialize;

use crate::assets::DecodedImage;

// ============================================================================
// Texel Formats
// ============================================================================

/// Number of color channels stored per texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    R,
    Rg,
    Rgb,
    Rgba,
}

impl Channels {
    pub const ALL: [Channels; 4] = [Channels::R, Channels::Rg, Channels::Rgb, Channels::Rgba];

    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Channels::R => 1,
            Channels::Rg => 2,
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }

    /// Maps a channel count in `1..=4` back to the enum.
    #[must_use]
    pub const fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Channels::R),
            2 => Some(Channels::Rg),
            3 => Some(Channels::Rgb),
            4 => Some(Channels::Rgba),
            _ => None,
        }
    }
}

/// Storage type of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFormat {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float16,
    Float32,
}

impl TextureFormat {
    pub const ALL: [TextureFormat; 8] = [
        TextureFormat::Int8,
        TextureFormat::Uint8,
        TextureFormat::Int16,
        TextureFormat::Uint16,
        TextureFormat::Int32,
        TextureFormat::Uint32,
        TextureFormat::Float16,
        TextureFormat::Float32,
    ];

    #[inline]
    #[must_use]
    pub const fn bytes_per_component(self) -> usize {
        match self {
            TextureFormat::Int8 | TextureFormat::Uint8 => 1,
            TextureFormat::Int16 | TextureFormat::Uint16 | TextureFormat::Float16 => 2,
            TextureFormat::Int32 | TextureFormat::Uint32 | TextureFormat::Float32 => 4,
        }
    }

    /// True for formats sampled as integers (`isampler2D` / `usampler2D`).
    ///
    /// 8-bit formats are normalized and sample as floats.
    #[inline]
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            TextureFormat::Int16
                | TextureFormat::Uint16
                | TextureFormat::Int32
                | TextureFormat::Uint32
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, TextureFormat::Float16 | TextureFormat::Float32)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TextureFormat::Int8 => "int8",
            TextureFormat::Uint8 => "uint8",
            TextureFormat::Int16 => "int16",
            TextureFormat::Uint16 => "uint16",
            TextureFormat::Int32 => "int32",
            TextureFormat::Uint32 => "uint32",
            TextureFormat::Float16 => "float16",
            TextureFormat::Float32 => "float32",
        }
    }
}

// ============================================================================
// Sampler State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MinFilter {
    #[default]
    Nearest,
    Linear,
    /// Trilinear: linear within and between mip levels.
    MipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MagFilter {
    #[default]
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    #[default]
    Clamp,
    Repeat,
    MirroredRepeat,
}

// ============================================================================
// Texture Descriptors
// ============================================================================

/// Everything about a texture except its size.
///
/// The default is an RGBA8 render-target style texture: nearest sampling,
/// clamped on both axes, no mipmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    pub channels: Channels,
    pub format: TextureFormat,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub wrap_x: WrapMode,
    pub wrap_y: WrapMode,
    pub mipmap: bool,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self::render_target(Channels::Rgba, TextureFormat::Uint8)
    }
}

impl TextureParams {
    /// Parameters for an offscreen color attachment: nearest sampling, clamped, no mips.
    #[must_use]
    pub const fn render_target(channels: Channels, format: TextureFormat) -> Self {
        Self {
            channels,
            format,
            min_filter: MinFilter::Nearest,
            mag_filter: MagFilter::Nearest,
            wrap_x: WrapMode::Clamp,
            wrap_y: WrapMode::Clamp,
            mipmap: false,
        }
    }

    /// Parameters for a loaded color image: linear, repeating, mipmapped.
    #[must_use]
    pub const fn color_image() -> Self {
        Self {
            channels: Channels::Rgba,
            format: TextureFormat::Uint8,
            min_filter: MinFilter::Linear,
            mag_filter: MagFilter::Linear,
            wrap_x: WrapMode::Repeat,
            wrap_y: WrapMode::Repeat,
            mipmap: true,
        }
    }

    #[must_use]
    pub const fn with_wrap(mut self, wrap_x: WrapMode, wrap_y: WrapMode) -> Self {
        self.wrap_x = wrap_x;
        self.wrap_y = wrap_y;
        self
    }

    #[inline]
    #[must_use]
    pub const fn pixel_byte_size(&self) -> usize {
        self.channels.count() * self.format.bytes_per_component()
    }
}

/// A texture's full description: its size plus [`TextureParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub params: TextureParams,
}

impl TextureDescriptor {
    #[must_use]
    pub const fn new(width: u32, height: u32, params: TextureParams) -> Self {
        Self {
            width,
            height,
            params,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// `width × height × pixel_byte_size`.
    #[inline]
    #[must_use]
    pub const fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.params.pixel_byte_size()
    }
}

/// Where a texture's initial texels come from.
///
/// Chosen explicitly by the caller; the backend never guesses the shape of
/// the input.
#[derive(Debug, Clone, Copy)]
pub enum TextureSource<'a> {
    /// Uninitialized storage, typically for render targets.
    Empty { width: u32, height: u32 },
    /// Tightly packed texels in the params' channel/format layout, bottom row first.
    Buffer {
        width: u32,
        height: u32,
        data: &'a [u8],
    },
    /// A decoded RGBA8 image; size and channel layout come from the image.
    Image(&'a DecodedImage),
}

impl TextureSource<'_> {
    #[must_use]
    pub fn size(&self) -> Extent {
        match self {
            TextureSource::Empty { width, height }
            | TextureSource::Buffer { width, height, .. } => Extent::new(*width, *height),
            TextureSource::Image(image) => Extent::new(image.width, image.height),
        }
    }
}

// ============================================================================
// Render State
// ============================================================================

/// Width and height of a render target, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    None,
    /// `src + dst`, used to accumulate per-light contributions.
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}
