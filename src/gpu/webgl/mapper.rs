//! Descriptor → GL enum mapping.
//!
//! Pure functions; every input in the declared domain has exactly one
//! mapping, so none of them can fail.
//!
//! | Format    | Internal formats          | Pixel format      | Type             |
//! |-----------|---------------------------|-------------------|------------------|
//! | `int8`    | `R8_SNORM` … `RGBA8_SNORM`| `RED` … `RGBA`    | `BYTE`           |
//! | `uint8`   | `R8` … `RGBA8`            | `RED` … `RGBA`    | `UNSIGNED_BYTE`  |
//! | `int16`   | `R16I` … `RGBA16I`        | `*_INTEGER`       | `SHORT`          |
//! | `uint16`  | `R16UI` … `RGBA16UI`      | `*_INTEGER`       | `UNSIGNED_SHORT` |
//! | `int32`   | `R32I` … `RGBA32I`        | `*_INTEGER`       | `INT`            |
//! | `uint32`  | `R32UI` … `RGBA32UI`      | `*_INTEGER`       | `UNSIGNED_INT`   |
//! | `float16` | `R16F` … `RGBA16F`        | `RED` … `RGBA`    | `HALF_FLOAT`     |
//! | `float32` | `R32F` … `RGBA32F`        | `RED` … `RGBA`    | `FLOAT`          |

use crate::gpu::types::{Channels, MagFilter, MinFilter, TextureFormat, WrapMode};

/// GL triple plus texel size for one channels × format combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeFormat {
    pub internal_format: u32,
    pub format: u32,
    pub ty: u32,
    pub pixel_byte_size: usize,
}

#[must_use]
pub const fn min_filter(filter: MinFilter) -> u32 {
    match filter {
        MinFilter::Nearest => glow::NEAREST,
        MinFilter::Linear => glow::LINEAR,
        MinFilter::MipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }
}

#[must_use]
pub const fn mag_filter(filter: MagFilter) -> u32 {
    match filter {
        MagFilter::Nearest => glow::NEAREST,
        MagFilter::Linear => glow::LINEAR,
    }
}

#[must_use]
pub const fn wrap_mode(wrap: WrapMode) -> u32 {
    match wrap {
        WrapMode::Clamp => glow::CLAMP_TO_EDGE,
        WrapMode::Repeat => glow::REPEAT,
        WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
    }
}

const fn pixel_format(channels: Channels, integer: bool) -> u32 {
    match (channels, integer) {
        (Channels::R, false) => glow::RED,
        (Channels::Rg, false) => glow::RG,
        (Channels::Rgb, false) => glow::RGB,
        (Channels::Rgba, false) => glow::RGBA,
        (Channels::R, true) => glow::RED_INTEGER,
        (Channels::Rg, true) => glow::RG_INTEGER,
        (Channels::Rgb, true) => glow::RGB_INTEGER,
        (Channels::Rgba, true) => glow::RGBA_INTEGER,
    }
}

const fn component_type(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::Int8 => glow::BYTE,
        TextureFormat::Uint8 => glow::UNSIGNED_BYTE,
        TextureFormat::Int16 => glow::SHORT,
        TextureFormat::Uint16 => glow::UNSIGNED_SHORT,
        TextureFormat::Int32 => glow::INT,
        TextureFormat::Uint32 => glow::UNSIGNED_INT,
        TextureFormat::Float16 => glow::HALF_FLOAT,
        TextureFormat::Float32 => glow::FLOAT,
    }
}

const fn internal_format(channels: Channels, format: TextureFormat) -> u32 {
    // Columns: R, RG, RGB, RGBA
    let row = match format {
        TextureFormat::Int8 => [glow::R8_SNORM, glow::RG8_SNORM, glow::RGB8_SNORM, glow::RGBA8_SNORM],
        TextureFormat::Uint8 => [glow::R8, glow::RG8, glow::RGB8, glow::RGBA8],
        TextureFormat::Int16 => [glow::R16I, glow::RG16I, glow::RGB16I, glow::RGBA16I],
        TextureFormat::Uint16 => [glow::R16UI, glow::RG16UI, glow::RGB16UI, glow::RGBA16UI],
        TextureFormat::Int32 => [glow::R32I, glow::RG32I, glow::RGB32I, glow::RGBA32I],
        TextureFormat::Uint32 => [glow::R32UI, glow::RG32UI, glow::RGB32UI, glow::RGBA32UI],
        TextureFormat::Float16 => [glow::R16F, glow::RG16F, glow::RGB16F, glow::RGBA16F],
        TextureFormat::Float32 => [glow::R32F, glow::RG32F, glow::RGB32F, glow::RGBA32F],
    };
    row[channels.count() - 1]
}

/// Maps a channel count and component format to its GL triple.
#[must_use]
pub const fn format(channels: Channels, format: TextureFormat) -> NativeFormat {
    NativeFormat {
        internal_format: internal_format(channels, format),
        format: pixel_format(channels, format.is_integer()),
        ty: component_type(format),
        pixel_byte_size: channels.count() * format.bytes_per_component(),
    }
}

/// Whether `internal_format` can be rendered to under OpenGL ES 3.0.
///
/// Float formats additionally need `EXT_color_buffer_float`; three-channel
/// and signed-normalized formats are never renderable.
#[must_use]
pub const fn is_color_renderable(internal_format: u32, float_targets: bool) -> bool {
    match internal_format {
        glow::R8 | glow::RG8 | glow::RGB8 | glow::RGBA8 => true,
        glow::R16I | glow::RG16I | glow::RGBA16I => true,
        glow::R16UI | glow::RG16UI | glow::RGBA16UI => true,
        glow::R32I | glow::RG32I | glow::RGBA32I => true,
        glow::R32UI | glow::RG32UI | glow::RGBA32UI => true,
        glow::R16F | glow::RG16F | glow::RGBA16F => float_targets,
        glow::R32F | glow::RG32F | glow::RGBA32F => float_targets,
        _ => false,
    }
}

/// Whether `internal_format` can be sampled with linear filtering.
///
/// Integer formats never can; 32-bit floats need `OES_texture_float_linear`.
#[must_use]
pub const fn is_filterable(internal_format: u32, float_linear: bool) -> bool {
    match internal_format {
        glow::R8 | glow::RG8 | glow::RGB8 | glow::RGBA8 => true,
        glow::R8_SNORM | glow::RG8_SNORM | glow::RGB8_SNORM | glow::RGBA8_SNORM => true,
        glow::R16F | glow::RG16F | glow::RGB16F | glow::RGBA16F => true,
        glow::R32F | glow::RG32F | glow::RGB32F | glow::RGBA32F => float_linear,
        _ => false,
    }
}

/// `glGenerateMipmap` needs a level 0 that is both color-renderable and
/// filterable.
#[must_use]
pub const fn can_generate_mipmap(
    internal_format: u32,
    float_targets: bool,
    float_linear: bool,
) -> bool {
    is_color_renderable(internal_format, float_targets)
        && is_filterable(internal_format, float_linear)
}

/// Looks up the channels × format pair that produced `internal_format`.
#[must_use]
pub fn describe(internal_format: u32) -> Option<(Channels, TextureFormat)> {
    TextureFormat::ALL.iter().find_map(|&kind| {
        Channels::ALL
            .iter()
            .find(|&&channels| format(channels, kind).internal_format == internal_format)
            .map(|&channels| (channels, kind))
    })
}
