//! Framebuffer Tests
//!
//! Tests for:
//! - Attachment order and draw buffer lists
//! - Completeness failures
//! - Clear → readback round trips across formats
//! - Draw → readback round trips through the flat-fill rasterizer
//! - Depth surfaces, resizing and the default framebuffer
//! - Blend state

mod support;

use half::f16;
use umbra::assets::MemoryAssetReader;
use umbra::gpu::webgl::headless::FRAMEBUFFER_INCOMPLETE_DIMENSIONS;
use umbra::gpu::webgl::{GlContext, GlObjectKind, HeadlessGl};
use umbra::gpu::{
    BlendMode, Channels, CullMode, Framebuffer, Geometry, GpuApi, RenderTarget, ShaderProgram,
    Texture2D, TextureFormat, TextureParams, TextureSource, UniformValue,
};
use umbra::{UmbraError, uniform_schema};

use support::{headless, HeadlessApi};

uniform_schema! {
    enum FillUniform {
        FillColor => "fillColor",
    }
}

const FILL_VERTEX: &str = "#version 300 es
layout(location = 0) in vec3 position;
void main() { gl_Position = vec4(position, 1.0); }";

const FILL_FRAGMENT: &str = "#version 300 es
precision highp float;
uniform vec4 fillColor;
layout(location = 0) out vec4 color;
layout(location = 1) out vec4 distance;
void main() { color = fillColor; distance = fillColor; }";

fn target(
    api: &HeadlessApi,
    width: u32,
    height: u32,
    channels: Channels,
    format: TextureFormat,
) -> <HeadlessApi as GpuApi>::Texture {
    api.create_texture_2d(
        TextureParams::render_target(channels, format),
        TextureSource::Empty { width, height },
    )
    .unwrap()
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn attachments_follow_slice_order() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let a = target(&api, 4, 4, Channels::Rgba, TextureFormat::Float16);
    let b = target(&api, 4, 4, Channels::R, TextureFormat::Float32);
    let c = target(&api, 4, 4, Channels::Rgba, TextureFormat::Float32);

    fb.set_attachments(&[&a, &b, &c]).unwrap();

    assert_eq!(fb.attachment_count(), 3);
    let attached = gl.color_attachments(fb.handle());
    assert_eq!(
        attached,
        vec![
            (0, a.handle().unwrap()),
            (1, b.handle().unwrap()),
            (2, c.handle().unwrap()),
        ]
    );
    assert_eq!(
        gl.draw_buffer_list(fb.handle()),
        vec![glow::COLOR_ATTACHMENT0, glow::COLOR_ATTACHMENT1, glow::COLOR_ATTACHMENT2]
    );
    assert_eq!(fb.attachment(1).unwrap().params.channels, Channels::R);
}

#[test]
fn fewer_attachments_detach_trailing_slots() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let a = target(&api, 4, 4, Channels::Rgba, TextureFormat::Uint8);
    let b = target(&api, 4, 4, Channels::Rgba, TextureFormat::Uint8);

    fb.set_attachments(&[&a, &b]).unwrap();
    fb.set_attachments(&[&b]).unwrap();

    assert_eq!(fb.attachment_count(), 1);
    assert_eq!(gl.color_attachments(fb.handle()), vec![(0, b.handle().unwrap())]);
    assert_eq!(gl.draw_buffer_list(fb.handle()), vec![glow::COLOR_ATTACHMENT0]);
}

#[test]
fn attachments_must_match_the_framebuffer_size() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let a = target(&api, 4, 4, Channels::Rgba, TextureFormat::Uint8);
    let b = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&a]).unwrap();

    assert!(matches!(
        fb.set_attachments(&[&a, &b]),
        Err(UmbraError::AttachmentSizeMismatch {
            slot: 1,
            expected_width: 4,
            expected_height: 4,
            width: 2,
            height: 2,
        })
    ));
    // Rejected before anything was attached.
    assert_eq!(fb.attachment_count(), 1);
    assert_eq!(gl.color_attachments(fb.handle()), vec![(0, a.handle().unwrap())]);
}

#[test]
fn stale_targets_are_rejected_after_resize() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let old = target(&api, 4, 4, Channels::Rgba, TextureFormat::Float16);
    fb.set_attachments(&[&old]).unwrap();

    fb.resize(8, 8).unwrap();
    assert!(matches!(
        fb.set_attachments(&[&old]),
        Err(UmbraError::AttachmentSizeMismatch { slot: 0, width: 4, .. })
    ));

    let fresh = target(&api, 8, 8, Channels::Rgba, TextureFormat::Float16);
    fb.set_attachments(&[&fresh]).unwrap();
}

#[test]
fn headless_reports_mismatched_dimensions() {
    let gl = HeadlessGl::new();
    let texture = |size: i32| {
        let texture = gl.create_texture().unwrap();
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGBA8 as i32,
            size,
            size,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            None,
        );
        texture
    };
    let (large, small) = (texture(4), texture(2));
    let fb = gl.create_framebuffer().unwrap();
    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fb));
    gl.framebuffer_texture_2d(
        glow::FRAMEBUFFER,
        glow::COLOR_ATTACHMENT0,
        glow::TEXTURE_2D,
        Some(large),
        0,
    );
    gl.framebuffer_texture_2d(
        glow::FRAMEBUFFER,
        glow::COLOR_ATTACHMENT1,
        glow::TEXTURE_2D,
        Some(small),
        0,
    );

    assert_eq!(
        gl.check_framebuffer_status(glow::FRAMEBUFFER),
        FRAMEBUFFER_INCOMPLETE_DIMENSIONS
    );
}

#[test]
fn three_channel_targets_are_incomplete() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let rgb = target(&api, 4, 4, Channels::Rgb, TextureFormat::Float32);

    assert!(matches!(
        fb.set_attachments(&[&rgb]),
        Err(UmbraError::FramebufferIncomplete { status }) if status == glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
    ));
}

#[test]
fn freed_texture_cannot_be_attached() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let a = target(&api, 4, 4, Channels::Rgba, TextureFormat::Uint8);
    a.free().unwrap();

    assert!(matches!(fb.set_attachments(&[&a]), Err(UmbraError::ResourceFreed(_))));
}

// ============================================================================
// Clear & Readback
// ============================================================================

#[test]
fn clear_reaches_every_attachment() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, true).unwrap();
    let color = target(&api, 2, 2, Channels::Rgba, TextureFormat::Float16);
    let distance = target(&api, 2, 2, Channels::R, TextureFormat::Float32);
    let normal = target(&api, 2, 2, Channels::Rgba, TextureFormat::Float32);
    let albedo = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&color, &distance, &normal, &albedo]).unwrap();

    fb.bind().unwrap();
    fb.clear([1.0, 0.0, 0.5, 1.0], Some(1.0));

    let mut bytes = vec![0u8; 4 * 4];
    fb.read_pixels(0, 0, 2, 2, 1, &mut bytes, 0).unwrap();
    for texel in bytes.chunks_exact(4) {
        assert_eq!(f32::from_ne_bytes(texel.try_into().unwrap()), 1.0);
    }

    let mut bytes = vec![0u8; 2 * 2 * 8];
    fb.read_pixels(0, 0, 2, 2, 0, &mut bytes, 0).unwrap();
    let first = bytes[..8]
        .chunks_exact(2)
        .map(|c| f16::from_ne_bytes([c[0], c[1]]).to_f32())
        .collect::<Vec<_>>();
    assert_eq!(first, vec![1.0, 0.0, 0.5, 1.0]);

    let mut bytes = vec![0u8; 16];
    fb.read_pixels(1, 1, 1, 1, 2, &mut bytes, 0).unwrap();
    assert_eq!(f32::from_ne_bytes(bytes[8..12].try_into().unwrap()), 0.5);

    let mut bytes = vec![0u8; 4];
    fb.read_pixels(0, 1, 1, 1, 3, &mut bytes, 0).unwrap();
    assert_eq!(bytes, vec![255, 0, 128, 255]);

    api.check_error().unwrap();
}

#[test]
fn readback_honors_destination_offset() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, false).unwrap();
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&texture]).unwrap();
    fb.bind().unwrap();
    fb.clear([0.0, 1.0, 0.0, 1.0], None);

    let mut bytes = vec![7u8; 8];
    fb.read_pixels(0, 0, 1, 1, 0, &mut bytes, 4).unwrap();
    assert_eq!(bytes, vec![7, 7, 7, 7, 0, 255, 0, 255]);
}

#[test]
fn readback_rejects_bad_slots_and_rects() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, false).unwrap();
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&texture]).unwrap();
    let mut bytes = vec![0u8; 64];

    assert!(matches!(
        fb.read_pixels(0, 0, 1, 1, 1, &mut bytes, 0),
        Err(UmbraError::AttachmentOutOfRange { slot: 1, count: 1 })
    ));
    assert!(matches!(
        fb.read_pixels(1, 0, 2, 1, 0, &mut bytes, 0),
        Err(UmbraError::ReadbackOutOfBounds(_))
    ));
    assert!(matches!(
        fb.read_pixels(0, 0, 2, 2, 0, &mut bytes, 60),
        Err(UmbraError::ReadbackOutOfBounds(_))
    ));
    assert!(matches!(
        fb.read_pixels(0, 0, 1, 1, 0, &mut bytes, usize::MAX),
        Err(UmbraError::ReadbackOutOfBounds(_))
    ));
}

#[test]
fn readback_keeps_blend_and_viewport_state() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, false).unwrap();
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&texture]).unwrap();

    api.default_framebuffer().bind().unwrap();
    api.set_blending(BlendMode::Add);

    let mut bytes = vec![0u8; 4];
    fb.read_pixels(0, 0, 1, 1, 0, &mut bytes, 0).unwrap();

    assert_eq!(gl.bound_framebuffer(), Some(fb.handle()));
    assert!(gl.is_enabled(glow::BLEND));
    assert_eq!(gl.viewport(), [0, 0, 8, 8]);
}

// ============================================================================
// Draw & Readback
// ============================================================================

/// One triangle in the interleaved layout from clip-space corners.
fn clip_triangle(corners: [[f32; 2]; 3]) -> Vec<f32> {
    corners
        .iter()
        .flat_map(|[x, y]| [*x, *y, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0])
        .collect()
}

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn fill(api: &HeadlessApi, color: [f32; 4]) -> <HeadlessApi as GpuApi>::Shader<FillUniform> {
    let shader = api
        .create_shader_from_source::<FillUniform>(FILL_VERTEX, FILL_FRAGMENT)
        .unwrap();
    shader.use_program();
    shader
        .set_uniform(FillUniform::FillColor, UniformValue::Float(&color[..]))
        .unwrap();
    shader
}

#[test]
fn drawn_triangle_reaches_every_mrt_attachment() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, true).unwrap();
    let color = target(&api, 4, 4, Channels::Rgba, TextureFormat::Float32);
    let distance = target(&api, 4, 4, Channels::R, TextureFormat::Float32);
    fb.set_attachments(&[&color, &distance]).unwrap();
    let cover = api
        .create_geometry(&clip_triangle([[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]]))
        .unwrap();

    fb.bind().unwrap();
    fb.clear([0.0; 4], Some(1.0));
    let _shader = fill(&api, [0.25, 0.5, 0.75, 1.0]);
    cover.draw().unwrap();
    api.check_error().unwrap();

    let mut texel = vec![0u8; 16];
    fb.read_pixels(2, 2, 1, 1, 0, &mut texel, 0).unwrap();
    assert_eq!(floats(&texel), vec![0.25, 0.5, 0.75, 1.0]);

    let mut plane = vec![0u8; 4 * 16];
    fb.read_pixels(0, 0, 4, 4, 1, &mut plane, 0).unwrap();
    assert!(floats(&plane).iter().all(|&d| d == 0.25));
}

#[test]
fn uncovered_pixels_keep_the_clear_color() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let texture = target(&api, 4, 4, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&texture]).unwrap();
    let lower_left = api
        .create_geometry(&clip_triangle([[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]]))
        .unwrap();

    fb.bind().unwrap();
    fb.clear([0.0, 0.0, 0.0, 1.0], None);
    let _shader = fill(&api, [1.0, 0.0, 0.0, 1.0]);
    lower_left.draw().unwrap();

    let mut bytes = vec![0u8; 4 * 16];
    fb.read_pixels(0, 0, 4, 4, 0, &mut bytes, 0).unwrap();
    let pixel = |x: usize, y: usize| &bytes[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
    assert_eq!(pixel(0, 0), &[255, 0, 0, 255]);
    assert_eq!(pixel(3, 0), &[255, 0, 0, 255]);
    assert_eq!(pixel(3, 3), &[0, 0, 0, 255]);
}

#[test]
fn clockwise_triangles_follow_the_cull_mode() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, false).unwrap();
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&texture]).unwrap();
    let clockwise = api
        .create_geometry(&clip_triangle([[-1.0, -1.0], [-1.0, 3.0], [3.0, -1.0]]))
        .unwrap();

    fb.bind().unwrap();
    fb.clear([0.0; 4], None);
    let _shader = fill(&api, [0.0, 1.0, 0.0, 1.0]);

    // Back faces are culled after initialization.
    clockwise.draw().unwrap();
    let mut bytes = vec![0u8; 4];
    fb.read_pixels(0, 0, 1, 1, 0, &mut bytes, 0).unwrap();
    assert_eq!(bytes, vec![0, 0, 0, 0]);

    api.set_cull_face(CullMode::Front);
    clockwise.draw().unwrap();
    fb.read_pixels(0, 0, 1, 1, 0, &mut bytes, 0).unwrap();
    assert_eq!(bytes, vec![0, 255, 0, 255]);
}

#[test]
fn additive_draws_accumulate() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, false).unwrap();
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Float16);
    fb.set_attachments(&[&texture]).unwrap();
    let cover = api
        .create_geometry(&clip_triangle([[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]]))
        .unwrap();

    fb.bind().unwrap();
    fb.clear([0.0; 4], None);
    fb.set_blending(BlendMode::Add);
    let _shader = fill(&api, [0.5, 0.25, 0.0, 1.0]);
    cover.draw().unwrap();
    cover.draw().unwrap();

    let mut bytes = vec![0u8; 8];
    fb.read_pixels(1, 1, 1, 1, 0, &mut bytes, 0).unwrap();
    let light: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|c| f16::from_ne_bytes([c[0], c[1]]).to_f32())
        .collect();
    assert_eq!(light, vec![1.0, 0.5, 0.0, 2.0]);
}

// ============================================================================
// Depth & Resize
// ============================================================================

#[test]
fn depth_is_cleared_only_when_present() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);

    let plain = api.create_framebuffer(2, 2, false).unwrap();
    plain.set_attachments(&[&texture]).unwrap();
    plain.bind().unwrap();
    assert!(!gl.is_enabled(glow::DEPTH_TEST));
    plain.clear([0.0; 4], Some(1.0));

    let texture2 = target(&api, 2, 2, Channels::Rgba, TextureFormat::Uint8);
    let deep = api.create_framebuffer(2, 2, true).unwrap();
    deep.set_attachments(&[&texture2]).unwrap();
    deep.bind().unwrap();
    assert!(gl.is_enabled(glow::DEPTH_TEST));
    deep.clear([0.0; 4], Some(1.0));

    let clears = gl.clear_calls();
    assert_eq!(clears.len(), 2);
    assert_eq!(clears[0].framebuffer, Some(plain.handle()));
    assert_eq!(clears[0].depth, None);
    assert_eq!(clears[1].framebuffer, Some(deep.handle()));
    assert_eq!(clears[1].depth, Some(1.0));
}

#[test]
fn resize_reallocates_the_depth_surface() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, true).unwrap();
    assert_eq!(gl.depth_attachment_size(fb.handle()), Some((4, 4)));

    fb.resize(16, 8).unwrap();
    assert_eq!(gl.depth_attachment_size(fb.handle()), Some((16, 8)));
    assert_eq!(fb.size().width, 16);
    assert_eq!(gl.live(GlObjectKind::Renderbuffer), 1);

    let texture = target(&api, 16, 8, Channels::Rgba, TextureFormat::Float32);
    fb.set_attachments(&[&texture]).unwrap();
    fb.bind().unwrap();
    assert_eq!(gl.viewport(), [0, 0, 16, 8]);
}

#[test]
fn dropping_a_framebuffer_releases_its_objects() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(4, 4, true).unwrap();
    drop(fb);

    assert_eq!(gl.live(GlObjectKind::Framebuffer), 0);
    assert_eq!(gl.live(GlObjectKind::Renderbuffer), 0);
}

#[test]
fn default_framebuffer_binds_the_surface() {
    let (gl, api) = headless(MemoryAssetReader::new(), 32, 16);
    let fb = api.create_framebuffer(4, 4, false).unwrap();
    let texture = target(&api, 4, 4, Channels::Rgba, TextureFormat::Uint8);
    fb.set_attachments(&[&texture]).unwrap();
    fb.bind().unwrap();

    api.default_framebuffer().bind().unwrap();
    assert_eq!(gl.bound_framebuffer(), None);
    assert_eq!(gl.viewport(), [0, 0, 32, 16]);

    api.resize_default_framebuffer(64, 48).unwrap();
    assert_eq!(api.default_framebuffer().size().height, 48);
    api.default_framebuffer().bind().unwrap();
    assert_eq!(gl.viewport(), [0, 0, 64, 48]);
}

// ============================================================================
// Blending
// ============================================================================

#[test]
fn additive_blending_is_one_one() {
    let (gl, api) = headless(MemoryAssetReader::new(), 8, 8);
    let fb = api.create_framebuffer(2, 2, false).unwrap();
    let texture = target(&api, 2, 2, Channels::Rgba, TextureFormat::Float16);
    fb.set_attachments(&[&texture]).unwrap();

    fb.bind().unwrap();
    fb.set_blending(BlendMode::Add);
    assert!(gl.is_enabled(glow::BLEND));
    assert_eq!(gl.blend_state(), (glow::FUNC_ADD, glow::ONE, glow::ONE));

    // Every bind starts unblended.
    fb.bind().unwrap();
    assert!(!gl.is_enabled(glow::BLEND));

    api.set_blending(BlendMode::Add);
    assert!(gl.is_enabled(glow::BLEND));
    api.set_blending(BlendMode::None);
    assert!(!gl.is_enabled(glow::BLEND));
}
