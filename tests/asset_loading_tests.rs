//! Asset Loading Tests
//!
//! Tests for:
//! - OBJ and raw geometry through the backend
//! - Image decoding and texture upload orientation
//! - HTML fallbacks from asset servers
//! - Shader include resolution over the shipped GLSL
//! - Disk reader

mod support;

use pollster::block_on;
use umbra::assets::{obj, AssetReaderVariant, MemoryAssetReader};
use umbra::gpu::webgl::GlObjectKind;
use umbra::gpu::{Geometry, GpuApi, Texture2D, TextureParams, FLOATS_PER_VERTEX};
use umbra::renderer::lighting::{self, ResolveUniform};
use umbra::renderer::mrt::{self, MeshUniform};
use umbra::renderer::output::{self, OutputUniform};
use umbra::scene::icosphere;
use umbra::scene::IcosphereUniform;
use umbra::UmbraError;

use support::{headless, png, shipped_assets};

const CUBE_FACE: &str = "\
# one face of a cube, two triangles
o Cube
v -1.0 -1.0 1.0
v 1.0 -1.0 1.0
v 1.0 1.0 1.0
v -1.0 1.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
usemtl Material
s off
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

// ============================================================================
// Geometry
// ============================================================================

#[test]
fn obj_face_expands_to_interleaved_vertices() {
    let mesh = obj::parse(CUBE_FACE).unwrap();
    assert_eq!(mesh.vertices.len(), 6);

    let floats = mesh.to_interleaved();
    assert_eq!(floats.len(), 6 * FLOATS_PER_VERTEX);
    // Vertex 4 is the first corner of the second triangle.
    let fourth = &floats[3 * FLOATS_PER_VERTEX..4 * FLOATS_PER_VERTEX];
    assert_eq!(&fourth[..3], &[-1.0, -1.0, 1.0]);
    assert_eq!(&fourth[5..8], &[0.0, 0.0, 1.0]);
    assert_eq!(fourth[11], 1.0);
}

#[test]
fn load_geometry_dispatches_on_extension() {
    let raw: Vec<u8> = support::triangle()
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect();
    let mut reader = MemoryAssetReader::new();
    reader
        .insert("face.obj", CUBE_FACE)
        .insert("triangle.raw", raw)
        .insert("model.fbx", vec![0u8; 4]);
    let (gl, api) = headless(reader, 8, 8);

    let face = block_on(api.load_geometry("face.obj")).unwrap();
    assert_eq!(face.vertex_count(), 6);
    let triangle = block_on(api.load_geometry("triangle.raw")).unwrap();
    assert_eq!(triangle.vertex_count(), 3);
    assert_eq!(gl.live(GlObjectKind::VertexArray), 2);

    assert!(matches!(
        block_on(api.load_geometry("model.fbx")),
        Err(UmbraError::UnsupportedAsset(_))
    ));
    assert!(matches!(
        block_on(api.load_geometry("missing.obj")),
        Err(UmbraError::Io(_))
    ));
}

#[test]
fn malformed_obj_reports_its_line() {
    let mut reader = MemoryAssetReader::new();
    reader.insert("broken.obj", "v 0 0 0\nvn 0 0 1\nf 1//1 1//1 9//1\n");
    let (_gl, api) = headless(reader, 8, 8);

    match block_on(api.load_geometry("broken.obj")) {
        Err(UmbraError::MeshParse { line, .. }) => assert_eq!(line, 3),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("out of range index was accepted"),
    }
}

// ============================================================================
// Textures
// ============================================================================

#[test]
fn images_are_uploaded_bottom_row_first() {
    let mut image = image::RgbaImage::new(1, 2);
    image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
    image.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();

    let mut reader = MemoryAssetReader::new();
    reader.insert("two_rows.png", bytes);
    let (gl, api) = headless(reader, 8, 8);

    let texture = block_on(api.load_texture_2d("two_rows.png", TextureParams::color_image())).unwrap();
    assert_eq!((texture.descriptor().width, texture.descriptor().height), (1, 2));
    assert_eq!(texture.byte_size(), 8);

    let data = gl.texture_data(texture.handle().unwrap()).unwrap();
    assert_eq!(data, vec![0, 0, 255, 255, 255, 0, 0, 255]);
}

#[test]
fn image_params_keep_sampling_but_force_rgba8() {
    let mut reader = MemoryAssetReader::new();
    reader.insert("solid.png", png(4, 4, [10, 20, 30, 255]));
    let (gl, api) = headless(reader, 8, 8);

    let params = TextureParams {
        mipmap: false,
        ..TextureParams::render_target(umbra::gpu::Channels::R, umbra::gpu::TextureFormat::Float32)
    };
    let texture = block_on(api.load_texture_2d("solid.png", params)).unwrap();
    let (_, _, internal) = gl.texture_storage(texture.handle().unwrap()).unwrap();
    assert_eq!(internal, glow::RGBA8);
    assert_eq!(texture.descriptor().params.min_filter, params.min_filter);
}

#[test]
fn html_responses_are_not_assets() {
    let mut reader = MemoryAssetReader::new();
    reader.insert_typed("earth.jpg", "<!doctype html><html></html>", Some("text/html"));
    let (gl, api) = headless(reader, 8, 8);

    assert!(matches!(
        block_on(api.load_texture_2d("earth.jpg", TextureParams::color_image())),
        Err(UmbraError::HtmlInsteadOfAsset(path)) if path == "earth.jpg"
    ));
    assert_eq!(gl.live(GlObjectKind::Texture), 0);
}

#[test]
fn undecodable_images_fail() {
    let mut reader = MemoryAssetReader::new();
    reader.insert("noise.png", vec![1u8, 2, 3, 4]);
    let (_gl, api) = headless(reader, 8, 8);

    assert!(block_on(api.load_texture_2d("noise.png", TextureParams::color_image())).is_err());
}

// ============================================================================
// Shaders
// ============================================================================

#[test]
fn shipped_shaders_resolve_and_link() {
    let (_gl, api) = headless(shipped_assets(), 8, 8);

    block_on(api.create_shader::<MeshUniform>(mrt::VERTEX_SHADER, mrt::FRAGMENT_SHADER)).unwrap();
    block_on(api.create_shader::<ResolveUniform>(
        lighting::RESOLVE_VERTEX_SHADER,
        lighting::RESOLVE_FRAGMENT_SHADER,
    ))
    .unwrap();
    block_on(api.create_shader::<OutputUniform>(output::VERTEX_SHADER, output::FRAGMENT_SHADER))
        .unwrap();
    block_on(api.create_shader::<IcosphereUniform>(
        icosphere::VERTEX_SHADER,
        icosphere::FRAGMENT_SHADER,
    ))
    .unwrap();
    api.check_error().unwrap();
}

#[test]
fn includes_are_inlined_once() {
    let reader = AssetReaderVariant::memory(shipped_assets());
    let source = block_on(umbra::assets::shader_source::load_and_resolve(
        &reader,
        mrt::FRAGMENT_SHADER,
    ))
    .unwrap();

    assert!(source.starts_with("#version 300 es"));
    assert!(!source.contains("#include"));
    assert!(!source.contains("#pragma once"));
    assert!(source.contains("#ifndef Xcommon_gbuffer_glsl"));
    assert!(source.contains("#line 1 10"));
}

#[test]
fn missing_include_fails_shader_creation() {
    let mut reader = MemoryAssetReader::new();
    reader
        .insert("a.vert", "#version 300 es\n#include \"nowhere.glsl\"\nvoid main() {}")
        .insert("a.frag", "#version 300 es\nvoid main() {}");
    let (gl, api) = headless(reader, 8, 8);

    assert!(block_on(api.create_shader::<OutputUniform>("a.vert", "a.frag")).is_err());
    assert_eq!(gl.live(GlObjectKind::Program), 0);
}

// ============================================================================
// Disk Reader
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
#[tokio::test]
async fn file_reader_reads_relative_to_its_root() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");
    let reader = AssetReaderVariant::from_source(root).unwrap();

    let text = reader.read_text("common/distance.glsl").await.unwrap();
    assert!(text.contains("encodeDistance"));
    assert!(matches!(
        reader.read_bytes("common/absent.glsl").await,
        Err(UmbraError::Io(_))
    ));
}
