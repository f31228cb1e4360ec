//! Pipeline Tests
//!
//! Tests for:
//! - Pipeline construction from shipped shaders
//! - Per-frame draw sequence across MRT, lighting and output
//! - Resizing without leaking render targets
//! - Standalone distance stage
//! - LOD icosphere loading and drawing

mod support;

use std::rc::Rc;

use glam::{Quat, Vec3};
use pollster::block_on;
use umbra::assets::{AssetReaderVariant, MemoryAssetReader};
use umbra::gpu::webgl::{GlObjectKind, HeadlessGl};
use umbra::gpu::webgl::headless::UniformData;
use umbra::gpu::{Framebuffer, GpuApi, RenderTarget, Texture2D, TextureParams};
use umbra::renderer::{MeshDistanceStage, Pipeline, RendererSettings};
use umbra::scene::{Camera, IcosphereDrawer, Mesh, SpotLight};
use umbra::UmbraError;

use support::{headless, png, shipped_assets, triangle, HeadlessApi};

fn scene_assets() -> MemoryAssetReader {
    let raw: Vec<u8> = triangle().iter().flat_map(|f| f.to_le_bytes()).collect();
    let mut reader = shipped_assets();
    reader
        .insert("triangle.raw", raw)
        .insert("checker.png", png(2, 2, [200, 100, 50, 255]));
    reader
}

fn meshes(api: &HeadlessApi, count: usize) -> Vec<Mesh<HeadlessApi>> {
    let geometry = Rc::new(block_on(api.load_geometry("triangle.raw")).unwrap());
    let texture =
        Rc::new(block_on(api.load_texture_2d("checker.png", TextureParams::color_image())).unwrap());
    (0..count)
        .map(|i| {
            let mut mesh = Mesh::new(Rc::clone(&geometry), Rc::clone(&texture));
            mesh.position = Vec3::new(i as f32, 0.0, -3.0);
            mesh
        })
        .collect()
}

fn camera() -> Camera {
    let mut camera = Camera::new();
    camera.set_perspective(60f32.to_radians(), 1.0, 0.1, 100.0);
    camera
}

fn lights(count: usize) -> Vec<SpotLight> {
    (0..count)
        .map(|i| {
            let mut light = SpotLight::new();
            light.position = Vec3::new(0.0, 2.0 + i as f32, 0.0);
            light.set_perspective(45f32.to_radians(), 1.0, 0.5, 50.0);
            light
        })
        .collect()
}

type Fixture<T> = (Rc<HeadlessGl>, Rc<HeadlessApi>, T);

fn pipeline(size: u32, settings: &RendererSettings) -> Fixture<Pipeline<HeadlessApi>> {
    let (gl, api) = headless(scene_assets(), size, size);
    let pipeline = block_on(Pipeline::new(Rc::clone(&api), settings)).unwrap();
    (gl, api, pipeline)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn stages_size_their_targets() {
    let settings = RendererSettings {
        shadow_map_size: 256,
        ..Default::default()
    };
    let (gl, _api, pipeline) = pipeline(64, &settings);

    let gbuffer = pipeline.mrt().outputs();
    for texture in gbuffer.as_array() {
        let (w, h, _) = gl.texture_storage(texture.handle().unwrap()).unwrap();
        assert_eq!((w, h), (64, 64));
    }
    assert_eq!(pipeline.mrt().framebuffer().attachment_count(), 4);
    assert_eq!(
        gl.depth_attachment_size(pipeline.mrt().framebuffer().handle()),
        Some((64, 64))
    );

    let (w, _, internal) = gl
        .texture_storage(pipeline.lighting().shadow_map().handle().unwrap())
        .unwrap();
    assert_eq!(w, 256);
    assert_eq!(internal, glow::R32F);

    let (_, _, internal) = gl
        .texture_storage(pipeline.lighting().output().handle().unwrap())
        .unwrap();
    assert_eq!(internal, glow::RGBA32F);
    assert_eq!(gl.live(GlObjectKind::Texture), 6);
}

#[test]
fn missing_shaders_fail_construction() {
    let (_gl, api) = headless(MemoryAssetReader::new(), 16, 16);
    let result = block_on(Pipeline::new(api, &RendererSettings::default()));
    assert!(matches!(result, Err(UmbraError::Io(_))));
}

// ============================================================================
// Frame
// ============================================================================

#[test]
fn frame_draws_every_pass_in_order() {
    let (gl, api, pipeline) = pipeline(32, &RendererSettings::default());
    let meshes = meshes(&api, 2);
    let lights = lights(2);
    gl.reset_calls();

    pipeline.draw(&camera(), &lights, &meshes, 1.5).unwrap();
    api.check_error().unwrap();

    let mrt = Some(pipeline.mrt().framebuffer().handle());
    let resolve = Some(pipeline.lighting().resolve_framebuffer().handle());
    let draws = gl.draw_calls();
    assert_eq!(draws.len(), 2 + 2 * (2 + 1) + 1);

    assert!(draws[..2].iter().all(|d| d.framebuffer == mrt && d.count == 3));
    assert!(draws[..2].iter().all(|d| d.depth_test && !d.blend));

    for light in 0..2 {
        let pass = &draws[2 + light * 3..2 + (light + 1) * 3];
        let shadow = pass[0].framebuffer;
        assert!(shadow.is_some() && shadow != mrt && shadow != resolve);
        assert_eq!(pass[1].framebuffer, shadow);
        assert_eq!(pass[2].framebuffer, resolve);
        assert_eq!(pass[2].count, 6);
        assert!(pass[2].blend);
        assert!(!pass[2].depth_test);
    }

    let output = draws.last().unwrap();
    assert_eq!(output.framebuffer, None);
    assert_eq!(output.count, 6);
    assert!(!output.blend);
}

#[test]
fn resolve_target_is_cleared_once_per_frame() {
    let (gl, api, pipeline) = pipeline(32, &RendererSettings::default());
    let meshes = meshes(&api, 1);
    gl.reset_calls();

    pipeline.draw(&camera(), &lights(3), &meshes, 0.0).unwrap();

    let resolve = Some(pipeline.lighting().resolve_framebuffer().handle());
    let clears = gl.clear_calls();
    assert_eq!(clears.iter().filter(|c| c.framebuffer == resolve).count(), 1);
    // MRT, resolve, three shadow maps, output.
    assert_eq!(clears.len(), 6);

    let output = clears.last().unwrap();
    assert_eq!(output.framebuffer, None);
    assert_eq!(output.color, Some([1.0, 1.0, 1.0, 1.0]));
}

#[test]
fn no_lights_still_presents() {
    let (gl, api, pipeline) = pipeline(16, &RendererSettings::default());
    let meshes = meshes(&api, 1);
    gl.reset_calls();

    pipeline.draw(&camera(), &[], &meshes, 0.0).unwrap();

    let draws = gl.draw_calls();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[1].framebuffer, None);
}

#[test]
fn output_samples_surface_color_light_and_distance() {
    let (gl, api, pipeline) = pipeline(16, &RendererSettings::default());
    let meshes = meshes(&api, 1);

    pipeline.draw(&camera(), &lights(1), &meshes, 0.0).unwrap();

    let gbuffer = pipeline.mrt().outputs();
    assert_eq!(gl.texture_on_unit(0), Some(gbuffer.color.handle().unwrap()));
    assert_eq!(
        gl.texture_on_unit(1),
        Some(pipeline.lighting().output().handle().unwrap())
    );
    assert_eq!(gl.texture_on_unit(2), Some(gbuffer.distance.handle().unwrap()));

    let output = gl.draw_calls().last().unwrap().program;
    for (name, unit) in [("colorTexture", 0), ("lightTexture", 1), ("distanceTexture", 2)] {
        assert_eq!(
            gl.uniform_value(output, name),
            Some(UniformData::Int {
                components: 1,
                data: vec![unit],
            })
        );
    }
}

#[test]
fn next_frame_starts_without_output_samplers() {
    let (gl, api, pipeline) = pipeline(16, &RendererSettings::default());
    let meshes = meshes(&api, 1);
    pipeline.draw(&camera(), &lights(1), &meshes, 0.0).unwrap();

    // The MRT program binds one texture after the output pass bound three.
    pipeline.mrt().draw(&camera(), &meshes, 0.1).unwrap();

    assert_eq!(gl.texture_on_unit(0), Some(meshes[0].color_texture().handle().unwrap()));
    assert_eq!(gl.texture_on_unit(1), None);
    assert_eq!(gl.texture_on_unit(2), None);
}

#[test]
fn elapsed_and_model_uniforms_reach_the_mrt_program() {
    let (gl, api, pipeline) = pipeline(16, &RendererSettings::default());
    let meshes = meshes(&api, 1);
    let mut camera = camera();
    camera.position = Vec3::new(0.0, 0.0, 2.0);

    pipeline.draw(&camera, &[], &meshes, 2.25).unwrap();

    let program = gl.draw_calls()[0].program;
    assert_eq!(
        gl.uniform_value(program, "elapsed"),
        Some(UniformData::Float {
            components: 1,
            data: vec![2.25],
        })
    );
    let Some(UniformData::Matrix { data, .. }) =
        gl.uniform_value(program, "modelMatrix")
    else {
        panic!("modelMatrix was not uploaded");
    };
    // Translation is camera-relative.
    assert_eq!(&data[12..15], &[0.0, 0.0, -5.0]);
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_replaces_targets_without_leaking() {
    let (gl, api, mut pipeline) = pipeline(32, &RendererSettings::default());
    let meshes = meshes(&api, 1);
    let before = gl.live(GlObjectKind::Texture);

    pipeline.resize(48, 24).unwrap();
    pipeline.resize(20, 10).unwrap();

    assert_eq!(gl.live(GlObjectKind::Texture), before);
    assert_eq!(api.default_framebuffer().size().width, 20);
    for texture in pipeline.mrt().outputs().as_array() {
        let (w, h, _) = gl.texture_storage(texture.handle().unwrap()).unwrap();
        assert_eq!((w, h), (20, 10));
    }
    assert_eq!(
        gl.depth_attachment_size(pipeline.mrt().framebuffer().handle()),
        Some((20, 10))
    );
    let (w, h, _) = gl
        .texture_storage(pipeline.lighting().output().handle().unwrap())
        .unwrap();
    assert_eq!((w, h), (20, 10));
    // The shadow map keeps its size.
    let (w, _, _) = gl
        .texture_storage(pipeline.lighting().shadow_map().handle().unwrap())
        .unwrap();
    assert_eq!(w, 1024);

    gl.reset_calls();
    pipeline.draw(&camera(), &lights(1), &meshes, 0.0).unwrap();
    api.check_error().unwrap();
    // Mesh, shadow, resolve, output.
    assert_eq!(gl.draw_calls().len(), 4);
}

// ============================================================================
// Distance Stage
// ============================================================================

#[test]
fn distance_stage_draws_every_mesh_into_its_target() {
    let (gl, api) = headless(scene_assets(), 32, 32);
    let stage = block_on(MeshDistanceStage::new(Rc::clone(&api), 8, 4)).unwrap();
    let meshes = meshes(&api, 3);
    gl.reset_calls();

    stage.draw(&camera(), &meshes).unwrap();

    let target = Some(stage.framebuffer().handle());
    let draws = gl.draw_calls();
    assert_eq!(draws.len(), 3);
    assert!(draws.iter().all(|d| d.framebuffer == target && d.depth_test));

    let mut bytes = vec![0u8; 4];
    stage.framebuffer().read_pixels(7, 3, 1, 1, 0, &mut bytes, 0).unwrap();
    assert_eq!(f32::from_ne_bytes(bytes.try_into().unwrap()), 1.0);
    assert_eq!(stage.output().descriptor().width, 8);
}

// ============================================================================
// Icosphere
// ============================================================================

fn icosphere_assets(patches: usize) -> MemoryAssetReader {
    let coarse: Vec<u8> = triangle().iter().flat_map(|f| f.to_le_bytes()).collect();
    let fine: Vec<u8> = triangle()
        .iter()
        .chain(triangle().iter())
        .flat_map(|f| f.to_le_bytes())
        .collect();
    let placements = (0..patches)
        .map(|_| r#"{ "center": [0, 0, 0], "mat3": [1, 0, 0, 0, 1, 0, 0, 0, 1] }"#)
        .collect::<Vec<_>>()
        .join(",");
    let json = format!(
        r#"{{ "levelsMeshes": ["coarse.raw", "fine.raw"], "positionMatrices": [{placements}] }}"#
    );

    let mut reader = shipped_assets();
    reader
        .insert("earth.jpg", png(4, 2, [0, 80, 160, 255]))
        .insert("icosphere/icosphere.json", json)
        .insert("icosphere/coarse.raw", coarse)
        .insert("icosphere/fine.raw", fine);
    reader
}

fn icosphere(patches: usize) -> Fixture<umbra::Result<IcosphereDrawer<HeadlessApi>>> {
    let (gl, api) = headless(icosphere_assets(patches), 16, 16);
    let reader = api.reader().clone();
    let drawer = block_on(IcosphereDrawer::load(Rc::clone(&api), &reader));
    (gl, api, drawer)
}

#[test]
fn icosphere_draws_one_patch_per_placement() {
    let (gl, api, drawer) = icosphere(5);
    let drawer = drawer.unwrap();
    assert_eq!(drawer.level_count(), 2);
    assert_eq!(drawer.patch_count(), 5);

    api.default_framebuffer().bind().unwrap();
    gl.reset_calls();
    drawer
        .draw(Vec3::new(0.0, 0.0, -20.0), Quat::IDENTITY, 1.0, &camera())
        .unwrap();
    api.check_error().unwrap();

    let draws = gl.draw_calls();
    assert_eq!(draws.len(), 5);
    // Far away: coarsest level, culling off while patches draw.
    assert!(draws.iter().all(|d| d.count == 3 && d.cull_face.is_none()));
    assert!(gl.is_enabled(glow::CULL_FACE));
    assert_eq!(gl.cull_mode(), glow::BACK);

    let program = gl.current_program().unwrap();
    assert_eq!(
        gl.uniform_value(program, "index"),
        Some(UniformData::Int {
            components: 1,
            data: vec![4],
        })
    );
}

#[test]
fn icosphere_uses_finest_level_up_close() {
    let (gl, api, drawer) = icosphere(1);
    let drawer = drawer.unwrap();

    api.default_framebuffer().bind().unwrap();
    gl.reset_calls();
    drawer
        .draw(Vec3::new(0.0, 0.0, -0.1), Quat::IDENTITY, 1.0, &camera())
        .unwrap();

    assert_eq!(gl.draw_calls()[0].count, 6);
}

#[test]
fn icosphere_rejects_too_many_patches() {
    let (_gl, _api, drawer) = icosphere(321);
    assert!(matches!(drawer, Err(UmbraError::InvalidDescriptor(_))));
}

#[test]
fn icosphere_requires_levels() {
    let mut reader = shipped_assets();
    reader
        .insert("earth.jpg", png(1, 1, [0, 0, 0, 255]))
        .insert(
            "icosphere/icosphere.json",
            r#"{ "levelsMeshes": [], "positionMatrices": [] }"#,
        );
    let (_gl, api) = headless(reader, 16, 16);
    let reader = AssetReaderVariant::memory(MemoryAssetReader::new());

    // The descriptor comes from the reader handed to `load`.
    assert!(matches!(
        block_on(IcosphereDrawer::load(Rc::clone(&api), &reader)),
        Err(UmbraError::Io(_))
    ));
    let reader = api.reader().clone();
    assert!(matches!(
        block_on(IcosphereDrawer::load(api, &reader)),
        Err(UmbraError::InvalidDescriptor(_))
    ));
}
