//! Runs the deferred pipeline on the in-memory GL context.
//!
//! Builds the stages from the shipped shaders, lights a textured quad with
//! two spot lights, resizes halfway through and logs what each frame drew.
//!
//! ```text
//! RUST_LOG=debug cargo run --example headless_frames
//! ```

use std::rc::Rc;

use anyhow::Context;
use glam::{Quat, Vec3};
use umbra::gpu::webgl::GlObjectKind;
use umbra::prelude::*;
use umbra::renderer::FULL_SCREEN_QUAD;
use umbra::utils::logging;

const FRAMES: u64 = 120;

#[rustfmt::skip]
const CHECKER: [u8; 16] = [
    255, 255, 255, 255,   40,  40,  40, 255,
     40,  40,  40, 255,  255, 255, 255, 255,
];

fn main() -> anyhow::Result<()> {
    logging::init();

    let settings = RendererSettings {
        width: 320,
        height: 240,
        shadow_map_size: 512,
        asset_root: concat!(env!("CARGO_MANIFEST_DIR"), "/assets").to_string(),
        ..Default::default()
    };

    let gl = Rc::new(HeadlessGl::new());
    let api = Rc::new(WebGlApi::initialize(
        Rc::clone(&gl),
        settings.asset_reader()?,
        settings.width,
        settings.height,
        settings.depth,
    )?);
    let mut pipeline = pollster::block_on(Pipeline::new(Rc::clone(&api), &settings))
        .context("building the pipeline")?;

    let geometry = Rc::new(api.create_geometry(&FULL_SCREEN_QUAD)?);
    let texture = Rc::new(api.create_texture_2d(
        TextureParams::color_image(),
        TextureSource::Buffer {
            width: 2,
            height: 2,
            data: &CHECKER,
        },
    )?);
    let mut floor = Mesh::new(geometry, texture);
    floor.position = Vec3::new(0.0, -1.0, -4.0);
    floor.orientation = Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2);
    floor.scale = Vec3::splat(3.0);
    let meshes = [floor];

    let mut camera = Camera::new();
    camera.set_perspective(
        60f32.to_radians(),
        settings.width as f32 / settings.height as f32,
        0.1,
        100.0,
    );

    let mut lights = [SpotLight::new(), SpotLight::new()];
    for (i, light) in lights.iter_mut().enumerate() {
        light.position = Vec3::new(i as f32 * 2.0 - 1.0, 3.0, -4.0);
        light.orientation = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        light.set_perspective(50f32.to_radians(), 1.0, 0.5, 20.0);
    }
    lights[1].color = Vec3::new(1.0, 0.6, 0.3);

    let mut timer = Timer::new();
    let mut fps = FpsCounter::new();
    while timer.frame_count < FRAMES {
        timer.tick();
        if timer.frame_count == FRAMES / 2 {
            pipeline.resize(640, 360)?;
            camera.set_perspective(60f32.to_radians(), 640.0 / 360.0, 0.1, 100.0);
        }

        gl.reset_calls();
        let angle = timer.elapsed_seconds();
        lights[0].position.x = angle.sin() * 2.0;
        pipeline.draw(&camera, &lights, &meshes, timer.elapsed_seconds())?;
        api.check_error()?;

        log::debug!(
            "Frame {}: {} draws, {} clears",
            timer.frame_count,
            gl.draw_calls().len(),
            gl.clear_calls().len()
        );
        if let Some(rate) = fps.record(timer.delta) {
            log::info!("{rate:.0} frames/s");
        }
    }

    log::info!(
        "Rendered {FRAMES} frames, {} textures live",
        gl.live(GlObjectKind::Texture)
    );
    Ok(())
}
