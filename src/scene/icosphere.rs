//! Level-of-detail icosphere.
//!
//! The sphere is cut into patches that share one set of per-level meshes.
//! Each patch is placed by a center and a rotation uploaded once as uniform
//! arrays; per frame only the patch centers move, and each patch picks its
//! mesh from its distance to the camera.

use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};

use super::Camera;
use crate::assets::{AssetReaderVariant, IcosphereDescriptor, PatchPlacement};
use crate::errors::{Result, UmbraError};
use crate::gpu::{
    CullMode, Geometry, GpuApi, ShaderProgram, TextureParams, UniformValue, WrapMode,
};
use crate::scene::CameraUniforms;

/// Upper bound on patches; matches the uniform array sizes in `icosphere.vert`.
pub const MAX_PATCHES: usize = 320;

/// Distance thresholds, in sphere radii, between consecutive levels.
pub const LOD_DISTANCE_STEPS: [f32; 4] = [0.5, 1.5, 3.7, 10.0];

pub const VERTEX_SHADER: &str = "entrypoints/icosphere/icosphere.vert";
pub const FRAGMENT_SHADER: &str = "entrypoints/icosphere/icosphere.frag";

crate::uniform_schema! {
    pub enum IcosphereUniform {
        Scale => "scale",
        Centers => "centers",
        CentersWithoutTranslation => "centersWithoutTranslation",
        Matrices => "matrices",
        SphereCenter => "sphereCenter",
        PerspectiveMatrix => "perspectiveMatrix",
        ViewMatrix => "viewMatrix",
        ModelMatrix => "modelMatrix",
        Index => "index",
        Tex => "tex",
    }
}

impl CameraUniforms for IcosphereUniform {
    const PERSPECTIVE_MATRIX: Self = IcosphereUniform::PerspectiveMatrix;
    const VIEW_MATRIX: Self = IcosphereUniform::ViewMatrix;
}

/// Picks the level for a patch `distance` away from the camera.
///
/// Level 0 is the finest. Anything beyond the last threshold uses the
/// coarsest of `level_count` levels.
#[must_use]
pub fn lod_level(distance: f32, scale: f32, level_count: usize) -> usize {
    let last = level_count.saturating_sub(1);
    LOD_DISTANCE_STEPS
        .iter()
        .position(|step| distance < step * scale)
        .map_or(last, |level| level.min(last))
}

/// Where patch centers land for a sphere at `position` seen from `camera_position`.
///
/// Returns `(translated, rotated)`: camera-relative centers and the centers
/// rotated and scaled only.
#[must_use]
pub fn patch_centers(
    patches: &[PatchPlacement],
    position: Vec3,
    orientation: Quat,
    scale: f32,
    camera_position: Vec3,
) -> (Vec<Vec3>, Vec<Vec3>) {
    let camera_space = position - camera_position;
    patches
        .iter()
        .map(|patch| {
            let rotated = orientation * (patch.center() * scale);
            (camera_space + rotated, rotated)
        })
        .unzip()
}

/// Draws a textured LOD icosphere.
pub struct IcosphereDrawer<A: GpuApi> {
    api: Rc<A>,
    shader: A::Shader<IcosphereUniform>,
    texture: A::Texture,
    /// Finest first.
    levels: Vec<A::Geometry>,
    patches: Vec<PatchPlacement>,
}

impl<A: GpuApi> IcosphereDrawer<A> {
    /// Loads `earth.jpg`, `icosphere/icosphere.json` and its level meshes,
    /// then uploads the patch rotations once.
    pub async fn load(api: Rc<A>, reader: &AssetReaderVariant) -> Result<Self> {
        let texture = api
            .load_texture_2d(
                "earth.jpg",
                TextureParams::color_image().with_wrap(WrapMode::Clamp, WrapMode::Clamp),
            )
            .await?;

        let descriptor =
            IcosphereDescriptor::from_json(&reader.read_bytes("icosphere/icosphere.json").await?)?;
        if descriptor.levels_meshes.is_empty() {
            return Err(UmbraError::InvalidDescriptor(
                "icosphere has no level meshes".to_string(),
            ));
        }
        if descriptor.position_matrices.len() > MAX_PATCHES {
            return Err(UmbraError::InvalidDescriptor(format!(
                "icosphere has {} patches, at most {MAX_PATCHES} are supported",
                descriptor.position_matrices.len()
            )));
        }

        let mut levels = Vec::with_capacity(descriptor.levels_meshes.len());
        for mesh in &descriptor.levels_meshes {
            levels.push(api.load_geometry(&format!("icosphere/{mesh}")).await?);
        }
        // Listed coarsest first.
        levels.reverse();

        let shader = api
            .create_shader::<IcosphereUniform>(VERTEX_SHADER, FRAGMENT_SHADER)
            .await?;

        let drawer = Self {
            api,
            shader,
            texture,
            levels,
            patches: descriptor.position_matrices,
        };
        drawer.upload_matrices()?;
        log::debug!(
            "Icosphere loaded: {} levels, {} patches",
            drawer.levels.len(),
            drawer.patches.len()
        );
        Ok(drawer)
    }

    #[inline]
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    #[must_use]
    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    fn upload_matrices(&self) -> Result<()> {
        self.shader.use_program();
        let mut matrices = vec![0.0f32; MAX_PATCHES * 16];
        for (chunk, patch) in matrices.chunks_exact_mut(16).zip(&self.patches) {
            chunk.copy_from_slice(&patch.matrix().to_cols_array());
        }
        self.shader
            .set_uniform_matrix_array(IcosphereUniform::Matrices, 4, false, &matrices)
    }

    fn upload_centers(&self, translated: &[Vec3], rotated: &[Vec3]) -> Result<()> {
        let mut translated_buffer = vec![0.0f32; MAX_PATCHES * 4];
        let mut rotated_buffer = vec![0.0f32; MAX_PATCHES * 4];
        for (i, (t, r)) in translated.iter().zip(rotated).enumerate() {
            translated_buffer[i * 4..i * 4 + 3].copy_from_slice(&t.to_array());
            rotated_buffer[i * 4..i * 4 + 3].copy_from_slice(&r.to_array());
        }
        self.shader.set_uniform_array(
            IcosphereUniform::Centers,
            UniformValue::Float(&translated_buffer),
            4,
        )?;
        self.shader.set_uniform_array(
            IcosphereUniform::CentersWithoutTranslation,
            UniformValue::Float(&rotated_buffer),
            4,
        )
    }

    /// Draws the sphere into the currently bound target.
    ///
    /// Face culling is off while patches draw and back-face culling is
    /// restored afterwards.
    pub fn draw(&self, position: Vec3, orientation: Quat, scale: f32, camera: &Camera) -> Result<()> {
        self.shader.use_program();
        self.shader
            .set_samplers(&[(IcosphereUniform::Tex, &self.texture)])?;

        let (translated, rotated) =
            patch_centers(&self.patches, position, orientation, scale, camera.position);
        self.upload_centers(&translated, &rotated)?;

        self.shader.set_uniform_matrix_array(
            IcosphereUniform::ModelMatrix,
            4,
            false,
            &Mat4::from_quat(orientation).to_cols_array(),
        )?;
        self.shader
            .set_uniform(IcosphereUniform::Scale, UniformValue::Float(&[scale]))?;
        self.shader.set_uniform(
            IcosphereUniform::SphereCenter,
            UniformValue::Float(&position.to_array()),
        )?;
        camera.set_uniforms(&self.shader)?;

        self.api.set_cull_face(CullMode::None);
        let result = self.draw_patches(position, &rotated, scale, camera);
        self.api.set_cull_face(CullMode::Back);
        result
    }

    fn draw_patches(&self, position: Vec3, rotated: &[Vec3], scale: f32, camera: &Camera) -> Result<()> {
        for (index, offset) in rotated.iter().enumerate() {
            self.shader
                .set_uniform(IcosphereUniform::Index, UniformValue::Int(&[index as i32]))?;
            let distance = (position + *offset).distance(camera.position);
            let level = lod_level(distance, scale, self.levels.len());
            self.levels[level].draw()?;
        }
        Ok(())
    }
}
