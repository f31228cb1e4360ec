//! Scene Objects
//!
//! A flat scene: a camera, spot lights and textured meshes. There is no
//! hierarchy; every object carries its own world transform.
//!
//! Rendering is camera-relative. Model matrices are built from
//! `position - camera.position` and view matrices hold rotation only, so
//! large world coordinates never reach the GPU.
//!
//! Objects upload uniforms through the capability traits below. A stage's
//! [`UniformSchema`] opts into each trait by naming the slot that carries the
//! value, and objects work against any schema that does.

pub mod camera;
pub mod icosphere;
pub mod mesh;
pub mod spot_light;

pub use camera::Camera;
pub use icosphere::{IcosphereDrawer, IcosphereUniform};
pub use mesh::Mesh;
pub use spot_light::SpotLight;

use crate::gpu::UniformSchema;

/// Schemas that receive a projection and a view matrix.
pub trait CameraUniforms: UniformSchema {
    const PERSPECTIVE_MATRIX: Self;
    const VIEW_MATRIX: Self;
}

/// Schemas that receive a per-object model matrix.
pub trait ModelUniforms: UniformSchema {
    const MODEL_MATRIX: Self;
}

/// Schemas that sample an object's color texture.
pub trait ColorTextureUniforms: UniformSchema {
    const COLOR_TEXTURE: Self;
}

/// Schemas that shade with a shadow-mapped spot light.
pub trait LightResolveUniforms: UniformSchema {
    const LIGHT_PERSPECTIVE_MATRIX: Self;
    const LIGHT_VIEW_MATRIX: Self;
    const LIGHT_COLOR: Self;
    const LIGHT_CAMERA_RELATIVE_POSITION: Self;
}
