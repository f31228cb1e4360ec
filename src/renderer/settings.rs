//! Renderer Settings
//!
//! Everything the pipeline needs to know before the first frame: output
//! size, where assets come from and how large shadow maps are.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use umbra::renderer::RendererSettings;
//!
//! let settings = RendererSettings {
//!     width: 1280,
//!     height: 720,
//!     ..Default::default()
//! };
//!
//! // Or from JSON; missing fields keep their defaults.
//! let settings = RendererSettings::from_json(br#"{ "shadowMapSize": 2048 }"#)?;
//! ```

use serde::Deserialize;

use super::lighting::DEFAULT_SHADOW_MAP_SIZE;
use crate::assets::AssetReaderVariant;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererSettings {
    /// Initial output width in pixels.
    pub width: u32,
    /// Initial output height in pixels.
    pub height: u32,
    /// Whether the default framebuffer has a depth buffer.
    pub depth: bool,
    /// Edge length of the square shadow map.
    pub shadow_map_size: u32,
    /// Clear color of the presented image.
    pub clear_color: [f32; 4],
    /// Directory or `http(s)://` URL that asset paths are relative to.
    pub asset_root: String,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            depth: false,
            shadow_map_size: DEFAULT_SHADOW_MAP_SIZE,
            clear_color: [1.0, 1.0, 1.0, 1.0],
            asset_root: "assets".to_string(),
        }
    }
}

impl RendererSettings {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// A reader rooted at [`asset_root`](Self::asset_root).
    pub fn asset_reader(&self) -> Result<AssetReaderVariant> {
        AssetReaderVariant::from_source(&self.asset_root)
    }
}
