//! Asset Loading
//!
//! Everything between a URI and bytes the GPU layer can consume:
//!
//! - [`io`]: [`AssetReader`] implementations (disk, HTTP, memory) behind
//!   [`AssetReaderVariant`]
//! - [`image_data`]: decoding to RGBA8 ([`DecodedImage`])
//! - [`obj`] / [`mesh`]: OBJ parsing, raw float dumps, tangent generation
//! - [`shader_source`]: `#include` / `#pragma once` resolution
//! - [`icosphere`]: the LOD icosphere descriptor

pub mod icosphere;
pub mod image_data;
pub mod io;
pub mod mesh;
pub mod obj;
pub mod shader_source;

pub use icosphere::{IcosphereDescriptor, PatchPlacement};
pub use image_data::DecodedImage;
pub use io::{Asset, AssetReader, AssetReaderVariant, MemoryAssetReader};
#[cfg(not(target_arch = "wasm32"))]
pub use io::FileAssetReader;
#[cfg(feature = "http")]
pub use io::HttpAssetReader;
pub use mesh::{MeshData, Vertex};
