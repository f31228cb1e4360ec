//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;

use umbra::assets::{AssetReaderVariant, MemoryAssetReader};
use umbra::gpu::webgl::{HeadlessGl, WebGlApi};

pub type HeadlessApi = WebGlApi<HeadlessGl>;

/// Every file under the crate's `assets/` directory, keyed by its relative path.
pub fn shipped_assets() -> MemoryAssetReader {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
    let mut reader = MemoryAssetReader::new();
    collect(&root, &root, &mut reader);
    reader
}

fn collect(root: &Path, dir: &Path, reader: &mut MemoryAssetReader) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, reader);
        } else {
            let uri = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            reader.insert(uri, std::fs::read(&path).unwrap());
        }
    }
}

pub fn headless(reader: MemoryAssetReader, width: u32, height: u32) -> (Rc<HeadlessGl>, Rc<HeadlessApi>) {
    let gl = Rc::new(HeadlessGl::new());
    let api = WebGlApi::initialize(
        Rc::clone(&gl),
        AssetReaderVariant::memory(reader),
        width,
        height,
        false,
    )
    .unwrap();
    (gl, Rc::new(api))
}

/// A solid-color PNG.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let pixels = rgba.repeat((width * height) as usize);
    let image = image::RgbaImage::from_raw(width, height, pixels).unwrap();
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// One triangle in the interleaved layout.
pub fn triangle() -> Vec<f32> {
    #[rustfmt::skip]
    let vertices = vec![
        0.0, 0.0, 0.0,  0.0, 0.0,  0.0, 0.0, 1.0,  1.0, 0.0, 0.0, 1.0,
        1.0, 0.0, 0.0,  1.0, 0.0,  0.0, 0.0, 1.0,  1.0, 0.0, 0.0, 1.0,
        0.0, 1.0, 0.0,  0.0, 1.0,  0.0, 0.0, 1.0,  1.0, 0.0, 0.0, 1.0,
    ];
    vertices
}

pub const MINIMAL_VERTEX: &str = "#version 300 es\nuniform mat4 modelMatrix;\nvoid main() {}";
pub const MINIMAL_FRAGMENT: &str = "#version 300 es\nuniform sampler2D colorTexture;\nuniform sampler2D distanceTexture;\nvoid main() {}";
