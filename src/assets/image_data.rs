use crate::errors::Result;

/// An image decoded to tightly packed RGBA8, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Decodes any format the `image` crate was built with (PNG, JPEG, HDR, WebP).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// Pixels with the row order reversed, as GL expects for uploads.
    #[must_use]
    pub fn rows_bottom_up(&self) -> Vec<u8> {
        let row = self.width as usize * 4;
        if row == 0 {
            return Vec::new();
        }
        self.pixels
            .chunks_exact(row)
            .rev()
            .flatten()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_reversed() {
        let image = DecodedImage {
            width: 1,
            height: 2,
            pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        assert_eq!(image.rows_bottom_up(), vec![5, 6, 7, 8, 1, 2, 3, 4]);
    }

    #[test]
    fn decodes_png() {
        let mut png = Vec::new();
        let source = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        source
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let decoded = DecodedImage::decode(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(DecodedImage::decode(b"not an image").is_err());
    }
}
