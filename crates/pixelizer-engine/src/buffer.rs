use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::{PixelError, Result};

pub const PNG_CONTENT_TYPE: &str = "image/png";
pub const DEFAULT_FILENAME: &str = "image.png";

/// PNG bytes plus the filename and content type the upload boundary needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    filename: String,
    content_type: String,
    width: u32,
    height: u32,
}

impl NormalizedImage {
    /// Encodes `image` as PNG.
    pub fn encode(image: &DynamicImage, filename: impl Into<String>) -> Result<Self> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| PixelError::Encode(err.to_string()))?;
        Ok(Self {
            bytes: cursor.into_inner(),
            filename: filename.into(),
            content_type: PNG_CONTENT_TYPE.to_string(),
            width: image.width(),
            height: image.height(),
        })
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// A fresh reader positioned at the first byte.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes.as_slice())
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory_with_format(&self.bytes, ImageFormat::Png)
            .map_err(|err| PixelError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use image::{DynamicImage, Rgba, RgbaImage};

    use super::{NormalizedImage, PNG_CONTENT_TYPE};

    #[test]
    fn encode_writes_png_signature_and_tags() -> anyhow::Result<()> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 4])));
        let buffer = NormalizedImage::encode(&image, "image.png")?;

        assert_eq!(
            &buffer.bytes()[..8],
            &[137, 80, 78, 71, 13, 10, 26, 10]
        );
        assert_eq!(buffer.filename(), "image.png");
        assert_eq!(buffer.content_type(), PNG_CONTENT_TYPE);
        assert_eq!(buffer.dimensions(), (4, 3));

        let mut head = [0u8; 4];
        buffer.reader().read_exact(&mut head)?;
        assert_eq!(head, [137, 80, 78, 71]);

        let decoded = buffer.decode()?;
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0), &Rgba([1, 2, 3, 4]));
        Ok(())
    }
}
