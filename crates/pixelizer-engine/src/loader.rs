use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;
use pixelizer_contracts::config::PixelizerConfig;

use crate::buffer::{NormalizedImage, DEFAULT_FILENAME};
use crate::error::{PixelError, Result};

/// Upper bounds for normalized images, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Bounds {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
        }
    }

    pub fn from_config(config: &PixelizerConfig) -> Self {
        Self::new(config.max_width, config.max_height)
    }
}

/// Something the loader can decode.
#[derive(Debug, Clone)]
pub enum ImageInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageInput {
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(PixelError::Read)?;
        Ok(Self::Bytes(bytes))
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => fs::read(path).map_err(|err| PixelError::io(path, err)),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&NormalizedImage> for ImageInput {
    fn from(buffer: &NormalizedImage) -> Self {
        Self::Bytes(buffer.bytes().to_vec())
    }
}

/// Decodes `input`, converts it to RGBA, shrinks it to fit `bounds` and
/// re-encodes it as PNG tagged `image.png`.
pub fn normalize(input: impl Into<ImageInput>, bounds: Bounds) -> Result<NormalizedImage> {
    let input = input.into();
    let bytes = input.read_bytes()?;
    let image = image::load_from_memory(&bytes).map_err(|err| match &input {
        ImageInput::Path(path) => PixelError::Decode(format!("{}: {err}", path.display())),
        ImageInput::Bytes(_) => PixelError::Decode(err.to_string()),
    })?;
    normalize_image(image, bounds)
}

/// Same as [`normalize`] for an image that is already decoded.
pub fn normalize_image(image: DynamicImage, bounds: Bounds) -> Result<NormalizedImage> {
    let rgba = DynamicImage::ImageRgba8(image.into_rgba8());
    let resized = shrink_to_fit(rgba, bounds);
    NormalizedImage::encode(&resized, DEFAULT_FILENAME)
}

/// Downscales preserving aspect ratio; never upscales.
pub fn shrink_to_fit(image: DynamicImage, bounds: Bounds) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let (new_width, new_height) = fit_dimensions(width, height, bounds);
    if (new_width, new_height) == (width, height) {
        return image;
    }
    image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Largest size within `bounds` with the aspect ratio of `width x height`.
pub fn fit_dimensions(width: u32, height: u32, bounds: Bounds) -> (u32, u32) {
    if width <= bounds.max_width && height <= bounds.max_height {
        return (width, height);
    }
    let scale_w = f64::from(bounds.max_width) / f64::from(width);
    let scale_h = f64::from(bounds.max_height) / f64::from(height);
    let scale = scale_w.min(scale_h);
    let new_width = ((f64::from(width) * scale).round() as u32).clamp(1, bounds.max_width);
    let new_height = ((f64::from(height) * scale).round() as u32).clamp(1, bounds.max_height);
    (new_width, new_height)
}
