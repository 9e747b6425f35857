use std::path::PathBuf;

use pixelizer_contracts::config::PixelizerConfig;

use crate::buffer::NormalizedImage;
use crate::error::Result;
use crate::loader::{normalize, Bounds};

/// Style exemplars, loaded once and never modified.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    images: Vec<NormalizedImage>,
    sources: Vec<PathBuf>,
}

impl ReferenceSet {
    /// Loads `{prefix}1.{ext}` … `{prefix}{count}.{ext}` from the reference
    /// directory. Any missing or undecodable file fails the whole set.
    pub fn load(config: &PixelizerConfig) -> Result<Self> {
        let bounds = Bounds::from_config(config);
        let mut images = Vec::with_capacity(config.reference_count);
        let mut sources = Vec::with_capacity(config.reference_count);
        for (idx, path) in config.reference_paths().into_iter().enumerate() {
            let filename = format!("{}{}.png", config.reference_prefix, idx + 1);
            images.push(normalize(path.as_path(), bounds)?.with_filename(filename));
            sources.push(path);
        }
        Ok(Self { images, sources })
    }

    pub fn from_images(images: Vec<NormalizedImage>) -> Self {
        Self {
            images,
            sources: Vec::new(),
        }
    }

    pub fn images(&self) -> &[NormalizedImage] {
        &self.images
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};
    use pixelizer_contracts::config::PixelizerConfig;

    use super::ReferenceSet;
    use crate::error::PixelError;

    #[test]
    fn loads_numbered_references_in_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for idx in 1..=3u32 {
            DynamicImage::ImageRgb8(RgbImage::from_pixel(idx * 10, 8, Rgb([0, 0, 0])))
                .save(temp.path().join(format!("style{idx}.png")))?;
        }
        let config = PixelizerConfig {
            reference_dir: temp.path().to_path_buf(),
            reference_prefix: "style".to_string(),
            reference_count: 3,
            max_width: 25,
            ..PixelizerConfig::default()
        };

        let references = ReferenceSet::load(&config)?;
        assert_eq!(references.len(), 3);
        assert_eq!(references.images()[0].filename(), "style1.png");
        assert_eq!(references.images()[0].dimensions(), (10, 8));
        assert_eq!(references.images()[2].dimensions(), (25, 7));
        assert_eq!(references.sources()[1], temp.path().join("style2.png"));
        Ok(())
    }

    #[test]
    fn missing_reference_fails() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let config = PixelizerConfig {
            reference_dir: temp.path().to_path_buf(),
            reference_count: 1,
            ..PixelizerConfig::default()
        };
        let err = ReferenceSet::load(&config).unwrap_err();
        assert!(matches!(err, PixelError::Io { .. }));
        Ok(())
    }
}
