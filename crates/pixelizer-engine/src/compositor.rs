use std::path::PathBuf;

use image::{imageops, DynamicImage, Rgb, RgbImage};
use pixelizer_contracts::config::Direction;

use crate::buffer::{NormalizedImage, DEFAULT_FILENAME};
use crate::error::{PixelError, Result};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Joins the present images along `direction` into one RGB PNG canvas.
///
/// Absent entries are skipped. Returns `None` when nothing is left; a single
/// image is returned as-is apart from dropping its alpha channel. Each image
/// is centred on the cross axis over a white background. Vertical canvases
/// are pasted top-to-bottom the same way horizontal ones are left-to-right.
pub fn concatenate(
    images: &[Option<DynamicImage>],
    direction: Direction,
) -> Result<Option<NormalizedImage>> {
    let mut valid: Vec<RgbImage> = images.iter().flatten().map(DynamicImage::to_rgb8).collect();
    let canvas = match valid.len() {
        0 => return Ok(None),
        1 => valid.remove(0),
        _ => paste_all(&valid, direction),
    };
    NormalizedImage::encode(&DynamicImage::ImageRgb8(canvas), DEFAULT_FILENAME).map(Some)
}

/// Decodes already-normalized buffers and concatenates them.
pub fn concatenate_buffers(
    buffers: &[&NormalizedImage],
    direction: Direction,
) -> Result<Option<NormalizedImage>> {
    let images = buffers
        .iter()
        .map(|buffer| buffer.decode().map(Some))
        .collect::<Result<Vec<_>>>()?;
    concatenate(&images, direction)
}

/// Opens each path as-is (no resizing) and concatenates the results.
pub fn concatenate_paths(paths: &[PathBuf], direction: Direction) -> Result<Option<NormalizedImage>> {
    let images = paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(Some)
                .map_err(|err| PixelError::Decode(format!("{}: {err}", path.display())))
        })
        .collect::<Result<Vec<_>>>()?;
    concatenate(&images, direction)
}

/// Canvas size for `sizes` joined along `direction`.
pub fn canvas_dimensions(sizes: &[(u32, u32)], direction: Direction) -> (u32, u32) {
    let widths = sizes.iter().map(|(width, _)| *width);
    let heights = sizes.iter().map(|(_, height)| *height);
    match direction {
        Direction::Horizontal => (widths.sum(), heights.max().unwrap_or(0)),
        Direction::Vertical => (widths.max().unwrap_or(0), heights.sum()),
    }
}

fn paste_all(images: &[RgbImage], direction: Direction) -> RgbImage {
    let sizes: Vec<(u32, u32)> = images.iter().map(RgbImage::dimensions).collect();
    let (width, height) = canvas_dimensions(&sizes, direction);
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

    let mut offset: i64 = 0;
    for image in images {
        let (x, y) = match direction {
            Direction::Horizontal => (offset, i64::from((height - image.height()) / 2)),
            Direction::Vertical => (i64::from((width - image.width()) / 2), offset),
        };
        imageops::replace(&mut canvas, image, x, y);
        offset += match direction {
            Direction::Horizontal => i64::from(image.width()),
            Direction::Vertical => i64::from(image.height()),
        };
    }
    canvas
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use pixelizer_contracts::config::Direction;

    use super::{canvas_dimensions, concatenate, concatenate_paths};
    use crate::error::PixelError;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn empty_inputs_yield_none() -> anyhow::Result<()> {
        assert!(concatenate(&[], Direction::Horizontal)?.is_none());
        assert!(concatenate(&[None, None], Direction::Vertical)?.is_none());
        Ok(())
    }

    #[test]
    fn single_image_is_returned_without_alpha() -> anyhow::Result<()> {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(7, 3, Rgba([10, 20, 30, 40])));
        let out = concatenate(&[None, Some(rgba)], Direction::Horizontal)?.unwrap();

        assert_eq!(out.dimensions(), (7, 3));
        let decoded = out.decode()?;
        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0), &Rgb([10, 20, 30]));
        Ok(())
    }

    #[test]
    fn horizontal_canvas_sums_widths_and_centres_vertically() -> anyhow::Result<()> {
        let images = [
            Some(solid(4, 6, [255, 0, 0])),
            None,
            Some(solid(3, 2, [0, 0, 255])),
        ];
        let out = concatenate(&images, Direction::Horizontal)?.unwrap();
        assert_eq!(out.dimensions(), (7, 6));
        assert_eq!(out.filename(), "image.png");

        let canvas = out.decode()?.to_rgb8();
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([255, 0, 0]));
        // (6 - 2) / 2 = 2 rows of white above the second image.
        assert_eq!(canvas.get_pixel(4, 1), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(4, 2), &Rgb([0, 0, 255]));
        assert_eq!(canvas.get_pixel(6, 3), &Rgb([0, 0, 255]));
        assert_eq!(canvas.get_pixel(6, 4), &Rgb([255, 255, 255]));
        Ok(())
    }

    #[test]
    fn vertical_canvas_pastes_top_to_bottom() -> anyhow::Result<()> {
        let images = [Some(solid(2, 2, [0, 255, 0])), Some(solid(5, 3, [0, 0, 0]))];
        let out = concatenate(&images, Direction::Vertical)?.unwrap();
        assert_eq!(out.dimensions(), (5, 5));

        let canvas = out.decode()?.to_rgb8();
        // (5 - 2) / 2 = 1 column of white left of the first image.
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(1, 0), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(3, 1), &Rgb([255, 255, 255]));
        assert_eq!(canvas.get_pixel(0, 2), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(4, 4), &Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn paths_are_concatenated_without_resizing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let left = temp.path().join("left.png");
        let right = temp.path().join("right.jpg");
        solid(2000, 10, [1, 1, 1]).save(&left)?;
        solid(5, 30, [2, 2, 2]).save(&right)?;

        let out = concatenate_paths(&[left, right], Direction::Horizontal)?.unwrap();
        assert_eq!(out.dimensions(), (2005, 30));

        let missing = temp.path().join("missing.png");
        assert!(matches!(
            concatenate_paths(&[missing], Direction::Vertical),
            Err(PixelError::Decode(_))
        ));
        Ok(())
    }

    #[test]
    fn canvas_dimensions_follow_axis() {
        let sizes = [(10, 20), (30, 5)];
        assert_eq!(canvas_dimensions(&sizes, Direction::Horizontal), (40, 20));
        assert_eq!(canvas_dimensions(&sizes, Direction::Vertical), (30, 25));
    }
}
