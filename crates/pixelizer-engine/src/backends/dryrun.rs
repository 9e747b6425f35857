use image::{DynamicImage, Rgba, RgbaImage};
use sha2::{Digest, Sha256};

use super::{EditRequest, ImageBackend, ResultStream};
use crate::buffer::NormalizedImage;
use crate::error::{PixelError, Result};

const BACKDROP: [u8; 3] = [0xd3, 0xd3, 0xd3];
const DEFAULT_EDGE: u32 = 1024;

/// Offline backend: solid frames whose colour is derived from the prompt and
/// the submitted images. Streamed requests get `partial_images` frames that
/// fade from the backdrop towards the final colour.
pub struct DryrunBackend;

impl ImageBackend for DryrunBackend {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn edit(&self, request: &EditRequest) -> Result<ResultStream> {
        if request.images.is_empty() {
            return Err(PixelError::NoInput);
        }
        let (width, height) = parse_dims(&request.size);
        let target = color_from_request(request);
        let steps = if request.stream {
            u32::from(request.partial_images)
        } else {
            0
        };

        let frames = (1..=steps + 1)
            .map(|step| {
                let color = blend(BACKDROP, target, step, steps + 1);
                render_frame(width, height, color)
            })
            .collect::<Vec<_>>();
        Ok(Box::new(frames.into_iter()))
    }
}

fn render_frame(width: u32, height: u32, [r, g, b]: [u8; 3]) -> Result<Vec<u8>> {
    let image = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    NormalizedImage::encode(&DynamicImage::ImageRgba8(image), "dryrun.png")
        .map(NormalizedImage::into_bytes)
}

fn parse_dims(size: &str) -> (u32, u32) {
    size.split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)))
        .filter(|(w, h)| *w > 0 && *h > 0)
        .unwrap_or((DEFAULT_EDGE, DEFAULT_EDGE))
}

fn color_from_request(request: &EditRequest) -> [u8; 3] {
    let mut hasher = Sha256::new();
    hasher.update(request.prompt.as_bytes());
    for image in &request.images {
        hasher.update(image.bytes());
    }
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2]]
}

fn blend(from: [u8; 3], to: [u8; 3], step: u32, total: u32) -> [u8; 3] {
    let mix = |a: u8, b: u8| {
        let a = i64::from(a);
        let b = i64::from(b);
        (a + (b - a) * i64::from(step) / i64::from(total.max(1))) as u8
    };
    [mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])]
}
