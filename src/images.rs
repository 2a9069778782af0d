use image::{ColorType, DynamicImage, ImageFormat};

use crate::error::ImageError;
use crate::model::ImageUpload;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

pub(crate) enum PixelData {
    /// Original JPEG bytes, embedded with DCTDecode.
    Dct { data: Vec<u8>, gray: bool },
    /// zlib-compressed RGB plus an optional zlib-compressed alpha channel.
    Flate { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

/// A decoded upload ready to be written as an image XObject.
pub struct PreparedImage {
    pub kind: ImageKind,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub(crate) pixels: PixelData,
}

impl PreparedImage {
    /// Largest size that fits inside `max_w` x `max_h` without distortion.
    pub fn fit_within(&self, max_w: f32, max_h: f32) -> (f32, f32) {
        let (pw, ph) = (self.pixel_width.max(1) as f32, self.pixel_height.max(1) as f32);
        let scale = (max_w / pw).min(max_h / ph);
        (pw * scale, ph * scale)
    }
}

/// Validate and decode an upload. Only PNG and JPEG are accepted.
pub fn prepare(upload: &ImageUpload) -> Result<PreparedImage, ImageError> {
    let format = image::guess_format(&upload.data).map_err(|_| ImageError::Unsupported)?;
    let kind = match format {
        ImageFormat::Png => ImageKind::Png,
        ImageFormat::Jpeg => ImageKind::Jpeg,
        other => {
            log::debug!("{}: rejected image format {other:?}", upload.name);
            return Err(ImageError::Unsupported);
        }
    };

    // Decode fully even for JPEG passthrough so truncated files are caught here.
    let decoded = image::load_from_memory_with_format(&upload.data, format)?;
    let (w, h) = (decoded.width(), decoded.height());

    let pixels = match (kind, decoded.color()) {
        (ImageKind::Jpeg, ColorType::Rgb8) => PixelData::Dct {
            data: upload.data.clone(),
            gray: false,
        },
        (ImageKind::Jpeg, ColorType::L8) => PixelData::Dct {
            data: upload.data.clone(),
            gray: true,
        },
        _ => flate_pixels(&decoded),
    };

    log::debug!("image {}: {kind:?} {w}x{h}", upload.name);
    Ok(PreparedImage {
        kind,
        pixel_width: w,
        pixel_height: h,
        pixels,
    })
}

fn flate_pixels(decoded: &DynamicImage) -> PixelData {
    let rgba = decoded.to_rgba8();
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb_data: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

    let alpha = has_alpha.then(|| {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
    });

    PixelData::Flate { rgb, alpha }
}
