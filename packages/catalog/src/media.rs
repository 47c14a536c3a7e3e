use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader, RgbImage};

use crate::config::MediaConfig;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Unsupported image type '{0}'")]
    UnsupportedType(String),
    #[error("Image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Image could not be encoded: {0}")]
    Encode(#[source] image::ImageError),
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::UnsupportedType(_) | TransformError::Decode(_) => {
                AppError::UnsupportedMedia(err.to_string())
            }
            TransformError::Encode(e) => AppError::from(e),
        }
    }
}

/// Output geometry for the two derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub full_max_width: u32,
    pub full_max_height: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub jpeg_quality: u8,
}

impl From<&MediaConfig> for TransformOptions {
    fn from(c: &MediaConfig) -> Self {
        Self {
            full_max_width: c.full_max_width.max(1),
            full_max_height: c.full_max_height.max(1),
            thumbnail_width: c.thumbnail_width.max(1),
            thumbnail_height: c.thumbnail_height.max(1),
            jpeg_quality: c.jpeg_quality.clamp(1, 100),
        }
    }
}

/// Encoded JPEG derivatives of one upload.
#[derive(Debug, Clone)]
pub struct Derivatives {
    pub full: Vec<u8>,
    pub full_dimensions: (u32, u32),
    pub thumbnail: Vec<u8>,
}

/// Map a declared MIME type to the decoder to use.
pub fn format_for_mime(mime: &str) -> Result<ImageFormat, TransformError> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match ImageFormat::from_mime_type(essence.to_ascii_lowercase()) {
        Some(f @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP)) => Ok(f),
        _ => Err(TransformError::UnsupportedType(mime.to_string())),
    }
}

/// Decode `bytes` strictly as `format`. Bytes of any other format fail.
pub fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, TransformError> {
    ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(TransformError::Decode)
}

/// Downscale to fit inside `max_w` x `max_h`, preserving aspect ratio.
/// Images already inside the box are returned unchanged.
pub fn fit_within(img: DynamicImage, max_w: u32, max_h: u32) -> DynamicImage {
    if img.width() <= max_w && img.height() <= max_h {
        return img;
    }
    img.resize(max_w, max_h, FilterType::Lanczos3)
}

/// Center-crop to the target aspect ratio, then resize to exactly `w` x `h`.
pub fn crop_to_fill(src: &RgbImage, w: u32, h: u32) -> RgbImage {
    let (src_w, src_h) = src.dimensions();
    let dst_aspect = w as f64 / h as f64;
    let src_aspect = src_w as f64 / src_h as f64;

    let (x, y, crop_w, crop_h) = if src_aspect > dst_aspect {
        let crop_w = (((src_h as f64) * dst_aspect).round() as u32).clamp(1, src_w);
        ((src_w - crop_w) / 2, 0, crop_w, src_h)
    } else {
        let crop_h = (((src_w as f64) / dst_aspect).round() as u32).clamp(1, src_h);
        (0, (src_h - crop_h) / 2, src_w, crop_h)
    };

    let cropped = image::imageops::crop_imm(src, x, y, crop_w, crop_h).to_image();
    image::imageops::resize(&cropped, w, h, FilterType::Lanczos3)
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8.into())
        .map_err(TransformError::Encode)?;
    Ok(out.into_inner())
}

/// Produce the normalized full-size JPEG and the crop-to-fit thumbnail.
pub fn render(
    bytes: &[u8],
    format: ImageFormat,
    opts: &TransformOptions,
) -> Result<Derivatives, TransformError> {
    let decoded = decode(bytes, format)?;

    let full = fit_within(decoded, opts.full_max_width, opts.full_max_height).to_rgb8();
    let thumbnail = crop_to_fill(&full, opts.thumbnail_width, opts.thumbnail_height);

    Ok(Derivatives {
        full_dimensions: full.dimensions(),
        full: encode_jpeg(&full, opts.jpeg_quality)?,
        thumbnail: encode_jpeg(&thumbnail, opts.jpeg_quality)?,
    })
}

/// Run [`render`] on the blocking thread pool.
pub async fn render_blocking(
    bytes: Vec<u8>,
    format: ImageFormat,
    opts: TransformOptions,
) -> Result<Derivatives, AppError> {
    tokio::task::spawn_blocking(move || render(&bytes, format, &opts))
        .await
        .map_err(|e| AppError::Internal(format!("image task failed: {e}")))?
        .map_err(AppError::from)
}
