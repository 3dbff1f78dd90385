//! Image decoding and encoding helpers

use crate::detection::OutputFormat;
use image::{DynamicImage, ImageFormat, ImageReader, ImageResult, Limits, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Format implied by a file name's extension
    pub fn format_from_name(name: &str) -> Option<ImageFormat> {
        ImageFormat::from_path(Path::new(name)).ok()
    }

    /// Decode bytes into an RGBA canvas.
    ///
    /// The content is sniffed first; `hint` is only used when the magic
    /// bytes are not recognised.
    pub fn decode_rgba(bytes: &[u8], hint: Option<ImageFormat>) -> ImageResult<RgbaImage> {
        let image = match image::guess_format(bytes).ok().or(hint) {
            Some(format) => image::load_from_memory_with_format(bytes, format)?,
            None => image::load_from_memory(bytes)?,
        };
        Ok(image.into_rgba8())
    }

    /// Decode bytes that must be a PNG
    pub fn decode_png(bytes: &[u8]) -> ImageResult<RgbaImage> {
        Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.into_rgba8())
    }

    /// Decode a PNG, refusing images wider or taller than `max_side`.
    /// The limit is checked against the header before pixels are allocated.
    pub fn decode_png_within(bytes: &[u8], max_side: u32) -> ImageResult<RgbaImage> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(max_side);
        limits.max_image_height = Some(max_side);

        let mut reader = ImageReader::with_format(Cursor::new(bytes), ImageFormat::Png);
        reader.limits(limits);
        Ok(reader.decode()?.into_rgba8())
    }

    /// Encode a canvas to bytes in the requested format
    pub fn encode(canvas: &RgbaImage, format: OutputFormat) -> ImageResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        match format {
            OutputFormat::Png => canvas.write_to(&mut buf, ImageFormat::Png)?,
            OutputFormat::Jpeg => DynamicImage::ImageRgba8(canvas.clone())
                .into_rgb8()
                .write_to(&mut buf, ImageFormat::Jpeg)?,
        }
        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_round_trip_keeps_dimensions_and_alpha() -> ImageResult<()> {
        let mut canvas = RgbaImage::from_pixel(37, 21, Rgba([10, 20, 30, 255]));
        canvas.put_pixel(3, 4, Rgba([0, 0, 0, 0]));

        let bytes = ImageUtils::encode(&canvas, OutputFormat::Png)?;
        let decoded = ImageUtils::decode_rgba(&bytes, None)?;
        assert_eq!(decoded.dimensions(), (37, 21));
        assert_eq!(decoded.get_pixel(3, 4)[3], 0);
        Ok(())
    }

    #[test]
    fn test_jpeg_output_drops_alpha_but_keeps_size() -> ImageResult<()> {
        let canvas = RgbaImage::from_pixel(16, 9, Rgba([200, 100, 50, 128]));
        let bytes = ImageUtils::encode(&canvas, OutputFormat::Jpeg)?;
        assert_eq!(image::guess_format(&bytes)?, ImageFormat::Jpeg);
        assert_eq!(ImageUtils::decode_rgba(&bytes, None)?.dimensions(), (16, 9));
        Ok(())
    }

    #[test]
    fn test_content_wins_over_misleading_hint() -> ImageResult<()> {
        let canvas = RgbaImage::new(5, 5);
        let png = ImageUtils::encode(&canvas, OutputFormat::Png)?;
        let decoded = ImageUtils::decode_rgba(&png, Some(ImageFormat::Jpeg))?;
        assert_eq!(decoded.dimensions(), (5, 5));
        Ok(())
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(ImageUtils::decode_rgba(b"definitely not pixels", Some(ImageFormat::Png)).is_err());
        assert!(ImageUtils::decode_png(&[0xFF, 0xD8, 0xFF]).is_err());
    }

    #[test]
    fn test_side_limit_applies_to_either_axis() -> ImageResult<()> {
        let tall = ImageUtils::encode(&RgbaImage::new(1, 300), OutputFormat::Png)?;
        assert!(matches!(
            ImageUtils::decode_png_within(&tall, 256),
            Err(image::ImageError::Limits(_))
        ));
        assert_eq!(ImageUtils::decode_png_within(&tall, 300)?.dimensions(), (1, 300));
        Ok(())
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(ImageUtils::format_from_name("dog.JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageUtils::format_from_name("cat.png"), Some(ImageFormat::Png));
        assert_eq!(ImageUtils::format_from_name("readme"), None);
    }
}
