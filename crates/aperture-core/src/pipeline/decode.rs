//! Image decoding shared by the thumbnail and metadata stages.
//!
//! Decoding trusts content, not extensions: the format is detected from
//! the bytes. The actual decode is CPU-bound and runs under
//! `spawn_blocking` so it never stalls the async runtime.

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::error::PipelineError;

/// Result of decoding a source object.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded pixel data
    pub image: DynamicImage,
    /// Detected encoding
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Source object length in bytes
    pub byte_len: u64,
}

/// Decode source bytes fetched from the object store.
///
/// `key` is only used for error context.
pub async fn decode_image(bytes: Vec<u8>, key: &str) -> Result<DecodedImage, PipelineError> {
    let key_owned = key.to_string();
    let join = tokio::task::spawn_blocking(move || decode_bytes_sync(bytes, &key_owned)).await;

    match join {
        Ok(result) => result,
        Err(e) => Err(PipelineError::ImageDecodeFailed {
            key: key.to_string(),
            message: format!("decode task failed: {e}"),
        }),
    }
}

fn decode_bytes_sync(bytes: Vec<u8>, key: &str) -> Result<DecodedImage, PipelineError> {
    use std::io::Cursor;

    let byte_len = bytes.len() as u64;
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::ImageDecodeFailed {
            key: key.to_string(),
            message: format!("cannot detect image format: {e}"),
        })?;

    let format = reader
        .format()
        .ok_or_else(|| PipelineError::ImageDecodeFailed {
            key: key.to_string(),
            message: "unrecognized image data".to_string(),
        })?;

    let image = reader.decode().map_err(|e| PipelineError::ImageDecodeFailed {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    Ok(DecodedImage {
        image,
        format,
        width,
        height,
        byte_len,
    })
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Ico => "ico".to_string(),
        ImageFormat::Pnm => "pnm".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

/// MIME type for an encoding.
pub fn content_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn test_decode_detects_format_from_content() {
        // A PNG under a .jpg key decodes as PNG
        let decoded = decode_image(png_bytes(20, 10), "uploads/misnamed.jpg")
            .await
            .unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width, decoded.height), (20, 10));
        assert!(decoded.byte_len > 0);
    }

    #[tokio::test]
    async fn test_decode_rejects_garbage() {
        let err = decode_image(vec![0u8; 64], "uploads/bad.jpg").await.unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(ImageFormat::Jpeg), "image/jpeg");
        assert_eq!(content_type_for(ImageFormat::Png), "image/png");
    }
}
