//! PNG encoding for clipboard images.
//!
//! A captured image is stored as PNG bytes in the blob store and carried in
//! its entry as a `data:image/png;base64,...` URL. The same URL doubles as the
//! image's change-detection signature.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use clipkeep_core::error::{ClipkeepError, Result};

use crate::source::ClipImage;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// A clipboard image encoded for storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub png: Vec<u8>,
    pub data_url: String,
}

impl EncodedImage {
    /// Encode raw clipboard pixels.
    pub fn from_clip(image: &ClipImage) -> Result<Self> {
        let png = encode_png(image)?;
        let data_url = data_url(&png);
        Ok(Self { png, data_url })
    }

    /// Value compared between ticks to decide whether the image changed.
    pub fn signature(&self) -> &str {
        &self.data_url
    }
}

/// Encode RGBA pixels as PNG.
pub fn encode_png(image: &ClipImage) -> Result<Vec<u8>> {
    let width = u32::try_from(image.width)
        .map_err(|_| ClipkeepError::Image(format!("width {} out of range", image.width)))?;
    let height = u32::try_from(image.height)
        .map_err(|_| ClipkeepError::Image(format!("height {} out of range", image.height)))?;

    let rgba = image::RgbaImage::from_raw(width, height, image.rgba.clone()).ok_or_else(|| {
        ClipkeepError::Image(format!(
            "{} bytes do not fill a {}x{} RGBA image",
            image.rgba.len(),
            width,
            height
        ))
    })?;

    let mut png = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ClipkeepError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(png)
}

/// Decode PNG bytes back to RGBA pixels.
pub fn decode_png(bytes: &[u8]) -> Result<ClipImage> {
    let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| ClipkeepError::Image(format!("PNG decoding failed: {}", e)))?;
    let rgba = decoded.to_rgba8();
    Ok(ClipImage::new(
        rgba.width() as usize,
        rgba.height() as usize,
        rgba.into_raw(),
    ))
}

/// Inline `data:` URL for PNG bytes.
pub fn data_url(png: &[u8]) -> String {
    format!("{}{}", DATA_URL_PREFIX, BASE64.encode(png))
}

/// PNG bytes carried by a `data:` URL produced by [`data_url`].
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let payload = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| ClipkeepError::Image("not a PNG data URL".into()))?;
    BASE64
        .decode(payload)
        .map_err(|e| ClipkeepError::Image(format!("invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: usize, height: usize) -> ClipImage {
        let mut rgba = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        ClipImage::new(width, height, rgba)
    }

    #[test]
    fn test_png_preserves_pixels() {
        let image = checker(4, 3);
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(decode_png(&png).unwrap(), image);
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        let image = ClipImage::new(10, 10, vec![0; 12]);
        assert!(matches!(encode_png(&image), Err(ClipkeepError::Image(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_png(b"not a png"), Err(ClipkeepError::Image(_))));
    }

    #[test]
    fn test_data_url_shape() {
        let encoded = EncodedImage::from_clip(&checker(2, 2)).unwrap();
        assert!(encoded.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(encoded.signature(), encoded.data_url);
        assert_eq!(decode_data_url(&encoded.data_url).unwrap(), encoded.png);
    }

    #[test]
    fn test_signature_tracks_pixels() {
        let a = EncodedImage::from_clip(&checker(3, 3)).unwrap();
        let b = EncodedImage::from_clip(&checker(3, 3)).unwrap();
        let c = EncodedImage::from_clip(&checker(4, 3)).unwrap();
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn test_decode_data_url_rejects_other_schemes() {
        assert!(decode_data_url("data:text/plain;base64,AAAA").is_err());
    }
}
