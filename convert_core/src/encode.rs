//! Encoding layer: normalized image + encode options -> output file.
//!
//! Pixels are encoded into a memory buffer first (image crate for PNG/JPEG,
//! libwebp via the webp crate for lossy WEBP), then any forwarded EXIF/ICC
//! blocks are spliced into the container with img-parts before the bytes
//! hit disk.

use crate::errors::{ConvertError, Result};
use crate::policy::{EncodeOptions, TargetFormat, JPEG_QUALITY, WEBP_QUALITY};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder};
use img_parts::{Bytes, ImageEXIF, ImageICC};
use std::path::Path;
use tracing::warn;

/// Encode a normalized image into container bytes for the target format.
pub fn encode_to_vec(image: &DynamicImage, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match options.format {
        TargetFormat::Jpeg => {
            let quality = options.jpeg_quality.unwrap_or(JPEG_QUALITY);
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder
                .encode_image(image)
                .map_err(|e| ConvertError::Encode(format!("JPEG encode failed: {}", e)))?;
        }
        TargetFormat::Png => {
            let encoder = PngEncoder::new(&mut buf);
            encoder
                .write_image(
                    image.as_bytes(),
                    image.width(),
                    image.height(),
                    image.color().into(),
                )
                .map_err(|e| ConvertError::Encode(format!("PNG encode failed: {}", e)))?;
        }
        TargetFormat::Webp => {
            let quality = options.webp_quality.unwrap_or(WEBP_QUALITY);
            let encoder = match image {
                DynamicImage::ImageRgb8(rgb) => {
                    webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                }
                DynamicImage::ImageRgba8(rgba) => {
                    webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                }
                other => {
                    // Policy guarantees RGB8/RGBA8; anything else is a bug upstream.
                    return Err(ConvertError::Encode(format!(
                        "Unsupported pixel mode for WEBP encode: {:?}",
                        other.color()
                    )));
                }
            };
            buf = encoder.encode(quality).to_vec();
        }
    }

    Ok(embed_metadata(buf, options))
}

/// Splice forwarded EXIF/ICC blocks into the encoded container. Falls back
/// to the plain encoded bytes if the container cannot be re-parsed, so a
/// metadata problem never fails the conversion itself.
fn embed_metadata(encoded: Vec<u8>, options: &EncodeOptions) -> Vec<u8> {
    if options.exif.is_none() && options.icc_profile.is_none() {
        return encoded;
    }

    let exif = options.exif.clone().map(Bytes::from);
    let icc = options.icc_profile.clone().map(Bytes::from);

    let result = match options.format {
        TargetFormat::Jpeg => {
            img_parts::jpeg::Jpeg::from_bytes(Bytes::from(encoded.clone())).map(|mut jpeg| {
                if exif.is_some() {
                    jpeg.set_exif(exif);
                }
                if icc.is_some() {
                    jpeg.set_icc_profile(icc);
                }
                let mut out = Vec::new();
                jpeg.encoder().write_to(&mut out).map(|_| out)
            })
        }
        TargetFormat::Png => {
            img_parts::png::Png::from_bytes(Bytes::from(encoded.clone())).map(|mut png| {
                if exif.is_some() {
                    png.set_exif(exif);
                }
                if icc.is_some() {
                    png.set_icc_profile(icc);
                }
                let mut out = Vec::new();
                png.encoder().write_to(&mut out).map(|_| out)
            })
        }
        TargetFormat::Webp => {
            img_parts::webp::WebP::from_bytes(Bytes::from(encoded.clone())).map(|mut webp| {
                if exif.is_some() {
                    webp.set_exif(exif);
                }
                if icc.is_some() {
                    webp.set_icc_profile(icc);
                }
                let mut out = Vec::new();
                webp.encoder().write_to(&mut out).map(|_| out)
            })
        }
    };

    match result {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => {
            warn!(error = %e, "Metadata splice failed, writing image without metadata");
            encoded
        }
        Err(e) => {
            warn!(error = %e, "Could not re-parse encoded container for metadata");
            encoded
        }
    }
}

/// Encode and write the output file in one step.
pub fn write_output(path: &Path, image: &DynamicImage, options: &EncodeOptions) -> Result<()> {
    let bytes = encode_to_vec(image, options)?;
    std::fs::write(path, bytes).map_err(|e| {
        ConvertError::Encode(format!("Failed to write {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{plan, SourceMetadata};
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([200, 10, 30, 255])))
    }

    fn planned(target: TargetFormat) -> (DynamicImage, EncodeOptions) {
        plan(sample(), target, false, &SourceMetadata::default())
    }

    #[test]
    fn test_jpeg_bytes_have_marker() {
        let (image, options) = planned(TargetFormat::Jpeg);
        let bytes = encode_to_vec(&image, &options).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_png_roundtrips() {
        let (image, options) = planned(TargetFormat::Png);
        let bytes = encode_to_vec(&image, &options).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [200, 10, 30, 255]);
    }

    #[test]
    fn test_webp_bytes_are_riff() {
        let (image, options) = planned(TargetFormat::Webp);
        let bytes = encode_to_vec(&image, &options).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_icc_profile_embedded_in_png() {
        let metadata = SourceMetadata {
            exif: None,
            icc_profile: Some(b"fake-icc-profile".to_vec()),
        };
        let (image, options) = plan(sample(), TargetFormat::Png, true, &metadata);
        let bytes = encode_to_vec(&image, &options).unwrap();

        let parsed = img_parts::png::Png::from_bytes(Bytes::from(bytes)).unwrap();
        assert!(parsed.icc_profile().is_some());
    }

    #[test]
    fn test_write_output_creates_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("x.png");
        let (image, options) = planned(TargetFormat::Png);
        write_output(&out, &image, &options).unwrap();
        assert!(out.exists());
    }
}
