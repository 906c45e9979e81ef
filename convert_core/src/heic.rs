//! HEIC/HEIF decode via libheif.
//!
//! Decodes the primary image of a HEIC/HEIF container into an
//! `image::DynamicImage` (RGBA when the handle carries an alpha channel,
//! RGB otherwise) and extracts the embedded EXIF block and raw ICC color
//! profile, when present, for carry-over into the encoded output.

use crate::errors::{ConvertError, Result};
use crate::policy::SourceMetadata;
use image::DynamicImage;
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use std::path::Path;

pub fn decode_heic(path: &Path) -> Result<(DynamicImage, SourceMetadata)> {
    let lib_heif = LibHeif::new();

    let ctx = HeifContext::read_from_file(path.to_string_lossy().as_ref())
        .map_err(|e| ConvertError::Decode(format!("Failed to read HEIC container: {}", e)))?;

    let handle = ctx
        .primary_image_handle()
        .map_err(|e| ConvertError::Decode(format!("Failed to get primary image: {}", e)))?;

    let width = handle.width();
    let height = handle.height();
    let has_alpha = handle.has_alpha_channel();

    let chroma = if has_alpha {
        RgbChroma::Rgba
    } else {
        RgbChroma::Rgb
    };
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| ConvertError::Decode(format!("Failed to decode HEIC: {}", e)))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| ConvertError::Decode("No interleaved RGB plane found".to_string()))?;

    let channels: usize = if has_alpha { 4 } else { 3 };
    let pixels = pack_rows(plane.data, plane.stride, width as usize, height as usize, channels);

    let img = if has_alpha {
        image::RgbaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| ConvertError::Decode("Failed to build RGBA buffer".to_string()))?
    } else {
        image::RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ConvertError::Decode("Failed to build RGB buffer".to_string()))?
    };

    let metadata = SourceMetadata {
        exif: extract_exif(&handle),
        icc_profile: handle.color_profile_raw().map(|profile| profile.data),
    };

    Ok((img, metadata))
}

/// Copy pixel rows out of a possibly stride-padded interleaved plane.
fn pack_rows(data: &[u8], stride: usize, width: usize, height: usize, channels: usize) -> Vec<u8> {
    let row_bytes = width * channels;
    if stride == row_bytes {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(row_bytes * height);
    for row in data.chunks(stride).take(height) {
        out.extend_from_slice(&row[..row_bytes]);
    }
    out
}

fn extract_exif(handle: &libheif_rs::ImageHandle) -> Option<Vec<u8>> {
    handle
        .all_metadata()
        .into_iter()
        .find(|block| block.item_type.0 == *b"Exif")
        .and_then(|block| strip_exif_header(&block.raw_data))
}

/// The HEIF `Exif` item payload starts with a 4-byte big-endian offset to
/// the TIFF header, usually spanning an `Exif\0\0` identifier. Encoders
/// downstream expect the bare TIFF data, so both are stripped here.
pub(crate) fn strip_exif_header(raw: &[u8]) -> Option<Vec<u8>> {
    if raw.len() < 4 {
        return None;
    }
    let offset = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    let mut start = 4usize.checked_add(offset)?;
    if start >= raw.len() {
        // Malformed offset: fall back to scanning past the identifier.
        start = 4;
    }
    let mut body = &raw[start..];
    if body.starts_with(b"Exif\0\0") {
        body = &body[6..];
    }
    if body.is_empty() {
        None
    } else {
        Some(body.to_vec())
    }
}

/// Cheap check for HEIC/HEIF inputs: extension first, then the `ftyp`
/// brand for files with a misleading or missing extension.
pub fn is_heic_file(path: &Path) -> bool {
    let ext = crate::common_utils::get_extension_lowercase(path);
    if matches!(ext.as_str(), "heic" | "heif" | "hif") {
        return true;
    }

    if let Ok(mut file) = std::fs::File::open(path) {
        use std::io::Read;
        let mut buffer = [0u8; 12];
        if file.read_exact(&mut buffer).is_ok() && &buffer[4..8] == b"ftyp" {
            let brand = &buffer[8..12];
            if matches!(
                brand,
                b"heic" | b"heix" | b"heim" | b"heis" | b"mif1" | b"msf1"
            ) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_heic_file_by_extension() {
        assert!(is_heic_file(Path::new("test.heic")));
        assert!(is_heic_file(Path::new("test.HEIC")));
        assert!(is_heic_file(Path::new("test.heif")));
        assert!(!is_heic_file(Path::new("test.jpg")));
    }

    #[test]
    fn test_strip_exif_header_with_identifier() {
        let mut raw = vec![0, 0, 0, 0];
        raw.extend_from_slice(b"Exif\0\0");
        raw.extend_from_slice(b"II*\0rest");
        assert_eq!(strip_exif_header(&raw).unwrap(), b"II*\0rest");
    }

    #[test]
    fn test_strip_exif_header_offset_past_identifier() {
        // Offset 6 jumps over the Exif identifier directly to the TIFF data.
        let mut raw = vec![0, 0, 0, 6];
        raw.extend_from_slice(b"Exif\0\0");
        raw.extend_from_slice(b"MM\0*tail");
        assert_eq!(strip_exif_header(&raw).unwrap(), b"MM\0*tail");
    }

    #[test]
    fn test_strip_exif_header_rejects_short_payloads() {
        assert!(strip_exif_header(&[0, 0]).is_none());
        assert!(strip_exif_header(&[0, 0, 0, 0]).is_none());
    }

    #[test]
    fn test_pack_rows_removes_stride_padding() {
        // 2x2 RGB rows padded to a stride of 8 bytes.
        let data = [
            1, 2, 3, 4, 5, 6, 0, 0, //
            7, 8, 9, 10, 11, 12, 0, 0,
        ];
        let packed = pack_rows(&data, 8, 2, 2, 3);
        assert_eq!(packed, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_pack_rows_passthrough_when_tight() {
        let data = [1, 2, 3, 4, 5, 6];
        assert_eq!(pack_rows(&data, 3, 1, 2, 3), data.to_vec());
    }
}
