//! Conversion policy: pixel-mode normalization and encode options.
//!
//! `plan` is a pure function from (decoded image, target format, metadata
//! flags) to (normalized image, encode options). It performs no I/O, so the
//! per-format branching is unit-testable without touching any codec.
//!
//! Normalization rules per target:
//! - JPEG: RGBA sources are composited onto an opaque white background;
//!   every other non-RGB mode (including grayscale+alpha) converts
//!   directly to RGB, dropping alpha.
//! - WEBP: alpha sources convert to RGBA (alpha preserved); non-alpha
//!   non-RGB modes convert to RGB.
//! - PNG: passed through unchanged. Palette sources arrive from the
//!   decoders already expanded to RGB/RGBA, so the palette-transparency
//!   case is covered by the alpha-carrying decode output.

use image::{DynamicImage, RgbImage, RgbaImage};
use std::fmt;
use std::str::FromStr;

/// Fixed JPEG encode quality (0-100).
pub const JPEG_QUALITY: u8 = 95;
/// Fixed lossy WEBP encode quality (0.0-100.0).
pub const WEBP_QUALITY: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpeg,
    Webp,
}

impl TargetFormat {
    /// Lowercase extension appended to converted filenames.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Webp => "webp",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TargetFormat::Png => "PNG",
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Webp => "WEBP",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(TargetFormat::Png),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            "webp" => Ok(TargetFormat::Webp),
            other => Err(format!("Unsupported output format: {}", other)),
        }
    }
}

/// Embedded metadata blocks carried by a decoded source image.
#[derive(Debug, Default, Clone)]
pub struct SourceMetadata {
    pub exif: Option<Vec<u8>>,
    pub icc_profile: Option<Vec<u8>>,
}

impl SourceMetadata {
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.icc_profile.is_none()
    }
}

/// Parameters for one encode, shared read-only across a batch item.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub format: TargetFormat,
    /// Set for JPEG only.
    pub jpeg_quality: Option<u8>,
    /// Set for WEBP only.
    pub webp_quality: Option<f32>,
    /// EXIF block forwarded unchanged from the source, when preserved.
    pub exif: Option<Vec<u8>>,
    /// ICC color profile forwarded unchanged from the source, when preserved.
    pub icc_profile: Option<Vec<u8>>,
}

/// Decide normalization and encode parameters for one image.
pub fn plan(
    image: DynamicImage,
    target: TargetFormat,
    preserve_metadata: bool,
    source: &SourceMetadata,
) -> (DynamicImage, EncodeOptions) {
    let normalized = normalize(image, target);

    let (exif, icc_profile) = if preserve_metadata {
        (source.exif.clone(), source.icc_profile.clone())
    } else {
        (None, None)
    };

    let options = EncodeOptions {
        format: target,
        jpeg_quality: matches!(target, TargetFormat::Jpeg).then_some(JPEG_QUALITY),
        webp_quality: matches!(target, TargetFormat::Webp).then_some(WEBP_QUALITY),
        exif,
        icc_profile,
    };

    (normalized, options)
}

fn normalize(image: DynamicImage, target: TargetFormat) -> DynamicImage {
    match target {
        TargetFormat::Jpeg => match image {
            // Only true RGBA sources are composited onto white; grayscale+alpha
            // converts directly to RGB with the alpha dropped.
            DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageRgba16(_)
            | DynamicImage::ImageRgba32F(_) => {
                DynamicImage::ImageRgb8(flatten_onto_white(&image.to_rgba8()))
            }
            DynamicImage::ImageRgb8(_) => image,
            _ => DynamicImage::ImageRgb8(image.to_rgb8()),
        },
        TargetFormat::Webp => {
            if image.color().has_alpha() {
                if matches!(image, DynamicImage::ImageRgba8(_)) {
                    image
                } else {
                    DynamicImage::ImageRgba8(image.to_rgba8())
                }
            } else if matches!(image, DynamicImage::ImageRgb8(_)) {
                image
            } else {
                DynamicImage::ImageRgb8(image.to_rgb8())
            }
        }
        TargetFormat::Png => image,
    }
}

/// Composite an RGBA image onto an opaque white background, using the alpha
/// channel as the mask. Output is plain RGB, safe for JPEG.
pub fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as u16;
        let inverse = 255 - alpha;
        for channel in 0..3 {
            // Rounded fixed-point blend: c*a + 255*(1-a)
            dst[channel] =
                ((src[channel] as u16 * alpha + 255 * inverse + 127) / 255) as u8;
        }
    }
    out
}
