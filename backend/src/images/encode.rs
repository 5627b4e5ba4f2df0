//! Re-encodes an original upload into one variant: proportional resize bound
//! by the variant's longest edge, WebP output.

use image::{imageops::FilterType, ImageFormat, ImageReader};
use std::io::Cursor;

use super::variants::Variant;

pub const VARIANT_CONTENT_TYPE: &str = "image/webp";

/// Decodes `original`, bounds it to the variant's longest edge (never
/// upscaling) and encodes WebP bytes.
pub fn encode_variant(original: &[u8], variant: Variant) -> anyhow::Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(original))
        .with_guessed_format()?
        .decode()?;

    let max_edge = variant.max_edge();
    let img = if img.width().max(img.height()) > max_edge {
        img.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    img.to_rgba8().write_to(&mut out, ImageFormat::WebP)?;
    Ok(out.into_inner())
}
