//! PNG codec.
//!
//! Structurally identical to the JPEG codec: validate the frame against the
//! expected geometry, decode into a strided raw buffer, funnel every
//! backing-library failure into [`CodecError`]. PNG additionally carries the
//! 16-bit sample path, which is how deep-pixel pyramids move through this
//! core.

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::error::CodecError;
use crate::raster::RasterGeometry;

use super::{check_raw_extent, CodecParams, DecodeOutcome, FormatParams};

// =============================================================================
// Decode
// =============================================================================

/// Decode a PNG tile into a strided raw buffer.
///
/// Sources with an alpha plane are accepted when the geometry expects the
/// same color channels; the alpha plane is dropped and the outcome's
/// `modified` flag is set, since the raw buffer no longer matches the
/// literal bitstream samples.
pub fn decode(
    params: &CodecParams,
    geometry: &RasterGeometry,
    src: &[u8],
    dest: &mut [u8],
) -> Result<DecodeOutcome, CodecError> {
    let img = image::load_from_memory_with_format(src, image::ImageFormat::Png).map_err(|e| {
        CodecError::Malformed {
            message: e.to_string(),
        }
    })?;

    if img.width() as i64 != geometry.page_size.x || img.height() as i64 != geometry.page_size.y {
        return Err(CodecError::SizeMismatch {
            actual_w: img.width(),
            actual_h: img.height(),
            expected_w: geometry.page_size.x as u32,
            expected_h: geometry.page_size.y as u32,
        });
    }

    check_raw_extent(geometry, params.line_stride, dest.len())?;

    let bytes_per_sample = geometry.datatype.size();
    let channels = geometry.page_size.c;

    let (pixels, modified): (Vec<u8>, bool) = match (img, channels, bytes_per_sample) {
        (DynamicImage::ImageLuma8(b), 1, 1) => (b.into_raw(), false),
        (DynamicImage::ImageRgb8(b), 3, 1) => (b.into_raw(), false),
        (DynamicImage::ImageLuma16(b), 1, 2) => (samples_to_bytes(b.into_raw()), false),
        (DynamicImage::ImageRgb16(b), 3, 2) => (samples_to_bytes(b.into_raw()), false),
        (img @ DynamicImage::ImageLumaA8(_), 1, 1) => (img.into_luma8().into_raw(), true),
        (img @ DynamicImage::ImageRgba8(_), 3, 1) => (img.into_rgb8().into_raw(), true),
        (img @ DynamicImage::ImageLumaA16(_), 1, 2) => {
            (samples_to_bytes(img.into_luma16().into_raw()), true)
        }
        (img @ DynamicImage::ImageRgba16(_), 3, 2) => {
            (samples_to_bytes(img.into_rgb16().into_raw()), true)
        }
        (img, _, _) => {
            return Err(CodecError::UnsupportedChannels {
                channels: img.color().channel_count(),
            })
        }
    };

    let row_bytes = geometry.row_bytes();
    for (row, chunk) in pixels.chunks_exact(row_bytes).enumerate() {
        let start = row * params.line_stride;
        dest[start..start + row_bytes].copy_from_slice(chunk);
    }

    Ok(DecodeOutcome { modified })
}

fn samples_to_bytes(samples: Vec<u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_ne_bytes());
    }
    out
}

// =============================================================================
// Encode
// =============================================================================

/// Encode a strided raw buffer as PNG.
pub fn encode(
    params: &CodecParams,
    geometry: &RasterGeometry,
    raw: &[u8],
) -> Result<Bytes, CodecError> {
    let level = match params.format {
        FormatParams::Png(p) => p.compression.min(9),
        _ => 6,
    };

    let bytes_per_sample = geometry.datatype.size();
    let color = match (geometry.page_size.c, bytes_per_sample) {
        (1, 1) => ExtendedColorType::L8,
        (3, 1) => ExtendedColorType::Rgb8,
        (1, 2) => ExtendedColorType::L16,
        (3, 2) => ExtendedColorType::Rgb16,
        (_, b) if b != 1 && b != 2 => {
            return Err(CodecError::UnsupportedPixelFormat {
                bytes_per_sample: b,
            })
        }
        (c, _) => {
            return Err(CodecError::UnsupportedChannels {
                channels: c.min(u8::MAX as i64) as u8,
            })
        }
    };

    check_raw_extent(geometry, params.line_stride, raw.len())?;

    let width = geometry.page_size.x as u32;
    let height = geometry.page_size.y as u32;
    let row_bytes = geometry.row_bytes();

    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * params.line_stride;
        packed.extend_from_slice(&raw[start..start + row_bytes]);
    }

    let compression = match level {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive);
    encoder
        .write_image(&packed, width, height, color)
        .map_err(|e| CodecError::Malformed {
            message: e.to_string(),
        })?;

    Ok(Bytes::from(out))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ImageFormat, PngParams, PNG_SIGNATURE};
    use crate::raster::{BoundingBox, DataType, Size};

    fn geometry(c: i64, datatype: DataType) -> RasterGeometry {
        RasterGeometry::new(
            Size::new(32, 32, 1, c),
            Size::new(32, 32, 1, c),
            datatype,
            0,
            BoundingBox::default(),
        )
        .unwrap()
    }

    fn params(geometry: &RasterGeometry) -> CodecParams {
        CodecParams::packed(geometry, FormatParams::Png(PngParams { compression: 6 }))
    }

    fn gray16_png() -> Vec<u8> {
        use image::{ImageBuffer, Luma};
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(32, 32, |x, y| Luma([(x * 2048 + y) as u16]));
        let mut out = Vec::new();
        let encoder = PngEncoder::new(&mut out);
        encoder
            .write_image(
                &samples_to_bytes(img.into_raw()),
                32,
                32,
                ExtendedColorType::L16,
            )
            .unwrap();
        out
    }

    // -------------------------------------------------------------------------
    // Round trips
    // -------------------------------------------------------------------------

    #[test]
    fn test_round_trip_gray8_exact() {
        let geom = geometry(1, DataType::Byte);
        let raw: Vec<u8> = (0..geom.tile_bytes()).map(|i| (i % 251) as u8).collect();
        let compressed = encode(&params(&geom), &geom, &raw).unwrap();
        assert_eq!(&compressed[..8], &PNG_SIGNATURE);
        assert_eq!(ImageFormat::sniff(&compressed), Some(ImageFormat::Png));

        let mut decoded = vec![0u8; geom.tile_bytes()];
        decode(&params(&geom), &geom, &compressed, &mut decoded).unwrap();
        // Lossless: exact byte identity
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_round_trip_rgb16_exact() {
        let geom = geometry(3, DataType::UInt16);
        let raw: Vec<u8> = (0..geom.tile_bytes()).map(|i| (i % 247) as u8).collect();
        let compressed = encode(&params(&geom), &geom, &raw).unwrap();
        let mut decoded = vec![0u8; geom.tile_bytes()];
        decode(&params(&geom), &geom, &compressed, &mut decoded).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_decode_gray16() {
        let geom = geometry(1, DataType::UInt16);
        let mut dest = vec![0u8; geom.tile_bytes()];
        let outcome = decode(&params(&geom), &geom, &gray16_png(), &mut dest).unwrap();
        assert!(!outcome.modified);
        // First row, second sample is x=1,y=0 -> 2048
        let sample = u16::from_ne_bytes([dest[2], dest[3]]);
        assert_eq!(sample, 2048);
    }

    #[test]
    fn test_decode_rgba_drops_alpha_and_flags() {
        use image::{Rgba, RgbaImage};
        let img = RgbaImage::from_fn(32, 32, |x, y| Rgba([x as u8, y as u8, 9, 200]));
        let mut src = Vec::new();
        PngEncoder::new(&mut src)
            .write_image(img.as_raw(), 32, 32, ExtendedColorType::Rgba8)
            .unwrap();

        let geom = geometry(3, DataType::Byte);
        let mut dest = vec![0u8; geom.tile_bytes()];
        let outcome = decode(&params(&geom), &geom, &src, &mut dest).unwrap();
        assert!(outcome.modified);
        // Alpha is gone; the color samples survive
        assert_eq!(dest[0], 0);
        assert_eq!(dest[2], 9);
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_size_mismatch() {
        let big = geometry(1, DataType::Byte);
        let raw = vec![7u8; big.tile_bytes()];
        let compressed = encode(&params(&big), &big, &raw).unwrap();

        let small = RasterGeometry::new(
            Size::new(16, 16, 1, 1),
            Size::new(16, 16, 1, 1),
            DataType::Byte,
            0,
            BoundingBox::default(),
        )
        .unwrap();
        let mut dest = vec![0u8; small.tile_bytes()];
        let result = decode(&params(&small), &small, &compressed, &mut dest);
        assert!(matches!(result, Err(CodecError::SizeMismatch { .. })));
    }

    #[test]
    fn test_decode_corrupt_never_panics() {
        let geom = geometry(1, DataType::Byte);
        let mut dest = vec![0u8; geom.tile_bytes()];

        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&[0x00, 0x55, 0xAA, 0xFF]);
        let err = decode(&params(&geom), &geom, &data, &mut dest).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_encode_rejects_float_samples() {
        let geom = geometry(1, DataType::Float64);
        let raw = vec![0u8; geom.tile_bytes()];
        let result = encode(&params(&geom), &geom, &raw);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedPixelFormat {
                bytes_per_sample: 8
            })
        ));
    }
}
