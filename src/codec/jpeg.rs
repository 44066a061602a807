//! JPEG codec.
//!
//! Decoding happens in two stages. A marker-level sniff walks the bitstream
//! to the frame header and extracts the sample precision, dimensions and
//! channel count, rejecting progressive and arithmetic-coded variants before
//! any pixel work starts. The precision-specific decode path then runs
//! behind that dispatch, with every backing-library failure converted into a
//! [`CodecError`] carrying the library's diagnostic.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};

use crate::error::CodecError;
use crate::raster::RasterGeometry;

use super::{check_raw_extent, CodecParams, DecodeOutcome, FormatParams};

// =============================================================================
// Markers
// =============================================================================

/// Start Of Image
const SOI: u8 = 0xD8;
/// End Of Image
const EOI: u8 = 0xD9;
/// Start Of Scan
const SOS: u8 = 0xDA;
/// Baseline DCT frame
const SOF0: u8 = 0xC0;
/// Extended sequential DCT frame
const SOF1: u8 = 0xC1;
/// Progressive DCT frame
const SOF2: u8 = 0xC2;
/// Arithmetic-coded sequential frame
const SOF9: u8 = 0xC9;
/// Arithmetic-coded progressive frame
const SOF10: u8 = 0xCA;
/// Arithmetic-coded lossless frame
const SOF11: u8 = 0xCB;

// =============================================================================
// Frame sniffing
// =============================================================================

/// Structural frame information read from a JPEG bitstream's SOF marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFrame {
    /// Sample precision in bits (8 or 12 for supported streams)
    pub precision: u8,
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

/// Walk the marker stream to the frame header.
///
/// Rejects progressive and arithmetic-coded frames and any stream whose
/// scan data starts before a frame header appears.
pub fn sniff_frame(data: &[u8]) -> Result<JpegFrame, CodecError> {
    let malformed = |message: &str| CodecError::Malformed {
        message: message.to_string(),
    };

    if data.len() < 4 || data[0] != 0xFF || data[1] != SOI {
        return Err(malformed("missing SOI marker"));
    }

    let mut pos = 2;
    loop {
        if pos + 1 >= data.len() {
            return Err(malformed("truncated before frame header"));
        }
        if data[pos] != 0xFF {
            return Err(malformed("marker stream desynchronized"));
        }
        // Fill bytes before a marker are legal
        let mut code = data[pos + 1];
        while code == 0xFF {
            pos += 1;
            if pos + 1 >= data.len() {
                return Err(malformed("truncated before frame header"));
            }
            code = data[pos + 1];
        }

        match code {
            SOF0 | SOF1 => {
                // length(2) precision(1) height(2) width(2) components(1)
                if pos + 10 > data.len() {
                    return Err(malformed("truncated frame header"));
                }
                return Ok(JpegFrame {
                    precision: data[pos + 4],
                    height: u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32,
                    width: u16::from_be_bytes([data[pos + 7], data[pos + 8]]) as u32,
                    components: data[pos + 9],
                });
            }
            SOF2 => return Err(malformed("progressive JPEG is not supported")),
            SOF9 | SOF10 | SOF11 => {
                return Err(malformed("arithmetic-coded JPEG is not supported"))
            }
            0xC3 | 0xC5..=0xC7 | 0xCD..=0xCF => {
                return Err(malformed("unsupported JPEG frame type"))
            }
            SOS => return Err(malformed("scan data before frame header")),
            EOI => return Err(malformed("no frame header before EOI")),
            SOI | 0xD0..=0xD7 | 0x01 => {
                // Standalone markers carry no length field
                pos += 2;
            }
            _ => {
                if pos + 4 > data.len() {
                    return Err(malformed("truncated marker segment"));
                }
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                if length < 2 {
                    return Err(malformed("invalid marker segment length"));
                }
                pos += 2 + length;
            }
        }
    }
}

// =============================================================================
// Decode
// =============================================================================

/// Decode a JPEG tile into a strided raw buffer.
pub fn decode(
    params: &CodecParams,
    geometry: &RasterGeometry,
    src: &[u8],
    dest: &mut [u8],
) -> Result<DecodeOutcome, CodecError> {
    let frame = sniff_frame(src)?;

    match frame.precision {
        8 | 12 => {}
        bits => return Err(CodecError::UnsupportedPrecision { bits }),
    }
    match frame.components {
        1 | 3 => {}
        channels => return Err(CodecError::UnsupportedChannels { channels }),
    }
    if frame.components as i64 != geometry.page_size.c {
        return Err(CodecError::UnsupportedChannels {
            channels: frame.components,
        });
    }
    if frame.width as i64 != geometry.page_size.x || frame.height as i64 != geometry.page_size.y {
        return Err(CodecError::SizeMismatch {
            actual_w: frame.width,
            actual_h: frame.height,
            expected_w: geometry.page_size.x as u32,
            expected_h: geometry.page_size.y as u32,
        });
    }

    check_raw_extent(geometry, params.line_stride, dest.len())?;

    match frame.precision {
        8 => decode8(params, geometry, src, dest),
        // The backing codec stack has no 12-bit JPEG primitive; the
        // dispatch recognizes the precision so the diagnostic names it.
        _ => Err(CodecError::Malformed {
            message: "12-bit JPEG decoding is not available".to_string(),
        }),
    }
}

/// 8-bit decode path over the `image` JPEG codec.
fn decode8(
    params: &CodecParams,
    geometry: &RasterGeometry,
    src: &[u8],
    dest: &mut [u8],
) -> Result<DecodeOutcome, CodecError> {
    let img = image::load_from_memory_with_format(src, image::ImageFormat::Jpeg).map_err(|e| {
        CodecError::Malformed {
            message: e.to_string(),
        }
    })?;

    let row_bytes = geometry.row_bytes();
    let (pixels, modified): (Vec<u8>, bool) = match (img, geometry.page_size.c) {
        (DynamicImage::ImageLuma8(buf), 1) => (buf.into_raw(), false),
        (DynamicImage::ImageRgb8(buf), 3) => (buf.into_raw(), false),
        // Some encoders mark gray scans as YCbCr; collapse to the expected layout.
        (other, 1) => (other.into_luma8().into_raw(), true),
        (other, 3) => (other.into_rgb8().into_raw(), true),
        (_, c) => {
            return Err(CodecError::UnsupportedChannels {
                channels: c.min(u8::MAX as i64) as u8,
            })
        }
    };

    for (row, chunk) in pixels.chunks_exact(row_bytes).enumerate() {
        let start = row * params.line_stride;
        dest[start..start + row_bytes].copy_from_slice(chunk);
    }

    Ok(DecodeOutcome { modified })
}

// =============================================================================
// Encode
// =============================================================================

/// Encode a strided raw buffer as JPEG.
///
/// The input sample width must correspond to a JPEG-expressible precision:
/// one byte per sample (8-bit) or two bytes per sample (12-bit). Both widths
/// are checked explicitly; anything else is an unsupported pixel format.
pub fn encode(
    params: &CodecParams,
    geometry: &RasterGeometry,
    raw: &[u8],
) -> Result<Bytes, CodecError> {
    let quality = match params.format {
        FormatParams::Jpeg(p) => p.quality.clamp(1, 100),
        _ => 85,
    };

    let bytes_per_sample = geometry.datatype.size();
    if bytes_per_sample != 1 && bytes_per_sample != 2 {
        return Err(CodecError::UnsupportedPixelFormat { bytes_per_sample });
    }

    check_raw_extent(geometry, params.line_stride, raw.len())?;

    if bytes_per_sample == 2 {
        return Err(CodecError::UnsupportedPrecision { bits: 12 });
    }

    let width = geometry.page_size.x as u32;
    let height = geometry.page_size.y as u32;
    let row_bytes = geometry.row_bytes();

    let color = match geometry.page_size.c {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        c => {
            return Err(CodecError::UnsupportedChannels {
                channels: c.min(u8::MAX as i64) as u8,
            })
        }
    };

    // Pack strided rows tightly for the encoder.
    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * params.line_stride;
        packed.extend_from_slice(&raw[start..start + row_bytes]);
    }

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(&packed, width, height, color)
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
    use crate::codec::{JpegParams, JPEG_SIGNATURE};
    use crate::raster::{BoundingBox, DataType, Size};

    fn geometry(c: i64) -> RasterGeometry {
        RasterGeometry::new(
            Size::new(64, 64, 1, c),
            Size::new(64, 64, 1, c),
            DataType::Byte,
            0,
            BoundingBox::default(),
        )
        .unwrap()
    }

    fn params(geometry: &RasterGeometry) -> CodecParams {
        CodecParams::packed(geometry, FormatParams::Jpeg(JpegParams { quality: 90 }))
    }

    fn test_jpeg(c: i64) -> Vec<u8> {
        use image::{GrayImage, Luma, Rgb, RgbImage};
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
        if c == 1 {
            let img = GrayImage::from_fn(64, 64, |x, y| Luma([((x + y) % 256) as u8]));
            encoder.encode_image(&img).unwrap();
        } else {
            let img = RgbImage::from_fn(64, 64, |x, _| Rgb([x as u8 * 4, 128, 7]));
            encoder.encode_image(&img).unwrap();
        }
        buf
    }

    // -------------------------------------------------------------------------
    // sniff_frame
    // -------------------------------------------------------------------------

    #[test]
    fn test_sniff_gray_frame() {
        let data = test_jpeg(1);
        let frame = sniff_frame(&data).unwrap();
        assert_eq!(frame.precision, 8);
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 64);
        assert_eq!(frame.components, 1);
    }

    #[test]
    fn test_sniff_rgb_frame() {
        let frame = sniff_frame(&test_jpeg(3)).unwrap();
        assert_eq!(frame.components, 3);
    }

    #[test]
    fn test_sniff_rejects_progressive() {
        // SOI then a progressive SOF
        let data = [
            0xFF, 0xD8, 0xFF, 0xC2, 0x00, 0x0B, 0x08, 0x00, 0x40, 0x00, 0x40, 0x01, 0x00, 0x00,
        ];
        let err = sniff_frame(&data).unwrap_err();
        assert!(err.to_string().contains("progressive"));
    }

    #[test]
    fn test_sniff_rejects_arithmetic() {
        let data = [
            0xFF, 0xD8, 0xFF, 0xC9, 0x00, 0x0B, 0x08, 0x00, 0x40, 0x00, 0x40, 0x01, 0x00, 0x00,
        ];
        let err = sniff_frame(&data).unwrap_err();
        assert!(err.to_string().contains("arithmetic"));
    }

    #[test]
    fn test_sniff_rejects_truncated() {
        let data = test_jpeg(1);
        assert!(sniff_frame(&data[..3]).is_err());
        assert!(sniff_frame(&[]).is_err());
        assert!(sniff_frame(&[0x00, 0x01, 0x02, 0x03]).is_err());
    }

    // -------------------------------------------------------------------------
    // decode
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_gray() {
        let geom = geometry(1);
        let mut dest = vec![0u8; geom.tile_bytes()];
        let outcome = decode(&params(&geom), &geom, &test_jpeg(1), &mut dest).unwrap();
        assert!(!outcome.modified);
        // Gradient content survived decode
        assert!(dest.iter().any(|&b| b > 0));
    }

    #[test]
    fn test_decode_rgb() {
        let geom = geometry(3);
        let mut dest = vec![0u8; geom.tile_bytes()];
        decode(&params(&geom), &geom, &test_jpeg(3), &mut dest).unwrap();
        assert!(dest.iter().any(|&b| b > 0));
    }

    #[test]
    fn test_decode_strided() {
        let geom = geometry(1);
        let stride = geom.row_bytes() + 16;
        let p = CodecParams {
            line_stride: stride,
            format: FormatParams::Jpeg(JpegParams { quality: 90 }),
        };
        let mut dest = vec![0xAAu8; stride * 64];
        decode(&p, &geom, &test_jpeg(1), &mut dest).unwrap();
        // Padding bytes past each row are untouched
        assert_eq!(dest[geom.row_bytes()], 0xAA);
    }

    #[test]
    fn test_decode_size_mismatch() {
        let geom = RasterGeometry::new(
            Size::new(32, 32, 1, 1),
            Size::new(32, 32, 1, 1),
            DataType::Byte,
            0,
            BoundingBox::default(),
        )
        .unwrap();
        let mut dest = vec![0u8; geom.tile_bytes()];
        let p = CodecParams::packed(&geom, FormatParams::Jpeg(JpegParams { quality: 90 }));
        let result = decode(&p, &geom, &test_jpeg(1), &mut dest);
        assert!(matches!(result, Err(CodecError::SizeMismatch { .. })));
    }

    #[test]
    fn test_decode_channel_mismatch() {
        let geom = geometry(3);
        let mut dest = vec![0u8; geom.tile_bytes()];
        let result = decode(&params(&geom), &geom, &test_jpeg(1), &mut dest);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedChannels { channels: 1 })
        ));
    }

    #[test]
    fn test_decode_corrupt_never_panics() {
        let geom = geometry(1);
        let mut dest = vec![0u8; geom.tile_bytes()];
        let mut data = test_jpeg(1);
        // Corrupt the scan data
        let len = data.len();
        for b in &mut data[len / 2..] {
            *b = 0x55;
        }
        let result = decode(&params(&geom), &geom, &data, &mut dest);
        if let Err(e) = result {
            assert!(!e.to_string().is_empty());
        }

        // Truncated stream must fail with a diagnostic
        let err = decode(&params(&geom), &geom, &test_jpeg(1)[..10], &mut dest).unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_decode_buffer_too_small() {
        let geom = geometry(1);
        let mut dest = vec![0u8; 16];
        let result = decode(&params(&geom), &geom, &test_jpeg(1), &mut dest);
        assert!(matches!(result, Err(CodecError::BufferTooSmall { .. })));
    }

    // -------------------------------------------------------------------------
    // encode
    // -------------------------------------------------------------------------

    #[test]
    fn test_encode_round_trip_uniform() {
        let geom = geometry(1);
        let raw = vec![137u8; geom.tile_bytes()];
        let compressed = encode(&params(&geom), &geom, &raw).unwrap();
        assert_eq!(&compressed[..3], &JPEG_SIGNATURE);

        let mut decoded = vec![0u8; geom.tile_bytes()];
        decode(&params(&geom), &geom, &compressed, &mut decoded).unwrap();
        // Lossy format: uniform input stays within a small pixel delta
        for &b in &decoded {
            assert!((b as i32 - 137).abs() <= 3, "pixel {} too far from 137", b);
        }
    }

    #[test]
    fn test_encode_rejects_wide_samples() {
        let geom = RasterGeometry::new(
            Size::new(64, 64, 1, 1),
            Size::new(64, 64, 1, 1),
            DataType::Float32,
            0,
            BoundingBox::default(),
        )
        .unwrap();
        let raw = vec![0u8; geom.tile_bytes()];
        let p = CodecParams::packed(&geom, FormatParams::Jpeg(JpegParams { quality: 90 }));
        let result = encode(&p, &geom, &raw);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedPixelFormat {
                bytes_per_sample: 4
            })
        ));
    }

    #[test]
    fn test_encode_two_byte_samples_reach_precision_path() {
        // Two-byte samples pass the width check (the 12-bit leg), then fail
        // with a precision error rather than a pixel-format error.
        let geom = RasterGeometry::new(
            Size::new(64, 64, 1, 1),
            Size::new(64, 64, 1, 1),
            DataType::UInt16,
            0,
            BoundingBox::default(),
        )
        .unwrap();
        let raw = vec![0u8; geom.tile_bytes()];
        let p = CodecParams::packed(&geom, FormatParams::Jpeg(JpegParams { quality: 90 }));
        let result = encode(&p, &geom, &raw);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedPrecision { bits: 12 })
        ));
    }

    #[test]
    fn test_encode_short_buffer() {
        let geom = geometry(1);
        let raw = vec![0u8; geom.tile_bytes() - 1];
        let result = encode(&params(&geom), &geom, &raw);
        assert!(matches!(result, Err(CodecError::BufferTooSmall { .. })));
    }
}
