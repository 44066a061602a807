//! Codec abstraction.
//!
//! Each supported compressed format implements the same two-operation
//! contract: `decode` fills a caller-supplied raw pixel buffer laid out
//! row-major with a caller-chosen line stride, and `encode` produces a
//! compressed payload from such a buffer. Every failure of the backing
//! image library is funneled into [`CodecError`] at this boundary; no
//! library fault propagates further as anything but an ordinary error value.
//!
//! Formats are recognized by their fixed leading signatures, the way the
//! wire protocol defines them: a JPEG bitstream begins `FF D8 FF`, a PNG
//! begins with its 8-byte signature. The name-to-format mapping is an
//! explicit immutable table, not a mutable global.

mod jpeg;
mod png;

pub use jpeg::{sniff_frame, JpegFrame};

use bytes::Bytes;

use crate::error::CodecError;
use crate::raster::RasterGeometry;

// =============================================================================
// Format identification
// =============================================================================

/// PNG leading signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// JPEG leading signature (first three bytes of any JPEG bitstream).
pub const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// A compressed tile format this core can decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Immutable format-name table, consulted at configuration time.
const FORMAT_NAMES: &[(&str, ImageFormat)] = &[
    ("jpeg", ImageFormat::Jpeg),
    ("jpg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
];

impl ImageFormat {
    /// Identify a format from the leading bytes of a compressed buffer.
    ///
    /// Returns `None` for anything that is not a recognized signature.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.len() >= PNG_SIGNATURE.len() && data[..8] == PNG_SIGNATURE {
            return Some(ImageFormat::Png);
        }
        if data.len() >= JPEG_SIGNATURE.len() && data[..3] == JPEG_SIGNATURE {
            return Some(ImageFormat::Jpeg);
        }
        None
    }

    /// Look up a format by name, case insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        FORMAT_NAMES
            .iter()
            .find(|(n, _)| *n == lower)
            .map(|(_, f)| *f)
    }

    /// MIME type for HTTP responses.
    pub const fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
        }
    }
}

// =============================================================================
// Codec parameters
// =============================================================================

/// JPEG-specific encode parameters.
#[derive(Debug, Clone, Copy)]
pub struct JpegParams {
    /// Output quality, 1-100
    pub quality: u8,
}

/// PNG-specific encode parameters.
#[derive(Debug, Clone, Copy)]
pub struct PngParams {
    /// Compression level, 0-9 (0 = fastest, 9 = smallest)
    pub compression: u8,
}

/// Format-specific parameter payload, selected by the format tag.
///
/// Adding a format means adding a variant here; the common
/// [`CodecParams`] record never changes.
#[derive(Debug, Clone, Copy)]
pub enum FormatParams {
    Jpeg(JpegParams),
    Png(PngParams),
}

/// Per-call configuration for a decode or encode operation.
#[derive(Debug, Clone, Copy)]
pub struct CodecParams {
    /// Bytes per row in the raw buffer. May exceed the tight row size to
    /// allow caller-chosen alignment; never smaller.
    pub line_stride: usize,

    /// Format-specific payload
    pub format: FormatParams,
}

impl CodecParams {
    /// Parameters for a tightly packed buffer matching a geometry.
    pub fn packed(geometry: &RasterGeometry, format: FormatParams) -> Self {
        Self {
            line_stride: geometry.row_bytes(),
            format,
        }
    }
}

/// Result of a successful decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOutcome {
    /// Set when the decoder synthesized data not literally present in the
    /// source bitstream (for example, dropped an alpha plane to match the
    /// expected channel count).
    pub modified: bool,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Decode a compressed tile into `dest`, row-major at `params.line_stride`.
///
/// The buffer is validated against the geometry's page size before any
/// pixels are written; a malformed or unsupported bitstream yields an error
/// with no partial output.
pub fn decode_tile(
    format: ImageFormat,
    params: &CodecParams,
    geometry: &RasterGeometry,
    src: &[u8],
    dest: &mut [u8],
) -> Result<DecodeOutcome, CodecError> {
    match format {
        ImageFormat::Jpeg => jpeg::decode(params, geometry, src, dest),
        ImageFormat::Png => png::decode(params, geometry, src, dest),
    }
}

/// Encode a raw tile buffer into a compressed payload.
///
/// The returned buffer's length reflects the bytes actually written.
pub fn encode_tile(
    format: ImageFormat,
    params: &CodecParams,
    geometry: &RasterGeometry,
    raw: &[u8],
) -> Result<Bytes, CodecError> {
    match format {
        ImageFormat::Jpeg => jpeg::encode(params, geometry, raw),
        ImageFormat::Png => png::encode(params, geometry, raw),
    }
}

/// Check that a raw buffer covers the geometry's tile at the given stride.
pub(crate) fn check_raw_extent(
    geometry: &RasterGeometry,
    line_stride: usize,
    len: usize,
) -> Result<(), CodecError> {
    let rows = geometry.page_size.y as usize;
    let row_bytes = geometry.row_bytes();
    if line_stride < row_bytes {
        return Err(CodecError::BufferTooSmall {
            needed: row_bytes,
            available: line_stride,
        });
    }
    let needed = line_stride * (rows - 1) + row_bytes;
    if len < needed {
        return Err(CodecError::BufferTooSmall {
            needed,
            available: len,
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
