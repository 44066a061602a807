use thiserror::Error;

use crate::raster::DataType;

/// Errors detected once at setup time, never at request time.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A size directive could not be parsed as "x y [z [c]]"
    #[error("Invalid size {directive:?}: {reason}")]
    InvalidSize {
        directive: String,
        reason: &'static str,
    },

    /// The geometry cannot form a valid tile pyramid
    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// A bounding box could not be parsed
    #[error("Invalid bounding box {value:?}: expected four comma separated numbers")]
    InvalidBoundingBox { value: String },

    /// An unknown pixel datatype name
    #[error("Unknown datatype: {name}")]
    UnknownDataType { name: String },

    /// A LUT specification is malformed or non-increasing
    #[error("Invalid LUT {spec:?}: {reason}")]
    InvalidLut { spec: String, reason: String },

    /// The requested datatype pair is not in the conversion matrix
    #[error("Unsupported conversion: {from:?} to {to:?}")]
    UnsupportedConversion { from: DataType, to: DataType },

    /// Output and input datatypes differ but no LUT was configured
    #[error("Datatypes differ ({from:?} to {to:?}) but no LUT is configured")]
    MissingLut { from: DataType, to: DataType },

    /// The empty-tile payload could not be loaded
    #[error("Empty tile {path:?}: {reason}")]
    EmptyTile { path: String, reason: String },

    /// A numeric parameter is outside its valid range
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Errors raised at the codec boundary.
///
/// Every failure of the underlying image library is converted into one of
/// these variants carrying the library's first diagnostic message. No
/// library-internal fault propagates past the codec abstraction.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The bitstream is malformed, truncated, or uses an unsupported variant
    #[error("Unsupported or malformed bitstream: {message}")]
    Malformed { message: String },

    /// The bitstream's leading signature matches no known format
    #[error("Unrecognized format signature")]
    UnknownSignature,

    /// The decoded frame does not match the expected tile geometry
    #[error(
        "Size mismatch: bitstream is {actual_w}x{actual_h}, geometry expects {expected_w}x{expected_h}"
    )]
    SizeMismatch {
        actual_w: u32,
        actual_h: u32,
        expected_w: u32,
        expected_h: u32,
    },

    /// The bitstream carries a channel count the codec does not handle
    #[error("Unsupported channel count: {channels}")]
    UnsupportedChannels { channels: u8 },

    /// The bitstream carries a sample precision the codec does not handle
    #[error("Unsupported sample precision: {bits} bits")]
    UnsupportedPrecision { bits: u8 },

    /// The raw pixel buffer does not correspond to a supported sample width
    #[error("Unsupported pixel format: {bytes_per_sample} bytes per sample")]
    UnsupportedPixelFormat { bytes_per_sample: usize },

    /// The caller-supplied destination buffer cannot hold the decoded tile
    #[error("Destination buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Errors from the type conversion engine.
///
/// An unsupported runtime conversion is a server-side fault: the pair should
/// have been rejected at configuration time.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("Unsupported runtime conversion: {from:?} to {to:?}")]
    Unsupported { from: DataType, to: DataType },

    #[error("Buffer length {len} is not a multiple of the {size}-byte sample size")]
    MisalignedBuffer { len: usize, size: usize },
}

/// Errors from the source-tile fetch collaborator.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Network or backend failure
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The source reports no tile at the requested address
    #[error("Tile not found: {0}")]
    NotFound(String),

    /// The source tile exceeds the configured input size limit
    #[error("Tile too large: {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Pipeline-level errors.
///
/// These are handled locally inside the tile pipeline and folded into one of
/// the response outcomes; they never carry internal diagnostics to clients.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The request path did not parse as a tile address
    #[error("Bad tile address: {0}")]
    BadAddress(String),

    /// The address is outside the pyramid
    #[error("Tile out of bounds: level {level}, row {row}, col {col}")]
    OutOfBounds { level: i64, row: i64, col: i64 },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
