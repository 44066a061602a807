//! # tileconv
//!
//! The conversion core of a tiled-imagery server: given a compressed image
//! tile addressed in one raster pyramid, produce the equivalent tile in
//! another format or pixel datatype.
//!
//! ## Features
//!
//! - **Pyramid addressing**: level/row/column addressing over derived level
//!   tables, with translation between pyramids that skip top levels
//! - **Format support**: JPEG and PNG codecs behind one decode/encode
//!   contract, with signature-based format sniffing
//! - **Type conversion**: piecewise-linear lookup tables with precomputed
//!   slopes remap pixel buffers between datatypes
//! - **Identity tags**: base-32 ETag tokens with a missing-tile flag and a
//!   content-derived fallback, for conditional request handling
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`raster`] - Pyramid model: datatypes, geometry, levels, addressing
//! - [`codec`] - Codec abstraction and the JPEG/PNG implementations
//! - [`convert`] - LUT engine and datatype conversion
//! - [`tile`] - Tile resolution pipeline, sources and identity tags
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tileconv::{
//!     BoundingBox, Bytes, ConvertConfig, DataType, FsTileSource, ImageFormat,
//!     RasterGeometry, Size, TileAddress, TileConverter,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let geometry = Arc::new(
//!         RasterGeometry::new(
//!             Size::new(4096, 4096, 1, 3),
//!             Size::new(512, 512, 1, 3),
//!             DataType::Byte,
//!             0,
//!             BoundingBox::default(),
//!         )
//!         .unwrap(),
//!     );
//!
//!     let config = ConvertConfig {
//!         input: geometry.clone(),
//!         output: geometry,
//!         output_format: ImageFormat::Jpeg,
//!         lut: None,
//!         quality: 80,
//!         png_compression: 6,
//!         max_input_size: 1 << 20,
//!         seed: 0,
//!         empty_tile: Bytes::new(),
//!         empty_etag: String::new(),
//!     };
//!
//!     let converter =
//!         TileConverter::new(config, FsTileSource::new("/data/tiles")).unwrap();
//!     let outcome = converter
//!         .get_tile(TileAddress::new(0, 0, 0), None)
//!         .await
//!         .unwrap();
//!     // Hand the outcome to the response collaborator...
//! }
//! ```

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod raster;
pub mod tile;

// Re-export commonly used types
pub use bytes::Bytes;

pub use codec::{
    decode_tile, encode_tile, sniff_frame, CodecParams, DecodeOutcome, FormatParams, ImageFormat,
    JpegFrame, JpegParams, PngParams, JPEG_SIGNATURE, PNG_SIGNATURE,
};
pub use config::{
    Config, DEFAULT_MAX_INPUT_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_PNG_COMPRESSION, DEFAULT_QUALITY,
};
pub use convert::{check_supported, convert, is_supported, Lut, LutPoint, Sample};
pub use error::{CodecError, ConfigError, ConvertError, TileError, UpstreamError};
pub use raster::{
    build_levels, translate, BoundingBox, DataType, Level, RasterGeometry, Size, TileAddress,
};
pub use tile::{
    derive_tag, fold_tag, from_base32, to_base32, ConvertConfig, FsTileSource, SourceTile,
    TileConverter, TileOutcome, TileResponse, TileSource, ETAG_LEN,
};
