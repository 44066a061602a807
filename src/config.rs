//! Configuration for the tile conversion pipeline.
//!
//! All options can come from the command line or from environment variables
//! with the `TILECONV_` prefix. The raw textual options here are turned into
//! the validated, immutable [`ConvertConfig`] by [`Config::build`]; every
//! configuration fault is reported at startup, never at request time.
//!
//! # Environment Variables
//!
//! - `TILECONV_SIZE` - Input raster size as "x y [z [c]]" (required)
//! - `TILECONV_PAGE_SIZE` - Tile size (default: 512 512)
//! - `TILECONV_DATA_TYPE` - Input pixel datatype (default: byte)
//! - `TILECONV_SKIP` - Skipped input pyramid levels (default: 0)
//! - `TILECONV_BBOX` - Bounding box "xmin,ymin,xmax,ymax" (default: 0,0,1,1)
//! - `TILECONV_OUT_SIZE` - Output raster size (default: input size)
//! - `TILECONV_OUT_DATA_TYPE` - Output pixel datatype (default: input type)
//! - `TILECONV_OUT_SKIP` - Skipped output pyramid levels (default: 0)
//! - `TILECONV_FORMAT` - Output format, jpeg or png (default: jpeg)
//! - `TILECONV_LUT` - Remap table as "in:out,in:out,..." pairs
//! - `TILECONV_QUALITY` - JPEG output quality (default: 80)
//! - `TILECONV_PNG_COMPRESSION` - PNG compression level (default: 6)
//! - `TILECONV_MAX_INPUT_SIZE` - Source tile byte limit (default: 1 MiB)
//! - `TILECONV_ETAG_SEED` - 64-bit identity tag seed (default: 0)
//! - `TILECONV_EMPTY_TILE` - Path to the canonical empty-tile payload
//! - `TILECONV_SOURCE_DIR` - Source tile directory for the CLI

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Args;

use crate::codec::ImageFormat;
use crate::convert::Lut;
use crate::error::ConfigError;
use crate::raster::{BoundingBox, DataType, RasterGeometry, Size};
use crate::tile::{fold_tag, to_base32, ConvertConfig};

// =============================================================================
// Default Values
// =============================================================================

/// Default tile size directive.
pub const DEFAULT_PAGE_SIZE: &str = "512 512";

/// Default JPEG output quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// Default PNG compression level.
pub const DEFAULT_PNG_COMPRESSION: u8 = 6;

/// Default cap on source tile size (1 MiB).
pub const DEFAULT_MAX_INPUT_SIZE: usize = 1 << 20;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Raster and pipeline options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Input Raster
    // =========================================================================
    /// Input raster size as "x y [z [c]]" in pixels.
    #[arg(long, env = "TILECONV_SIZE")]
    pub size: String,

    /// Tile size as "x y", shared by the input and output pyramids.
    #[arg(long, default_value = DEFAULT_PAGE_SIZE, env = "TILECONV_PAGE_SIZE")]
    pub page_size: String,

    /// Input pixel datatype (byte, uint16, int16, uint32, int32,
    /// float32, float64).
    #[arg(long, env = "TILECONV_DATA_TYPE")]
    pub data_type: Option<String>,

    /// Number of top input pyramid levels omitted from addressing.
    #[arg(long, default_value_t = 0, env = "TILECONV_SKIP")]
    pub skip: usize,

    /// Bounding box as "xmin,ymin,xmax,ymax".
    #[arg(long, env = "TILECONV_BBOX")]
    pub bbox: Option<String>,

    // =========================================================================
    // Output Raster
    // =========================================================================
    /// Output raster size; defaults to the input size.
    #[arg(long, env = "TILECONV_OUT_SIZE")]
    pub out_size: Option<String>,

    /// Output pixel datatype; defaults to the input datatype.
    #[arg(long, env = "TILECONV_OUT_DATA_TYPE")]
    pub out_data_type: Option<String>,

    /// Number of top output pyramid levels omitted from addressing.
    #[arg(long, default_value_t = 0, env = "TILECONV_OUT_SKIP")]
    pub out_skip: usize,

    /// Output tile format, "jpeg" or "png".
    #[arg(long, default_value = "jpeg", env = "TILECONV_FORMAT")]
    pub format: String,

    // =========================================================================
    // Conversion
    // =========================================================================
    /// Datatype remap table as comma-separated "input:output" pairs with
    /// strictly increasing inputs. Required when the datatypes differ.
    #[arg(long, env = "TILECONV_LUT")]
    pub lut: Option<String>,

    /// JPEG output quality (1-100).
    #[arg(long, default_value_t = DEFAULT_QUALITY, env = "TILECONV_QUALITY")]
    pub quality: u8,

    /// PNG compression level (0-9).
    #[arg(long, default_value_t = DEFAULT_PNG_COMPRESSION, env = "TILECONV_PNG_COMPRESSION")]
    pub png_compression: u8,

    // =========================================================================
    // Pipeline
    // =========================================================================
    /// Largest accepted source tile, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_SIZE, env = "TILECONV_MAX_INPUT_SIZE")]
    pub max_input_size: usize,

    /// Seed mixed into every identity tag.
    #[arg(long, default_value_t = 0, env = "TILECONV_ETAG_SEED")]
    pub etag_seed: u64,

    /// Path to the compressed payload served for missing tiles.
    ///
    /// When absent, missing tiles are served with an empty body.
    #[arg(long, env = "TILECONV_EMPTY_TILE")]
    pub empty_tile: Option<PathBuf>,

    /// Directory holding source tiles laid out level/row/col.
    #[arg(long, env = "TILECONV_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,
}

impl Config {
    /// Turn the textual options into a validated pipeline configuration.
    pub fn build(&self) -> Result<ConvertConfig, ConfigError> {
        let page_size = Size::parse(&self.page_size)?;
        let bbox = match &self.bbox {
            Some(text) => BoundingBox::parse(text)?,
            None => BoundingBox::default(),
        };

        let in_size = Size::parse(&self.size)?;
        let in_type = DataType::parse(self.data_type.as_deref())?;
        let input = RasterGeometry::new(in_size, page_size, in_type, self.skip, bbox)?;

        let out_size = match &self.out_size {
            Some(text) => Size::parse(text)?,
            None => in_size,
        };
        let out_type = match &self.out_data_type {
            Some(name) => DataType::parse(Some(name.as_str()))?,
            None => in_type,
        };
        let output = RasterGeometry::new(out_size, page_size, out_type, self.out_skip, bbox)?;

        let output_format =
            ImageFormat::parse(&self.format).ok_or_else(|| ConfigError::InvalidParameter {
                name: "format",
                reason: format!("{:?} is not a supported output format", self.format),
            })?;

        let lut = match &self.lut {
            Some(spec) => Some(Lut::from_spec(spec)?),
            None => None,
        };

        let empty_tile = self.load_empty_tile()?;
        let empty_etag = to_base32(fold_tag(self.etag_seed, &empty_tile), true);

        let config = ConvertConfig {
            input: Arc::new(input),
            output: Arc::new(output),
            output_format,
            lut,
            quality: self.quality,
            png_compression: self.png_compression,
            max_input_size: self.max_input_size,
            seed: self.etag_seed,
            empty_tile,
            empty_etag,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the missing-tile payload, enforcing the input size cap.
    fn load_empty_tile(&self) -> Result<Bytes, ConfigError> {
        let path = match &self.empty_tile {
            Some(path) => path,
            None => return Ok(Bytes::new()),
        };
        let err = |reason: String| ConfigError::EmptyTile {
            path: path.display().to_string(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| err(e.to_string()))?;
        if data.len() > self.max_input_size {
            return Err(err(format!(
                "{} bytes exceeds the {} byte input limit",
                data.len(),
                self.max_input_size
            )));
        }
        Ok(Bytes::from(data))
    }
}

// =============================================================================
// Tests
// =============================================================================
