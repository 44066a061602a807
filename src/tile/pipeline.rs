//! Tile resolution pipeline.
//!
//! Runs one request through the fixed state machine:
//!
//! ```text
//! parse -> validate -> {missing | fetch} -> sniff -> decode
//!       -> [convert] -> identity -> {not-modified | passthrough | encode}
//! ```
//!
//! Every per-request fault folds into one of the [`TileOutcome`] variants;
//! only server-side faults (an upstream that breaks its contract, a
//! conversion pair that escaped setup validation) surface as errors.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::{
    decode_tile, encode_tile, CodecParams, FormatParams, ImageFormat, JpegParams, PngParams,
};
use crate::convert::{check_supported, convert, Lut};
use crate::error::{CodecError, ConfigError, TileError, UpstreamError};
use crate::raster::{translate, RasterGeometry, TileAddress};

use super::etag::{derive_tag, from_base32, to_base32};
use super::source::TileSource;

// =============================================================================
// Configuration
// =============================================================================

/// Everything the pipeline needs, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Input pyramid, the geometry source tiles are addressed in
    pub input: Arc<RasterGeometry>,

    /// Output pyramid, the geometry requests are addressed in
    pub output: Arc<RasterGeometry>,

    /// Compressed format of produced tiles
    pub output_format: ImageFormat,

    /// Datatype remapping table; required when the pyramids' datatypes differ
    pub lut: Option<Lut>,

    /// JPEG output quality, 1-100
    pub quality: u8,

    /// PNG output compression level, 0-9
    pub png_compression: u8,

    /// Largest source tile the pipeline will accept, in bytes
    pub max_input_size: usize,

    /// Seed mixed into every identity tag
    pub seed: u64,

    /// Canonical payload served for absent or out-of-range tiles
    pub empty_tile: Bytes,

    /// Precomputed identity token of the empty tile, flag bit set
    pub empty_etag: String,
}

impl ConvertConfig {
    /// Validate the cross-field constraints the type system cannot express.
    ///
    /// Runs once at setup; a configuration that passes here never produces
    /// a configuration-class fault at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let inp = self.input.page_size;
        let out = self.output.page_size;
        if inp.x != out.x || inp.y != out.y || inp.c != out.c {
            return Err(ConfigError::InvalidGeometry {
                reason: format!(
                    "input page {}x{}x{} and output page {}x{}x{} must match, \
                     tiles are remapped in place, never resampled",
                    inp.x, inp.y, inp.c, out.x, out.y, out.c
                ),
            });
        }

        if self.input.datatype != self.output.datatype {
            check_supported(self.input.datatype, self.output.datatype)?;
            if self.lut.is_none() {
                return Err(ConfigError::MissingLut {
                    from: self.input.datatype,
                    to: self.output.datatype,
                });
            }
        }

        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::InvalidParameter {
                name: "quality",
                reason: format!("{} is outside 1..=100", self.quality),
            });
        }
        if self.png_compression > 9 {
            return Err(ConfigError::InvalidParameter {
                name: "png_compression",
                reason: format!("{} is outside 0..=9", self.png_compression),
            });
        }
        if self.max_input_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_input_size",
                reason: "must be positive".to_string(),
            });
        }

        Ok(())
    }

    fn encode_params(&self) -> CodecParams {
        let format = match self.output_format {
            ImageFormat::Jpeg => FormatParams::Jpeg(JpegParams {
                quality: self.quality,
            }),
            ImageFormat::Png => FormatParams::Png(PngParams {
                compression: self.png_compression,
            }),
        };
        CodecParams::packed(&self.output, format)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// A produced tile, ready for the response collaborator.
#[derive(Debug, Clone)]
pub struct TileResponse {
    pub data: Bytes,
    pub etag: String,
    pub mime: &'static str,
}

/// The four ways a tile request resolves.
#[derive(Debug, Clone)]
pub enum TileOutcome {
    /// A converted (or passed-through) tile
    Tile(TileResponse),

    /// The caller's conditional tag matched; no payload
    NotModified,

    /// The tile is absent or out of range; serve the canonical empty tile
    Missing,

    /// The source tile exists but could not be decoded
    NotFound,
}

// =============================================================================
// Pipeline
// =============================================================================

/// The tile conversion pipeline over a source `S`.
///
/// Holds only immutable state; one instance serves unbounded concurrent
/// requests. Nothing is cached between requests.
pub struct TileConverter<S: TileSource> {
    config: ConvertConfig,
    source: S,
}

impl<S: TileSource> TileConverter<S> {
    /// Build a pipeline, validating the configuration first.
    pub fn new(config: ConvertConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// The response a caller should serve for the [`TileOutcome::Missing`]
    /// outcome.
    pub fn missing_response(&self) -> TileResponse {
        TileResponse {
            data: self.config.empty_tile.clone(),
            etag: self.config.empty_etag.clone(),
            mime: self.config.output_format.mime(),
        }
    }

    /// Resolve a request path such as `/tiles/3/7/11`.
    ///
    /// An unparseable path is a missing tile, not an error.
    pub async fn get_tile_path(
        &self,
        path: &str,
        if_none_match: Option<&str>,
    ) -> Result<TileOutcome, TileError> {
        let addr = match TileAddress::parse(path) {
            Ok(addr) => addr,
            Err(err) => {
                debug!(path, %err, "bad tile address");
                return Ok(self.missing_or_not_modified(if_none_match));
            }
        };
        self.get_tile(addr, if_none_match).await
    }

    /// Resolve one tile address in the output pyramid's logical numbering.
    pub async fn get_tile(
        &self,
        addr: TileAddress,
        if_none_match: Option<&str>,
    ) -> Result<TileOutcome, TileError> {
        // Bounds in the output pyramid, then the same tile translated into
        // the input pyramid's numbering. Either failing means the tile does
        // not exist, and the source is never consulted.
        let input_addr = translate(addr, &self.config.output, &self.config.output)
            .and_then(|_| translate(addr, &self.config.output, &self.config.input));
        let input_addr = match input_addr {
            Ok(a) if addr.extra < self.config.output.size.z => a,
            _ => {
                debug!(
                    level = addr.level,
                    row = addr.row,
                    col = addr.col,
                    "address outside the pyramid"
                );
                return Ok(self.missing_or_not_modified(if_none_match));
            }
        };

        // Fetch failure degrades to missing; the upstream owns its own retry
        // policy.
        let source_tile = match self
            .source
            .fetch_tile(&input_addr, self.config.max_input_size)
            .await
        {
            Ok(tile) => tile,
            Err(err @ UpstreamError::TooLarge { .. }) => {
                warn!(%err, "source tile over the input limit");
                return Ok(self.missing_or_not_modified(if_none_match));
            }
            Err(err) => {
                debug!(%err, "source fetch failed");
                return Ok(self.missing_or_not_modified(if_none_match));
            }
        };

        // A source tag carrying the missing flag marks the canonical empty
        // tile; short-circuit before any codec work.
        let source_tag = source_tile.etag.as_deref().and_then(from_base32);
        if let Some((_, true)) = source_tag {
            return Ok(self.missing_or_not_modified(if_none_match));
        }
        if source_tile.etag.as_deref() == Some(self.config.empty_etag.as_str()) {
            return Ok(self.missing_or_not_modified(if_none_match));
        }

        // The upstream promised a tile; an unknown signature is its fault,
        // not a missing tile.
        let source_format = ImageFormat::sniff(&source_tile.data)
            .ok_or(TileError::Codec(CodecError::UnknownSignature))?;

        let tag = derive_tag(
            self.config.seed,
            source_tag.map(|(v, _)| v),
            &source_tile.data,
        );
        let etag = to_base32(tag, false);
        if if_none_match == Some(etag.as_str()) {
            return Ok(TileOutcome::NotModified);
        }

        // Straight passthrough: same format, same datatype, forward the
        // compressed bytes untouched.
        let needs_convert = self.config.input.datatype != self.config.output.datatype;
        if source_format == self.config.output_format && !needs_convert {
            return Ok(TileOutcome::Tile(TileResponse {
                data: source_tile.data,
                etag,
                mime: self.config.output_format.mime(),
            }));
        }

        // Decode into a tightly packed buffer in the input datatype.
        let encode_params = self.config.encode_params();
        let decode_params = CodecParams {
            line_stride: self.config.input.row_bytes(),
            format: encode_params.format,
        };
        let mut raw = vec![0u8; self.config.input.tile_bytes()];
        if let Err(err) = decode_tile(
            source_format,
            &decode_params,
            &self.config.input,
            &source_tile.data,
            &mut raw,
        ) {
            warn!(
                level = addr.level,
                row = addr.row,
                col = addr.col,
                %err,
                "source tile failed to decode"
            );
            return Ok(TileOutcome::NotFound);
        }

        // validate() guarantees the LUT exists when the datatypes differ.
        let raw = match (&self.config.lut, needs_convert) {
            (Some(lut), true) => convert(
                lut,
                self.config.input.datatype,
                self.config.output.datatype,
                raw,
            )?,
            _ => raw,
        };

        let data = encode_tile(
            self.config.output_format,
            &encode_params,
            &self.config.output,
            &raw,
        )?;

        Ok(TileOutcome::Tile(TileResponse {
            data,
            etag,
            mime: self.config.output_format.mime(),
        }))
    }

    /// Missing-tile outcome, honoring a conditional tag that already holds
    /// the sentinel.
    fn missing_or_not_modified(&self, if_none_match: Option<&str>) -> TileOutcome {
        if if_none_match == Some(self.config.empty_etag.as_str()) {
            TileOutcome::NotModified
        } else {
            TileOutcome::Missing
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
