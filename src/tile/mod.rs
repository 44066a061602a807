//! Tile resolution pipeline.
//!
//! Ties the pyramid model, codecs and conversion engine together: resolve a
//! requested tile address, fetch the source tile, convert it, and compute
//! the identity tag a response collaborator needs for conditional requests.

mod etag;
mod pipeline;
mod source;

pub use etag::{derive_tag, fold_tag, from_base32, to_base32, ETAG_LEN};
pub use pipeline::{ConvertConfig, TileConverter, TileOutcome, TileResponse};
pub use source::{FsTileSource, SourceTile, TileSource};
