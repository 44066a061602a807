//! Upstream tile sources.
//!
//! The pipeline fetches source tiles through the [`TileSource`] trait so the
//! conversion core never knows where compressed bytes come from. The crate
//! ships a filesystem-backed implementation; service embedders provide their
//! own for HTTP or object-store backends.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::UpstreamError;
use crate::raster::TileAddress;

/// One fetched source tile: compressed payload plus the source's own
/// identity tag, when it published one.
#[derive(Debug, Clone)]
pub struct SourceTile {
    pub data: Bytes,
    pub etag: Option<String>,
}

/// Abstract provider of compressed source tiles.
///
/// Implementations must be safe to share across concurrent requests; the
/// pipeline holds one instance for its lifetime and calls it from many
/// tasks at once.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch the compressed tile at `addr` in the input pyramid's logical
    /// numbering.
    ///
    /// `max_size` is the caller's input size limit; implementations should
    /// fail with [`UpstreamError::TooLarge`] rather than returning a larger
    /// payload.
    async fn fetch_tile(&self, addr: &TileAddress, max_size: usize)
        -> Result<SourceTile, UpstreamError>;
}

// =============================================================================
// Filesystem source
// =============================================================================

/// Tile source reading from a local directory laid out `level/row/col`.
///
/// Mostly useful for the command-line tool and for tests; a production
/// deployment would front an object store or a tile server instead.
#[derive(Debug, Clone)]
pub struct FsTileSource {
    root: PathBuf,
}

impl FsTileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn tile_path(&self, addr: &TileAddress) -> PathBuf {
        let mut path = self.root.clone();
        if addr.extra != 0 {
            path.push(addr.extra.to_string());
        }
        path.push(addr.level.to_string());
        path.push(addr.row.to_string());
        path.push(addr.col.to_string());
        path
    }
}

#[async_trait]
impl TileSource for FsTileSource {
    async fn fetch_tile(
        &self,
        addr: &TileAddress,
        max_size: usize,
    ) -> Result<SourceTile, UpstreamError> {
        let path = self.tile_path(addr);

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UpstreamError::NotFound(path.display().to_string())
            } else {
                UpstreamError::Fetch(format!("{}: {}", path.display(), e))
            }
        })?;

        let meta = file
            .metadata()
            .await
            .map_err(|e| UpstreamError::Fetch(format!("{}: {}", path.display(), e)))?;
        let size = meta.len() as usize;
        if size > max_size {
            return Err(UpstreamError::TooLarge {
                size,
                limit: max_size,
            });
        }

        let mut data = Vec::with_capacity(size);
        file.read_to_end(&mut data)
            .await
            .map_err(|e| UpstreamError::Fetch(format!("{}: {}", path.display(), e)))?;

        // A local file carries no tag of its own; the pipeline derives one
        // from the payload.
        Ok(SourceTile {
            data: Bytes::from(data),
            etag: None,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
