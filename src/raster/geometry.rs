//! Tiled raster geometry and pyramid level derivation.
//!
//! A [`RasterGeometry`] describes one tile pyramid: full-resolution extent,
//! tile (page) size, pixel datatype, and the number of top levels skipped
//! from external addressing. The level table is derived once at construction
//! and the geometry is immutable afterwards, shared read-only across
//! requests.
//!
//! # Level Numbering
//!
//! Levels are stored coarsest first: index 0 is the single-tile top of the
//! pyramid, index `n_levels - 1` is the full-resolution base. Each level
//! halves the tile grid of the level below it (rounding up), so the table
//! always collapses to exactly one tile at index 0.

use crate::error::ConfigError;

// =============================================================================
// Size and bounding box
// =============================================================================

/// Raster extent in pixels plus slice and channel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub c: i64,
}

impl Size {
    pub const fn new(x: i64, y: i64, z: i64, c: i64) -> Self {
        Self { x, y, z, c }
    }

    /// Parse "x y", "x y z" or "x y z c" with whitespace separators.
    ///
    /// The channel count defaults to 3 and the slice count to 1 when the
    /// optional fields are absent.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let err = |reason| ConfigError::InvalidSize {
            directive: value.to_string(),
            reason,
        };

        let fields: Vec<i64> = value
            .split_whitespace()
            .map(|tok| tok.parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|_| err("not an integer"))?;

        if fields.len() < 2 {
            return Err(err("values missing"));
        }
        if fields.len() > 4 {
            return Err(err("too many values, expected at most four"));
        }

        let x = fields[0];
        let y = fields[1];
        let z = fields.get(2).copied().unwrap_or(1);
        let c = fields.get(3).copied().unwrap_or(3);
        if x <= 0 || y <= 0 || z <= 0 || c <= 0 {
            return Err(err("values must be positive"));
        }

        Ok(Size { x, y, z, c })
    }
}

/// Geographic bounding box, used only to seed per-level resolutions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 1.0,
            ymax: 1.0,
        }
    }
}

impl BoundingBox {
    /// Parse "xmin,ymin,xmax,ymax".
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = value.split(',').collect();
        if parts.len() != 4 {
            return Err(ConfigError::InvalidBoundingBox {
                value: value.to_string(),
            });
        }
        let mut nums = [0.0f64; 4];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidBoundingBox {
                    value: value.to_string(),
                })?;
        }
        Ok(Self {
            xmin: nums[0],
            ymin: nums[1],
            xmax: nums[2],
            ymax: nums[3],
        })
    }
}

// =============================================================================
// Pyramid levels
// =============================================================================

use super::datatype::DataType;

/// One pyramid level: per-pixel resolution and tile grid extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    /// Resolution in bounding-box units per pixel, X axis
    pub rx: f64,

    /// Resolution in bounding-box units per pixel, Y axis
    pub ry: f64,

    /// Tile grid width, in tiles
    pub tiles_wide: i64,

    /// Tile grid height, in tiles
    pub tiles_high: i64,
}

/// Build the level table for a geometry.
///
/// The base level's grid is `ceil(size / page_size)` per axis. The number of
/// levels is enough halvings to shrink the larger grid dimension to one tile,
/// plus the base itself: `2 + floor(log2(max(w, h) - 1))`, or 1 when the
/// base grid is already a single tile. Levels are filled base-up so index 0
/// is the coarsest.
///
/// Pure and deterministic: the same inputs always produce the same table.
pub fn build_levels(
    size: Size,
    page_size: Size,
    bbox: BoundingBox,
) -> Result<Vec<Level>, ConfigError> {
    if size.x <= 0 || size.y <= 0 || size.z <= 0 || size.c <= 0 {
        return Err(ConfigError::InvalidGeometry {
            reason: format!(
                "raster extents must be positive, got {}x{}x{}x{}",
                size.x, size.y, size.z, size.c
            ),
        });
    }
    if page_size.x <= 0 || page_size.y <= 0 || page_size.c <= 0 {
        return Err(ConfigError::InvalidGeometry {
            reason: format!(
                "page extents must be positive, got {}x{}x{}",
                page_size.x, page_size.y, page_size.c
            ),
        });
    }
    if page_size.z != 1 {
        return Err(ConfigError::InvalidGeometry {
            reason: format!("page size z must be 1, got {}", page_size.z),
        });
    }

    let mut level = Level {
        rx: (bbox.xmax - bbox.xmin) / size.x as f64,
        ry: (bbox.ymax - bbox.ymin) / size.y as f64,
        tiles_wide: 1 + (size.x - 1) / page_size.x,
        tiles_high: 1 + (size.y - 1) / page_size.y,
    };

    let largest = level.tiles_wide.max(level.tiles_high) as u64;
    let n_levels = if largest <= 1 {
        1
    } else {
        2 + (largest - 1).ilog2() as usize
    };

    // Fill from the bottom up so index 0 is the single-tile top.
    let mut levels = vec![level; n_levels];
    for slot in levels.iter_mut().rev() {
        *slot = level;
        level.tiles_wide = 1 + (level.tiles_wide - 1) / 2;
        level.tiles_high = 1 + (level.tiles_high - 1) / 2;
        level.rx *= 2.0;
        level.ry *= 2.0;
    }

    // The pyramid has to collapse to exactly one tile on top.
    let top = levels[0];
    if top.tiles_wide * top.tiles_high != 1 {
        return Err(ConfigError::InvalidGeometry {
            reason: format!(
                "top level is {}x{} tiles, expected 1x1",
                top.tiles_wide, top.tiles_high
            ),
        });
    }

    Ok(levels)
}

// =============================================================================
// RasterGeometry
// =============================================================================

/// Immutable description of one tile pyramid.
///
/// Built once from configuration and shared read-only for the lifetime of
/// the serving process.
#[derive(Debug, Clone)]
pub struct RasterGeometry {
    /// Full-resolution extent and channel count
    pub size: Size,

    /// Tile extent
    pub page_size: Size,

    /// Pixel sample datatype
    pub datatype: DataType,

    /// Number of top pyramid levels omitted from logical addressing
    pub skip: usize,

    /// Geographic extent
    pub bbox: BoundingBox,

    /// Derived level table, coarsest first
    levels: Vec<Level>,
}

impl RasterGeometry {
    pub fn new(
        size: Size,
        page_size: Size,
        datatype: DataType,
        skip: usize,
        bbox: BoundingBox,
    ) -> Result<Self, ConfigError> {
        let levels = build_levels(size, page_size, bbox)?;
        if skip >= levels.len() {
            return Err(ConfigError::InvalidGeometry {
                reason: format!(
                    "skip {} must be less than the {} pyramid levels",
                    skip,
                    levels.len()
                ),
            });
        }
        Ok(Self {
            size,
            page_size,
            datatype,
            skip,
            bbox,
            levels,
        })
    }

    /// Total number of levels, including skipped ones.
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Level table, coarsest first. Index 0 is the single-tile top.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Look up a level by absolute (non-skip-adjusted) index.
    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Bytes in one tightly packed tile row.
    pub fn row_bytes(&self) -> usize {
        (self.page_size.x * self.page_size.c) as usize * self.datatype.size()
    }

    /// Bytes in one tightly packed decoded tile.
    pub fn tile_bytes(&self) -> usize {
        self.row_bytes() * self.page_size.y as usize
    }
}

// =============================================================================
// Tests
// =============================================================================
