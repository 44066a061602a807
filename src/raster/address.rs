//! Tile addressing and translation between pyramids.

use crate::error::TileError;

use super::geometry::RasterGeometry;

/// Logical tile address in a pyramid's skip-adjusted numbering.
///
/// Request-scoped: parsed from a path, validated, translated between the
/// output and input pyramids, and discarded when the request completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAddress {
    /// Pyramid level in logical numbering (0 = coarsest visible level)
    pub level: i64,

    /// Tile row, 0-indexed from the top
    pub row: i64,

    /// Tile column, 0-indexed from the left
    pub col: i64,

    /// Extra dimension index (slice), 0 for flat rasters
    pub extra: i64,
}

impl TileAddress {
    pub const fn new(level: i64, row: i64, col: i64) -> Self {
        Self {
            level,
            row,
            col,
            extra: 0,
        }
    }

    /// Parse the tail of a request path as a tile address.
    ///
    /// Accepts `level/row/col` or `extra/level/row/col`; leading path
    /// segments before the numeric tail are ignored. Any non-numeric or
    /// negative segment inside the tail is a bad address, which the
    /// pipeline resolves to the missing-tile outcome.
    pub fn parse(path: &str) -> Result<Self, TileError> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if segments.len() < 3 {
            return Err(TileError::BadAddress(format!(
                "expected at least level/row/col, got {:?}",
                path
            )));
        }

        // The numeric tail: up to four trailing segments that all parse.
        let tail_len = if segments.len() >= 4 && segments[segments.len() - 4].parse::<i64>().is_ok()
        {
            4
        } else {
            3
        };
        let tail = &segments[segments.len() - tail_len..];

        let mut values = [0i64; 4];
        for (slot, seg) in values.iter_mut().zip(tail.iter().rev()) {
            // values: [col, row, level, extra]
            *slot = seg
                .parse::<i64>()
                .map_err(|_| TileError::BadAddress(format!("non-numeric segment {:?}", seg)))?;
        }

        let addr = TileAddress {
            col: values[0],
            row: values[1],
            level: values[2],
            extra: if tail_len == 4 { values[3] } else { 0 },
        };

        if addr.level < 0 || addr.row < 0 || addr.col < 0 || addr.extra < 0 {
            return Err(TileError::BadAddress(format!(
                "negative component in {:?}",
                path
            )));
        }

        Ok(addr)
    }
}

/// Translate an address from one pyramid's logical numbering to another's.
///
/// The logical level is converted to the absolute pyramid level by adding
/// the source geometry's skip, then back to the target's logical numbering
/// by subtracting its skip. The row and column are bounds-checked against
/// the target level's tile grid.
///
/// Translating an in-bounds address from A to B and back to A yields the
/// original address.
pub fn translate(
    addr: TileAddress,
    from: &RasterGeometry,
    to: &RasterGeometry,
) -> Result<TileAddress, TileError> {
    let out_of_bounds = TileError::OutOfBounds {
        level: addr.level,
        row: addr.row,
        col: addr.col,
    };

    let absolute = addr.level + from.skip as i64;
    let level = absolute - to.skip as i64;
    if level < 0 || absolute < 0 || absolute as usize >= to.n_levels() {
        return Err(out_of_bounds);
    }

    let grid = match to.level(absolute as usize) {
        Some(l) => l,
        None => return Err(out_of_bounds),
    };
    if addr.row >= grid.tiles_high || addr.col >= grid.tiles_wide || addr.row < 0 || addr.col < 0 {
        return Err(out_of_bounds);
    }

    Ok(TileAddress {
        level,
        row: addr.row,
        col: addr.col,
        extra: addr.extra,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BoundingBox, DataType, Size};

    fn geometry(skip: usize) -> RasterGeometry {
        RasterGeometry::new(
            Size::new(100000, 60000, 1, 3),
            Size::new(512, 512, 1, 3),
            DataType::Byte,
            skip,
            BoundingBox::default(),
        )
        .unwrap()
    }

    // -------------------------------------------------------------------------
    // Parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_level_row_col() {
        let addr = TileAddress::parse("/tiles/3/7/11").unwrap();
        assert_eq!(addr, TileAddress::new(3, 7, 11));
    }

    #[test]
    fn test_parse_with_extra_dimension() {
        let addr = TileAddress::parse("/tiles/layer/2/3/7/11").unwrap();
        assert_eq!(addr.extra, 2);
        assert_eq!(addr.level, 3);
        assert_eq!(addr.row, 7);
        assert_eq!(addr.col, 11);
    }

    #[test]
    fn test_parse_ignores_prefix() {
        let addr = TileAddress::parse("/service/v1/out/0/0/0").unwrap();
        assert_eq!(addr, TileAddress::new(0, 0, 0));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(TileAddress::parse("/tiles/a/b/c").is_err());
        assert!(TileAddress::parse("/tiles/1/2/x").is_err());
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(TileAddress::parse("/tiles/1/-2/3").is_err());
    }

    #[test]
    fn test_parse_rejects_short_path() {
        assert!(TileAddress::parse("/1/2").is_err());
        assert!(TileAddress::parse("").is_err());
    }

    // -------------------------------------------------------------------------
    // Translation
    // -------------------------------------------------------------------------

    #[test]
    fn test_translate_same_skip_is_identity() {
        let geom = geometry(0);
        let addr = TileAddress::new(2, 1, 1);
        let translated = translate(addr, &geom, &geom).unwrap();
        assert_eq!(translated, addr);
    }

    #[test]
    fn test_translate_skip_adjusts_level() {
        let out = geometry(2);
        let input = geometry(0);
        // Logical level 0 of the skip-2 pyramid is absolute level 2.
        let addr = TileAddress::new(0, 0, 0);
        let translated = translate(addr, &out, &input).unwrap();
        assert_eq!(translated.level, 2);
    }

    #[test]
    fn test_translate_round_trip() {
        let a = geometry(2);
        let b = geometry(0);
        let addr = TileAddress::new(3, 2, 5);
        let there = translate(addr, &a, &b).unwrap();
        let back = translate(there, &b, &a).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_translate_out_of_range_level() {
        let geom = geometry(0);
        let addr = TileAddress::new(geom.n_levels() as i64 + 1, 0, 0);
        assert!(matches!(
            translate(addr, &geom, &geom),
            Err(TileError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_translate_out_of_range_row_col() {
        let geom = geometry(0);
        // Level 0 is a single tile.
        assert!(translate(TileAddress::new(0, 1, 0), &geom, &geom).is_err());
        assert!(translate(TileAddress::new(0, 0, 1), &geom, &geom).is_err());
    }

    #[test]
    fn test_translate_edge_tile_in_bounds() {
        let geom = geometry(0);
        let base = geom.levels()[geom.n_levels() - 1];
        let addr = TileAddress::new(
            geom.n_levels() as i64 - 1,
            base.tiles_high - 1,
            base.tiles_wide - 1,
        );
        assert!(translate(addr, &geom, &geom).is_ok());
    }
}
