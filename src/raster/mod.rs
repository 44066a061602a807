//! Pyramid model.
//!
//! Pure data and geometry for tiled raster pyramids: pixel datatypes,
//! raster extents, derived level tables, and tile addressing across
//! pyramids with skipped top levels. Leaf dependency for everything else
//! in the crate; nothing here performs I/O.

mod address;
mod datatype;
mod geometry;

pub use address::{translate, TileAddress};
pub use datatype::DataType;
pub use geometry::{build_levels, BoundingBox, Level, RasterGeometry, Size};
