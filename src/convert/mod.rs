//! Type conversion engine.
//!
//! Rewrites raw pixel buffers from one numeric datatype to another through
//! a piecewise-linear lookup table with precomputed slopes. The LUT and the
//! conversion matrix are fixed at configuration time; per-tile work is a
//! pure buffer rewrite.

mod lut;
mod sample;

pub use lut::{Lut, LutPoint};
pub use sample::{check_supported, convert, is_supported, Sample};
