//! Buffer rewriting between pixel datatypes.
//!
//! [`convert`] walks a raw pixel buffer sample by sample, remaps each value
//! through the LUT, and writes the result in the destination datatype.
//! Integer destinations truncate; no clamping happens beyond what the LUT's
//! zero final slope already provides. Supported `(from, to)` pairs form an
//! explicit allow-list checked at configuration time.

use crate::error::{ConfigError, ConvertError};
use crate::raster::DataType;

use super::lut::Lut;

// =============================================================================
// Sample trait
// =============================================================================

/// A pixel sample type the conversion engine can read and write.
pub trait Sample: Copy {
    const DATA_TYPE: DataType;
    const SIZE: usize;

    fn from_ne(bytes: &[u8]) -> Self;
    fn write_ne(self, bytes: &mut [u8]);
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_sample {
    ($ty:ty, $dt:expr) => {
        impl Sample for $ty {
            const DATA_TYPE: DataType = $dt;
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn from_ne(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_ne_bytes(raw)
            }

            #[inline]
            fn write_ne(self, bytes: &mut [u8]) {
                bytes[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
        }
    };
}

impl_sample!(u8, DataType::Byte);
impl_sample!(u16, DataType::UInt16);
impl_sample!(i16, DataType::Int16);
impl_sample!(u32, DataType::UInt32);
impl_sample!(i32, DataType::Int32);
impl_sample!(f32, DataType::Float32);
impl_sample!(f64, DataType::Float64);

// =============================================================================
// Conversion matrix
// =============================================================================

/// The allow-list of supported datatype conversions.
///
/// Identity pairs are always supported; beyond those, only the downward
/// remaps a piecewise-linear LUT can express without resampling. Requesting
/// an unlisted pair is a configuration error, never a per-tile fault.
const CONVERSION_MATRIX: &[(DataType, DataType)] = &[
    (DataType::UInt16, DataType::Byte),
    (DataType::Int16, DataType::Byte),
    (DataType::UInt32, DataType::Byte),
    (DataType::UInt32, DataType::UInt16),
    (DataType::Float32, DataType::Byte),
    (DataType::Float64, DataType::Float32),
];

/// Whether a `(from, to)` pair is in the conversion matrix.
pub fn is_supported(from: DataType, to: DataType) -> bool {
    from == to || CONVERSION_MATRIX.contains(&(from, to))
}

/// Validate a pair at configuration time.
pub fn check_supported(from: DataType, to: DataType) -> Result<(), ConfigError> {
    if is_supported(from, to) {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedConversion { from, to })
    }
}

// =============================================================================
// Buffer conversion
// =============================================================================

/// Rewrite `buffer` from `from` samples to `to` samples through the LUT.
///
/// When the destination element is no larger than the source element the
/// input allocation is reused (samples are rewritten front to back, which
/// never overtakes unread input); a growing conversion allocates a fresh
/// buffer. The returned vector's length is the converted sample count times
/// the destination element size.
pub fn convert(
    lut: &Lut,
    from: DataType,
    to: DataType,
    buffer: Vec<u8>,
) -> Result<Vec<u8>, ConvertError> {
    if !is_supported(from, to) {
        return Err(ConvertError::Unsupported { from, to });
    }

    match (from, to) {
        (DataType::Byte, _) => dispatch_dst::<u8>(lut, to, buffer),
        (DataType::UInt16, _) => dispatch_dst::<u16>(lut, to, buffer),
        (DataType::Int16, _) => dispatch_dst::<i16>(lut, to, buffer),
        (DataType::UInt32, _) => dispatch_dst::<u32>(lut, to, buffer),
        (DataType::Int32, _) => dispatch_dst::<i32>(lut, to, buffer),
        (DataType::Float32, _) => dispatch_dst::<f32>(lut, to, buffer),
        (DataType::Float64, _) => dispatch_dst::<f64>(lut, to, buffer),
    }
}

fn dispatch_dst<S: Sample>(
    lut: &Lut,
    to: DataType,
    buffer: Vec<u8>,
) -> Result<Vec<u8>, ConvertError> {
    match to {
        DataType::Byte => convert_typed::<S, u8>(lut, buffer),
        DataType::UInt16 => convert_typed::<S, u16>(lut, buffer),
        DataType::Int16 => convert_typed::<S, i16>(lut, buffer),
        DataType::UInt32 => convert_typed::<S, u32>(lut, buffer),
        DataType::Int32 => convert_typed::<S, i32>(lut, buffer),
        DataType::Float32 => convert_typed::<S, f32>(lut, buffer),
        DataType::Float64 => convert_typed::<S, f64>(lut, buffer),
    }
}

fn convert_typed<S: Sample, D: Sample>(
    lut: &Lut,
    mut buffer: Vec<u8>,
) -> Result<Vec<u8>, ConvertError> {
    if buffer.len() % S::SIZE != 0 {
        return Err(ConvertError::MisalignedBuffer {
            len: buffer.len(),
            size: S::SIZE,
        });
    }
    let count = buffer.len() / S::SIZE;

    if D::SIZE <= S::SIZE {
        // In place: the write cursor never passes the read cursor.
        for i in 0..count {
            let value = S::from_ne(&buffer[i * S::SIZE..]).to_f64();
            let mapped = D::from_f64(lut.lookup(value));
            mapped.write_ne(&mut buffer[i * D::SIZE..]);
        }
        buffer.truncate(count * D::SIZE);
        Ok(buffer)
    } else {
        let mut out = vec![0u8; count * D::SIZE];
        for i in 0..count {
            let value = S::from_ne(&buffer[i * S::SIZE..]).to_f64();
            let mapped = D::from_f64(lut.lookup(value));
            mapped.write_ne(&mut out[i * D::SIZE..]);
        }
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================
