//! Pixel sample datatypes.

use crate::error::ConfigError;

/// Pixel value datatype of a raster.
///
/// The set follows the usual raster conventions: unsigned and signed
/// integers up to 32 bits plus the two IEEE float widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Eight bit unsigned integer
    Byte,
    /// Sixteen bit unsigned integer
    UInt16,
    /// Sixteen bit signed integer
    Int16,
    /// Thirty two bit unsigned integer
    UInt32,
    /// Thirty two bit signed integer
    Int32,
    /// Thirty two bit floating point
    Float32,
    /// Sixty four bit floating point
    Float64,
}

impl DataType {
    /// Size of one sample in bytes.
    pub const fn size(&self) -> usize {
        match self {
            DataType::Byte => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    /// Parse a datatype name, case insensitive, with the common aliases.
    ///
    /// `None` defaults to `Byte`, matching the behavior of raster
    /// configurations that omit the directive.
    pub fn parse(name: Option<&str>) -> Result<Self, ConfigError> {
        let name = match name {
            None => return Ok(DataType::Byte),
            Some(n) => n,
        };

        match name.to_ascii_lowercase().as_str() {
            "byte" | "uint8" | "char" => Ok(DataType::Byte),
            "uint16" => Ok(DataType::UInt16),
            "int16" | "short" => Ok(DataType::Int16),
            "uint32" => Ok(DataType::UInt32),
            "int32" | "int" => Ok(DataType::Int32),
            "float32" | "float" => Ok(DataType::Float32),
            "float64" | "double" => Ok(DataType::Float64),
            _ => Err(ConfigError::UnknownDataType {
                name: name.to_string(),
            }),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DataType::Byte.size(), 1);
        assert_eq!(DataType::UInt16.size(), 2);
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::UInt32.size(), 4);
        assert_eq!(DataType::Int32.size(), 4);
        assert_eq!(DataType::Float32.size(), 4);
        assert_eq!(DataType::Float64.size(), 8);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(DataType::parse(Some("UINT16")).unwrap(), DataType::UInt16);
        assert_eq!(DataType::parse(Some("uint16")).unwrap(), DataType::UInt16);
        assert_eq!(DataType::parse(Some("Int16")).unwrap(), DataType::Int16);
        assert_eq!(DataType::parse(Some("Float32")).unwrap(), DataType::Float32);
        assert_eq!(DataType::parse(Some("Float64")).unwrap(), DataType::Float64);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(DataType::parse(Some("char")).unwrap(), DataType::Byte);
        assert_eq!(DataType::parse(Some("short")).unwrap(), DataType::Int16);
        assert_eq!(DataType::parse(Some("int")).unwrap(), DataType::Int32);
        assert_eq!(DataType::parse(Some("float")).unwrap(), DataType::Float32);
        assert_eq!(DataType::parse(Some("double")).unwrap(), DataType::Float64);
    }

    #[test]
    fn test_parse_default() {
        assert_eq!(DataType::parse(None).unwrap(), DataType::Byte);
    }

    #[test]
    fn test_parse_unknown() {
        let result = DataType::parse(Some("complex64"));
        assert!(matches!(result, Err(ConfigError::UnknownDataType { .. })));
    }
}
