//! Numeric data types and the promotion lattice.
//!
//! Every numeric kind has a fixed rank used for widening decisions:
//!
//! ```text
//! Byte < UByte < Short < UShort < Int < UInt < Long < ULong < Float < Double
//!   0      1       2       3       4     5      6      7       8       9
//! ```
//!
//! Non-numeric kinds (`Char`, `String`) and absent types rank below all of
//! these, so they never win a promotion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared storage type of a variable or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Signed 8-bit integer.
    Byte,
    /// Unsigned 8-bit integer.
    UByte,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit integer.
    UShort,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    UInt,
    /// Signed 64-bit integer.
    Long,
    /// Unsigned 64-bit integer.
    ULong,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// Single character (fixed-length strings are stored as char arrays).
    Char,
    /// Variable-length string.
    String,
}

/// Rank used for types that do not participate in numeric promotion.
pub const NON_NUMERIC_RANK: i32 = -1;

impl DataType {
    /// Position of this type in the promotion lattice.
    ///
    /// Returns [`NON_NUMERIC_RANK`] for `Char` and `String`.
    pub fn rank(self) -> i32 {
        match self {
            DataType::Byte => 0,
            DataType::UByte => 1,
            DataType::Short => 2,
            DataType::UShort => 3,
            DataType::Int => 4,
            DataType::UInt => 5,
            DataType::Long => 6,
            DataType::ULong => 7,
            DataType::Float => 8,
            DataType::Double => 9,
            DataType::Char | DataType::String => NON_NUMERIC_RANK,
        }
    }

    /// Rank of an optional type; `None` ranks with the non-numeric kinds.
    pub fn rank_of(dt: Option<DataType>) -> i32 {
        dt.map_or(NON_NUMERIC_RANK, DataType::rank)
    }

    /// Lattice join: the wider of two optional types.
    ///
    /// Ties keep `a`. Non-numeric types lose to any numeric one.
    pub fn wider(a: Option<DataType>, b: Option<DataType>) -> Option<DataType> {
        if Self::rank_of(b) > Self::rank_of(a) {
            b
        } else {
            a
        }
    }

    /// Check if this is one of the ten numeric kinds.
    pub fn is_numeric(self) -> bool {
        self.rank() >= 0
    }

    /// Check if this is an integral numeric kind.
    pub fn is_integral(self) -> bool {
        (0..=7).contains(&self.rank())
    }

    /// Check if this is a floating-point kind.
    pub fn is_floating(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Check if this is an unsigned integral kind.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            DataType::UByte | DataType::UShort | DataType::UInt | DataType::ULong
        )
    }

    /// Check if this type holds text.
    pub fn is_string_like(self) -> bool {
        matches!(self, DataType::Char | DataType::String)
    }

    /// The unsigned type with the same width, for signed integral kinds.
    ///
    /// Used when an `_Unsigned = "true"` attribute reinterprets a signed
    /// declaration. Other kinds are returned unchanged.
    pub fn to_unsigned(self) -> DataType {
        match self {
            DataType::Byte => DataType::UByte,
            DataType::Short => DataType::UShort,
            DataType::Int => DataType::UInt,
            DataType::Long => DataType::ULong,
            other => other,
        }
    }

    /// The next larger signed-capable kind that holds the full unsigned range.
    ///
    /// `UByte -> Short`, `UShort -> Int`, `UInt -> Long`, `ULong -> Double`.
    pub fn widen_unsigned(self) -> DataType {
        match self {
            DataType::UByte | DataType::Byte => DataType::Short,
            DataType::UShort | DataType::Short => DataType::Int,
            DataType::UInt | DataType::Int => DataType::Long,
            DataType::ULong | DataType::Long => DataType::Double,
            other => other,
        }
    }

    /// Width in bits of an integral kind.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            DataType::Byte | DataType::UByte => Some(8),
            DataType::Short | DataType::UShort => Some(16),
            DataType::Int | DataType::UInt | DataType::Float => Some(32),
            DataType::Long | DataType::ULong | DataType::Double => Some(64),
            DataType::Char => Some(8),
            DataType::String => None,
        }
    }

    /// Reinterpret a signed integral value of this width as unsigned.
    ///
    /// `-1` stored in a byte becomes `255`. Non-negative values and
    /// floating-point kinds pass through unchanged.
    pub fn unsigned_value(self, value: f64) -> f64 {
        if value >= 0.0 || !self.is_integral() {
            return value;
        }
        match self.bit_width() {
            Some(bits) => value + 2f64.powi(bits as i32),
            None => value,
        }
    }

    /// Parse a CDM or netCDF type name (case-insensitive).
    pub fn from_name(name: &str) -> Option<DataType> {
        match name.trim().to_lowercase().as_str() {
            "byte" | "int8" | "nc_byte" => Some(DataType::Byte),
            "ubyte" | "uint8" | "nc_ubyte" => Some(DataType::UByte),
            "short" | "int16" | "nc_short" => Some(DataType::Short),
            "ushort" | "uint16" | "nc_ushort" => Some(DataType::UShort),
            "int" | "int32" | "nc_int" => Some(DataType::Int),
            "uint" | "uint32" | "nc_uint" => Some(DataType::UInt),
            "long" | "int64" | "nc_int64" => Some(DataType::Long),
            "ulong" | "uint64" | "nc_uint64" => Some(DataType::ULong),
            "float" | "float32" | "nc_float" => Some(DataType::Float),
            "double" | "float64" | "nc_double" => Some(DataType::Double),
            "char" | "nc_char" => Some(DataType::Char),
            "string" | "nc_string" => Some(DataType::String),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::UByte => "ubyte",
            DataType::Short => "short",
            DataType::UShort => "ushort",
            DataType::Int => "int",
            DataType::UInt => "uint",
            DataType::Long => "long",
            DataType::ULong => "ulong",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Char => "char",
            DataType::String => "String",
        }
    }

    /// All numeric kinds in lattice order.
    pub fn numeric_kinds() -> [DataType; 10] {
        [
            DataType::Byte,
            DataType::UByte,
            DataType::Short,
            DataType::UShort,
            DataType::Int,
            DataType::UInt,
            DataType::Long,
            DataType::ULong,
            DataType::Float,
            DataType::Double,
        ]
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_is_total_order() {
        let kinds = DataType::numeric_kinds();
        for (i, dt) in kinds.iter().enumerate() {
            assert_eq!(dt.rank(), i as i32);
        }
        assert_eq!(DataType::Char.rank(), NON_NUMERIC_RANK);
        assert_eq!(DataType::rank_of(None), NON_NUMERIC_RANK);
    }

    #[test]
    fn test_wider() {
        assert_eq!(
            DataType::wider(Some(DataType::Short), Some(DataType::Float)),
            Some(DataType::Float)
        );
        assert_eq!(
            DataType::wider(Some(DataType::Double), Some(DataType::Float)),
            Some(DataType::Double)
        );
        assert_eq!(DataType::wider(None, Some(DataType::Byte)), Some(DataType::Byte));
        assert_eq!(
            DataType::wider(Some(DataType::Int), Some(DataType::String)),
            Some(DataType::Int)
        );
        // ties keep the first argument
        assert_eq!(
            DataType::wider(Some(DataType::Float), Some(DataType::Float)),
            Some(DataType::Float)
        );
    }

    #[test]
    fn test_widen_unsigned() {
        assert_eq!(DataType::UByte.widen_unsigned(), DataType::Short);
        assert_eq!(DataType::UShort.widen_unsigned(), DataType::Int);
        assert_eq!(DataType::UInt.widen_unsigned(), DataType::Long);
        assert_eq!(DataType::ULong.widen_unsigned(), DataType::Double);
        assert_eq!(DataType::Float.widen_unsigned(), DataType::Float);
    }

    #[test]
    fn test_unsigned_value() {
        assert_eq!(DataType::Byte.unsigned_value(-1.0), 255.0);
        assert_eq!(DataType::Short.unsigned_value(-1.0), 65535.0);
        assert_eq!(DataType::Int.unsigned_value(-2.0), 4294967294.0);
        assert_eq!(DataType::Byte.unsigned_value(12.0), 12.0);
        assert_eq!(DataType::Float.unsigned_value(-1.0), -1.0);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(DataType::from_name("SHORT"), Some(DataType::Short));
        assert_eq!(DataType::from_name("uint8"), Some(DataType::UByte));
        assert_eq!(DataType::from_name("nc_double"), Some(DataType::Double));
        assert_eq!(DataType::from_name("quaternion"), None);
    }
}
