//! Raw (undecoded) sample arrays as produced by the I/O layer.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A single raw sample of one of the numeric storage kinds.
///
/// `to_f64_unsigned` reinterprets the bit pattern of signed integers as
/// unsigned, which is how `_Unsigned = "true"` data is widened.
pub trait Sample: Copy + ToPrimitive {
    const DATA_TYPE: DataType;

    fn to_f64_signed(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    fn to_f64_unsigned(self) -> f64;
}

macro_rules! impl_sample_signed {
    ($($ty:ty => $uty:ty, $dt:ident);* $(;)?) => {
        $(
            impl Sample for $ty {
                const DATA_TYPE: DataType = DataType::$dt;

                fn to_f64_unsigned(self) -> f64 {
                    (self as $uty) as f64
                }
            }
        )*
    };
}

macro_rules! impl_sample_plain {
    ($($ty:ty => $dt:ident);* $(;)?) => {
        $(
            impl Sample for $ty {
                const DATA_TYPE: DataType = DataType::$dt;

                fn to_f64_unsigned(self) -> f64 {
                    self.to_f64_signed()
                }
            }
        )*
    };
}

impl_sample_signed!(
    i8 => u8, Byte;
    i16 => u16, Short;
    i32 => u32, Int;
    i64 => u64, Long;
);

impl_sample_plain!(
    u8 => UByte;
    u16 => UShort;
    u32 => UInt;
    u64 => ULong;
    f32 => Float;
    f64 => Double;
);

/// Flat, row-major raw values of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawArray {
    Byte(Vec<i8>),
    UByte(Vec<u8>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Long(Vec<i64>),
    ULong(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// Character data; the last dimension is the string length.
    Char(Vec<u8>),
    String(Vec<String>),
}

fn to_f64_all<T: Sample>(values: &[T], unsigned: bool) -> Vec<f64> {
    if unsigned {
        values.iter().map(|&v| v.to_f64_unsigned()).collect()
    } else {
        values.iter().map(|&v| v.to_f64_signed()).collect()
    }
}

impl RawArray {
    pub fn data_type(&self) -> DataType {
        match self {
            RawArray::Byte(_) => DataType::Byte,
            RawArray::UByte(_) => DataType::UByte,
            RawArray::Short(_) => DataType::Short,
            RawArray::UShort(_) => DataType::UShort,
            RawArray::Int(_) => DataType::Int,
            RawArray::UInt(_) => DataType::UInt,
            RawArray::Long(_) => DataType::Long,
            RawArray::ULong(_) => DataType::ULong,
            RawArray::Float(_) => DataType::Float,
            RawArray::Double(_) => DataType::Double,
            RawArray::Char(_) => DataType::Char,
            RawArray::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawArray::Byte(v) => v.len(),
            RawArray::UByte(v) => v.len(),
            RawArray::Short(v) => v.len(),
            RawArray::UShort(v) => v.len(),
            RawArray::Int(v) => v.len(),
            RawArray::UInt(v) => v.len(),
            RawArray::Long(v) => v.len(),
            RawArray::ULong(v) => v.len(),
            RawArray::Float(v) => v.len(),
            RawArray::Double(v) => v.len(),
            RawArray::Char(v) => v.len(),
            RawArray::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the samples are numeric.
    pub fn is_numeric(&self) -> bool {
        self.data_type().is_numeric()
    }

    /// Widen every numeric sample to `f64`.
    ///
    /// With `unsigned` set, signed integer bit patterns are reinterpreted as
    /// unsigned first. Returns `None` for character and string data.
    pub fn to_f64_vec(&self, unsigned: bool) -> Option<Vec<f64>> {
        let out = match self {
            RawArray::Byte(v) => to_f64_all(v, unsigned),
            RawArray::UByte(v) => to_f64_all(v, unsigned),
            RawArray::Short(v) => to_f64_all(v, unsigned),
            RawArray::UShort(v) => to_f64_all(v, unsigned),
            RawArray::Int(v) => to_f64_all(v, unsigned),
            RawArray::UInt(v) => to_f64_all(v, unsigned),
            RawArray::Long(v) => to_f64_all(v, unsigned),
            RawArray::ULong(v) => to_f64_all(v, unsigned),
            RawArray::Float(v) => to_f64_all(v, unsigned),
            RawArray::Double(v) => to_f64_all(v, unsigned),
            RawArray::Char(_) | RawArray::String(_) => return None,
        };
        Some(out)
    }

    /// Interpret character data as fixed-length strings of `strlen` bytes.
    ///
    /// Trailing NULs are stripped. String arrays are returned as-is.
    pub fn to_strings(&self, strlen: usize) -> Option<Vec<String>> {
        match self {
            RawArray::String(v) => Some(v.clone()),
            RawArray::Char(bytes) if strlen > 0 => Some(
                bytes
                    .chunks(strlen)
                    .map(|chunk| {
                        String::from_utf8_lossy(chunk)
                            .trim_end_matches('\0')
                            .to_string()
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for RawArray {
                fn from(v: Vec<$ty>) -> Self {
                    RawArray::$variant(v)
                }
            }
        )*
    };
}

impl_from_vec!(
    i8 => Byte,
    u8 => UByte,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    String => String,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_unsigned_reinterpretation() {
        assert_eq!((-1i8).to_f64_unsigned(), 255.0);
        assert_eq!((-1i8).to_f64_signed(), -1.0);
        assert_eq!((-2i16).to_f64_unsigned(), 65534.0);
        assert_eq!((-1i32).to_f64_unsigned(), 4294967295.0);
        assert_eq!(200u8.to_f64_unsigned(), 200.0);
        assert_eq!(1.5f32.to_f64_unsigned(), 1.5);
    }

    #[test]
    fn test_to_f64_vec() {
        let raw = RawArray::from(vec![-1i8, 0, 127]);
        assert_eq!(raw.to_f64_vec(false), Some(vec![-1.0, 0.0, 127.0]));
        assert_eq!(raw.to_f64_vec(true), Some(vec![255.0, 0.0, 127.0]));
        assert_eq!(RawArray::Char(b"ab".to_vec()).to_f64_vec(false), None);
    }

    #[test]
    fn test_to_strings() {
        let raw = RawArray::Char(b"KDEN\0\0KTLX\0\0".to_vec());
        assert_eq!(
            raw.to_strings(6),
            Some(vec!["KDEN".to_string(), "KTLX".to_string()])
        );
    }
}
