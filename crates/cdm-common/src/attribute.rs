//! Typed attributes attached to variables and datasets.

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// Typed value list of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValues {
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
    String(String),
}

impl AttrValues {
    /// Storage type of the values.
    pub fn data_type(&self) -> DataType {
        match self {
            AttrValues::Byte(_) => DataType::Byte,
            AttrValues::UByte(_) => DataType::UByte,
            AttrValues::Short(_) => DataType::Short,
            AttrValues::UShort(_) => DataType::UShort,
            AttrValues::Int(_) => DataType::Int,
            AttrValues::UInt(_) => DataType::UInt,
            AttrValues::Long(_) => DataType::Long,
            AttrValues::ULong(_) => DataType::ULong,
            AttrValues::Float(_) => DataType::Float,
            AttrValues::Double(_) => DataType::Double,
            AttrValues::String(_) => DataType::String,
        }
    }

    /// Number of values; a string counts as one.
    pub fn len(&self) -> usize {
        match self {
            AttrValues::Byte(v) => v.len(),
            AttrValues::UByte(v) => v.len(),
            AttrValues::Short(v) => v.len(),
            AttrValues::UShort(v) => v.len(),
            AttrValues::Int(v) => v.len(),
            AttrValues::UInt(v) => v.len(),
            AttrValues::Long(v) => v.len(),
            AttrValues::ULong(v) => v.len(),
            AttrValues::Float(v) => v.len(),
            AttrValues::Double(v) => v.len(),
            AttrValues::String(_) => 1,
        }
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The i-th value as `f64`, or `None` for strings and out-of-range indices.
    pub fn numeric(&self, i: usize) -> Option<f64> {
        match self {
            AttrValues::Byte(v) => v.get(i).map(|&x| x as f64),
            AttrValues::UByte(v) => v.get(i).map(|&x| x as f64),
            AttrValues::Short(v) => v.get(i).map(|&x| x as f64),
            AttrValues::UShort(v) => v.get(i).map(|&x| x as f64),
            AttrValues::Int(v) => v.get(i).map(|&x| x as f64),
            AttrValues::UInt(v) => v.get(i).map(|&x| x as f64),
            AttrValues::Long(v) => v.get(i).map(|&x| x as f64),
            AttrValues::ULong(v) => v.get(i).map(|&x| x as f64),
            AttrValues::Float(v) => v.get(i).map(|&x| x as f64),
            AttrValues::Double(v) => v.get(i).copied(),
            AttrValues::String(_) => None,
        }
    }
}

macro_rules! impl_from_values {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for AttrValues {
                fn from(v: $ty) -> Self {
                    AttrValues::$variant(vec![v])
                }
            }

            impl From<Vec<$ty>> for AttrValues {
                fn from(v: Vec<$ty>) -> Self {
                    AttrValues::$variant(v)
                }
            }
        )*
    };
}

impl_from_values!(
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
);

impl From<&str> for AttrValues {
    fn from(s: &str) -> Self {
        AttrValues::String(s.to_string())
    }
}

impl From<String> for AttrValues {
    fn from(s: String) -> Self {
        AttrValues::String(s)
    }
}

/// A named attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: AttrValues,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: impl Into<AttrValues>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_string(&self) -> bool {
        matches!(self.values, AttrValues::String(_))
    }

    /// The string value, if this is a string attribute.
    pub fn string_value(&self) -> Option<&str> {
        match &self.values {
            AttrValues::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The first numeric value.
    pub fn numeric_value(&self) -> Option<f64> {
        self.values.numeric(0)
    }

    /// The i-th numeric value.
    pub fn numeric_at(&self, i: usize) -> Option<f64> {
        self.values.numeric(i)
    }

    /// All numeric values; empty for strings.
    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.values.numeric(i)).collect()
    }
}

/// Ordered attribute collection with name lookup.
///
/// Insertion order is preserved; setting an existing name replaces the value
/// in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeBag {
    attrs: Vec<Attribute>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-name lookup.
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Case-insensitive lookup; an exact match wins over a folded one.
    pub fn find_ignore_case(&self, name: &str) -> Option<&Attribute> {
        self.find(name)
            .or_else(|| self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name)))
    }

    /// Trimmed string value of a case-insensitive lookup.
    pub fn string_ignore_case(&self, name: &str) -> Option<&str> {
        self.find_ignore_case(name)
            .and_then(Attribute::string_value)
            .map(str::trim)
    }

    /// Insert or replace an attribute.
    pub fn set(&mut self, attr: Attribute) {
        match self.attrs.iter_mut().find(|a| a.name == attr.name) {
            Some(existing) => *existing = attr,
            None => self.attrs.push(attr),
        }
    }

    /// Remove an attribute by exact name, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeBag {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut bag = AttributeBag::new();
        for attr in iter {
            bag.set(attr);
        }
        bag
    }
}
