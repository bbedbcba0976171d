//! Raw variables: name, declared type, shape and attributes.

use serde::{Deserialize, Serialize};

use crate::array::RawArray;
use crate::attribute::{AttrValues, Attribute, AttributeBag};
use crate::dimension::DimId;
use crate::types::DataType;

/// A variable as supplied by the I/O layer.
///
/// `values` holds data injected in memory (by a convention's augmentation
/// step or by a test fixture); otherwise values come from the dataset reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub data_type: DataType,
    pub dims: Vec<DimId>,
    pub attributes: AttributeBag,
    #[serde(skip)]
    pub values: Option<RawArray>,
}

impl Variable {
    pub fn new(name: impl Into<String>, data_type: DataType, dims: Vec<DimId>) -> Self {
        Self {
            name: name.into(),
            data_type,
            dims,
            attributes: AttributeBag::new(),
            values: None,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, values: impl Into<AttrValues>) -> Self {
        self.attributes.set(Attribute::new(name, values));
        self
    }

    /// Builder-style in-memory values.
    pub fn with_values(mut self, values: impl Into<RawArray>) -> Self {
        self.values = Some(values.into());
        self
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.find(name)
    }

    pub fn find_attribute_ignore_case(&self, name: &str) -> Option<&Attribute> {
        self.attributes.find_ignore_case(name)
    }

    /// Trimmed string value of a case-insensitive attribute lookup.
    pub fn attribute_string(&self, name: &str) -> Option<&str> {
        self.attributes.string_ignore_case(name)
    }

    /// The `units` attribute, trimmed.
    pub fn units(&self) -> Option<&str> {
        self.attribute_string("units")
    }

    pub fn set_attribute(&mut self, attr: Attribute) {
        self.attributes.set(attr);
    }

    /// Check if `_Unsigned = "true"` is present (case-insensitive value).
    pub fn has_unsigned_attribute(&self) -> bool {
        self.attribute_string("_Unsigned")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Declared kind adjusted for `_Unsigned`.
    ///
    /// An unsigned declaration always wins; a signed integral declaration
    /// becomes unsigned when the attribute says so.
    pub fn unsigned_adjusted_type(&self) -> DataType {
        if self.data_type.is_unsigned() {
            self.data_type
        } else if self.has_unsigned_attribute() && self.data_type.is_integral() {
            self.data_type.to_unsigned()
        } else {
            self.data_type
        }
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned_adjusted_type().is_unsigned()
    }
}
