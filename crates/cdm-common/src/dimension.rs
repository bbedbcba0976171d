//! Dimensions and dimension identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a dimension within one dataset.
///
/// Two variables share a dimension only if they hold the same `DimId`;
/// equal names are not enough (private dimensions may repeat a name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimId(pub usize);

impl fmt::Display for DimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dim#{}", self.0)
    }
}

/// A named array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub length: usize,
    /// Shared dimensions are visible dataset-wide and findable by name.
    pub shared: bool,
    pub unlimited: bool,
}

impl Dimension {
    /// Create a shared, fixed-length dimension.
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            length,
            shared: true,
            unlimited: false,
        }
    }

    /// Create a shared unlimited (record) dimension.
    pub fn unlimited(name: impl Into<String>, length: usize) -> Self {
        Self {
            unlimited: true,
            ..Self::new(name, length)
        }
    }

    /// Create a private dimension owned by a single variable.
    pub fn private(name: impl Into<String>, length: usize) -> Self {
        Self {
            shared: false,
            ..Self::new(name, length)
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unlimited {
            write!(f, "{} = UNLIMITED ({})", self.name, self.length)
        } else {
            write!(f, "{} = {}", self.name, self.length)
        }
    }
}
