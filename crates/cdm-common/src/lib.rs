//! Common data model shared by the CDM enhancement and coordinate crates.
//!
//! The model is deliberately I/O free: a [`Dataset`] holds dimensions,
//! variables and attributes, and delegates value access to a
//! [`VariableReader`] supplied by the caller.

pub mod array;
pub mod attribute;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod types;
pub mod units;
pub mod variable;

pub use array::{RawArray, Sample};
pub use attribute::{AttrValues, Attribute, AttributeBag};
pub use dataset::{Dataset, VariableReader};
pub use dimension::{DimId, Dimension};
pub use error::{CdmError, CdmResult};
pub use types::{DataType, NON_NUMERIC_RANK};
pub use units::{TimePeriod, TimeUnits};
pub use variable::Variable;
